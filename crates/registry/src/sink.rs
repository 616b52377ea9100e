//! Where manifest-declared triggers deliver their signals.
//!
//! The manifest only describes which jobs and sources exist. What "trigger this
//! job" means for a deployment is supplied as a [`TriggerSink`].

use std::sync::Mutex;

use async_trait::async_trait;
use dispatch::{CollaboratorError, JobName, SourceDescriptor, SourceId, SourceOwnerName};
use serde::Serialize;
use tracing::info;

/// Receives trigger signals from manifest jobs and owners.
#[async_trait]
pub trait TriggerSink: Send + Sync {
    /// `job` matched a notification attributed to `actor`.
    async fn job_triggered(
        &self,
        job: &JobName,
        actor: &str,
        payload: &str,
    ) -> Result<(), CollaboratorError>;

    /// `source` of `owner` matched a notification.
    async fn source_updated(
        &self,
        owner: &SourceOwnerName,
        source: &SourceDescriptor,
    ) -> Result<(), CollaboratorError>;
}

/// A signal delivered to a [`LoggingSink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TriggerEvent {
    /// A job's trigger fired.
    JobTriggered {
        job: JobName,
        actor: String,
        payload_bytes: usize,
    },
    /// An owner was told a source changed.
    SourceUpdated {
        owner: SourceOwnerName,
        source: SourceId,
    },
}

/// Logs every signal and keeps it for later inspection.
#[derive(Debug, Default)]
pub struct LoggingSink {
    events: Mutex<Vec<TriggerEvent>>,
}

impl LoggingSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals received so far, in arrival order.
    pub fn events(&self) -> Vec<TriggerEvent> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<TriggerEvent>> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl TriggerSink for LoggingSink {
    async fn job_triggered(
        &self,
        job: &JobName,
        actor: &str,
        payload: &str,
    ) -> Result<(), CollaboratorError> {
        info!(job = %job, actor, payload_bytes = payload.len(), "Job triggered");
        self.lock().push(TriggerEvent::JobTriggered {
            job: job.clone(),
            actor: actor.to_string(),
            payload_bytes: payload.len(),
        });
        Ok(())
    }

    async fn source_updated(
        &self,
        owner: &SourceOwnerName,
        source: &SourceDescriptor,
    ) -> Result<(), CollaboratorError> {
        info!(owner = %owner, source = %source.id, "Source updated");
        self.lock().push(TriggerEvent::SourceUpdated {
            owner: owner.clone(),
            source: source.id.clone(),
        });
        Ok(())
    }
}
