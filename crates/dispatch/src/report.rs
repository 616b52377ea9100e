//! Outcome of a completed dispatch pass.

use serde::{Deserialize, Serialize};

use crate::types::{SourceKind, Timestamp};
use crate::{DispatchPassId, JobName, SourceId, SourceOwnerName};

/// A source whose owner was told it changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatedSource {
    /// The owner that was notified.
    pub owner: SourceOwnerName,
    /// The source that matched.
    pub source: SourceId,
}

/// What one dispatch pass did.
///
/// Candidates skipped because they carry no hook trigger are counted, not
/// listed. Callback failures are listed separately from successes; a failed
/// callback still counts as the configuration's one trigger for the pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchReport {
    /// Identifies the pass in logs.
    pub pass_id: DispatchPassId,
    /// Source-control kind of the notification.
    pub kind: SourceKind,
    /// The notification URL as received.
    pub repository_url: String,
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
    /// One entry per trigger invocation, in registry order.
    pub triggered_jobs: Vec<JobName>,
    /// Owner sources notified, in registry order.
    pub updated_sources: Vec<UpdatedSource>,
    /// Jobs and owners whose callback returned an error.
    pub failed_callbacks: Vec<String>,
    /// Jobs without a hook trigger or not driven by source configurations.
    pub skipped_jobs: usize,
}

impl DispatchReport {
    pub(crate) fn begin(pass_id: DispatchPassId, kind: SourceKind, repository_url: &str) -> Self {
        let now = Timestamp::now();
        Self {
            pass_id,
            kind,
            repository_url: repository_url.to_string(),
            started_at: now,
            finished_at: now,
            triggered_jobs: Vec::new(),
            updated_sources: Vec::new(),
            failed_callbacks: Vec::new(),
            skipped_jobs: 0,
        }
    }

    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = Timestamp::now();
        self
    }

    /// Returns `true` if nothing was triggered or updated.
    pub fn is_empty(&self) -> bool {
        self.triggered_jobs.is_empty() && self.updated_sources.is_empty()
    }

    /// Number of trigger invocations for `job` in this pass.
    pub fn trigger_count(&self, job: &str) -> usize {
        self.triggered_jobs
            .iter()
            .filter(|name| name.as_str() == job)
            .count()
    }
}
