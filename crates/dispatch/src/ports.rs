//! Port traits for the collaborators the dispatch loop depends on.
//!
//! Infrastructure crates implement these; the dispatch loop only ever sees the
//! trait objects. `dispatch::fakes` (feature `fakes`) provides
//! in-memory implementations.

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::CollaboratorError;
use crate::source::{SourceConfiguration, SourceDescriptor};
use crate::{JobName, SourceOwnerName};

/// Enumerates every registered job and source owner.
///
/// Called under the elevated identity, so implementations should return
/// candidates regardless of the triggering actor's visibility.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Every registered job, in registry order.
    async fn list_all_jobs(&self) -> Result<Vec<Arc<dyn CandidateJob>>, CollaboratorError>;

    /// Every registered source owner, in registry order.
    async fn list_all_source_owners(
        &self,
    ) -> Result<Vec<Arc<dyn SourceOwner>>, CollaboratorError>;
}

/// A registered job that may be triggered by a notification.
pub trait CandidateJob: Send + Sync {
    /// Full name of the job.
    fn name(&self) -> &JobName;

    /// The hook trigger configured on this job, if any. Jobs without one are
    /// never triggered.
    fn hook_trigger(&self) -> Option<&dyn HookTrigger>;

    /// The source configurations the job builds from.
    ///
    /// `None` means the job is not driven by source configurations at all;
    /// `Some(vec![])` means it is but declares none.
    fn source_configurations(&self) -> Option<Vec<SourceConfiguration>>;
}

/// The trigger-of-interest on a job.
#[async_trait]
pub trait HookTrigger: Send + Sync {
    /// Operator-supplied URL consulted when loose matching fails.
    fn override_url(&self) -> Option<&str> {
        None
    }

    /// Schedules the job. Queueing and retries are the implementation's concern.
    async fn on_triggered(&self, actor: &str, payload: &str) -> Result<(), CollaboratorError>;
}

/// An entity owning named sources, such as a multi-branch project.
#[async_trait]
pub trait SourceOwner: Send + Sync {
    /// Full name of the owner.
    fn name(&self) -> &SourceOwnerName;

    /// The sources this owner builds from.
    fn sources(&self) -> Vec<SourceDescriptor>;

    /// Tells the owner that `source` changed upstream.
    async fn on_source_updated(&self, source: &SourceDescriptor) -> Result<(), CollaboratorError>;
}
