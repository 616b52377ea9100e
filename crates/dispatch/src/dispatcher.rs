//! The dispatch loop.
//!
//! One call to [`Dispatcher::dispatch`] is one pass over the registry for one
//! notification:
//!
//! 1. validate the source kind, then the notification URL;
//! 2. under the elevated identity, enumerate jobs and source owners;
//! 3. **jobs**: for each job with a hook trigger, trigger it once per matching
//!    source configuration;
//! 4. **owners**: for each owned source that matches, notify its owner.
//!
//! The pass is sequential. Failures local to a candidate are logged and the
//! loop moves on; only the errors in [`DispatchError`] end a pass early.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, info_span, trace, warn, Instrument};

use crate::errors::DispatchError;
use crate::matcher::{match_configuration, match_source};
use crate::ports::{CandidateJob, Registry, SourceOwner};
use crate::report::{DispatchReport, UpdatedSource};
use crate::security::{ElevatedScope, SecurityContext};
use crate::source::SourceConfiguration;
use crate::types::{Notification, SourceKind};
use crate::{DispatchPassId, JobName, SystemIdentity};

/// Configurations already triggered in the current pass.
///
/// Keyed by job and configuration value, so one job listing the same
/// configuration twice is triggered once, while two jobs sharing a remote are
/// each triggered.
#[derive(Debug, Default)]
struct TriggeredSet {
    seen: HashSet<(JobName, SourceConfiguration)>,
}

impl TriggeredSet {
    /// Records the pair, returning `false` if it was already present.
    fn insert(&mut self, job: &JobName, config: &SourceConfiguration) -> bool {
        self.seen.insert((job.clone(), config.clone()))
    }
}

/// Runs dispatch passes against a registry.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<dyn Registry>,
    security: Arc<dyn SecurityContext>,
    system_identity: SystemIdentity,
}

impl Dispatcher {
    /// Creates a dispatcher running passes as `SYSTEM`.
    pub fn new(registry: Arc<dyn Registry>, security: Arc<dyn SecurityContext>) -> Self {
        Self {
            registry,
            security,
            system_identity: SystemIdentity::default(),
        }
    }

    /// Overrides the identity passes run under (default `SYSTEM`).
    #[must_use]
    pub fn with_system_identity(mut self, identity: SystemIdentity) -> Self {
        self.system_identity = identity;
        self
    }

    /// Triggers every job and source matching `url`.
    pub async fn dispatch(
        &self,
        actor: &str,
        url: &str,
        kind: &str,
        payload: &str,
    ) -> Result<(), DispatchError> {
        self.dispatch_with_report(actor, url, kind, payload)
            .await
            .map(|_| ())
    }

    /// [`Dispatcher::dispatch`] without a payload.
    #[deprecated(note = "use `dispatch` and pass the webhook payload")]
    pub async fn dispatch_legacy(
        &self,
        actor: &str,
        url: &str,
        kind: &str,
    ) -> Result<(), DispatchError> {
        self.dispatch(actor, url, kind, "").await
    }

    /// Like [`Dispatcher::dispatch`], returning what the pass did.
    pub async fn dispatch_with_report(
        &self,
        actor: &str,
        url: &str,
        kind: &str,
        payload: &str,
    ) -> Result<DispatchReport, DispatchError> {
        let source_kind = SourceKind::parse(kind)?;
        let pass_id = DispatchPassId::new_random();
        let span = info_span!("dispatch_pass", %pass_id, url, kind = %source_kind);

        async {
            let _elevated = ElevatedScope::enter(self.security.as_ref(), &self.system_identity);

            let notification = Notification::parse(actor, url, source_kind, payload)
                .inspect_err(|err| {
                    warn!(error = %err, "Invalid repository URL");
                })?;

            let jobs = self
                .registry
                .list_all_jobs()
                .await
                .map_err(DispatchError::Registry)?;
            let owners = self
                .registry
                .list_all_source_owners()
                .await
                .map_err(DispatchError::Registry)?;

            let mut report = DispatchReport::begin(pass_id, notification.kind, url);
            self.dispatch_jobs(&notification, &jobs, &mut report).await;
            debug!("Now checking source owners");
            self.dispatch_owners(&notification, &owners, &mut report).await;

            let report = report.finish();
            info!(
                triggered = report.triggered_jobs.len(),
                updated = report.updated_sources.len(),
                "Dispatch pass complete"
            );
            Ok::<_, DispatchError>(report)
        }
        .instrument(span)
        .await
    }

    async fn dispatch_jobs(
        &self,
        notification: &Notification,
        jobs: &[Arc<dyn CandidateJob>],
        report: &mut DispatchReport,
    ) {
        let mut triggered = TriggeredSet::default();

        for job in jobs {
            let name = job.name();
            debug!(job = %name, "Considering candidate job");

            let Some(trigger) = job.hook_trigger() else {
                debug!(job = %name, "Job has no hook trigger");
                report.skipped_jobs += 1;
                continue;
            };

            let Some(configurations) = job.source_configurations() else {
                info!(job = %name, "Job is not driven by source configurations");
                report.skipped_jobs += 1;
                continue;
            };
            if configurations.is_empty() {
                warn!(job = %name, "No SCM configuration found");
            }

            for config in &configurations {
                if !match_configuration(config, &notification.url, trigger.override_url()) {
                    trace!(
                        job = %name,
                        notify = %notification.url,
                        "SCM doesn't match remote repo"
                    );
                    continue;
                }
                if !triggered.insert(name, config) {
                    continue;
                }

                info!(job = %name, "Triggering job");
                if let Err(err) = trigger
                    .on_triggered(&notification.actor, &notification.payload)
                    .await
                {
                    warn!(job = %name, error = %err, "Trigger callback failed");
                    report.failed_callbacks.push(name.to_string());
                }
                report.triggered_jobs.push(name.clone());
            }
        }
    }

    async fn dispatch_owners(
        &self,
        notification: &Notification,
        owners: &[Arc<dyn SourceOwner>],
        report: &mut DispatchReport,
    ) {
        for owner in owners {
            let name = owner.name();
            debug!(owner = %name, "Considering candidate source owner");

            for source in owner.sources() {
                trace!(owner = %name, source = %source.id, "Considering candidate source");
                if !match_source(&source, &notification.url) {
                    debug!(owner = %name, source = %source.id, "Source doesn't match remote repo");
                    continue;
                }

                info!(owner = %name, source = %source.id, "Notifying source owner");
                if let Err(err) = owner.on_source_updated(&source).await {
                    warn!(owner = %name, error = %err, "Source update callback failed");
                    report.failed_callbacks.push(name.to_string());
                }
                report.updated_sources.push(UpdatedSource {
                    owner: name.clone(),
                    source: source.id,
                });
            }
        }
    }
}
