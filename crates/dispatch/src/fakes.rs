//! In-memory fakes for the port traits (testing only, behind the `fakes`
//! feature).
//!
//! Provides `MemoryRegistry`, `FakeJob`, `RecordingTrigger`,
//! `RecordingSourceOwner` and `MemorySecurityContext`, which satisfy the trait
//! contracts without any external collaborator and record every call for
//! assertions.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::errors::CollaboratorError;
use crate::ports::{CandidateJob, HookTrigger, Registry, SourceOwner};
use crate::security::{SavedContext, SecurityContext};
use crate::source::{SourceConfiguration, SourceDescriptor};
use crate::{JobName, SourceId, SourceOwnerName, SystemIdentity};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// RecordingTrigger
// ---------------------------------------------------------------------------

/// A hook trigger that records `(actor, payload)` for every invocation.
#[derive(Debug, Default)]
pub struct RecordingTrigger {
    override_url: Option<String>,
    fail: bool,
    calls: Mutex<Vec<(String, String)>>,
}

impl RecordingTrigger {
    /// A trigger that succeeds and has no override URL.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the override URL the trigger reports.
    pub fn with_override_url(mut self, url: impl Into<String>) -> Self {
        self.override_url = Some(url.into());
        self
    }

    /// Makes every invocation return an error (after recording it).
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// `(actor, payload)` of every invocation so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl HookTrigger for RecordingTrigger {
    fn override_url(&self) -> Option<&str> {
        self.override_url.as_deref()
    }

    async fn on_triggered(&self, actor: &str, payload: &str) -> Result<(), CollaboratorError> {
        lock(&self.calls).push((actor.to_string(), payload.to_string()));
        if self.fail {
            return Err(CollaboratorError::CallbackFailed {
                target: "recording trigger".to_string(),
                message: "configured to fail".to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeJob
// ---------------------------------------------------------------------------

/// A job with an optional [`RecordingTrigger`] and fixed configurations.
#[derive(Debug)]
pub struct FakeJob {
    name: JobName,
    trigger: Option<RecordingTrigger>,
    configurations: Option<Vec<SourceConfiguration>>,
}

impl FakeJob {
    /// A job with a plain trigger and the given configurations.
    pub fn triggered(name: &str, configurations: Vec<SourceConfiguration>) -> Self {
        Self::with_trigger(name, RecordingTrigger::new(), configurations)
    }

    /// A job with the given trigger and configurations.
    pub fn with_trigger(
        name: &str,
        trigger: RecordingTrigger,
        configurations: Vec<SourceConfiguration>,
    ) -> Self {
        Self {
            name: fake_name(name, JobName::new),
            trigger: Some(trigger),
            configurations: Some(configurations),
        }
    }

    /// A job without a hook trigger.
    pub fn untriggered(name: &str, configurations: Vec<SourceConfiguration>) -> Self {
        Self {
            name: fake_name(name, JobName::new),
            trigger: None,
            configurations: Some(configurations),
        }
    }

    /// A job with a trigger that is not driven by source configurations.
    pub fn without_sources(name: &str) -> Self {
        Self {
            name: fake_name(name, JobName::new),
            trigger: Some(RecordingTrigger::new()),
            configurations: None,
        }
    }

    /// Invocations recorded by this job's trigger.
    pub fn trigger_calls(&self) -> Vec<(String, String)> {
        self.trigger
            .as_ref()
            .map(RecordingTrigger::calls)
            .unwrap_or_default()
    }
}

impl CandidateJob for FakeJob {
    fn name(&self) -> &JobName {
        &self.name
    }

    fn hook_trigger(&self) -> Option<&dyn HookTrigger> {
        self.trigger.as_ref().map(|t| t as &dyn HookTrigger)
    }

    fn source_configurations(&self) -> Option<Vec<SourceConfiguration>> {
        self.configurations.clone()
    }
}

// ---------------------------------------------------------------------------
// RecordingSourceOwner
// ---------------------------------------------------------------------------

/// A source owner recording the id of every source it is told about.
#[derive(Debug)]
pub struct RecordingSourceOwner {
    name: SourceOwnerName,
    sources: Vec<SourceDescriptor>,
    updates: Mutex<Vec<SourceId>>,
}

impl RecordingSourceOwner {
    /// An owner of `sources` that accepts every update.
    pub fn new(name: &str, sources: Vec<SourceDescriptor>) -> Self {
        Self {
            name: fake_name(name, SourceOwnerName::new),
            sources,
            updates: Mutex::new(Vec::new()),
        }
    }

    /// Ids of the sources reported as updated, in order.
    pub fn updates(&self) -> Vec<SourceId> {
        lock(&self.updates).clone()
    }
}

#[async_trait]
impl SourceOwner for RecordingSourceOwner {
    fn name(&self) -> &SourceOwnerName {
        &self.name
    }

    fn sources(&self) -> Vec<SourceDescriptor> {
        self.sources.clone()
    }

    async fn on_source_updated(&self, source: &SourceDescriptor) -> Result<(), CollaboratorError> {
        lock(&self.updates).push(source.id.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryRegistry
// ---------------------------------------------------------------------------

/// In-memory registry holding jobs and owners in insertion order.
#[derive(Default)]
pub struct MemoryRegistry {
    jobs: Mutex<Vec<Arc<dyn CandidateJob>>>,
    owners: Mutex<Vec<Arc<dyn SourceOwner>>>,
    unavailable: bool,
}

impl MemoryRegistry {
    /// An empty, available registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry whose enumeration always fails.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Appends a job to the enumeration order.
    pub fn add_job(&self, job: Arc<dyn CandidateJob>) {
        lock(&self.jobs).push(job);
    }

    /// Appends a source owner to the enumeration order.
    pub fn add_owner(&self, owner: Arc<dyn SourceOwner>) {
        lock(&self.owners).push(owner);
    }

    fn check_available(&self) -> Result<(), CollaboratorError> {
        if self.unavailable {
            return Err(CollaboratorError::RegistryUnavailable {
                message: "memory registry configured as unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn list_all_jobs(&self) -> Result<Vec<Arc<dyn CandidateJob>>, CollaboratorError> {
        self.check_available()?;
        Ok(lock(&self.jobs).clone())
    }

    async fn list_all_source_owners(
        &self,
    ) -> Result<Vec<Arc<dyn SourceOwner>>, CollaboratorError> {
        self.check_available()?;
        Ok(lock(&self.owners).clone())
    }
}

// ---------------------------------------------------------------------------
// MemorySecurityContext
// ---------------------------------------------------------------------------

/// Tracks the current identity and how often it was restored.
#[derive(Debug, Default)]
pub struct MemorySecurityContext {
    current: Mutex<Option<String>>,
    restores: Mutex<usize>,
}

impl MemorySecurityContext {
    /// Starts with no identity.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Starts as `user`.
    pub fn as_user(user: &str) -> Self {
        Self {
            current: Mutex::new(Some(user.to_string())),
            restores: Mutex::new(0),
        }
    }

    /// The identity currently in effect.
    pub fn current(&self) -> Option<String> {
        lock(&self.current).clone()
    }

    /// How many times a saved context was restored.
    pub fn restore_count(&self) -> usize {
        *lock(&self.restores)
    }
}

impl SecurityContext for MemorySecurityContext {
    fn impersonate(&self, identity: &SystemIdentity) -> SavedContext {
        let mut current = lock(&self.current);
        SavedContext(current.replace(identity.to_string()))
    }

    fn restore(&self, previous: SavedContext) {
        *lock(&self.current) = previous.0;
        *lock(&self.restores) += 1;
    }
}

/// Fake names come from test literals; an empty one is a bug in the test.
fn fake_name<T>(name: &str, make: impl Fn(String) -> Option<T>) -> T {
    make(name.to_string()).expect("fake names must not be empty")
}
