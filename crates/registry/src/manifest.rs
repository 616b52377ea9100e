//! A registry declared in a TOML manifest.
//!
//! ```toml
//! [[job]]
//! name = "proj/repo/build"
//! override_url = "https://mirror.example.com/proj/repo.git"   # optional
//!
//! [[job.scm]]
//! kind = "git"
//! remotes = [{ name = "origin", uris = ["ssh://git@bitbucket.example.com/proj/repo.git"] }]
//!
//! [[job.scm]]
//! kind = "hg"
//! source = "https://hg.example.com/repo"
//!
//! [[owner]]
//! name = "proj/repo"
//!
//! [[owner.source]]
//! id = "default"
//! kind = "git"
//! remote = "git@bitbucket.example.com:proj/repo.git"
//! ```
//!
//! Jobs default to `trigger = true` and `source_driven = true`. Any `kind`
//! other than `git`, `hg` or `mercurial` is loaded as unsupported and never
//! matches. A git URI that does not parse is dropped from its remote with a
//! warning; the rest of the job still loads.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use dispatch::{
    CandidateJob, CollaboratorError, HookTrigger, JobName, Registry, RemoteConfig, RepositoryUrl,
    SourceConfiguration, SourceDescriptor, SourceId, SourceOwner, SourceOwnerName, SourceRemote,
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::ManifestError;
use crate::sink::TriggerSink;

// ---------------------------------------------------------------------------
// On-disk shape
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestFile {
    #[serde(default, rename = "job")]
    jobs: Vec<JobEntry>,
    #[serde(default, rename = "owner")]
    owners: Vec<OwnerEntry>,
}

fn yes() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JobEntry {
    name: String,
    #[serde(default = "yes")]
    trigger: bool,
    #[serde(default)]
    override_url: Option<String>,
    #[serde(default = "yes")]
    source_driven: bool,
    #[serde(default)]
    scm: Vec<ScmEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScmEntry {
    kind: String,
    #[serde(default)]
    remotes: Vec<RemoteEntry>,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RemoteEntry {
    #[serde(default = "origin")]
    name: String,
    uris: Vec<String>,
}

fn origin() -> String {
    "origin".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OwnerEntry {
    name: String,
    #[serde(default, rename = "source")]
    sources: Vec<SourceEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SourceEntry {
    id: String,
    kind: String,
    #[serde(default)]
    remote: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

fn invalid(message: impl Into<String>) -> ManifestError {
    ManifestError::Invalid {
        message: message.into(),
    }
}

fn is_mercurial(kind: &str) -> bool {
    kind.eq_ignore_ascii_case("hg") || kind.eq_ignore_ascii_case("mercurial")
}

fn convert_scm(job: &str, entry: ScmEntry) -> Result<SourceConfiguration, ManifestError> {
    if entry.kind.eq_ignore_ascii_case("git") {
        let remotes = entry
            .remotes
            .into_iter()
            .map(|remote| {
                let uris = remote
                    .uris
                    .iter()
                    .filter_map(|uri| match RepositoryUrl::parse(uri) {
                        Ok(url) => Some(url),
                        Err(err) => {
                            warn!(
                                job,
                                remote = %remote.name,
                                uri = %uri,
                                error = %err,
                                "Dropping unparseable git URI"
                            );
                            None
                        }
                    })
                    .collect();
                RemoteConfig::new(remote.name, uris)
            })
            .collect();
        return Ok(SourceConfiguration::Git { remotes });
    }

    if is_mercurial(&entry.kind) {
        let source = entry
            .source
            .ok_or_else(|| invalid(format!("job '{job}': mercurial scm needs `source`")))?;
        return Ok(SourceConfiguration::Mercurial { source });
    }

    Ok(SourceConfiguration::Unsupported { kind: entry.kind })
}

fn convert_source(owner: &str, entry: SourceEntry) -> Result<SourceDescriptor, ManifestError> {
    let id = SourceId::new(entry.id)
        .ok_or_else(|| invalid(format!("owner '{owner}': source id must not be empty")))?;

    let remote = if entry.kind.eq_ignore_ascii_case("git") {
        let remote = entry
            .remote
            .ok_or_else(|| invalid(format!("owner '{owner}', source '{id}': git needs `remote`")))?;
        SourceRemote::Git { remote }
    } else if is_mercurial(&entry.kind) {
        let source = entry.source.or(entry.remote).ok_or_else(|| {
            invalid(format!("owner '{owner}', source '{id}': mercurial needs `source`"))
        })?;
        SourceRemote::Mercurial { source }
    } else {
        SourceRemote::Unsupported { name: entry.kind }
    };

    Ok(SourceDescriptor { id, remote })
}

// ---------------------------------------------------------------------------
// Candidates
// ---------------------------------------------------------------------------

struct SinkTrigger {
    job: JobName,
    override_url: Option<String>,
    sink: Arc<dyn TriggerSink>,
}

#[async_trait]
impl HookTrigger for SinkTrigger {
    fn override_url(&self) -> Option<&str> {
        self.override_url.as_deref()
    }

    async fn on_triggered(&self, actor: &str, payload: &str) -> Result<(), CollaboratorError> {
        self.sink.job_triggered(&self.job, actor, payload).await
    }
}

/// A job loaded from the manifest.
pub struct ManifestJob {
    name: JobName,
    trigger: Option<SinkTrigger>,
    configurations: Option<Vec<SourceConfiguration>>,
}

impl CandidateJob for ManifestJob {
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

/// A source owner loaded from the manifest.
pub struct ManifestOwner {
    name: SourceOwnerName,
    sources: Vec<SourceDescriptor>,
    sink: Arc<dyn TriggerSink>,
}

#[async_trait]
impl SourceOwner for ManifestOwner {
    fn name(&self) -> &SourceOwnerName {
        &self.name
    }

    fn sources(&self) -> Vec<SourceDescriptor> {
        self.sources.clone()
    }

    async fn on_source_updated(&self, source: &SourceDescriptor) -> Result<(), CollaboratorError> {
        self.sink.source_updated(&self.name, source).await
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Registry whose jobs and owners come from a manifest.
pub struct ManifestRegistry {
    jobs: Vec<Arc<dyn CandidateJob>>,
    owners: Vec<Arc<dyn SourceOwner>>,
}

impl ManifestRegistry {
    /// Reads and parses the manifest at `path`.
    pub async fn load(path: &Path, sink: Arc<dyn TriggerSink>) -> Result<Self, ManifestError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ManifestError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(&text, path, sink)
    }

    /// Parses manifest text. `origin` is only used in error messages.
    pub fn parse(
        text: &str,
        origin: &Path,
        sink: Arc<dyn TriggerSink>,
    ) -> Result<Self, ManifestError> {
        let file: ManifestFile = toml::from_str(text).map_err(|source| ManifestError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        Self::from_file(file, sink)
    }

    /// Parses manifest text that did not come from a file.
    pub fn from_toml(text: &str, sink: Arc<dyn TriggerSink>) -> Result<Self, ManifestError> {
        Self::parse(text, Path::new("<inline>"), sink)
    }

    fn from_file(file: ManifestFile, sink: Arc<dyn TriggerSink>) -> Result<Self, ManifestError> {
        let mut seen_jobs = HashSet::new();
        let mut jobs: Vec<Arc<dyn CandidateJob>> = Vec::with_capacity(file.jobs.len());
        for entry in file.jobs {
            let name =
                JobName::new(entry.name).ok_or_else(|| invalid("job name must not be empty"))?;
            if !seen_jobs.insert(name.clone()) {
                return Err(invalid(format!("duplicate job '{name}'")));
            }

            let configurations = entry
                .scm
                .into_iter()
                .map(|scm| convert_scm(name.as_str(), scm))
                .collect::<Result<Vec<_>, _>>()?;

            let trigger = entry.trigger.then(|| SinkTrigger {
                job: name.clone(),
                override_url: entry.override_url.filter(|u| !u.is_empty()),
                sink: sink.clone(),
            });

            debug!(job = %name, configurations = configurations.len(), "Loaded job");
            jobs.push(Arc::new(ManifestJob {
                name,
                trigger,
                configurations: entry.source_driven.then_some(configurations),
            }));
        }

        let mut seen_owners = HashSet::new();
        let mut owners: Vec<Arc<dyn SourceOwner>> = Vec::with_capacity(file.owners.len());
        for entry in file.owners {
            let name = SourceOwnerName::new(entry.name)
                .ok_or_else(|| invalid("owner name must not be empty"))?;
            if !seen_owners.insert(name.clone()) {
                return Err(invalid(format!("duplicate owner '{name}'")));
            }

            let sources = entry
                .sources
                .into_iter()
                .map(|source| convert_source(name.as_str(), source))
                .collect::<Result<Vec<_>, _>>()?;

            debug!(owner = %name, sources = sources.len(), "Loaded source owner");
            owners.push(Arc::new(ManifestOwner {
                name,
                sources,
                sink: sink.clone(),
            }));
        }

        Ok(Self { jobs, owners })
    }

    /// Number of jobs loaded.
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Number of source owners loaded.
    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }
}

#[async_trait]
impl Registry for ManifestRegistry {
    async fn list_all_jobs(&self) -> Result<Vec<Arc<dyn CandidateJob>>, CollaboratorError> {
        Ok(self.jobs.clone())
    }

    async fn list_all_source_owners(
        &self,
    ) -> Result<Vec<Arc<dyn SourceOwner>>, CollaboratorError> {
        Ok(self.owners.clone())
    }
}
