//! Source-control configurations and the adapter layer that turns them into
//! remotes the matcher can compare.
//!
//! Two shapes exist:
//!
//! - [`SourceConfiguration`] is what a job declares (a git configuration with
//!   any number of remotes, a mercurial configuration with one source, or a
//!   kind this crate does not understand).
//! - [`SourceDescriptor`] is one named source belonging to a
//!   [`crate::SourceOwner`] (a multi-branch style project).
//!
//! Unsupported kinds are an explicit variant on both, so adding a new kind is a
//! compile error in [`extract_remotes`] and [`extract_remote`] until handled.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::url::RepositoryUrl;
use crate::SourceId;

// ---------------------------------------------------------------------------
// Job-style configurations
// ---------------------------------------------------------------------------

/// One logical git remote. A remote may carry several URIs (fetch, push).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteConfig {
    name: String,
    uris: Vec<RepositoryUrl>,
}

impl RemoteConfig {
    /// Creates a remote with its URIs in declaration order.
    pub fn new(name: impl Into<String>, uris: Vec<RepositoryUrl>) -> Self {
        Self {
            name: name.into(),
            uris,
        }
    }

    /// Remote name, conventionally `origin`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// URIs in the order they are tried.
    pub fn uris(&self) -> &[RepositoryUrl] {
        &self.uris
    }
}

/// A source-control configuration declared on a job.
///
/// Equality is by value; the dispatch loop uses it to avoid triggering the same
/// configuration twice for one job in one pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceConfiguration {
    /// Git with an ordered list of remotes.
    Git {
        remotes: Vec<RemoteConfig>,
    },
    /// Mercurial with a single source location, kept as written and parsed at
    /// match time.
    Mercurial {
        source: String,
    },
    /// Any other source-control system. Never matches.
    Unsupported {
        kind: String,
    },
}

/// The remotes a job configuration offers to the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remotes<'a> {
    /// Remotes for the loose git matcher.
    Git(&'a [RemoteConfig]),
    /// The single mercurial location, unparsed.
    Mercurial(&'a str),
    /// The configuration kind is not supported; nothing to match.
    NotApplicable,
}

/// Extracts the remotes of a job configuration.
pub fn extract_remotes(config: &SourceConfiguration) -> Remotes<'_> {
    match config {
        SourceConfiguration::Git { remotes } => {
            trace!("configuration is git");
            Remotes::Git(remotes)
        }
        SourceConfiguration::Mercurial { source } => {
            trace!("configuration is mercurial");
            Remotes::Mercurial(source)
        }
        SourceConfiguration::Unsupported { kind } => {
            trace!(kind = %kind, "configuration kind is not supported");
            Remotes::NotApplicable
        }
    }
}

// ---------------------------------------------------------------------------
// Owner-style sources
// ---------------------------------------------------------------------------

/// Where a source descriptor points.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceRemote {
    /// A git remote as written in the owner's configuration.
    Git { remote: String },
    /// A mercurial location as written.
    Mercurial { source: String },
    /// Any other kind, identified by name.
    Unsupported { name: String },
}

/// One named source owned by a [`crate::SourceOwner`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Identifies the source within its owner.
    pub id: SourceId,
    /// Where the source points.
    pub remote: SourceRemote,
}

/// The remote an owner-style source offers to the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLocation<'a> {
    /// Git remote, matched loosely.
    Git(&'a str),
    /// Mercurial location, matched strictly.
    Mercurial(&'a str),
    /// Unsupported kind; never matches.
    NoMatchPossible,
}

/// Extracts the remote of an owner-style source.
pub fn extract_remote(source: &SourceDescriptor) -> SourceLocation<'_> {
    match &source.remote {
        SourceRemote::Git { remote } => SourceLocation::Git(remote),
        SourceRemote::Mercurial { source: location } => SourceLocation::Mercurial(location),
        SourceRemote::Unsupported { name } => {
            trace!(source = %source.id, kind = %name, "source kind is not supported");
            SourceLocation::NoMatchPossible
        }
    }
}
