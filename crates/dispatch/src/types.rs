//! Shared value types for the dispatch domain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DispatchError;
use crate::url::RepositoryUrl;

// ---------------------------------------------------------------------------
// Source kinds
// ---------------------------------------------------------------------------

/// Source-control system a notification refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Git,
    Mercurial,
}

impl SourceKind {
    /// Parses the kind string carried by a notification.
    ///
    /// Accepts `git`, `hg` and `mercurial`, ignoring ASCII case.
    pub fn parse(kind: &str) -> Result<Self, DispatchError> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "git" => Ok(Self::Git),
            "hg" | "mercurial" => Ok(Self::Mercurial),
            _ => Err(DispatchError::UnsupportedScmType {
                kind: kind.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Git => write!(f, "git"),
            Self::Mercurial => write!(f, "hg"),
        }
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// One inbound "repository changed" event, validated.
///
/// Lives for a single dispatch pass and is read-only throughout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Who the change is attributed to. Passed through to triggers untouched.
    pub actor: String,
    pub url: RepositoryUrl,
    pub kind: SourceKind,
    /// Opaque webhook payload. Empty when the sender provides none.
    pub payload: String,
}

impl Notification {
    /// Validates the notification URL. The kind has already been parsed by the
    /// caller, so an unsupported kind is reported before a malformed URL.
    pub fn parse(
        actor: &str,
        url: &str,
        kind: SourceKind,
        payload: &str,
    ) -> Result<Self, DispatchError> {
        let url = RepositoryUrl::parse(url).map_err(|source| DispatchError::InvalidRepositoryUrl {
            url: url.to_string(),
            source,
        })?;
        Ok(Self {
            actor: actor.to_string(),
            url,
            kind,
            payload: payload.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_accepts_git_and_mercurial_spellings() {
        assert_eq!(SourceKind::parse("git").unwrap(), SourceKind::Git);
        assert_eq!(SourceKind::parse("HG").unwrap(), SourceKind::Mercurial);
        assert_eq!(SourceKind::parse("mercurial").unwrap(), SourceKind::Mercurial);
    }

    #[test]
    fn kind_rejects_svn() {
        let err = SourceKind::parse("svn").unwrap_err();
        assert!(matches!(err, DispatchError::UnsupportedScmType { kind } if kind == "svn"));
    }

    #[test]
    fn notification_rejects_malformed_url() {
        let err = Notification::parse("alice", "ht!tp://bad", SourceKind::Git, "").unwrap_err();
        assert!(
            matches!(err, DispatchError::InvalidRepositoryUrl { ref url, .. } if url == "ht!tp://bad")
        );
    }

    #[test]
    fn notification_keeps_raw_url_text() {
        let raw = "https://bitbucket.example.com/scm/proj/repo.git";
        let notification = Notification::parse("alice", raw, SourceKind::Mercurial, "{}").unwrap();
        assert_eq!(notification.url.as_str(), raw);
        assert_eq!(notification.kind, SourceKind::Mercurial);
        assert_eq!(notification.payload, "{}");
    }
}
