//! Error types for the dispatch domain.
//!
//! [`DispatchError`] covers conditions that abort a whole dispatch pass. Failures
//! that are local to one candidate (a stored remote that does not parse, a
//! trigger callback that errors) never surface here; they are logged and the pass
//! moves on to the next candidate.
//!
//! [`CollaboratorError`] is what port implementations (registry, trigger,
//! source owner) return to the dispatch loop.

use thiserror::Error;

// ---------------------------------------------------------------------------
// URL parsing
// ---------------------------------------------------------------------------

/// A repository URL could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlParseError {
    /// The input was empty or whitespace only.
    #[error("repository URL is blank")]
    Blank,

    /// The input looked like a URL with a scheme but could not be parsed as one.
    #[error("invalid repository URL '{input}': {reason}")]
    Malformed {
        /// The raw text that failed to parse.
        input: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// The input was neither a URL, an scp-like remote, nor a local path.
    #[error("unrecognised repository location '{input}'")]
    Unrecognised {
        /// The raw text that failed to parse.
        input: String,
    },
}

/// A remote stored on a job or source failed to parse.
///
/// Local to that candidate: it is treated as not matching and the pass goes on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not parse candidate remote '{remote}'")]
pub struct RemoteParseFailure {
    /// The stored remote text.
    pub remote: String,
    /// Why it failed to parse.
    #[source]
    pub source: UrlParseError,
}

// ---------------------------------------------------------------------------
// Collaborator failures
// ---------------------------------------------------------------------------

/// Failure reported by an external collaborator behind one of the port traits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    /// The registry could not enumerate its jobs or source owners.
    #[error("registry unavailable: {message}")]
    RegistryUnavailable {
        /// Description of the failure.
        message: String,
    },

    /// A trigger or source-owner callback refused or failed the notification.
    #[error("callback for '{target}' failed: {message}")]
    CallbackFailed {
        /// The job or owner the callback belonged to.
        target: String,
        /// Description of the failure.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Pass-level errors
// ---------------------------------------------------------------------------

/// Errors that abort an entire dispatch pass.
///
/// When one of these is returned no candidate has been triggered by the pass
/// and the caller's security context has been restored.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The notification's repository URL failed to parse.
    #[error("Invalid repository URL '{url}'")]
    InvalidRepositoryUrl {
        /// The raw URL carried by the notification.
        url: String,
        /// Why it failed to parse.
        #[source]
        source: UrlParseError,
    },

    /// The notification named a source-control kind this core does not handle.
    #[error("Unsupported SCM type {kind}")]
    UnsupportedScmType {
        /// The kind string as received.
        kind: String,
    },

    /// The registry could not be enumerated.
    #[error("Registry enumeration failed")]
    Registry(#[source] CollaboratorError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_kind_message_names_the_kind() {
        let err = DispatchError::UnsupportedScmType {
            kind: "svn".to_string(),
        };
        assert_eq!(err.to_string(), "Unsupported SCM type svn");
    }

    #[test]
    fn invalid_url_keeps_parse_error_as_source() {
        let parse_error = crate::url::RepositoryUrl::parse("ht!tp://bad").unwrap_err();
        assert!(matches!(parse_error, UrlParseError::Malformed { .. }));

        let err = DispatchError::InvalidRepositoryUrl {
            url: "ht!tp://bad".to_string(),
            source: parse_error,
        };
        assert_eq!(err.to_string(), "Invalid repository URL 'ht!tp://bad'");
        let source = std::error::Error::source(&err).expect("source should be set");
        assert!(source.to_string().contains("ht!tp://bad"));
    }
}
