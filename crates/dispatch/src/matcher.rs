//! Loose repository matching.
//!
//! Git remotes match when they name the same host (ignoring ASCII case) and the
//! same path once a leading `/`, a trailing `/` and a trailing `.git` are
//! removed. Scheme, user and port are ignored, so an SSH remote matches the
//! HTTPS URL of the same repository.
//!
//! Mercurial sources use a stricter structural comparison: host, path and query
//! must be identical and no canonicalisation is applied.

use tracing::{debug, trace, warn};

use crate::canonical::{canonicalize, strip_proxy_prefix};
use crate::errors::RemoteParseFailure;
use crate::source::{
    extract_remote, extract_remotes, RemoteConfig, Remotes, SourceConfiguration, SourceDescriptor,
    SourceLocation,
};
use crate::url::RepositoryUrl;

fn parse_candidate(remote: &str) -> Result<RepositoryUrl, RemoteParseFailure> {
    RepositoryUrl::parse(remote).map_err(|source| RemoteParseFailure {
        remote: remote.to_string(),
        source,
    })
}

fn normalize_path(path: &str) -> &str {
    let path = path.strip_prefix('/').unwrap_or(path);
    let path = path.strip_suffix('/').unwrap_or(path);
    path.strip_suffix(".git").unwrap_or(path)
}

fn hosts_match(lhs: Option<&str>, rhs: Option<&str>) -> bool {
    match (lhs, rhs) {
        (Some(l), Some(r)) => l.eq_ignore_ascii_case(r),
        (None, None) => true,
        _ => false,
    }
}

/// Returns `true` if `lhs` and `rhs` name the same git repository.
pub fn loosely_matches(lhs: &RepositoryUrl, rhs: &RepositoryUrl) -> bool {
    hosts_match(lhs.host(), rhs.host()) && normalize_path(lhs.path()) == normalize_path(rhs.path())
}

/// Matches a job's git remotes against the notification URL.
///
/// Every URI of every remote is canonicalised and compared in order; the first
/// loose match wins. When a comparison fails and `override_url` is non-empty,
/// the result is decided right there by exact comparison of `override_url`
/// with the notification's raw text, without trying the remaining URIs.
pub fn match_git(
    remotes: &[RemoteConfig],
    notify: &RepositoryUrl,
    override_url: Option<&str>,
) -> bool {
    let reference = strip_proxy_prefix(notify);
    let override_url = override_url.filter(|o| !o.is_empty());

    for remote in remotes {
        for uri in remote.uris() {
            let candidate = canonicalize(uri, notify);
            trace!(
                remote = %remote.name(),
                candidate = %candidate,
                notify = %reference,
                "Trying to match"
            );
            if loosely_matches(&candidate, &reference) {
                return true;
            }
            if let Some(override_url) = override_url {
                debug!(
                    override_url,
                    notify = %notify.as_str(),
                    "Trying to match using override repository URL"
                );
                return override_url == notify.as_str();
            }
        }
    }
    false
}

/// Matches a git source location (owner-style, no override) against the
/// notification URL.
pub fn match_git_source(remote: &str, notify: &RepositoryUrl) -> bool {
    let candidate = match parse_candidate(remote) {
        Ok(url) => url,
        Err(err) => {
            warn!(error = %err, cause = %err.source, "Skipping source with unparseable remote");
            return false;
        }
    };
    let candidate = canonicalize(&candidate, notify);
    let reference = strip_proxy_prefix(notify);
    trace!(candidate = %candidate, notify = %reference, "Trying to match");
    loosely_matches(&candidate, &reference)
}

/// Matches a mercurial source location against the notification URL by exact
/// host, path and query equality.
pub fn match_mercurial(source: &str, notify: &RepositoryUrl) -> bool {
    let candidate = match parse_candidate(source) {
        Ok(url) => url,
        Err(err) => {
            warn!(
                error = %err,
                cause = %err.source,
                "Skipping mercurial source with unparseable location"
            );
            return false;
        }
    };
    candidate.host() == notify.host()
        && candidate.path() == notify.path()
        && candidate.query() == notify.query()
}

/// Matches one job configuration, selecting the matcher by configuration kind.
pub fn match_configuration(
    config: &SourceConfiguration,
    notify: &RepositoryUrl,
    override_url: Option<&str>,
) -> bool {
    match extract_remotes(config) {
        Remotes::Git(remotes) => match_git(remotes, notify, override_url),
        Remotes::Mercurial(source) => match_mercurial(source, notify),
        Remotes::NotApplicable => false,
    }
}

/// Matches one owner-style source. There is no override URL on this path.
pub fn match_source(source: &SourceDescriptor, notify: &RepositoryUrl) -> bool {
    match extract_remote(source) {
        SourceLocation::Git(remote) => match_git_source(remote, notify),
        SourceLocation::Mercurial(location) => match_mercurial(location, notify),
        SourceLocation::NoMatchPossible => false,
    }
}
