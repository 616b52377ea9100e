//! Canonicalisation of candidate remotes against a notification URL.

use crate::url::RepositoryUrl;

/// Path prefix Bitbucket Server puts in front of HTTP clone URLs but not SSH ones.
pub const PROXY_PATH_PREFIX: &str = "/scm";

/// Returns `url` with a leading [`PROXY_PATH_PREFIX`] removed from its path.
///
/// Exactly those four characters are removed; `/scmfoo` becomes `foo`.
pub fn strip_proxy_prefix(url: &RepositoryUrl) -> RepositoryUrl {
    match url.path().strip_prefix(PROXY_PATH_PREFIX) {
        Some(rest) => url.with_path(rest),
        None => url.clone(),
    }
}

/// Derives a comparable form of `candidate` (a job's remote) for matching
/// against `reference` (the notification URL).
///
/// - the proxy path prefix is stripped from the candidate;
/// - when the reference has no host, the candidate's host is blanked too, so
///   comparison falls back to the path.
///
/// Neither input is modified.
pub fn canonicalize(candidate: &RepositoryUrl, reference: &RepositoryUrl) -> RepositoryUrl {
    let stripped = strip_proxy_prefix(candidate);
    if reference.is_host_blank() {
        stripped.with_host(reference.host())
    } else {
        stripped
    }
}
