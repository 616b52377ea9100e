//! Parsed repository locations.
//!
//! A [`RepositoryUrl`] is compared structurally, never by raw string, because
//! the same repository is routinely spelled several ways:
//!
//! | Form | Example |
//! |------|---------|
//! | hierarchical | `https://bitbucket.example.com/scm/proj/repo.git` |
//! | hierarchical with user and port | `ssh://git@bitbucket.example.com:7999/proj/repo.git` |
//! | scp-like | `git@bitbucket.example.com:proj/repo.git` |
//! | local path | `/srv/git/repo.git` |
//!
//! Hierarchical URLs go through the `url` crate; the scp-like and local forms
//! are recognised here because they are not URLs in the WHATWG sense. A
//! hierarchical URL with an empty authority (`https:///proj/repo.git`) is also
//! split here, since the `url` crate would promote the first path segment to
//! the host.
//!
//! Hosts are lowercased in every form and hierarchical paths are
//! percent-decoded, so values compare the same whichever form they came from.

use std::fmt;

use crate::errors::UrlParseError;

/// How the location was written. Only affects [`fmt::Display`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Form {
    Hierarchical,
    ScpLike,
    Local,
}

/// A parsed, immutable repository location.
///
/// Derived values (a different path, a different host) are produced with
/// [`RepositoryUrl::with_path`] and [`RepositoryUrl::with_host`]; the original is
/// never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryUrl {
    raw: String,
    form: Form,
    scheme: Option<String>,
    user: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    path: String,
    query: Option<String>,
}

impl RepositoryUrl {
    /// Parses `raw` into a repository location.
    ///
    /// The text is kept verbatim and returned by [`RepositoryUrl::as_str`].
    pub fn parse(raw: &str) -> Result<Self, UrlParseError> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(UrlParseError::Blank);
        }

        if text.contains("://") {
            return Self::parse_hierarchical(raw, text);
        }
        if is_local_path(text) {
            return Ok(Self::local(raw, text));
        }
        if let Some(parsed) = Self::parse_scp_like(raw, text) {
            return Ok(parsed);
        }

        Err(UrlParseError::Unrecognised {
            input: raw.to_string(),
        })
    }

    fn parse_hierarchical(raw: &str, text: &str) -> Result<Self, UrlParseError> {
        // `https:///p/r` has an empty authority; the `url` crate would read `p`
        // as the host, so host-less forms are split by hand.
        if let Some((scheme, rest)) = text.split_once("://") {
            if rest.starts_with('/') {
                return Self::parse_hostless(raw, scheme, rest);
            }
        }

        let parsed = ::url::Url::parse(text).map_err(|e| malformed(raw, e))?;

        let user = Some(parsed.username())
            .filter(|u| !u.is_empty())
            .map(str::to_string);
        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .map(str::to_ascii_lowercase);

        Ok(Self {
            raw: raw.to_string(),
            form: Form::Hierarchical,
            scheme: Some(parsed.scheme().to_string()),
            user,
            host,
            port: parsed.port(),
            path: decode_path(raw, parsed.path())?,
            query: parsed.query().map(str::to_string),
        })
    }

    fn parse_hostless(raw: &str, scheme: &str, rest: &str) -> Result<Self, UrlParseError> {
        if !is_valid_scheme(scheme) {
            return Err(malformed(raw, "invalid scheme"));
        }
        let (path, query) = split_query(rest);

        Ok(Self {
            raw: raw.to_string(),
            form: Form::Hierarchical,
            scheme: Some(scheme.to_ascii_lowercase()),
            user: None,
            host: None,
            port: None,
            path: decode_path(raw, path)?,
            query,
        })
    }

    fn parse_scp_like(raw: &str, text: &str) -> Option<Self> {
        let (authority, path) = text.split_once(':')?;
        if authority.contains('/') || path.is_empty() {
            return None;
        }
        let (user, host) = match authority.rsplit_once('@') {
            Some((user, host)) => (Some(user.to_string()).filter(|u| !u.is_empty()), host),
            None => (None, authority),
        };
        // A single letter before the colon is a Windows drive, not a host.
        if host.is_empty() || host.len() == 1 {
            return None;
        }
        let (path, query) = split_query(path);

        Some(Self {
            raw: raw.to_string(),
            form: Form::ScpLike,
            scheme: None,
            user,
            host: Some(host.to_ascii_lowercase()),
            port: None,
            path: path.to_string(),
            query,
        })
    }

    fn local(raw: &str, text: &str) -> Self {
        Self {
            raw: raw.to_string(),
            form: Form::Local,
            scheme: None,
            user: None,
            host: None,
            port: None,
            path: text.to_string(),
            query: None,
        }
    }

    /// The text this value was parsed from, unchanged.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The scheme, lowercased. `None` for scp-like and local forms.
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// The user name before `@`, if any.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// The host in ASCII lowercase, or `None` when absent or empty.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// The explicit port. Scheme default ports are not reported.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// The path, percent-decoded for hierarchical URLs and as written otherwise.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The query without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Returns `true` if the location carries no host information.
    pub fn is_host_blank(&self) -> bool {
        self.host.as_deref().map_or(true, |h| h.trim().is_empty())
    }

    /// Returns a copy with the path replaced.
    #[must_use]
    pub fn with_path(&self, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..self.clone()
        }
    }

    /// Returns a copy with the host replaced. Empty hosts are stored as `None`.
    #[must_use]
    pub fn with_host(&self, host: Option<&str>) -> Self {
        Self {
            host: host.filter(|h| !h.trim().is_empty()).map(str::to_string),
            ..self.clone()
        }
    }
}

impl fmt::Display for RepositoryUrl {
    /// Renders from the components, so derived values show their edits.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.form {
            Form::Local => return write!(f, "{}", self.path),
            Form::Hierarchical => {
                write!(f, "{}://", self.scheme.as_deref().unwrap_or_default())?;
            }
            Form::ScpLike => {}
        }
        if let Some(user) = &self.user {
            write!(f, "{user}@")?;
        }
        if let Some(host) = &self.host {
            write!(f, "{host}")?;
        }
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        if self.form == Form::ScpLike {
            write!(f, ":")?;
        }
        write!(f, "{}", self.path)?;
        if let Some(query) = &self.query {
            write!(f, "?{query}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for RepositoryUrl {
    type Err = UrlParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn is_local_path(text: &str) -> bool {
    text.starts_with('/') || text.starts_with("./") || text.starts_with("../") || text.starts_with('~')
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn malformed(raw: &str, reason: impl fmt::Display) -> UrlParseError {
    UrlParseError::Malformed {
        input: raw.to_string(),
        reason: reason.to_string(),
    }
}

/// Decodes `%XX` escapes so `my%20repo` and `my repo` compare equal.
fn decode_path(raw: &str, path: &str) -> Result<String, UrlParseError> {
    urlencoding::decode(path)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| malformed(raw, e))
}

fn split_query(path: &str) -> (&str, Option<String>) {
    match path.split_once('?') {
        Some((path, query)) => (path, Some(query.to_string())),
        None => (path, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_https_with_scm_prefix() {
        let url = RepositoryUrl::parse("https://bitbucket.example.com/scm/proj/repo.git").unwrap();
        assert_eq!(url.scheme(), Some("https"));
        assert_eq!(url.host(), Some("bitbucket.example.com"));
        assert_eq!(url.path(), "/scm/proj/repo.git");
        assert_eq!(url.query(), None);
    }

    #[test]
    fn parses_ssh_with_user_and_port() {
        let url = RepositoryUrl::parse("ssh://git@bitbucket.example.com:7999/proj/repo.git").unwrap();
        assert_eq!(url.scheme(), Some("ssh"));
        assert_eq!(url.user(), Some("git"));
        assert_eq!(url.host(), Some("bitbucket.example.com"));
        assert_eq!(url.port(), Some(7999));
        assert_eq!(url.path(), "/proj/repo.git");
    }

    #[test]
    fn parses_scp_like_remote() {
        let url = RepositoryUrl::parse("git@bitbucket.org:team/repo.git").unwrap();
        assert_eq!(url.scheme(), None);
        assert_eq!(url.user(), Some("git"));
        assert_eq!(url.host(), Some("bitbucket.org"));
        assert_eq!(url.path(), "team/repo.git");
        assert_eq!(url.to_string(), "git@bitbucket.org:team/repo.git");
    }

    #[test]
    fn parses_query_on_hierarchical_url() {
        let url = RepositoryUrl::parse("https://hg.example.com/repo?branch=default").unwrap();
        assert_eq!(url.path(), "/repo");
        assert_eq!(url.query(), Some("branch=default"));
    }

    #[test]
    fn parses_local_path_without_host() {
        let url = RepositoryUrl::parse("/srv/git/repo.git").unwrap();
        assert!(url.is_host_blank());
        assert_eq!(url.path(), "/srv/git/repo.git");
    }

    #[test]
    fn file_url_has_blank_host() {
        let url = RepositoryUrl::parse("file:///srv/git/repo.git").unwrap();
        assert!(url.is_host_blank());
        assert_eq!(url.path(), "/srv/git/repo.git");
    }

    #[test]
    fn rejects_invalid_scheme() {
        let err = RepositoryUrl::parse("ht!tp://bad").unwrap_err();
        assert!(matches!(err, UrlParseError::Malformed { .. }));
    }

    #[test]
    fn rejects_blank_and_bare_words() {
        assert_eq!(RepositoryUrl::parse("   ").unwrap_err(), UrlParseError::Blank);
        assert!(matches!(
            RepositoryUrl::parse("not-a-remote").unwrap_err(),
            UrlParseError::Unrecognised { .. }
        ));
        assert!(matches!(
            RepositoryUrl::parse("C:repo").unwrap_err(),
            UrlParseError::Unrecognised { .. }
        ));
    }

    #[test]
    fn empty_authority_keeps_full_path_and_no_host() {
        let url = RepositoryUrl::parse("https:///proj/repo.git").unwrap();
        assert_eq!(url.scheme(), Some("https"));
        assert_eq!(url.host(), None);
        assert!(url.is_host_blank());
        assert_eq!(url.path(), "/proj/repo.git");
        assert_eq!(url.to_string(), "https:///proj/repo.git");

        let ssh = RepositoryUrl::parse("ssh:///proj/repo.git?x=1").unwrap();
        assert_eq!(ssh.path(), "/proj/repo.git");
        assert_eq!(ssh.query(), Some("x=1"));
    }

    #[test]
    fn empty_authority_still_validates_scheme() {
        assert!(matches!(
            RepositoryUrl::parse("ht!tp:///proj/repo.git").unwrap_err(),
            UrlParseError::Malformed { .. }
        ));
    }

    #[test]
    fn hierarchical_paths_are_percent_decoded() {
        let url = RepositoryUrl::parse("https://bitbucket.example.com/scm/proj/my repo.git").unwrap();
        assert_eq!(url.path(), "/scm/proj/my repo.git");

        let escaped = RepositoryUrl::parse("https://example.com/proj/my%20repo.git").unwrap();
        assert_eq!(escaped.path(), "/proj/my repo.git");
    }

    #[test]
    fn hosts_are_lowercased_in_every_form() {
        let https = RepositoryUrl::parse("https://HG.example.com/repo").unwrap();
        let ssh = RepositoryUrl::parse("ssh://hg@HG.example.com/repo").unwrap();
        let scp = RepositoryUrl::parse("git@HG.Example.com:repo").unwrap();
        assert_eq!(https.host(), Some("hg.example.com"));
        assert_eq!(ssh.host(), Some("hg.example.com"));
        assert_eq!(scp.host(), Some("hg.example.com"));
    }

    #[test]
    fn raw_text_survives_derivation() {
        let url = RepositoryUrl::parse("https://Example.com/scm/p/r.git").unwrap();
        let derived = url.with_path("/p/r.git").with_host(None);
        assert_eq!(derived.as_str(), "https://Example.com/scm/p/r.git");
        assert_eq!(derived.to_string(), "https:///p/r.git");
        assert_eq!(url.path(), "/scm/p/r.git");
    }
}
