//! URL patterns used by routing rules.

use fallow_core::Error;
use regex::Regex;
use url::Url;

/// A single URL predicate.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Exact host or any of its subdomains.
    Host(String),
    /// Path starts with the given prefix.
    PathPrefix(String),
    /// Path contains the given fragment anywhere.
    PathContains(String),
    /// Last path segment ends in `.<ext>`, compared case-insensitively.
    Extension(String),
    /// Full URL starts with the given prefix.
    UrlPrefix(String),
    /// Regular expression over the full URL.
    Regex(Regex),
}

impl Pattern {
    /// Parse a `kind:value` pattern string.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let (kind, value) = input
            .split_once(':')
            .ok_or_else(|| Error::InvalidInput(format!("pattern without kind: {input:?}")))?;

        if value.is_empty() {
            return Err(Error::InvalidInput(format!("empty pattern: {input:?}")));
        }

        match kind {
            "host" => Ok(Pattern::Host(value.to_ascii_lowercase())),
            "prefix" => Ok(Pattern::PathPrefix(value.to_string())),
            "contains" => Ok(Pattern::PathContains(value.to_string())),
            "ext" => Ok(Pattern::Extension(value.trim_start_matches('.').to_ascii_lowercase())),
            "url" => Ok(Pattern::UrlPrefix(value.to_string())),
            "re" => Regex::new(value)
                .map(Pattern::Regex)
                .map_err(|e| Error::InvalidInput(format!("invalid regex {value:?}: {e}"))),
            other => Err(Error::InvalidInput(format!("unknown pattern kind: {other}"))),
        }
    }

    pub fn matches(&self, url: &Url) -> bool {
        match self {
            Pattern::Host(host) => url.host_str().is_some_and(|h| {
                h == host.as_str() || h.strip_suffix(host.as_str()).is_some_and(|rest| rest.ends_with('.'))
            }),
            Pattern::PathPrefix(prefix) => url.path().starts_with(prefix.as_str()),
            Pattern::PathContains(fragment) => url.path().contains(fragment.as_str()),
            Pattern::Extension(ext) => url
                .path_segments()
                .and_then(|segments| segments.last())
                .and_then(|last| last.rsplit_once('.'))
                .is_some_and(|(stem, suffix)| !stem.is_empty() && suffix.eq_ignore_ascii_case(ext)),
            Pattern::UrlPrefix(prefix) => url.as_str().starts_with(prefix.as_str()),
            Pattern::Regex(re) => re.is_match(url.as_str()),
        }
    }
}
