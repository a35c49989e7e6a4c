//! URL normalization for consistent cache keys.

/// Error type for URL parsing failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("relative URL without a base: {0}")]
    Relative(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Parse a request URL into the form used for cache keys.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Lowercase the host
/// 3. Remove fragment (#...), which never reaches the network
/// 4. Keep query string intact (do not reorder)
///
/// Any scheme is accepted; deciding whether a non-HTTP request is
/// intercepted is the classifier's job.
pub fn parse_request_url(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = url::Url::parse(trimmed).map_err(|e| match e {
        url::ParseError::RelativeUrlWithoutBase => UrlError::Relative(trimmed.to_string()),
        other => UrlError::InvalidUrl(other.to_string()),
    })?;

    if let Some(host) = parsed.host_str().map(str::to_lowercase) {
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Resolve a pre-cache manifest path against the application origin.
pub fn resolve_manifest_path(origin: &url::Url, path: &str) -> Result<url::Url, UrlError> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }
    let mut resolved = origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    resolved.set_fragment(None);
    Ok(resolved)
}
