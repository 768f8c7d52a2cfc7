//! URL canonicalization and origin-relative resolution.
//!
//! Request identities are built from canonical URLs, so the same resource
//! always maps to the same cache key regardless of how it was spelled.

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for greenmap_core::Error {
    fn from(err: UrlError) -> Self {
        greenmap_core::Error::InvalidUrl(err.to_string())
    }
}

/// Canonicalize a URL string for consistent cache keys.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(mut host) = parsed.host_str() {
        let h = host.to_lowercase();
        host = h.as_str();
        parsed
            .set_host(Some(host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Resolve a request target against the worker's origin.
///
/// Targets starting with `/` are origin-relative paths (manifest entries,
/// same-origin requests); anything else is canonicalized as an absolute URL.
pub fn resolve(origin: &url::Url, target: &str) -> Result<url::Url, UrlError> {
    let trimmed = target.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    if !trimmed.starts_with('/') || trimmed.starts_with("//") {
        return canonicalize(trimmed);
    }

    let mut joined = origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    joined.set_fragment(None);
    Ok(joined)
}
