//! Values kept in a cache store.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::hash::compute_request_key;

/// Identity of a request inside a store: method plus canonical URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct RequestIdentity {
    pub method: String,
    pub url: String,
}

impl RequestIdentity {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self { method: method.into().to_ascii_uppercase(), url: url.into() }
    }

    /// Shorthand for a GET identity.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// Storage key for this identity.
    pub fn key(&self) -> String {
        compute_request_key(&self.method, &self.url)
    }
}

impl std::fmt::Display for RequestIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Response snapshot captured at write time.
///
/// Owns its body outright, so the snapshot written to a store never shares
/// state with the response handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl StoredResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Vec<u8>>) -> Self {
        Self { status, headers, body: body.into() }
    }

    /// First header value with the given name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A stored entry together with its identity and write timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub identity: RequestIdentity,
    pub response: StoredResponse,
    pub stored_at: String,
}

/// A store name with its entry count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StoreSummary {
    pub name: String,
    pub entries: u64,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_normalizes_method() {
        let identity = RequestIdentity::new("get", "https://example.com/");
        assert_eq!(identity.method, "GET");
        assert_eq!(identity, RequestIdentity::get("https://example.com/"));
    }

    #[test]
    fn test_identity_display() {
        let identity = RequestIdentity::new("POST", "https://example.com/api");
        assert_eq!(identity.to_string(), "POST https://example.com/api");
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let response = StoredResponse::new(200, vec![("Content-Type".into(), "text/html".into())], "<html/>");
        assert_eq!(response.header("content-type"), Some("text/html"));
        assert_eq!(response.header("etag"), None);
    }
}
