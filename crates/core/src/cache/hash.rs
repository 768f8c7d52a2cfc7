//! Request identity key generation.

use sha2::{Digest, Sha256};

/// Compute the storage key for a request identity.
///
/// Method and URL are joined with a newline so `GET` + `/a` can never
/// collide with a method that happens to end in a URL prefix.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_stability() {
        let hash1 = compute_request_key("GET", "https://example.com/");
        let hash2 = compute_request_key("GET", "https://example.com/");
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_different_method() {
        let get = compute_request_key("GET", "https://example.com/");
        let head = compute_request_key("HEAD", "https://example.com/");
        assert_ne!(get, head);
    }

    #[test]
    fn test_hash_different_url() {
        let hash1 = compute_request_key("GET", "https://example.com/a");
        let hash2 = compute_request_key("GET", "https://example.com/b");
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_hash_format() {
        let hash = compute_request_key("GET", "https://example.com/");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
