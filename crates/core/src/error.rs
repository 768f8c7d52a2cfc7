//! Unified error types for the greenmap worker.
//!
//! Every variant carries a stable prefix so hosts can match on the
//! rendered message as well as on the MCP error code.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the offline worker and its store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., unknown HTTP method).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// A bootstrap manifest entry could not be retrieved during install.
    #[error("MANIFEST_FETCH_FAILED: {url}: {reason}")]
    ManifestFetch { url: String, reason: String },

    /// A runtime fetch could not reach the network.
    #[error("NETWORK_UNAVAILABLE: {0}")]
    NetworkUnavailable(String),

    /// The server answered, but with a body over the configured limit.
    #[error("RESPONSE_TOO_LARGE: {url}: {bytes} bytes exceeds {limit}")]
    ResponseTooLarge { url: String, bytes: u64, limit: usize },

    /// No cache entry found for the given request.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// An old-version store could not be deleted during activation.
    #[error("STORE_DELETION_FAILED: {name}: {reason}")]
    StoreDeletion { name: String, reason: String },

    /// The worker received a fetch event while not active.
    #[error("NOT_ACTIVE: worker is {0}")]
    NotActive(String),

    /// A lifecycle event arrived in a state that cannot accept it.
    #[error("INVALID_TRANSITION: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidInput(format!("malformed stored headers: {err}"))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) | Error::InvalidUrl(_) => -32602,
            Error::ManifestFetch { .. } => -32020,
            Error::NetworkUnavailable(_) => -32021,
            Error::ResponseTooLarge { .. } => -32024,
            Error::CacheMiss(_) => -32001,
            Error::StoreDeletion { .. } => -32022,
            Error::NotActive(_) | Error::InvalidTransition { .. } => -32023,
            Error::Database(_) | Error::MigrationFailed(_) => -32002,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
