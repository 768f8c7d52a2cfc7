//! Errors raised by the harness itself rather than the worker.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// The requested HTTP method is not a valid token.
    #[error("INVALID_METHOD: {0}")]
    InvalidMethod(String),

    /// A tool output could not be encoded as JSON.
    #[error("ENCODE_FAILED: {0}")]
    Encode(String),
}

impl From<HostError> for McpError {
    fn from(err: HostError) -> Self {
        let code = match &err {
            HostError::InvalidMethod(_) => -32602,
            HostError::Encode(_) => -32603,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
