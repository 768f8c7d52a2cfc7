//! worker_fetch tool implementation.
//!
//! Delivers one fetch event to the worker, the way the page's own requests
//! would reach it.

use greenmap_client::fetch::{Method, resolve};
use greenmap_client::{FetchRequest, OfflineWorker};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use super::json_result;
use crate::error::HostError;

/// Input parameters for the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// HTTP method (default: GET). Only GET responses are cached.
    #[serde(default = "default_method")]
    pub method: String,

    /// Optional request body, sent as-is.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchOutput {
    pub url: String,
    pub status: u16,
    /// "network" or "cache".
    pub source: String,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, with invalid sequences replaced.
    pub body: String,
    pub bytes: usize,
    pub fetch_ms: u64,
}

pub(crate) fn parse_method(method: &str) -> Result<Method, HostError> {
    Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| HostError::InvalidMethod(method.to_string()))
}

/// Implementation of the worker_fetch tool.
pub async fn fetch_impl(
    worker: &OfflineWorker, origin: &Url, params: WorkerFetchParams,
) -> Result<CallToolResult, McpError> {
    let method = parse_method(&params.method)?;
    let url = resolve(origin, &params.url).map_err(greenmap_core::Error::from)?;

    let mut request = FetchRequest::new(method, url);
    if let Some(body) = params.body {
        request = request.with_body(body);
    }

    let outcome = worker.handle_fetch(request).await?;
    let response = outcome.response;

    let headers = response
        .headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect();

    let output = WorkerFetchOutput {
        url: response.url.to_string(),
        status: response.status.as_u16(),
        source: outcome.source.as_str().to_string(),
        content_type: response.content_type,
        headers,
        body: String::from_utf8_lossy(&response.bytes).into_owned(),
        bytes: response.bytes.len(),
        fetch_ms: response.fetch_ms,
    };

    json_result(&output)
}
