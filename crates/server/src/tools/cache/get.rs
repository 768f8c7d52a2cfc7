//! cache_get tool implementation.
//!
//! Retrieves the entry the worker would fall back to for a request.

use greenmap_client::OfflineWorker;
use greenmap_client::fetch::resolve;
use greenmap_core::{Error, RequestIdentity};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::tools::fetch::parse_method;
use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// HTTP method of the stored request (default: GET).
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub store: String,
    pub request: RequestIdentity,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, with invalid sequences replaced.
    pub body: String,
    pub bytes: usize,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(worker: &OfflineWorker, origin: &Url, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let method = parse_method(&params.method)?;
    let url = resolve(origin, &params.url).map_err(Error::from)?;
    let identity = RequestIdentity::new(method.as_str(), url.as_str());

    let stored = worker
        .cached(&identity)
        .await?
        .ok_or_else(|| Error::CacheMiss(identity.to_string()))?;

    let output = CacheGetOutput {
        store: worker.store_name().to_string(),
        status: stored.status,
        body: String::from_utf8_lossy(&stored.body).into_owned(),
        bytes: stored.body.len(),
        headers: stored.headers,
        request: identity,
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{active_harness, decode};
    use rmcp::model::ErrorCode;

    #[tokio::test]
    async fn test_get_missing() {
        let h = active_harness().await;
        let params = CacheGetParams { url: "/nothing-here".into(), method: default_method() };

        let err = get_impl(&h.worker, &h.origin, params).await.unwrap_err();
        assert_eq!(err.code, ErrorCode(-32001));
        assert!(err.message.contains("GET http://localhost:3000/nothing-here"));
    }

    #[tokio::test]
    async fn test_get_manifest_entry() {
        let h = active_harness().await;
        let params = CacheGetParams { url: "http://LOCALHOST:3000/#top".into(), method: "get".into() };

        let output: CacheGetOutput = decode(&get_impl(&h.worker, &h.origin, params).await.unwrap());
        assert_eq!(output.store, "greenmap-v2");
        assert_eq!(output.request, RequestIdentity::get("http://localhost:3000/"));
        assert_eq!(output.status, 200);
        assert_eq!(output.body, "<html/>");
        assert!(output.headers.iter().any(|(k, v)| k == "content-type" && v == "application/json"));
    }
}
