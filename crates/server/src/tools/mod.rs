//! MCP tool implementations.
//!
//! Each tool delivers one event to the worker or inspects the cache stores.

pub mod cache;
pub mod fetch;
pub mod lifecycle;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::HostError;

/// Render a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(|e| HostError::Encode(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use bytes::Bytes;
    use greenmap_client::fetch::{StatusCode, header};
    use greenmap_client::{FetchRequest, FetchResponse, Network, OfflineWorker};
    use greenmap_core::{AppConfig, CacheDb, Error};
    use rmcp::model::CallToolResult;
    use serde::de::DeserializeOwned;
    use url::Url;

    pub const ORIGIN: &str = "http://localhost:3000";

    /// Network double answering from a fixed table of URL to body.
    #[derive(Default)]
    pub struct TableNetwork {
        pub pages: Mutex<HashMap<String, &'static str>>,
    }

    impl TableNetwork {
        pub fn serve(&self, path: &str, body: &'static str) {
            self.pages.lock().unwrap().insert(format!("{ORIGIN}{path}"), body);
        }

        pub fn go_offline(&self) {
            self.pages.lock().unwrap().clear();
        }
    }

    #[async_trait]
    impl Network for TableNetwork {
        async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
            let body = self
                .pages
                .lock()
                .unwrap()
                .get(request.url.as_str())
                .copied()
                .ok_or_else(|| Error::NetworkUnavailable(format!("no route to {}", request.url)))?;

            let mut headers = header::HeaderMap::new();
            headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));
            Ok(FetchResponse {
                url: request.url.clone(),
                final_url: request.url.clone(),
                status: StatusCode::OK,
                content_type: Some("application/json".into()),
                bytes: Bytes::from_static(body.as_bytes()),
                headers,
                fetch_ms: 3,
            })
        }
    }

    pub struct Harness {
        pub worker: Arc<OfflineWorker>,
        pub network: Arc<TableNetwork>,
        pub db: CacheDb,
        pub origin: Url,
    }

    /// Worker for version 2 whose manifest is just `/`, served by the table network.
    pub async fn harness() -> Harness {
        let config = AppConfig { cache_version: "2".into(), manifest: vec!["/".into()], ..Default::default() };
        let network = Arc::new(TableNetwork::default());
        network.serve("/", "<html/>");
        let db = CacheDb::open_in_memory().await.unwrap();
        let worker = OfflineWorker::from_config(&config, network.clone(), Arc::new(db.clone())).unwrap();
        Harness { worker: Arc::new(worker), network, db, origin: Url::parse(ORIGIN).unwrap() }
    }

    pub async fn active_harness() -> Harness {
        let h = harness().await;
        h.worker.install().await.unwrap();
        h.worker.activate().await.unwrap();
        h
    }

    /// Decode the JSON text of the first content item.
    pub fn decode<T: DeserializeOwned>(result: &CallToolResult) -> T {
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        serde_json::from_str(text).unwrap()
    }
}
