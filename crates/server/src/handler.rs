//! MCP server handler implementation.
//!
//! The handler is the host side of the worker: each tool call delivers one
//! lifecycle or fetch event, or inspects the cache stores.
use std::sync::Arc;

use crate::tools::cache::{CacheGetParams, get_impl, list_impl};
use crate::tools::fetch::{WorkerFetchParams, fetch_impl};
use crate::tools::lifecycle::{activate_impl, install_impl, status_impl};

use greenmap_client::OfflineWorker;
use greenmap_core::CacheDb;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use url::Url;

/// The MCP server handler for greenmap-worker.
#[derive(Clone)]
pub struct GreenmapWorkerServer {
    worker: Arc<OfflineWorker>,
    cache: CacheDb,
    origin: Url,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl GreenmapWorkerServer {
    pub fn new(worker: Arc<OfflineWorker>, cache: CacheDb, origin: Url) -> Self {
        Self { worker, cache, origin, tool_router: Self::tool_router() }
    }

    #[tool(description = "Deliver the install event: fetch the bootstrap manifest and seed the current cache store.")]
    async fn worker_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker).await
    }

    #[tool(description = "Deliver the activate event: delete every cache store other than the current one.")]
    async fn worker_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker).await
    }

    #[tool(description = "Report the worker's lifecycle state, current store name and bootstrap manifest.")]
    async fn worker_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.worker).await
    }

    /// Network first; GET responses are cached, and served from the cache
    /// when the network fails.
    #[tool(
        description = "Deliver a fetch event. Tries the network first and falls back to the current cache store. Returns status, source, headers and body."
    )]
    async fn worker_fetch(&self, params: Parameters<WorkerFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, &self.origin, params.0).await
    }

    #[tool(description = "List every cache store with its entry count and whether it is current.")]
    async fn cache_list(&self) -> Result<CallToolResult, McpError> {
        list_impl(&self.cache, self.worker.store_name()).await
    }

    #[tool(description = "Get the stored response for a request in the current cache store, without touching the network.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.worker, &self.origin, params.0).await
    }
}

impl ServerHandler for GreenmapWorkerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "greenmap-worker".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
