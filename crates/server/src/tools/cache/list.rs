//! cache_list tool implementation.

use greenmap_core::CacheDb;
use greenmap_core::cache::naming;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoreListing {
    pub name: String,
    pub entries: u64,
    pub created_at: String,
    /// Whether this is the store the running worker reads and writes.
    pub current: bool,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    pub stores: Vec<StoreListing>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(cache: &CacheDb, current: &str) -> Result<CallToolResult, McpError> {
    let stores = cache
        .summarize_stores()
        .await?
        .into_iter()
        .map(|s| StoreListing {
            current: naming::is_current(&s.name, current),
            name: s.name,
            entries: s.entries,
            created_at: s.created_at,
        })
        .collect();

    json_result(&CacheListOutput { stores })
}
