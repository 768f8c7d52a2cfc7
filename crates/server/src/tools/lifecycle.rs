//! worker_install, worker_activate and worker_status.

use greenmap_client::OfflineWorker;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Output from the worker_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerStatusOutput {
    /// Lifecycle state, e.g. "installed" or "active".
    pub state: String,
    /// Name of the current cache store.
    pub store: String,
    /// Resolved bootstrap manifest URLs.
    pub manifest: Vec<String>,
}

pub async fn install_impl(worker: &OfflineWorker) -> Result<CallToolResult, McpError> {
    let report = worker.install().await?;
    json_result(&report)
}

pub async fn activate_impl(worker: &OfflineWorker) -> Result<CallToolResult, McpError> {
    let report = worker.activate().await?;
    json_result(&report)
}

pub async fn status_impl(worker: &OfflineWorker) -> Result<CallToolResult, McpError> {
    let output = WorkerStatusOutput {
        state: worker.state().await.to_string(),
        store: worker.store_name().to_string(),
        manifest: worker.manifest().entries().iter().map(|u| u.to_string()).collect(),
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{decode, harness};
    use greenmap_client::{ActivationReport, InstallReport};
    use rmcp::model::ErrorCode;

    #[tokio::test]
    async fn test_status_before_install() {
        let h = harness().await;
        let output: WorkerStatusOutput = decode(&status_impl(&h.worker).await.unwrap());
        assert_eq!(output.state, "uninstalled");
        assert_eq!(output.store, "greenmap-v2");
        assert_eq!(output.manifest, vec!["http://localhost:3000/"]);
    }

    #[tokio::test]
    async fn test_install_then_activate() {
        let h = harness().await;
        h.db.open_store("greenmap-v1").await.unwrap();

        let install: InstallReport = decode(&install_impl(&h.worker).await.unwrap());
        assert_eq!(install.store, "greenmap-v2");
        assert_eq!(install.cached, vec!["http://localhost:3000/"]);

        let activation: ActivationReport = decode(&activate_impl(&h.worker).await.unwrap());
        assert_eq!(activation.deleted, vec!["greenmap-v1"]);
        assert!(activation.failed.is_empty());

        let status: WorkerStatusOutput = decode(&status_impl(&h.worker).await.unwrap());
        assert_eq!(status.state, "active");
    }

    #[tokio::test]
    async fn test_install_failure_maps_to_manifest_code_and_can_retry() {
        let h = harness().await;
        h.network.go_offline();

        let err = install_impl(&h.worker).await.unwrap_err();
        assert_eq!(err.code, ErrorCode(-32020));

        let status: WorkerStatusOutput = decode(&status_impl(&h.worker).await.unwrap());
        assert_eq!(status.state, "uninstalled");

        h.network.serve("/", "<html/>");
        let install: InstallReport = decode(&install_impl(&h.worker).await.unwrap());
        assert_eq!(install.cached.len(), 1);
    }

    #[tokio::test]
    async fn test_activate_out_of_order() {
        let h = harness().await;
        let err = activate_impl(&h.worker).await.unwrap_err();
        assert_eq!(err.code, ErrorCode(-32023));
    }
}
