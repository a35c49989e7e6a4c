//! cache_status tool implementation.
//!
//! Reports the lifecycle phase and every stored partition.

use chrono::Utc;
use fallow_client::LifecycleController;
use fallow_core::{Error, PartitionStats};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_status tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatusParams {
    /// Only report partitions belonging to the current version.
    #[serde(default)]
    pub current_only: bool,
}

/// A client session and the version controlling it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SessionStatus {
    pub id: String,
    /// `None` until an activation claims the session.
    pub controller: Option<String>,
}

/// Output from the cache_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatusOutput {
    pub phase: String,
    pub version: String,
    pub partitions: Vec<PartitionStats>,
    pub sessions: Vec<SessionStatus>,
    /// Sessions claimed by the last activation, if one has finished.
    pub claimed: Option<usize>,
    /// ISO8601 timestamp of the report.
    pub checked_at: String,
}

/// Implementation of the cache_status tool.
pub async fn status_impl(
    lifecycle: &LifecycleController, partitions: &fallow_core::Partitions, params: CacheStatusParams,
) -> Result<CallToolResult, McpError> {
    let mut stats = partitions.stats().await?;
    if params.current_only {
        stats.retain(|p| p.current);
    }

    let output = CacheStatusOutput {
        phase: lifecycle.phase().to_string(),
        version: partitions.version().to_string(),
        partitions: stats,
        sessions: lifecycle
            .sessions()
            .list()
            .await
            .into_iter()
            .map(|(id, controller)| SessionStatus { id, controller })
            .collect(),
        claimed: lifecycle.last_activation().map(|report| report.claimed),
        checked_at: Utc::now().to_rfc3339(),
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{output_json, worker};
    use fallow_core::{PartitionKind, ResponseSnapshot};

    #[tokio::test]
    async fn test_status_reports_phase_and_partitions() {
        let worker = worker().await;
        let partitions = worker.partitions().clone();
        let lifecycle = LifecycleController::new(worker.context().clone(), Vec::new(), chrono::Duration::hours(1));

        partitions
            .store(PartitionKind::Api, "GET", "https://app.example.com/api/a", &ResponseSnapshot::new(200, vec![], "{}"))
            .await
            .unwrap();
        partitions.db().open_partition("static-v0").await.unwrap();

        let result = status_impl(&lifecycle, &partitions, CacheStatusParams::default()).await.unwrap();
        let output = output_json(&result);
        assert_eq!(output["phase"], "installing");
        assert_eq!(output["version"], "v1");
        let listed = output["partitions"].as_array().unwrap();
        assert!(listed.iter().any(|p| p["name"] == "api-v1" && p["entries"] == 1));
        assert!(listed.iter().any(|p| p["name"] == "static-v0" && p["current"] == false));
        assert!(output["sessions"].as_array().unwrap().is_empty());
        assert!(output["claimed"].is_null());
    }

    #[tokio::test]
    async fn test_status_current_only() {
        let worker = worker().await;
        let partitions = worker.partitions().clone();
        let lifecycle = LifecycleController::new(worker.context().clone(), Vec::new(), chrono::Duration::hours(1));
        partitions.db().open_partition("runtime-v0").await.unwrap();
        partitions.db().open_partition("runtime-v1").await.unwrap();

        let params = CacheStatusParams { current_only: true };
        let output = output_json(&status_impl(&lifecycle, &partitions, params).await.unwrap());
        let listed = output["partitions"].as_array().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["name"], "runtime-v1");
    }
}
