//! worker_control tool implementation.
//!
//! Posts a message on the lifecycle control channel.

use fallow_client::ControlCommand;
use fallow_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Parameters for the worker_control tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerControlParams {
    /// Control message: "FORCE_ACTIVATE", "RUN_EVICTION_SWEEP", or a JSON
    /// object with a "type" field naming one of them.
    pub message: String,
}

/// Output from the worker_control tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerControlOutput {
    /// Recognized command, if any.
    pub command: Option<String>,
    /// "queued" or "ignored".
    pub status: String,
}

/// Implementation of the worker_control tool.
///
/// Unrecognized messages are still delivered; the controller drops them.
pub async fn control_impl(
    control: &mpsc::Sender<String>, params: WorkerControlParams,
) -> Result<CallToolResult, McpError> {
    let command = ControlCommand::parse(&params.message);

    control
        .send(params.message)
        .await
        .map_err(|_| Error::InvalidInput("lifecycle controller is not running".into()))?;

    let output = WorkerControlOutput {
        command: command.map(|c| c.as_str().to_string()),
        status: if command.is_some() { "queued" } else { "ignored" }.into(),
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::output_json;

    #[tokio::test]
    async fn test_control_queues_known_command() {
        let (tx, mut rx) = mpsc::channel(4);
        let params = WorkerControlParams { message: r#"{"type":"RUN_EVICTION_SWEEP"}"#.into() };

        let output = output_json(&control_impl(&tx, params).await.unwrap());
        assert_eq!(output["command"], "RUN_EVICTION_SWEEP");
        assert_eq!(output["status"], "queued");
        assert_eq!(rx.recv().await.unwrap(), r#"{"type":"RUN_EVICTION_SWEEP"}"#);
    }

    #[tokio::test]
    async fn test_control_acknowledges_unknown_command() {
        let (tx, _rx) = mpsc::channel(4);
        let params = WorkerControlParams { message: "REBOOT".into() };

        let output = output_json(&control_impl(&tx, params).await.unwrap());
        assert!(output["command"].is_null());
        assert_eq!(output["status"], "ignored");
    }

    #[tokio::test]
    async fn test_control_fails_when_controller_gone() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let params = WorkerControlParams { message: "FORCE_ACTIVATE".into() };
        assert!(control_impl(&tx, params).await.is_err());
    }
}
