//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::tools::{
    CacheStatusParams, FetchParams, WorkerControlParams, control_impl, fetch_impl, status_impl,
};

use fallow_client::{LifecycleController, Worker};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, ClientInfo, Implementation, ListToolsResult, PaginatedRequestParam,
        ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    service::{NotificationContext, RequestContext, RoleServer},
    tool, tool_router,
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Session id for a client that sent no implementation info.
const ANONYMOUS_SESSION: &str = "stdio";

/// Client session id: `<name>/<version>` from the initialize request.
fn session_id(info: Option<&ClientInfo>) -> String {
    match info {
        Some(info) => format!("{}/{}", info.client_info.name, info.client_info.version),
        None => ANONYMOUS_SESSION.to_string(),
    }
}

/// The main MCP server handler for fallow.
#[derive(Clone)]
pub struct FallowServer {
    tool_router: ToolRouter<Self>,
    worker: Worker,
    lifecycle: Arc<LifecycleController>,
    control: mpsc::Sender<String>,
}

#[tool_router]
impl FallowServer {
    pub fn new(worker: Worker, lifecycle: Arc<LifecycleController>, control: mpsc::Sender<String>) -> Self {
        Self { tool_router: Self::tool_router(), worker, lifecycle, control }
    }

    #[tool(
        description = "Issue a request through the caching layer. Returns status, headers, body text, and the route that answered."
    )]
    async fn fetch(&self, params: Parameters<FetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "Post a lifecycle control message: FORCE_ACTIVATE or RUN_EVICTION_SWEEP.")]
    async fn worker_control(&self, params: Parameters<WorkerControlParams>) -> Result<CallToolResult, McpError> {
        control_impl(&self.control, params.0).await
    }

    #[tool(description = "Report the lifecycle phase, cache version, and entry count of every partition.")]
    async fn cache_status(&self, params: Parameters<CacheStatusParams>) -> Result<CallToolResult, McpError> {
        status_impl(&self.lifecycle, self.worker.partitions(), params.0).await
    }
}

impl FallowServer {
    /// Register a connected MCP client as a session of the lifecycle.
    pub async fn register_client(&self, info: Option<&ClientInfo>) -> Option<String> {
        self.lifecycle.connect_client(&session_id(info)).await
    }
}

impl ServerHandler for FallowServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "fallow".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn on_initialized(&self, context: NotificationContext<RoleServer>) {
        self.register_client(context.peer.peer_info()).await;
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
