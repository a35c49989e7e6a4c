//! fetch tool implementation.
//!
//! Issues one request through the interception layer and reports what came
//! back and which route produced it.

use fallow_client::{Destination, Method, Request, RequestMode, Worker, fetch::parse_request_url};
use fallow_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Input parameters for the fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchParams {
    /// Absolute URL to request.
    pub url: String,

    /// HTTP method (default: GET). Anything but GET bypasses the cache.
    #[serde(default = "default_method")]
    pub method: String,

    /// Request mode: "navigate", "cors", "no-cors" or "same-origin".
    #[serde(default)]
    pub mode: Option<String>,

    /// Request destination: "document", "script", "style", "image", "font", ...
    #[serde(default)]
    pub destination: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchOutput {
    pub url: String,
    /// "passthrough" or the strategy that answered.
    pub route: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossy.
    pub body: String,
}

impl FetchParams {
    fn to_request(&self) -> Result<Request, Error> {
        let url = parse_request_url(&self.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let method = Method::from_bytes(self.method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| Error::InvalidInput(format!("invalid method: {}", self.method)))?;

        let mut request = Request::new(method, url);
        if let Some(mode) = &self.mode {
            request = request.with_mode(mode.parse::<RequestMode>()?);
        }
        if let Some(destination) = &self.destination {
            request = request.with_destination(destination.parse::<Destination>()?);
        }
        Ok(request)
    }
}

/// Implementation of the fetch tool.
pub async fn fetch_impl(worker: &Worker, params: FetchParams) -> Result<CallToolResult, McpError> {
    let request = params.to_request()?;
    let route = worker.route(&request);

    tracing::info!(%request, %route, "fetch");
    let response = worker.handle(&request).await?;

    let output = FetchOutput {
        url: request.url.to_string(),
        route: route.to_string(),
        status: response.status,
        content_type: response.content_type().map(str::to_string),
        body: response.text(),
        headers: response.headers,
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{output_json, worker};

    fn params(url: &str) -> FetchParams {
        FetchParams { url: url.into(), method: default_method(), mode: None, destination: None }
    }

    #[tokio::test]
    async fn test_fetch_routes_api_network_first() {
        let worker = worker().await;
        let result = fetch_impl(&worker, params("https://app.example.com/ok/api/prices")).await.unwrap();
        let output = output_json(&result);
        assert_eq!(output["route"], "network-first");
        assert_eq!(output["status"], 200);
        assert_eq!(output["body"], "GET /ok/api/prices");
    }

    #[tokio::test]
    async fn test_fetch_post_is_passthrough() {
        let worker = worker().await;
        let mut p = params("https://app.example.com/ok/api/orders");
        p.method = "post".into();
        let output = output_json(&fetch_impl(&worker, p).await.unwrap());
        assert_eq!(output["route"], "passthrough");
        assert_eq!(output["body"], "POST /ok/api/orders");
    }

    #[tokio::test]
    async fn test_fetch_offline_navigation_serves_document() {
        let worker = worker().await;
        let mut p = params("https://app.example.com/dashboard");
        p.mode = Some("navigate".into());
        let output = output_json(&fetch_impl(&worker, p).await.unwrap());
        assert_eq!(output["route"], "network-first-offline");
        assert_eq!(output["status"], 200);
        assert_eq!(output["content_type"], "text/html; charset=utf-8");
    }

    #[tokio::test]
    async fn test_fetch_rejects_relative_url() {
        let worker = worker().await;
        let err = fetch_impl(&worker, params("/relative")).await.unwrap_err();
        assert_eq!(err.code.0, -32003);
    }

    #[tokio::test]
    async fn test_fetch_rejects_unknown_mode() {
        let worker = worker().await;
        let mut p = params("https://app.example.com/ok");
        p.mode = Some("teleport".into());
        let err = fetch_impl(&worker, p).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}
