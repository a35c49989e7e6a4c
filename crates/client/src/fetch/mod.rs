//! Network primitive used by every strategy.
//!
//! ### Contract
//! - The body is fully buffered; nothing is streamed through.
//! - Any HTTP status, 4xx and 5xx included, is a successful fetch. Whether it
//!   is cached is the caller's decision.
//! - Timeouts map to `Error::FetchTimeout`; DNS, connect and read failures map
//!   to `Error::HttpError`. Both are transport failures that strategies absorb.
//! - Max body bytes: 5MB (configurable)

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use fallow_core::{AppConfig, Error, ResponseSnapshot};
use reqwest::{Client, header};
use std::time::{Duration, Instant};

use crate::request::Request;

pub use url::{UrlError, parse_request_url, resolve_manifest_path};

/// Performs one network round trip for a request.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `request`, giving up after `timeout`.
    async fn fetch(&self, request: &Request, timeout: Duration) -> Result<ResponseSnapshot, Error>;
}

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "fallow/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "fallow/0.1".to_string(), max_bytes: 5 * 1024 * 1024, max_redirects: 5 }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), max_bytes: config.max_bytes, ..Default::default() }
    }
}

/// reqwest-backed fetcher.
pub struct HttpFetcher {
    http: Client,
    config: FetchConfig,
}

fn map_reqwest_error(url: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(format!("{url}: {err}"))
    } else {
        Error::HttpError(format!("{url}: network error: {err}"))
    }
}

fn header_pairs(headers: &header::HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect()
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    async fn round_trip(&self, request: &Request, timeout: Duration) -> Result<ResponseSnapshot, Error> {
        let url = request.url.as_str();
        let response = self
            .http
            .request(request.method.clone(), url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{url}: {len} bytes exceeds {}", self.config.max_bytes)));
        }

        let status = response.status().as_u16();
        let headers = header_pairs(response.headers());
        let body: Bytes = response.bytes().await.map_err(|e| map_reqwest_error(url, e))?;

        if body.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "{url}: {} bytes exceeds {}",
                body.len(),
                self.config.max_bytes
            )));
        }

        Ok(ResponseSnapshot::new(status, headers, body.to_vec()))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request, timeout: Duration) -> Result<ResponseSnapshot, Error> {
        let start = Instant::now();

        let response = tokio::time::timeout(timeout, self.round_trip(request, timeout))
            .await
            .map_err(|_| Error::FetchTimeout(format!("{}: no response within {}ms", request.url, timeout.as_millis())))??;

        tracing::debug!(
            "fetched {} -> {} in {}ms ({} bytes)",
            request,
            response.status,
            start.elapsed().as_millis(),
            response.body.len()
        );

        Ok(response)
    }
}
