//! HTTP transport for the collector endpoint
//!
//! [`Transport`] is the request/response primitive the sender relies on.
//! [`HttpTransport`] is the production implementation on top of `reqwest`;
//! tests substitute their own.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};

use crate::config::CollectorConfig;
use crate::error::{Error, Result};

/// Status and body of one exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// One JSON POST per call
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` to `url` and wait for the response.
    ///
    /// Returns `Err` only for transport-level failures; any HTTP status,
    /// including errors, comes back as a response.
    async fn post(&self, url: &str, body: String) -> Result<TransportResponse>;
}

/// `reqwest`-backed transport
pub struct HttpTransport {
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport from collector configuration
    ///
    /// Only the client timeout is taken from the configuration.
    pub fn new(config: &CollectorConfig) -> Result<Self> {
        Self::with_timeout(config.timeout())
    }

    pub fn with_timeout(timeout: Option<Duration>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let http_client = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, url: &str, body: String) -> Result<TransportResponse> {
        let response = self
            .http_client
            .post(url)
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status().as_u16();
        // The status alone decides delivery; the body only feeds failure reasons
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(status, error = %e, "Failed to read collector response body");
                String::new()
            }
        };

        Ok(TransportResponse { status, body })
    }
}
