use reqwest::{Client, Request, Response};
use std::time::Duration;

use crate::error::{Result, ZohoError};

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// HTTP client for the Zoho CRM API
/// Sends each request exactly once; any status comes back as a response.
#[derive(Clone)]
pub struct ZohoHttpClient {
    /// Shared HTTP client with connection pooling
    client: Client,
}

impl ZohoHttpClient {
    /// Create a new HTTP client
    pub fn new(connect_timeout: u64, request_timeout: u64) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout))
            .timeout(Duration::from_secs(request_timeout))
            .build()?;

        Ok(Self { client })
    }

    /// Wrap an already configured client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Execute a request without retries
    pub async fn execute(&self, request: Request) -> Result<Response> {
        let method = request.method().clone();
        let url = request.url().clone();
        tracing::debug!(
            method = %method,
            url = %url,
            "Sending HTTP request"
        );

        match self.client.execute(request).await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    tracing::debug!(status = %status, "Received HTTP response");
                } else {
                    tracing::warn!(
                        status = %status,
                        method = %method,
                        url = %url,
                        "Received error response"
                    );
                }
                Ok(response)
            }
            Err(e) => {
                tracing::error!(
                    error_kind = error_kind(&e),
                    error = %e,
                    method = %method,
                    url = %url,
                    "HTTP request failed"
                );
                Err(ZohoError::TransportError(e))
            }
        }
    }

    /// Get the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Categorize a transport error for logs
fn error_kind(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connection_failed"
    } else if e.is_request() {
        "request_error"
    } else if e.is_body() {
        "body_error"
    } else if e.is_decode() {
        "decode_error"
    } else {
        "unknown"
    }
}
