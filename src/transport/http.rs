//! reqwest-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::{debug, trace};

use super::{Body, Transport};
use crate::error::{CameraError, Result};

/// Transport talking plain HTTP to the camera.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Build a transport for `host` with a per-request timeout.
    pub fn new(host: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CameraError::Other(format!("Failed to create HTTP client: {e}")))?;

        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("http://{host}")
        };
        debug!(%base_url, timeout_ms = timeout.as_millis() as u64, "HTTP transport ready");

        Ok(Self { client, base_url })
    }

    async fn send(&self, method: Method, path: &str, body: Body) -> Result<Value> {
        let url = format!("{}{path}", self.base_url);
        trace!(%method, %url, "Camera request");

        let mut request = self.client.request(method, &url);
        if body != Body::Empty {
            request = request
                .header(CONTENT_TYPE, body.content_type())
                .body(body.encode());
        }

        let response = request
            .send()
            .await
            .map_err(|e| CameraError::transport(path, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CameraError::HttpStatus {
                endpoint: path.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| CameraError::transport(path, e))?;
        parse_response(path, &text)
    }
}

/// Parse a response body, rejecting camera-level error codes.
pub(crate) fn parse_response(endpoint: &str, text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    let value: Value = serde_json::from_str(text).map_err(|e| CameraError::InvalidResponse {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;

    if let Some(code) = value.get("errCode").and_then(Value::as_u64) {
        if code != 200 {
            let message = value
                .get("errMsg")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(CameraError::InvalidResponse {
                endpoint: endpoint.to_string(),
                reason: format!("camera error {code}: {message}"),
            });
        }
    }

    Ok(value)
}

#[async_trait]
impl Transport for HttpTransport {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, path: &str) -> Result<Value> {
        self.send(Method::GET, path, Body::Empty).await
    }

    async fn post(&self, path: &str, body: Body) -> Result<Value> {
        self.send(Method::POST, path, body).await
    }

    async fn put(&self, path: &str, body: Body) -> Result<Value> {
        self.send(Method::PUT, path, body).await
    }
}
