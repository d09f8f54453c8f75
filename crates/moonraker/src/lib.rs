//! Moonraker metadata fetcher
//!
//! One GET against the Moonraker HTTP API, returning the `gcode_metadata`
//! namespace as a filename -> metadata mapping.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::ACCEPT;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

pub mod payload;

pub use payload::{extract_gcode_index, unwrap_result};

/// How much of an unparseable body is echoed back in the error.
const SNIPPET_CHARS: usize = 2000;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Connection error: {0}")]
    Connect(String),
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("HTTP error: {status} {reason}")]
    Status { status: u16, reason: String },
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Response was not valid JSON: {message}. Partial body: {snippet:?}")]
    InvalidJson { message: String, snippet: String },
    #[error("Unexpected payload format: expected a mapping of filename to metadata")]
    UnexpectedPayload,
}

impl FetchError {
    /// Network-level failures, as opposed to a reachable server sending garbage.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            FetchError::Connect(_)
                | FetchError::Timeout(_)
                | FetchError::Status { .. }
                | FetchError::Transport(_)
        )
    }
}

/// Construct an HTTP URL from host, port and endpoint path.
pub fn build_url(host: &str, port: u16, endpoint: &str) -> String {
    if endpoint.starts_with('/') {
        format!("http://{}:{}{}", host, port, endpoint)
    } else {
        format!("http://{}:{}/{}", host, port, endpoint)
    }
}

pub struct MoonrakerClient {
    client: Client,
    timeout: Duration,
}

impl MoonrakerClient {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    /// Fetch a URL and parse its JSON payload.
    pub async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        // text() honours the charset declared by the server
        let body = response.text().await.map_err(|e| self.classify(e))?;
        debug!("Received {} bytes from {}", body.len(), url);

        serde_json::from_str(&body).map_err(|e| FetchError::InvalidJson {
            message: e.to_string(),
            snippet: body.chars().take(SNIPPET_CHARS).collect(),
        })
    }

    /// Fetch and unwrap the `gcode_metadata` namespace.
    pub async fn fetch_gcode_index(&self, url: &str) -> Result<Map<String, Value>, FetchError> {
        let payload = self.fetch_json(url).await?;
        let index = extract_gcode_index(unwrap_result(payload))?;
        info!("📡 Moonraker reported metadata for {} files", index.len());
        Ok(index)
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else if err.is_connect() {
            FetchError::Connect(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}
