//! HTTP client abstraction for the feature service.

use crate::{AcquisitionError, Result};
use carto_model::OverpassConfig;
use std::time::Duration;
use tracing::debug;

/// Synchronous HTTP operations needed by the acquirer.
///
/// Tests substitute their own implementation to simulate the service.
pub trait HttpClient: Send + Sync {
    /// POST `body` as plain text and return the response body.
    fn post_text(&self, url: &str, body: &str) -> Result<String>;
}

/// [`HttpClient`] backed by a blocking `reqwest` client.
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Client with the given timeout and user agent.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| AcquisitionError::Network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Client configured for the feature service.
    pub fn from_config(config: &OverpassConfig) -> Result<Self> {
        Self::new(Duration::from_secs(config.timeout_secs), &config.user_agent)
    }
}

impl HttpClient for ReqwestClient {
    fn post_text(&self, url: &str, body: &str) -> Result<String> {
        debug!(url, bytes = body.len(), "POST");
        let response = self
            .client
            .post(url)
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body.to_string())
            .send()
            .map_err(|e| AcquisitionError::Network(format!("POST request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AcquisitionError::HttpStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        response
            .text()
            .map_err(|e| AcquisitionError::Network(format!("Failed to read response: {}", e)))
    }
}
