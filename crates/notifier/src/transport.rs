//! Outbound webhook delivery.

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;

use gpuwatch_common::error::MonitorError;

/// Delivers a rendered payload and reports the HTTP status received.
///
/// Any HTTP response counts as delivered; only a failure to get a response
/// at all is an error.
pub trait Transport {
    fn post(&self, payload: &Value) -> Result<u16, MonitorError>;
}

/// HTTP POST of the payload as a JSON body.
pub struct WebhookTransport {
    client: Client,
    url: String,
}

impl WebhookTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, MonitorError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MonitorError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl Transport for WebhookTransport {
    fn post(&self, payload: &Value) -> Result<u16, MonitorError> {
        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .map_err(|e| MonitorError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), url = %self.url, "Webhook answered with a non-success status");
        }
        Ok(status.as_u16())
    }
}
