use std::time::Duration;

use async_trait::async_trait;

use crate::bridge::transport::ServiceBridge;
use crate::config::BridgeConfig;
use crate::errors::{BoxPromptError, BoxPromptResult};

/// Service bridge speaking JSON over HTTP to a device-side relay.
///
/// Every call is one `POST` to the configured endpoint with the body
/// `{ "service": ..., "requestId": ..., "payload": ... }`. The response body
/// is the service's acknowledgment; an empty body maps to `null`.
pub struct HttpBridge {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpBridge {
    pub fn new(config: &BridgeConfig) -> BoxPromptResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            endpoint: config.endpoint.clone(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ServiceBridge for HttpBridge {
    async fn post(&self, service: &str, payload: serde_json::Value) -> BoxPromptResult<serde_json::Value> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let body = serde_json::json!({
            "service": service,
            "requestId": request_id,
            "payload": payload,
        });

        tracing::debug!(service, request_id = %request_id, endpoint = %self.endpoint, "posting to service");

        let resp = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            tracing::warn!(service, %status, body = %text, "service call failed");
            return Err(BoxPromptError::Bridge(format!("{service}: HTTP {status}: {text}")));
        }

        let ack = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text)?
        };
        tracing::debug!(service, request_id = %request_id, "service acknowledged");
        Ok(ack)
    }
}
