use async_trait::async_trait;

use crate::errors::BoxPromptResult;

/// Request/response channel to the named services running on the device.
#[async_trait]
pub trait ServiceBridge: Send + Sync {
    /// Post `payload` to `service` and return its acknowledgment.
    async fn post(&self, service: &str, payload: serde_json::Value) -> BoxPromptResult<serde_json::Value>;

    /// Query a service that takes no input.
    async fn fetch(&self, service: &str) -> BoxPromptResult<serde_json::Value> {
        self.post(service, serde_json::Value::Null).await
    }
}
