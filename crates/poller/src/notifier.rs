use crate::event::ChangeEvent;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Webhook request failed: {0}")]
    Request(String),

    #[error("Webhook returned status {0}")]
    Status(u16),
}

/// Delivery seam for change events so the poll loop can be tested
/// without a live receiver.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, webhook_url: &str, event: &ChangeEvent) -> Result<(), NotifyError>;
}

/// POSTs events as JSON to the subscription's webhook URL.
pub struct WebhookNotifier {
    http: Client,
}

impl WebhookNotifier {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");
        Self { http }
    }
}

impl Default for WebhookNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn deliver(&self, webhook_url: &str, event: &ChangeEvent) -> Result<(), NotifyError> {
        debug!(url = webhook_url, key = %event.object_key, "posting webhook");

        let response = self
            .http
            .post(webhook_url)
            .json(event)
            .send()
            .await
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        Ok(())
    }
}
