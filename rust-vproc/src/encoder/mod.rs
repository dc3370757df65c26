//! Encoder collaborator notification.
//!
//! When a job's enhancement pass finishes, the encoder service is told to
//! pick up the processed frames. The call is fire-and-forget: failures are
//! logged, never retried, and never affect job completion.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info};

/// Encoder notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Whether notifications are sent at all.
    pub enabled: bool,
    /// Encoder service endpoint.
    pub url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "http://localhost:5002/encode".to_string(),
            timeout_secs: 30,
        }
    }
}

/// HTTP client for the encoder collaborator.
pub struct EncoderClient {
    config: EncoderConfig,
    client: reqwest::Client,
}

impl EncoderClient {
    pub fn new(config: EncoderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self { config, client }
    }

    /// Notify the encoder that a job's enhanced frames are ready.
    pub async fn notify_complete(&self, job_id: &str, metadata: &serde_json::Map<String, Value>) {
        if !self.config.enabled {
            return;
        }

        let payload = json!({
            "job_id": job_id,
            "metadata": metadata,
        });

        match self
            .client
            .post(&self.config.url)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                info!(job_id = %job_id, "Notified encoder service");
            }
            Ok(response) => {
                error!(
                    job_id = %job_id,
                    status = %response.status(),
                    "Encoder service rejected the notification"
                );
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Failed to notify encoder service");
            }
        }
    }
}
