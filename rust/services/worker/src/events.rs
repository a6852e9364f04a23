//! Event client
//!
//! Posts run events to the gateway's internal ingress, which fans them out
//! to WebSocket subscribers. Delivery is best-effort by design: the durable
//! record of a run is its audit trail and artifacts, so a failed post is
//! logged and execution continues.

use lo_core::{RunEvent, Settings};
use std::time::Duration;
use tracing::warn;

/// HTTP client for the gateway's event ingress
#[derive(Clone)]
pub struct EventClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl EventClient {
    pub fn new(settings: &Settings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(3))
            .build()
            .unwrap_or_default();
        Self {
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            client,
        }
    }

    /// Emit one event for its run. Best-effort.
    pub async fn emit(&self, event: &RunEvent) {
        let url = format!(
            "{}/v1/internal/runs/{}/events",
            self.base_url,
            event.run_id()
        );
        let result = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(event)
            .send()
            .await;

        match result {
            Ok(response) if !response.status().is_success() => {
                warn!(url = %url, status = %response.status(), "Event ingress rejected event");
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to post run event");
            }
            Ok(_) => {}
        }
    }
}
