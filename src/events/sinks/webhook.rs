use async_trait::async_trait;
use reqwest::{Client, header};
use std::time::Duration;

use super::{EmissionError, EventSink};
use crate::events::models::ItemEvent;

/// Posts each event as JSON to a downstream event-bus endpoint.
pub struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Result<Self, EmissionError> {
        let client = Client::builder().timeout(Duration::from_secs(5)).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl EventSink for WebhookSink {
    async fn send(&self, event: &ItemEvent) -> Result<(), EmissionError> {
        let body = serde_json::to_vec(event)?;
        let response = self
            .client
            .post(&self.url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(EmissionError::DeliveryFailed(format!(
                "Event endpoint returned non-success status: {status}. Body: {error_body}"
            )));
        }

        Ok(())
    }
}
