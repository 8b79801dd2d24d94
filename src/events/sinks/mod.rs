use async_trait::async_trait;
use thiserror::Error;

use crate::events::models::ItemEvent;

pub mod broadcast;
pub mod webhook;

#[derive(Error, Debug)]
pub enum EmissionError {
    #[error("Failed to deliver event: {0}")]
    DeliveryFailed(String),
    #[error("No subscribers for event stream")]
    NoSubscribers,
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Destination for item events. Implementations make a single delivery
/// attempt; retries and de-duplication belong to consumers.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn send(&self, event: &ItemEvent) -> Result<(), EmissionError>;
}
