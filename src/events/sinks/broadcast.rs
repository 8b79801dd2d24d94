use async_trait::async_trait;
use tokio::sync::broadcast;

use super::{EmissionError, EventSink};
use crate::events::models::ItemEvent;

/// In-process sink fanning events out to every subscriber.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<ItemEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ItemEvent> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl EventSink for BroadcastSink {
    async fn send(&self, event: &ItemEvent) -> Result<(), EmissionError> {
        self.tx
            .send(event.clone())
            .map(|_| ())
            .map_err(|_| EmissionError::NoSubscribers)
    }
}
