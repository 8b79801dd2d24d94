use std::sync::Arc;
use tracing::{debug, error};

use super::models::{EventKind, ItemEvent};
use super::sinks::{EmissionError, EventSink};
use crate::context::UserContext;
use crate::db::models::SavedItem;

/// Observability sink for failures that must not reach the caller.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &EmissionError, event: &ItemEvent);
}

/// Reports emission failures through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report(&self, error: &EmissionError, event: &ItemEvent) {
        error!(
            error = %error,
            event_id = %event.event_id,
            kind = %event.kind,
            item_id = %event.saved_item.id,
            user_id = event.user.user_id,
            "Item event could not be emitted."
        );
    }
}

/// Fire-and-forget dispatch of item events.
///
/// `emit` hands the event to a spawned task and returns immediately; the
/// mutation that triggered it never waits on, or fails because of, delivery.
#[derive(Clone)]
pub struct ItemsEventEmitter {
    sink: Arc<dyn EventSink>,
    reporter: Arc<dyn ErrorReporter>,
}

impl ItemsEventEmitter {
    pub fn new(sink: Arc<dyn EventSink>, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self { sink, reporter }
    }

    pub fn with_tracing_reporter(sink: Arc<dyn EventSink>) -> Self {
        Self::new(sink, Arc::new(TracingErrorReporter))
    }

    pub fn emit(
        &self,
        kind: EventKind,
        saved_item: &SavedItem,
        user: &UserContext,
        tags: Option<Vec<String>>,
    ) {
        let event = ItemEvent::new(kind, saved_item.clone(), user.clone(), tags);
        let sink = self.sink.clone();
        let reporter = self.reporter.clone();

        tokio::spawn(async move {
            match sink.send(&event).await {
                Ok(()) => debug!(
                    event_id = %event.event_id,
                    kind = %event.kind,
                    item_id = %event.saved_item.id,
                    "Item event emitted."
                ),
                Err(e) => reporter.report(&e, &event),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingSink, RecordingReporter, RecordingSink, sample_item};
    use std::time::Duration;

    #[tokio::test]
    async fn emits_event_with_snapshot_and_tags() {
        let (sink, mut rx) = RecordingSink::new();
        let emitter = ItemsEventEmitter::with_tracing_reporter(Arc::new(sink));
        let user = UserContext::new(1);
        let item = sample_item("10");

        emitter.emit(EventKind::AddTags, &item, &user, Some(vec!["rust".into()]));

        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.kind, EventKind::AddTags);
        assert_eq!(event.saved_item.id, "10");
        assert_eq!(event.user.user_id, 1);
        assert_eq!(event.tags, Some(vec!["rust".to_string()]));
    }

    #[tokio::test]
    async fn sink_failure_is_reported_not_propagated() {
        let (reporter, mut reports) = RecordingReporter::new();
        let emitter = ItemsEventEmitter::new(Arc::new(FailingSink), Arc::new(reporter));

        emitter.emit(EventKind::ArchiveItem, &sample_item("10"), &UserContext::new(1), None);

        let (kind, message) = tokio::time::timeout(Duration::from_secs(1), reports.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kind, EventKind::ArchiveItem);
        assert!(message.contains("Failed to deliver event"));
    }

    #[test]
    fn event_kind_serializes_in_screaming_case() {
        let json = serde_json::to_string(&EventKind::UnfavoriteItem).unwrap();
        assert_eq!(json, "\"UNFAVORITE_ITEM\"");
        assert_eq!(EventKind::ClearTags.to_string(), "CLEAR_TAGS");
    }
}
