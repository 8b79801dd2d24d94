//! Shared fixtures for the in-crate tests: an in-memory SQLite storage and
//! recording fakes for the external capabilities.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sea_orm::{ColumnTrait, ConnectOptions, Database, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::db::entities::prelude::{
    ItemTagActiveModel, ItemTagEntity, SavedItemActiveModel, SavedItemColumn, SavedItemEntity,
};
use crate::db::models::SavedItem;
use crate::db::schema::create_tables;
use crate::db::status::SavedItemStatus;
use crate::db::storage::Storage;
use crate::db::transform::ZERO_DATE;
use crate::events::{
    EmissionError, ErrorReporter, EventKind, EventSink, ItemEvent, ItemsEventEmitter,
};
use crate::resolver::{ResolvedUrl, ResolverError, UrlResolver};

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

pub async fn setup_storage() -> Storage {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
    // One connection, or each pooled connection would see its own empty database.
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let conn = Database::connect(opt).await.unwrap();
    create_tables(&conn).await.unwrap();
    Storage::single(conn)
}

/// Writes (or overwrites) a `list` row. Archived and favorite stamps are set
/// to `at` when the corresponding flag is on.
pub async fn insert_item(
    storage: &Storage,
    user_id: i64,
    item_id: i64,
    status: i16,
    favorite: i16,
    at: DateTime<Utc>,
) {
    let context = storage.write_context();
    let conn = context.conn();
    SavedItemEntity::delete_many()
        .filter(SavedItemColumn::UserId.eq(user_id))
        .filter(SavedItemColumn::ItemId.eq(item_id))
        .exec(conn)
        .await
        .unwrap();
    let model = SavedItemActiveModel {
        user_id: Set(user_id),
        item_id: Set(item_id),
        resolved_id: Set(Some(item_id)),
        given_url: Set(format!("https://example.com/{item_id}")),
        title: Set(None),
        status: Set(status),
        favorite: Set(favorite),
        time_added: Set(at),
        time_updated: Set(at),
        time_read: Set(if status == SavedItemStatus::Archived.code() { at } else { ZERO_DATE }),
        time_favorited: Set(if favorite == 1 { at } else { ZERO_DATE }),
        api_id: Set(None),
    };
    SavedItemEntity::insert(model).exec_without_returning(conn).await.unwrap();
}

pub async fn insert_tag(storage: &Storage, user_id: i64, item_id: i64, name: &str) {
    let context = storage.write_context();
    let model = ItemTagActiveModel {
        user_id: Set(user_id),
        item_id: Set(item_id),
        tag: Set(name.to_string()),
        time_added: Set(ts(100)),
        time_updated: Set(ts(100)),
        api_id: Set(None),
    };
    ItemTagEntity::insert(model)
        .exec_without_returning(context.conn())
        .await
        .unwrap();
}

pub fn sample_item(id: &str) -> SavedItem {
    SavedItem {
        id: id.to_string(),
        user_id: 1,
        url: format!("https://example.com/{id}"),
        resolved_id: None,
        title: None,
        status: SavedItemStatus::Unread,
        is_favorite: false,
        is_archived: false,
        created_at: ts(100),
        updated_at: ts(100),
        archived_at: None,
        favorited_at: None,
        deleted_at: None,
    }
}

pub struct RecordingSink {
    tx: UnboundedSender<ItemEvent>,
}

impl RecordingSink {
    pub fn new() -> (Self, UnboundedReceiver<ItemEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn send(&self, event: &ItemEvent) -> Result<(), EmissionError> {
        self.tx
            .send(event.clone())
            .map_err(|e| EmissionError::DeliveryFailed(e.to_string()))
    }
}

pub struct FailingSink;

#[async_trait]
impl EventSink for FailingSink {
    async fn send(&self, _event: &ItemEvent) -> Result<(), EmissionError> {
        Err(EmissionError::DeliveryFailed("sink offline".to_string()))
    }
}

pub struct RecordingReporter {
    tx: UnboundedSender<(EventKind, String)>,
}

impl RecordingReporter {
    pub fn new() -> (Self, UnboundedReceiver<(EventKind, String)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, error: &EmissionError, event: &ItemEvent) {
        let _ = self.tx.send((event.kind, error.to_string()));
    }
}

pub fn recording_emitter() -> (ItemsEventEmitter, UnboundedReceiver<ItemEvent>) {
    let (sink, rx) = RecordingSink::new();
    (ItemsEventEmitter::with_tracing_reporter(Arc::new(sink)), rx)
}

/// Drains every event emitted so far, waiting briefly for spawned deliveries.
pub async fn collect_events(rx: &mut UnboundedReceiver<ItemEvent>) -> Vec<ItemEvent> {
    let mut events = Vec::new();
    while let Ok(Some(event)) = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await {
        events.push(event);
    }
    events
}

pub struct StaticResolver {
    item_id: i64,
}

impl StaticResolver {
    pub fn new(item_id: i64) -> Self {
        Self { item_id }
    }
}

#[async_trait]
impl UrlResolver for StaticResolver {
    async fn resolve(&self, _url: &str) -> Result<ResolvedUrl, ResolverError> {
        Ok(ResolvedUrl {
            item_id: self.item_id,
            resolved_id: Some(self.item_id),
            title: Some("Resolved title".to_string()),
        })
    }
}

pub struct FailingResolver;

#[async_trait]
impl UrlResolver for FailingResolver {
    async fn resolve(&self, _url: &str) -> Result<ResolvedUrl, ResolverError> {
        Err(ResolverError::BadStatus(503))
    }
}
