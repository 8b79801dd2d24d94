//! Data access for saved items and tags.
//!
//! Read services accept any storage context. The mutation and upsert
//! services refuse a read-only one and route their own read-backs through
//! the primary connection they were built with.

pub mod loader;
pub mod mutation_service;
pub mod saved_item_service;
pub mod tag_service;
pub mod upsert_service;

pub use loader::SavedItemLoader;
pub use mutation_service::SavedItemMutationService;
pub use saved_item_service::SavedItemDataService;
pub use tag_service::TagDataService;
pub use upsert_service::{SavedItemUpsertInput, SavedItemUpsertService, UpsertKind, UpsertPlan};
