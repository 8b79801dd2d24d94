use dashmap::DashMap;
use tracing::debug;

use crate::db::error::ItemServiceError;
use crate::db::models::SavedItem;
use crate::db::services::saved_item_service::SavedItemDataService;

/// Request-scoped batch loader for saved items.
///
/// Uncached keys are fetched together in one query. Hits and misses are both
/// cached, so a key is looked up at most once per loader.
#[derive(Debug)]
pub struct SavedItemLoader {
    service: SavedItemDataService,
    cache: DashMap<String, Option<SavedItem>>,
}

impl SavedItemLoader {
    pub fn new(service: SavedItemDataService) -> Self {
        Self {
            service,
            cache: DashMap::new(),
        }
    }

    pub async fn load(&self, id: &str) -> Result<Option<SavedItem>, ItemServiceError> {
        let mut loaded = self.load_many(&[id.to_string()]).await?;
        Ok(loaded.pop().flatten())
    }

    /// Loads every key, returning results in the order of `ids`.
    pub async fn load_many(
        &self,
        ids: &[String],
    ) -> Result<Vec<Option<SavedItem>>, ItemServiceError> {
        let mut pending: Vec<String> = Vec::new();
        for id in ids {
            if !self.cache.contains_key(id) && !pending.contains(id) {
                pending.push(id.clone());
            }
        }

        if !pending.is_empty() {
            debug!(count = pending.len(), "Batch loading saved items.");
            let found = self.service.get_by_ids(&pending).await?;
            for item in found {
                self.cache.insert(item.id.clone(), Some(item));
            }
            for id in pending {
                self.cache.entry(id).or_insert(None);
            }
        }

        Ok(ids
            .iter()
            .map(|id| self.cache.get(id).and_then(|entry| entry.value().clone()))
            .collect())
    }

    /// Seeds the cache with an item already in hand, e.g. a mutation result.
    pub fn prime(&self, item: SavedItem) {
        self.cache.insert(item.id.clone(), Some(item));
    }

    pub fn clear(&self, id: &str) {
        self.cache.remove(id);
    }
}
