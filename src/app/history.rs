//! Local search history and the onboarding flag
//!
//! History is a most-recent-first list, unique by id and capped in length,
//! persisted as one JSON array under a single key. Every write is a full
//! read-modify-write of that array, serialized by a per-store mutex so quick
//! successive records cannot lose updates.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::models::{HistoryItem, SearchHistoryEntry};
use super::storage::KeyValueStore;
use crate::constants::{history, storage};
use crate::errors::StorageResult;

/// Bounded MRU list of past identifications
pub struct SearchHistory {
    store: Arc<dyn KeyValueStore>,
    key: String,
    max_entries: usize,
    write_lock: Mutex<()>,
}

impl SearchHistory {
    /// History under the default key and size cap
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_limits(store, history::STORAGE_KEY, history::MAX_ENTRIES)
    }

    pub fn with_limits(
        store: Arc<dyn KeyValueStore>,
        key: impl Into<String>,
        max_entries: usize,
    ) -> Self {
        Self {
            store,
            key: key.into(),
            max_entries,
            write_lock: Mutex::new(()),
        }
    }

    /// Record an item at the front, replacing any entry with the same id
    ///
    /// Returns the list as persisted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read or written
    pub async fn record(&self, item: HistoryItem) -> StorageResult<Vec<SearchHistoryEntry>> {
        let _guard = self.write_lock.lock().await;

        let entry = SearchHistoryEntry::from_item(item);
        let mut entries = self.load().await?;
        entries.retain(|existing| existing.id != entry.id);
        entries.insert(0, entry);
        entries.truncate(self.max_entries);

        let serialized = serde_json::to_string(&entries)?;
        self.store.set(&self.key, serialized).await?;
        debug!("History now holds {} entries", entries.len());
        Ok(entries)
    }

    /// Persisted entries, most recent first
    ///
    /// A missing or unparsable value reads as empty.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` only if the store itself fails
    pub async fn list(&self) -> StorageResult<Vec<SearchHistoryEntry>> {
        self.load().await
    }

    /// Remove the persisted history entirely
    pub async fn clear(&self) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        self.store.remove(&self.key).await
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    async fn load(&self) -> StorageResult<Vec<SearchHistoryEntry>> {
        let Some(raw) = self.store.get(&self.key).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!("Discarding unreadable search history: {}", e);
                Ok(Vec::new())
            }
        }
    }
}

/// Boolean-as-string flag recording that onboarding finished
pub struct OnboardingFlag {
    store: Arc<dyn KeyValueStore>,
}

impl OnboardingFlag {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn is_complete(&self) -> StorageResult<bool> {
        Ok(self
            .store
            .get(storage::ONBOARDING_KEY)
            .await?
            .is_some_and(|value| value == "true"))
    }

    pub async fn mark_complete(&self) -> StorageResult<()> {
        self.store
            .set(storage::ONBOARDING_KEY, "true".to_string())
            .await
    }

    pub async fn reset(&self) -> StorageResult<()> {
        self.store.remove(storage::ONBOARDING_KEY).await
    }
}
