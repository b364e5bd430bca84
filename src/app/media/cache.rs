//! In-memory TTL cache for media records
//!
//! Entries are keyed by exact scientific name. An entry is valid while its age
//! is at most the TTL; expired entries are only evicted when that key is looked
//! up again, never by a background sweep.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::app::models::BirdMedia;

/// A cached record with the instant it was stored
#[derive(Debug, Clone)]
pub struct MediaCacheEntry {
    pub data: BirdMedia,
    pub stored_at: Instant,
}

impl MediaCacheEntry {
    fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) <= ttl
    }
}

/// Shared media cache; concurrent writers for a key overwrite each other
#[derive(Debug)]
pub struct MediaCache {
    entries: RwLock<HashMap<String, MediaCacheEntry>>,
    ttl: Duration,
}

impl MediaCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Fresh record for `key`; evicts the entry if it has expired
    pub async fn get(&self, key: &str) -> Option<BirdMedia> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.is_fresh(self.ttl, now) => {
                    debug!("Media cache hit: {}", key);
                    return Some(entry.data.clone());
                }
                Some(_) => {}
                None => {
                    debug!("Media cache miss: {}", key);
                    return None;
                }
            }
        }

        // Expired: re-check under the write lock, a writer may have refreshed it
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(key) {
            if entry.is_fresh(self.ttl, Instant::now()) {
                return Some(entry.data.clone());
            }
            entries.remove(key);
            debug!("Evicted expired media entry: {}", key);
        }
        None
    }

    /// Store a record, replacing any previous entry
    pub async fn insert(&self, key: impl Into<String>, data: BirdMedia) {
        let entry = MediaCacheEntry {
            data,
            stored_at: Instant::now(),
        };
        self.entries.write().await.insert(key.into(), entry);
    }

    /// Drop one key
    pub async fn invalidate(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    /// Drop everything
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of stored entries, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
