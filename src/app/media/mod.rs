//! Per-species media lookup with caching and retry
//!
//! Media (photos, range maps, sounds) is looked up by scientific name. Results
//! are kept in a process-wide TTL cache so repeated lookups from different
//! parts of the app cost one network call, and misses are retried with
//! exponential backoff and a per-attempt timeout.
//!
//! # Module Organization
//!
//! - [`cache`] - TTL cache with lazy eviction
//! - [`retry`] - Retry policy shared by remote lookups
//! - [`client`] - `MediaClient` tying the cache and retry to a fetcher

use async_trait::async_trait;

use crate::app::models::BirdMedia;
use crate::errors::ClientResult;

pub mod cache;
pub mod client;
pub mod retry;

pub use cache::{MediaCache, MediaCacheEntry};
pub use client::{MediaClient, MediaConfig};
pub use retry::RetryPolicy;

/// Remote source of media records
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Look up media for one scientific name
    async fn fetch_media(&self, scientific_name: &str) -> ClientResult<BirdMedia>;
}
