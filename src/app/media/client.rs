//! Cached, retried media lookups

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::cache::MediaCache;
use super::retry::RetryPolicy;
use super::MediaFetcher;
use crate::app::models::BirdMedia;
use crate::constants::media;
use crate::errors::ClientResult;

/// Runtime configuration for [`MediaClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaConfig {
    pub cache_ttl: Duration,
    pub retry: RetryPolicy,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            cache_ttl: media::CACHE_TTL,
            retry: RetryPolicy::default(),
        }
    }
}

/// Media lookup with a shared TTL cache in front of a retried remote call
///
/// Concurrent misses for the same key each perform their own lookup; the
/// last one to finish wins the cache slot.
pub struct MediaClient {
    fetcher: Arc<dyn MediaFetcher>,
    cache: Arc<MediaCache>,
    retry: RetryPolicy,
}

impl MediaClient {
    /// Create a client with its own cache
    pub fn new(fetcher: Arc<dyn MediaFetcher>, config: MediaConfig) -> Self {
        let cache = Arc::new(MediaCache::new(config.cache_ttl));
        Self::with_cache(fetcher, cache, config.retry)
    }

    /// Create a client sharing an existing cache
    pub fn with_cache(
        fetcher: Arc<dyn MediaFetcher>,
        cache: Arc<MediaCache>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            fetcher,
            cache,
            retry,
        }
    }

    /// Media for a scientific name, from cache when fresh
    ///
    /// # Errors
    ///
    /// Returns the last attempt's `ClientError` unchanged once retries are
    /// exhausted
    pub async fn fetch(&self, scientific_name: &str) -> ClientResult<BirdMedia> {
        if let Some(cached) = self.cache.get(scientific_name).await {
            return Ok(cached);
        }

        let label = format!("Media lookup for '{}'", scientific_name);
        let fetcher = Arc::clone(&self.fetcher);
        let media = self
            .retry
            .run(&label, || {
                let fetcher = Arc::clone(&fetcher);
                async move { fetcher.fetch_media(scientific_name).await }
            })
            .await?;

        debug!("Caching media for '{}'", scientific_name);
        self.cache.insert(scientific_name, media.clone()).await;
        info!("Fetched media for '{}'", scientific_name);
        Ok(media)
    }

    /// The cache backing this client
    pub fn cache(&self) -> &Arc<MediaCache> {
        &self.cache
    }
}
