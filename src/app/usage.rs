//! Usage credit counter
//!
//! The server owns the count of identifications per user. The client keeps the
//! last value the server reported and derives the remaining credits from it;
//! it never advances the count on its own.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::constants::usage;
use crate::errors::ClientResult;

/// Server-side counter procedures
#[async_trait]
pub trait UsageBackend: Send + Sync {
    /// Stored count for `user_id`, `None` when there is no record yet
    async fn read_count(&self, user_id: &str) -> ClientResult<Option<u32>>;

    /// Atomically increment and return the new count
    async fn increment_count(&self, user_id: &str) -> ClientResult<u32>;
}

/// Usage gating settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageConfig {
    /// Identifications allowed before gating
    pub limit: u32,
    /// Privileged identities are never gated
    pub privileged: bool,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            limit: usage::DEFAULT_LIMIT,
            privileged: false,
        }
    }
}

/// Cached view of one identity's usage counter
pub struct UsageCounter {
    backend: Arc<dyn UsageBackend>,
    user_id: String,
    config: UsageConfig,
    used: AtomicU32,
}

impl UsageCounter {
    pub fn new(backend: Arc<dyn UsageBackend>, user_id: impl Into<String>, config: UsageConfig) -> Self {
        Self {
            backend,
            user_id: user_id.into(),
            config,
            used: AtomicU32::new(0),
        }
    }

    /// Mark the identity as privileged (never gated)
    pub fn with_privileged(mut self, privileged: bool) -> Self {
        self.config.privileged = privileged;
        self
    }

    /// Read the authoritative count and adopt it
    ///
    /// A missing record counts as zero.
    ///
    /// # Errors
    ///
    /// Returns the backend's `ClientError`; the cached value is unchanged
    pub async fn fetch_count(&self) -> ClientResult<u32> {
        let count = self.backend.read_count(&self.user_id).await?.unwrap_or(0);
        self.used.store(count, Ordering::SeqCst);
        debug!("Usage for {}: {}", self.user_id, count);
        Ok(count)
    }

    /// Increment on the server and adopt the returned count
    ///
    /// # Errors
    ///
    /// Returns the backend's `ClientError`; the cached value is unchanged
    pub async fn try_increment(&self) -> ClientResult<u32> {
        let count = self.backend.increment_count(&self.user_id).await?;
        self.used.store(count, Ordering::SeqCst);
        info!("Usage for {} now {}", self.user_id, count);
        Ok(count)
    }

    /// Increment, falling back to the previous value on failure
    pub async fn increment(&self) -> u32 {
        match self.try_increment().await {
            Ok(count) => count,
            Err(e) => {
                let previous = self.used();
                warn!(
                    "Usage increment failed for {}: {}. Keeping {}",
                    self.user_id, e, previous
                );
                previous
            }
        }
    }

    /// Last count reported by the server
    pub fn used(&self) -> u32 {
        self.used.load(Ordering::SeqCst)
    }

    /// Credits left before gating, never negative
    pub fn remaining(&self) -> u32 {
        self.config.limit.saturating_sub(self.used())
    }

    /// Whether identification should be blocked for this identity
    pub fn is_gated(&self) -> bool {
        !self.config.privileged && self.used() >= self.config.limit
    }

    pub fn limit(&self) -> u32 {
        self.config.limit
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}
