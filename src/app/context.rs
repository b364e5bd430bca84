//! Wiring of the core components
//!
//! `AppContext` builds every component from one loaded configuration and one
//! set of credentials. There are no global singletons: the backend client and
//! the media cache are shared by `Arc` between the components that need them.

use std::sync::Arc;

use tracing::debug;

use super::client::BackendClient;
use super::feedback::FeedbackClient;
use super::history::{OnboardingFlag, SearchHistory};
use super::media::MediaClient;
use super::storage::{FileStore, KeyValueStore};
use super::usage::UsageCounter;
use crate::auth::Credentials;
use crate::config::AppConfig;
use crate::constants::history;
use crate::errors::Result;

/// All core components for one identity
pub struct AppContext {
    pub client: Arc<BackendClient>,
    pub media: MediaClient,
    /// Present only when a user id is configured
    pub usage: Option<UsageCounter>,
    pub history: SearchHistory,
    pub onboarding: OnboardingFlag,
    pub feedback: FeedbackClient,
}

impl AppContext {
    /// Build every component, persisting local state in a [`FileStore`]
    ///
    /// # Errors
    ///
    /// Returns `AppError` if the backend client cannot be built or no store
    /// location is available
    pub fn from_config(config: &AppConfig, credentials: Credentials) -> Result<Self> {
        Self::with_store(config, credentials, Self::local_store(config)?)
    }

    /// The configured local store, without touching the backend
    pub fn local_store(config: &AppConfig) -> Result<Arc<dyn KeyValueStore>> {
        let store = FileStore::at_or_default(config.history.store_path.as_deref())?;
        Ok(Arc::new(store))
    }

    /// Build every component over an explicit store
    pub fn with_store(
        config: &AppConfig,
        credentials: Credentials,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        let user_id = credentials.user_id.clone();
        let client = Arc::new(BackendClient::new(
            &config.client.to_runtime_config(),
            credentials,
        )?);

        let media = MediaClient::new(client.clone(), config.media.to_runtime_config());
        let usage = user_id.clone().map(|id| {
            UsageCounter::new(client.clone(), id, config.usage.to_runtime_config())
        });
        let history = SearchHistory::with_limits(
            store.clone(),
            history::STORAGE_KEY,
            config.history.max_entries,
        );
        let onboarding = OnboardingFlag::new(store);
        let feedback = FeedbackClient::new(client.clone(), user_id);

        debug!(
            "Application context ready (usage tracking: {})",
            usage.is_some()
        );

        Ok(Self {
            client,
            media,
            usage,
            history,
            onboarding,
            feedback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::HistoryItem;
    use crate::app::storage::MemoryStore;

    #[test]
    fn test_context_without_user_has_no_usage() {
        let context = AppContext::with_store(
            &AppConfig::default(),
            Credentials::new("token-0123456789abcdef", None),
            Arc::new(MemoryStore::new()),
        )
        .unwrap();

        assert!(context.usage.is_none());
        assert_eq!(context.history.max_entries(), history::MAX_ENTRIES);
    }

    #[test]
    fn test_context_applies_usage_config() {
        let mut config = AppConfig::default();
        config.usage.limit = 3;

        let context = AppContext::with_store(
            &config,
            Credentials::new("token-0123456789abcdef", Some("user-1".to_string())),
            Arc::new(MemoryStore::new()),
        )
        .unwrap();

        let usage = context.usage.unwrap();
        assert_eq!(usage.limit(), 3);
        assert_eq!(usage.remaining(), 3);
        assert_eq!(usage.user_id(), "user-1");
    }

    #[tokio::test]
    async fn test_history_shares_configured_store() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.history.store_path = Some(temp_dir.path().join("store.json"));

        let context = AppContext::from_config(
            &config,
            Credentials::new("token-0123456789abcdef", None),
        )
        .unwrap();
        context
            .history
            .record(HistoryItem {
                id: "42".to_string(),
                name: "Erithacus rubecula".to_string(),
                display_name: Some("Robin".to_string()),
                thumbnail: None,
            })
            .await
            .unwrap();

        let history = SearchHistory::with_limits(
            AppContext::local_store(&config).unwrap(),
            history::STORAGE_KEY,
            config.history.max_entries,
        );
        let entries = history.list().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "42");
    }
}
