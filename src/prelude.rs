//! Prelude module for the Birdsight library
//!
//! This module re-exports the most commonly used items, so typical
//! integrations need a single `use birdsight::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use birdsight::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::load(None).await?;
//!     let context = AppContext::from_config(&config, Credentials::from_env()?)?;
//!
//!     for entry in context.history.list().await? {
//!         println!("{}", entry.display_name);
//!     }
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, ClientError, Result, StreamError};

// Essential app components
pub use crate::app::{
    run_identification, AppContext, BackendClient, BirdMedia, CandidateRecord, ClientConfig,
    Completion, FeedbackClient, FeedbackRecord, FeedbackType, HistoryItem, IdentificationOutcome,
    IdentifyRequest, KeyValueStore, MediaClient, MediaConfig, SearchHistory, SearchHistoryEntry,
    StreamConsumer, UsageCounter,
};

// Configuration and authentication
pub use crate::auth::{check_credentials, Credentials};
pub use crate::config::AppConfig;

// Commonly used constants
pub use crate::constants::{DEFAULT_RATE_LIMIT_RPS, DEFAULT_USAGE_LIMIT, USER_AGENT};

pub use std::sync::Arc;
pub use tokio_util::sync::CancellationToken;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_imports() {
        let _client_config = ClientConfig::default();
        let _media_config = MediaConfig::default();
        let _has_token = check_credentials();

        assert_eq!(DEFAULT_USAGE_LIMIT, 7);
        assert!(USER_AGENT.contains("Birdsight"));
    }
}
