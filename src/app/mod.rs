//! Core application logic for Birdsight
//!
//! This module contains the backend client, the identification stream
//! reconciler, the cached media client, usage counting, and the local history
//! and feedback components.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use birdsight::app::{BackendClient, ClientConfig, MediaClient, MediaConfig};
//! use birdsight::auth::Credentials;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(BackendClient::new(
//!     &ClientConfig::default(),
//!     Credentials::from_env()?,
//! )?);
//!
//! let media = MediaClient::new(client, MediaConfig::default());
//! let record = media.fetch("Erithacus rubecula").await?;
//! println!("Photo: {:?}", record.photo.map(|p| p.url));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod context;
pub mod feedback;
pub mod history;
pub mod media;
pub mod models;
pub mod storage;
pub mod stream;
pub mod usage;

// Re-export main public API
pub use client::{BackendClient, ClientConfig};
pub use context::AppContext;
pub use feedback::{FeedbackClient, FeedbackSink};
pub use history::{OnboardingFlag, SearchHistory};
pub use media::{MediaCache, MediaClient, MediaConfig, MediaFetcher, RetryPolicy};
pub use models::{
    BirdMedia, CandidateRecord, FeedbackRecord, FeedbackType, HistoryItem, IdentifyRequest,
    SearchHistoryEntry, StreamEvent,
};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use stream::{
    run_identification, Completion, IdentificationOutcome, IdentificationState, StreamConsumer,
};
pub use usage::{UsageBackend, UsageConfig, UsageCounter};
