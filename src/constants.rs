//! Application constants for Birdsight
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names for authentication and endpoint selection
pub mod env {
    /// Environment variable holding the bearer token
    pub const TOKEN: &str = "BIRDSIGHT_TOKEN";

    /// Environment variable holding the user identity for usage and feedback
    pub const USER_ID: &str = "BIRDSIGHT_USER_ID";

    /// Environment variable overriding the backend base URL
    pub const BASE_URL: &str = "BIRDSIGHT_BASE_URL";
}

/// Authentication and credential-related constants
pub mod auth {
    /// Minimum accepted bearer token length
    pub const MIN_TOKEN_LENGTH: usize = 16;

    /// File permissions for .env file (Unix only) - owner read/write only
    #[cfg(unix)]
    pub const ENV_FILE_PERMISSIONS: u32 = 0o600;

    /// File holding saved credentials
    pub const ENV_FILE_NAME: &str = ".env";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = "Birdsight/0.1.0 (Bird Identification Client)";

    /// Whole-request timeout for ordinary calls
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

    /// Whole-request timeout for the identification stream, body included
    pub const STREAM_TIMEOUT: Duration = Duration::from_secs(600);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum idle connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 8;

    /// Content type of the identification stream
    pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";
}

/// Backend endpoints, relative to the configured base URL
pub mod endpoints {
    /// Default backend base URL (local edge-function runtime)
    pub const DEFAULT_BASE_URL: &str = "http://localhost:54321/functions/v1/";

    /// Streaming identification endpoint
    pub const IDENTIFY: &str = "identify";

    /// Per-species media lookup endpoint
    pub const MEDIA: &str = "bird-media";

    /// Usage counter read endpoint
    pub const USAGE: &str = "usage";

    /// Atomic usage increment procedure
    pub const USAGE_INCREMENT: &str = "usage/increment";

    /// Feedback insert endpoint
    pub const FEEDBACK: &str = "feedback";
}

/// Rate limiting and failure classification
pub mod limits {
    /// Client-side request rate limit (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 10;

    /// HTTP status the backend uses for quota exhaustion
    pub const RATE_LIMIT_STATUS: u16 = 429;

    /// Message fragments that mark a failure as rate-limited
    pub const RATE_LIMIT_MARKERS: [&str; 2] = ["Quota", "RESOURCE_EXHAUSTED"];

    /// Message shown instead of the raw error for rate-limited failures
    pub const RATE_LIMITED_USER_MESSAGE: &str =
        "The identification service is busy right now. Please try again shortly.";
}

/// Media lookup cache and retry defaults
pub mod media {
    use super::Duration;

    /// How long a cached media record stays valid
    pub const CACHE_TTL: Duration = Duration::from_secs(60 * 60);

    /// Additional attempts after the first failure
    pub const MAX_RETRIES: u32 = 2;

    /// Base delay for exponential backoff (milliseconds)
    pub const RETRY_BASE_DELAY_MS: u64 = 500;

    /// Per-attempt timeout (milliseconds)
    pub const ATTEMPT_TIMEOUT_MS: u64 = 12_000;
}

/// Usage credit defaults
pub mod usage {
    /// Identifications allowed before a non-privileged user is gated
    pub const DEFAULT_LIMIT: u32 = 7;
}

/// Local search history defaults
pub mod history {
    /// Maximum number of retained history entries
    pub const MAX_ENTRIES: usize = 10;

    /// Storage key holding the serialized history list
    pub const STORAGE_KEY: &str = "search_history";
}

/// Local key-value storage
pub mod storage {
    /// Storage key for the onboarding completion flag
    pub const ONBOARDING_KEY: &str = "onboarding_complete";

    /// File name of the persisted key-value document
    pub const STORE_FILE_NAME: &str = "store.json";

    /// Application directory name under the OS data/config dirs
    pub const APP_DIR_NAME: &str = "birdsight";

    /// Temporary file suffix for atomic writes
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";
}

/// Configuration file locations
pub mod config {
    /// Project-local configuration file
    pub const LOCAL_FILE_NAME: &str = "birdsight.toml";

    /// File name inside the user config directory
    pub const USER_FILE_NAME: &str = "config.toml";
}

/// Logging constants
pub mod logging {
    /// Default log level when no verbosity flag is given
    pub const DEFAULT_LOG_LEVEL: &str = "warn";
}

// Re-export commonly used constants for convenience
pub use env::{TOKEN as ENV_TOKEN, USER_ID as ENV_USER_ID};
pub use http::{DEFAULT_TIMEOUT as HTTP_TIMEOUT, USER_AGENT};
pub use limits::DEFAULT_RATE_LIMIT_RPS;
pub use usage::DEFAULT_LIMIT as DEFAULT_USAGE_LIMIT;
