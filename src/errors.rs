//! Error types for Birdsight
//!
//! This module defines the error types for all components of the application.
//! Remote failures keep the server's message and status intact so callers can
//! inspect them; recoverable local conditions (malformed stream lines, stale
//! enrichment indices, corrupt history) never surface as errors at all.

use std::path::PathBuf;

use thiserror::Error;

use crate::constants::limits;

/// Authentication-related errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// Missing bearer token
    #[error("Missing API token. Set BIRDSIGHT_TOKEN or run 'auth setup'")]
    MissingToken,

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Token failed local validation
    #[error("Invalid token: {reason}")]
    InvalidToken { reason: String },

    /// File I/O error during credential storage
    #[error("Failed to save credentials to file")]
    CredentialStorage(#[from] std::io::Error),

    /// Permission error on credential file
    #[error("Permission denied accessing credential file: {path}")]
    PermissionDenied { path: PathBuf },
}

/// Failures of calls to the remote backend
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport-level HTTP failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response; message is the server's own
    #[error("{message}")]
    Remote { status: u16, message: String },

    /// Quota exhausted or HTTP 429
    #[error("{message}")]
    RateLimited { status: Option<u16>, message: String },

    /// Connectivity failure reported without an HTTP response
    #[error("{message}")]
    Network { message: String },

    /// A single attempt exceeded its timeout
    #[error("Request timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// Invalid URL provided
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Request could not be built from the given input
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// Response body did not match the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// Classify a failed response by status and message.
    ///
    /// HTTP 429 or a message mentioning quota exhaustion becomes
    /// [`ClientError::RateLimited`]; anything else stays a plain remote failure.
    pub fn classify(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == limits::RATE_LIMIT_STATUS || mentions_quota(&message) {
            ClientError::RateLimited {
                status: Some(status),
                message,
            }
        } else {
            ClientError::Remote { status, message }
        }
    }

    /// HTTP status carried by the failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Remote { status, .. } => Some(*status),
            ClientError::RateLimited { status, .. } => *status,
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether this failure should be presented as "try again shortly"
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ClientError::RateLimited { .. })
    }

    /// Check if the failure is transient
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Http(_)
            | ClientError::Network { .. }
            | ClientError::Timeout { .. }
            | ClientError::RateLimited { .. } => true,
            ClientError::Remote { status, .. } => *status >= 500,
            ClientError::InvalidUrl { .. }
            | ClientError::InvalidRequest { .. }
            | ClientError::Decode(_) => false,
        }
    }
}

/// Whether a message uses the backend's quota-exhaustion wording
pub fn mentions_quota(message: &str) -> bool {
    limits::RATE_LIMIT_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

/// Identification stream failures surfaced to the caller
#[derive(Error, Debug)]
pub enum StreamError {
    /// Request or transport failure
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Terminal `error` event sent by the server
    #[error("{message}")]
    Server { message: String },
}

impl StreamError {
    /// Whether the failure is a quota / rate-limit condition
    pub fn is_rate_limited(&self) -> bool {
        match self {
            StreamError::Client(e) => e.is_rate_limited(),
            StreamError::Server { message } => mentions_quota(message),
        }
    }
}

/// Local key-value storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O error reading or writing the store
    #[error("Storage I/O error")]
    Io(#[from] std::io::Error),

    /// Value could not be serialized
    #[error("Failed to serialize stored value")]
    Serialize(#[from] serde_json::Error),

    /// Store location could not be determined
    #[error("Storage location unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Authentication error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Remote call error
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Identification stream error
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// Local storage error
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Client(e) => e.is_transient(),
            AppError::Stream(StreamError::Client(e)) => e.is_transient(),
            AppError::Stream(StreamError::Server { message }) => mentions_quota(message),
            _ => false,
        }
    }

    /// Check if the error is a rate-limit condition
    pub fn is_rate_limited(&self) -> bool {
        match self {
            AppError::Client(e) => e.is_rate_limited(),
            AppError::Stream(e) => e.is_rate_limited(),
            _ => false,
        }
    }

    /// Message for display: friendly for rate limits, the underlying text otherwise
    pub fn user_message(&self) -> String {
        if self.is_rate_limited() {
            limits::RATE_LIMITED_USER_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "authentication",
            AppError::Client(_) => "client",
            AppError::Stream(_) => "stream",
            AppError::Storage(_) => "storage",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Authentication result type alias
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Remote call result type alias
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Identification stream result type alias
pub type StreamResult<T> = std::result::Result<T, StreamError>;

/// Storage result type alias
pub type StorageResult<T> = std::result::Result<T, StorageError>;
