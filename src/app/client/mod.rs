//! HTTP client for the identification backend
//!
//! This module provides the client for every remote call the app makes: the
//! streaming identification request, per-species media lookup, the usage
//! counter procedures, and feedback inserts.
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `http`: Core HTTP operations with rate limiting and failure classification

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::Stream;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::app::feedback::FeedbackSink;
use crate::app::media::MediaFetcher;
use crate::app::models::{BirdMedia, FeedbackRecord, IdentifyRequest};
use crate::app::usage::UsageBackend;
use crate::auth::Credentials;
use crate::constants::{endpoints, http as http_constants};
use crate::errors::{ClientError, ClientResult};

// Module declarations
pub mod config;
pub mod http;

pub use config::ClientConfig;
pub use http::classify_failure;

use http::HttpHandler;

/// Usage count as returned by the backend: a bare integer from the
/// increment procedure, or a `{count}` row from the read endpoint
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CountBody {
    Bare(u32),
    Row { count: u32 },
}

impl CountBody {
    fn value(self) -> u32 {
        match self {
            CountBody::Bare(count) | CountBody::Row { count } => count,
        }
    }
}

/// HTTP client for the identification backend
///
/// Constructed explicitly and shared behind an `Arc`; it holds no global state.
#[derive(Debug)]
pub struct BackendClient {
    http_handler: HttpHandler,
    base_url: Url,
    credentials: Credentials,
    stream_timeout: Duration,
}

impl BackendClient {
    /// Creates a client for the configured backend
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the base URL is invalid or the HTTP client
    /// cannot be built
    pub fn new(config: &ClientConfig, credentials: Credentials) -> ClientResult<Self> {
        let client = config.build_http_client()?;
        let http_handler = HttpHandler::new(client, config.rate_limit_rps)?;
        let base_url = config.parsed_base_url()?;

        tracing::info!("Created backend client for {}", base_url);

        Ok(Self {
            http_handler,
            base_url,
            credentials,
            stream_timeout: config.stream_timeout,
        })
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidUrl {
                url: format!("{}{}", self.base_url, path),
                error: e.to_string(),
            })
    }

    fn token(&self) -> Option<&str> {
        Some(self.credentials.token.as_str()).filter(|t| !t.is_empty())
    }

    /// Open the identification stream for a capture
    ///
    /// Returns the raw response body as a byte stream; hand it to a
    /// [`StreamConsumer`](crate::app::stream::StreamConsumer) to reconcile.
    ///
    /// # Errors
    ///
    /// Returns the classified `ClientError` when the request fails or the
    /// backend answers with a non-success status
    pub async fn open_identification(
        &self,
        request: &IdentifyRequest,
    ) -> ClientResult<impl Stream<Item = Result<Bytes, reqwest::Error>>> {
        let url = self.endpoint(endpoints::IDENTIFY)?;
        let response = self
            .http_handler
            .post_json_with_timeout(&url, self.token(), request, self.stream_timeout)
            .await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !content_type.starts_with(http_constants::NDJSON_CONTENT_TYPE) {
            tracing::debug!("Identification stream served as '{}'", content_type);
        }

        Ok(response.bytes_stream())
    }

    /// Look up media for a species by scientific name
    pub async fn lookup_media(&self, scientific_name: &str) -> ClientResult<BirdMedia> {
        let url = self.endpoint(endpoints::MEDIA)?;
        let body = serde_json::json!({ "scientific_name": scientific_name });
        let response = self.http_handler.post_json(&url, self.token(), &body).await?;
        decode(response).await
    }

    /// Read the stored usage count; `None` when the identity has no record
    pub async fn read_usage(&self, user_id: &str) -> ClientResult<Option<u32>> {
        let url = self.endpoint(endpoints::USAGE)?;
        let response = match self
            .http_handler
            .get(&url, self.token(), &[("user_id", user_id)])
            .await
        {
            Ok(response) => response,
            Err(ClientError::Remote { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        let body: Option<CountBody> = decode(response).await?;
        Ok(body.map(CountBody::value))
    }

    /// Invoke the server-side atomic increment and return the new count
    pub async fn increment_usage(&self, user_id: &str) -> ClientResult<u32> {
        let url = self.endpoint(endpoints::USAGE_INCREMENT)?;
        let body = serde_json::json!({ "user_id": user_id });
        let response = self.http_handler.post_json(&url, self.token(), &body).await?;
        let count: CountBody = decode(response).await?;
        Ok(count.value())
    }

    /// Insert one feedback record
    pub async fn insert_feedback(&self, record: &FeedbackRecord) -> ClientResult<()> {
        let url = self.endpoint(endpoints::FEEDBACK)?;
        self.http_handler
            .post_json(&url, self.token(), record)
            .await?;
        Ok(())
    }

    /// User identity attached to this client, if any
    pub fn user_id(&self) -> Option<&str> {
        self.credentials.user_id.as_deref()
    }

    /// Get the backend base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl MediaFetcher for BackendClient {
    async fn fetch_media(&self, scientific_name: &str) -> ClientResult<BirdMedia> {
        self.lookup_media(scientific_name).await
    }
}

#[async_trait]
impl UsageBackend for BackendClient {
    async fn read_count(&self, user_id: &str) -> ClientResult<Option<u32>> {
        self.read_usage(user_id).await
    }

    async fn increment_count(&self, user_id: &str) -> ClientResult<u32> {
        self.increment_usage(user_id).await
    }
}

#[async_trait]
impl FeedbackSink for BackendClient {
    async fn insert(&self, record: &FeedbackRecord) -> ClientResult<()> {
        self.insert_feedback(record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials {
            token: "test-token-0123456789".to_string(),
            user_id: Some("user-1".to_string()),
        }
    }

    #[test]
    fn test_client_creation() {
        let config = ClientConfig::with_base_url("https://example.org/functions/v1");
        let client = BackendClient::new(&config, credentials()).unwrap();
        assert_eq!(client.user_id(), Some("user-1"));
        assert_eq!(
            client.endpoint(endpoints::USAGE_INCREMENT).unwrap().as_str(),
            "https://example.org/functions/v1/usage/increment"
        );
    }

    #[test]
    fn test_empty_token_not_sent() {
        let config = ClientConfig::default();
        let client = BackendClient::new(
            &config,
            Credentials {
                token: String::new(),
                user_id: None,
            },
        )
        .unwrap();
        assert!(client.token().is_none());
    }

    #[test]
    fn test_count_body_shapes() {
        let bare: CountBody = serde_json::from_str("4").unwrap();
        assert_eq!(bare.value(), 4);

        let row: CountBody = serde_json::from_str(r#"{"count":6}"#).unwrap();
        assert_eq!(row.value(), 6);

        let missing: Option<CountBody> = serde_json::from_str("null").unwrap();
        assert!(missing.is_none());
    }
}
