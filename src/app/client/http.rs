//! Core HTTP operations with rate limiting and failure classification
//!
//! Every backend call goes through [`HttpHandler`]: requests wait on a local
//! rate limiter, carry the bearer token, and non-success responses are turned
//! into a [`ClientError`] that keeps the server's message and status.
//! Retrying is left to the callers that want it.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::limits;
use crate::errors::{ClientError, ClientResult};

/// Error body returned by the backend on non-success responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    status: Option<u16>,
}

/// HTTP operations handler
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>,
}

impl HttpHandler {
    /// Creates a new HttpHandler with the given client and rate limiting
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidRequest` if the rate limit is zero
    pub fn new(client: Client, rate_limit_rps: u32) -> ClientResult<Self> {
        let rate_limiter = Self::build_rate_limiter(rate_limit_rps)?;
        Ok(Self {
            client,
            rate_limiter,
        })
    }

    /// Builds the rate limiter with the specified rate limit
    fn build_rate_limiter(
        rate_limit_rps: u32,
    ) -> ClientResult<RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>> {
        let quota = Quota::per_second(NonZeroU32::new(rate_limit_rps).ok_or_else(|| {
            ClientError::InvalidRequest {
                reason: "Rate limit must be non-zero".to_string(),
            }
        })?);
        Ok(RateLimiter::direct(quota))
    }

    /// POST a JSON body and return the successful response
    ///
    /// # Errors
    ///
    /// Returns the classified `ClientError` for transport failures and
    /// non-success statuses
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &Url,
        token: Option<&str>,
        body: &B,
    ) -> ClientResult<Response> {
        let request = self.client.post(url.as_str()).json(body);
        self.send(url, token, request).await
    }

    /// POST a JSON body under its own whole-request timeout
    ///
    /// The timeout replaces the client-wide one for this request and also
    /// bounds reading a streamed response body.
    pub async fn post_json_with_timeout<B: Serialize + ?Sized>(
        &self,
        url: &Url,
        token: Option<&str>,
        body: &B,
        timeout: Duration,
    ) -> ClientResult<Response> {
        let request = self.client.post(url.as_str()).json(body).timeout(timeout);
        self.send(url, token, request).await
    }

    /// GET with query parameters and return the successful response
    pub async fn get(
        &self,
        url: &Url,
        token: Option<&str>,
        query: &[(&str, &str)],
    ) -> ClientResult<Response> {
        let request = self.client.get(url.as_str()).query(query);
        self.send(url, token, request).await
    }

    async fn send(
        &self,
        url: &Url,
        token: Option<&str>,
        mut request: RequestBuilder,
    ) -> ClientResult<Response> {
        // Jitter avoids synchronized bursts from concurrent callers
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50)))
            .await;

        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            tracing::debug!("{} -> {}", url, status);
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = classify_failure(status.as_u16(), &body);
        tracing::warn!("{} -> {}: {}", url, status, error);
        Err(error)
    }

    /// Get a reference to the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Turn a non-success status and body into a classified error.
///
/// The JSON `{message, status}` body is preferred; a plain-text body is kept
/// as the message; an empty body falls back to the status reason phrase.
pub fn classify_failure(status: u16, body: &str) -> ClientError {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok();

    let message = parsed
        .as_ref()
        .and_then(|b| b.message.clone().or_else(|| b.error.clone()))
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| {
            reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("Request failed")
                .to_string()
        });

    let body_status = parsed.and_then(|b| b.status);
    let effective = match body_status {
        Some(limits::RATE_LIMIT_STATUS) => limits::RATE_LIMIT_STATUS,
        _ => status,
    };

    ClientError::classify(effective, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::client::config::ClientConfig;

    #[tokio::test]
    async fn test_rate_limiter_creation() {
        let rate_limiter = HttpHandler::build_rate_limiter(5).unwrap();
        rate_limiter.until_ready().await;
    }

    #[test]
    fn test_rate_limiter_zero_fails() {
        assert!(HttpHandler::build_rate_limiter(0).is_err());
    }

    #[tokio::test]
    async fn test_http_handler_creation() {
        let config = ClientConfig::default();
        let client = config.build_http_client().unwrap();
        assert!(HttpHandler::new(client, 5).is_ok());
    }

    #[test]
    fn test_classify_json_body() {
        let err = classify_failure(400, r#"{"message":"Image too large","status":400}"#);
        assert_eq!(err.to_string(), "Image too large");
        assert_eq!(err.status(), Some(400));
        assert!(!err.is_rate_limited());
    }

    #[test]
    fn test_classify_rate_limits() {
        assert!(classify_failure(429, "").is_rate_limited());
        assert!(classify_failure(500, r#"{"message":"Quota exceeded"}"#).is_rate_limited());
        assert!(classify_failure(500, r#"{"message":"busy","status":429}"#).is_rate_limited());
        assert!(classify_failure(500, "RESOURCE_EXHAUSTED").is_rate_limited());
    }

    #[test]
    fn test_classify_fallback_messages() {
        assert_eq!(classify_failure(502, "bad gateway").to_string(), "bad gateway");
        assert_eq!(classify_failure(404, "").to_string(), "Not Found");
        assert_eq!(
            classify_failure(500, r#"{"error":"edge function crashed"}"#).to_string(),
            "edge function crashed"
        );
    }
}
