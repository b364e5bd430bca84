//! Identification stream protocol and reconciliation
//!
//! The backend answers an identification request with newline-delimited JSON:
//! a `candidates` event establishing the ranked list, then `media` and
//! `metadata` events enriching individual candidates by index, interleaved
//! with `progress` messages, and finally `done` or `error`.
//!
//! # Module Organization
//!
//! - [`decoder`] - Line framing across chunk boundaries and event parsing
//! - [`reconciler`] - Candidate state and the per-event merge rules
//! - [`consumer`] - The read loop with cancellation and terminal handling
//!
//! # Examples
//!
//! ```rust,no_run
//! use birdsight::app::stream::run_identification;
//! use birdsight::app::{BackendClient, ClientConfig, IdentifyRequest};
//! use birdsight::auth::Credentials;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = BackendClient::new(&ClientConfig::default(), Credentials::from_env()?)?;
//! let request = IdentifyRequest::from_bytes(Some(b"...jpeg bytes..."), None)?;
//! let cancel = CancellationToken::new();
//!
//! let outcome = run_identification(&client, &request, &cancel, |kind, state| {
//!     println!("{}: {} candidates", kind, state.enriched().len());
//! })
//! .await?;
//! println!("Top result: {:?}", outcome.primary.map(|c| c.name));
//! # Ok(())
//! # }
//! ```

pub mod consumer;
pub mod decoder;
pub mod reconciler;

pub use consumer::{Completion, IdentificationOutcome, StreamConsumer};
pub use decoder::{parse_event, LineDecoder};
pub use reconciler::{EventOutcome, IdentificationState, StreamStats};

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::app::client::BackendClient;
use crate::app::models::IdentifyRequest;
use crate::errors::{StreamError, StreamResult};

/// Open an identification request and reconcile its stream
///
/// Cancellation is honoured while the request is being opened as well as
/// while the body is read.
///
/// # Errors
///
/// Returns `StreamError::Client` when the request is rejected (rate-limited
/// requests keep their classification) and `StreamError::Server` for a
/// terminal `error` event.
pub async fn run_identification<F>(
    client: &BackendClient,
    request: &IdentifyRequest,
    cancel: &CancellationToken,
    observer: F,
) -> StreamResult<IdentificationOutcome>
where
    F: FnMut(&'static str, &IdentificationState),
{
    info!(
        "Starting identification (image: {}, audio: {})",
        request.image.is_some(),
        request.audio.is_some()
    );

    let mut consumer = StreamConsumer::new();
    let body = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Ok(consumer.cancelled()),
        opened = client.open_identification(request) => opened.map_err(StreamError::Client)?,
    };

    consumer.consume_with(body, cancel, observer).await
}
