//! Consumption of an identification response body
//!
//! [`StreamConsumer`] reads chunks from any byte stream, frames them into
//! lines, decodes events and applies them to [`IdentificationState`] strictly
//! in arrival order. A cancellation token stops processing immediately: no
//! buffered line is applied once the token fires.

use std::time::Duration;

use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::decoder::{parse_event, LineDecoder};
use super::reconciler::{EventOutcome, IdentificationState, StreamStats};
use crate::app::models::CandidateRecord;
use crate::errors::{ClientError, StreamError, StreamResult};

/// How an identification stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Server sent a `done` event
    Done,
    /// Body ended without a terminal event
    EndOfStream,
    /// Caller cancelled
    Cancelled,
}

/// Final state handed back to the caller
#[derive(Debug, Clone)]
pub struct IdentificationOutcome {
    /// Enriched candidates in server rank order
    pub candidates: Vec<CandidateRecord>,
    /// Top-ranked candidate with its enrichment
    pub primary: Option<CandidateRecord>,
    /// Server-reported duration from the `done` event
    pub duration: Option<Duration>,
    pub completion: Completion,
    pub stats: StreamStats,
}

impl IdentificationOutcome {
    pub fn is_cancelled(&self) -> bool {
        self.completion == Completion::Cancelled
    }
}

/// Drives one identification stream at a time
#[derive(Debug, Default)]
pub struct StreamConsumer {
    state: IdentificationState,
    decoder: LineDecoder,
}

impl StreamConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    /// State accumulated so far, also valid after a failure
    pub fn state(&self) -> &IdentificationState {
        &self.state
    }

    /// Consume a response body to completion, failure or cancellation
    ///
    /// # Errors
    ///
    /// Returns `StreamError::Client` for a transport failure while reading and
    /// `StreamError::Server` for a terminal `error` event. Malformed lines and
    /// stale enrichment are absorbed.
    pub async fn consume<S, E>(
        &mut self,
        stream: S,
        cancel: &CancellationToken,
    ) -> StreamResult<IdentificationOutcome>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<ClientError>,
    {
        self.consume_with(stream, cancel, |_, _| {}).await
    }

    /// Like [`consume`](Self::consume), calling `observer` after every applied
    /// event with the event kind and the updated state
    pub async fn consume_with<S, E, F>(
        &mut self,
        stream: S,
        cancel: &CancellationToken,
        mut observer: F,
    ) -> StreamResult<IdentificationOutcome>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<ClientError>,
        F: FnMut(&'static str, &IdentificationState),
    {
        self.state.reset();
        self.decoder = LineDecoder::new();
        tokio::pin!(stream);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(self.cancelled()),
                chunk = stream.next() => chunk,
            };

            match next {
                Some(Ok(bytes)) => {
                    for line in self.decoder.push(&bytes) {
                        if cancel.is_cancelled() {
                            return Ok(self.cancelled());
                        }
                        if let Some(outcome) = self.handle_line(&line, &mut observer)? {
                            return Ok(outcome);
                        }
                    }
                }
                Some(Err(e)) => {
                    let e: ClientError = e.into();
                    error!("Identification stream failed: {}", e);
                    return Err(StreamError::Client(e));
                }
                None => {
                    if let Some(line) = self.decoder.finish() {
                        if cancel.is_cancelled() {
                            return Ok(self.cancelled());
                        }
                        if let Some(outcome) = self.handle_line(&line, &mut observer)? {
                            return Ok(outcome);
                        }
                    }
                    info!(
                        "Identification stream ended without terminal event ({} candidates)",
                        self.state.enriched().len()
                    );
                    return Ok(self.outcome(Completion::EndOfStream, None));
                }
            }
        }
    }

    fn handle_line<F>(
        &mut self,
        line: &str,
        observer: &mut F,
    ) -> StreamResult<Option<IdentificationOutcome>>
    where
        F: FnMut(&'static str, &IdentificationState),
    {
        self.state.record_line();
        let Some(event) = parse_event(line) else {
            self.state.record_malformed();
            return Ok(None);
        };

        let kind = event.kind();
        let outcome = self.state.apply(event);
        observer(kind, &self.state);

        match outcome {
            EventOutcome::Continue => Ok(None),
            EventOutcome::Done(duration) => {
                info!(
                    "Identification finished in {:?} with {} candidates",
                    duration,
                    self.state.enriched().len()
                );
                Ok(Some(self.outcome(Completion::Done, Some(duration))))
            }
            EventOutcome::Failed(message) => {
                error!("Identification failed: {}", message);
                Err(StreamError::Server { message })
            }
        }
    }

    pub(crate) fn cancelled(&self) -> IdentificationOutcome {
        warn!("Identification stream cancelled");
        self.outcome(Completion::Cancelled, None)
    }

    fn outcome(&self, completion: Completion, duration: Option<Duration>) -> IdentificationOutcome {
        IdentificationOutcome {
            candidates: self.state.enriched().to_vec(),
            primary: self.state.primary().cloned(),
            duration,
            completion,
            stats: self.state.stats().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn body(chunks: &[&str]) -> impl Stream<Item = Result<Bytes, ClientError>> {
        let items: Vec<Result<Bytes, ClientError>> = chunks
            .iter()
            .map(|c| Ok(Bytes::from(c.to_string())))
            .collect();
        stream::iter(items)
    }

    const CANDIDATES: &str = r#"{"type":"candidates","data":[{"name":"Robin","scientific_name":"Erithacus rubecula","confidence":0.92,"rarity":"Common","fact":"Sings in winter"},{"name":"Wren","scientific_name":"Troglodytes troglodytes","confidence":0.05,"rarity":"Common","fact":"Tiny but loud"}]}"#;
    const MEDIA_0: &str = r#"{"type":"media","index":0,"data":{"photo":{"url":"https://img/robin.jpg","attribution":"A. Birder"}}}"#;

    #[tokio::test]
    async fn test_end_to_end_reconciliation() {
        let ndjson = format!(
            "{}\n{}\n{}\n",
            CANDIDATES, MEDIA_0, r#"{"type":"done","duration":123}"#
        );
        let cancel = CancellationToken::new();
        let mut consumer = StreamConsumer::new();

        let outcome = consumer.consume(body(&[&ndjson]), &cancel).await.unwrap();

        assert_eq!(outcome.completion, Completion::Done);
        assert_eq!(outcome.duration, Some(Duration::from_millis(123)));
        assert_eq!(outcome.candidates.len(), 2);
        assert_eq!(outcome.candidates[0].photo_url(), Some("https://img/robin.jpg"));
        assert!(outcome.candidates[1].media.is_none());
        assert_eq!(
            outcome.primary.as_ref().unwrap().photo_url(),
            Some("https://img/robin.jpg")
        );
    }

    #[tokio::test]
    async fn test_fragmented_chunks() {
        let ndjson = format!("{}\n{}\n", CANDIDATES, MEDIA_0);
        let (a, rest) = ndjson.split_at(17);
        let (b, c) = rest.split_at(rest.len() - 30);
        let cancel = CancellationToken::new();
        let mut consumer = StreamConsumer::new();

        let outcome = consumer.consume(body(&[a, b, c]), &cancel).await.unwrap();

        assert_eq!(outcome.completion, Completion::EndOfStream);
        assert_eq!(outcome.candidates.len(), 2);
        assert!(outcome.candidates[0].media.is_some());
        assert!(outcome.duration.is_none());
    }

    #[tokio::test]
    async fn test_malformed_line_does_not_abort() {
        let ndjson = format!(
            "{}\n{{oops not json\n{}\n",
            CANDIDATES, r#"{"type":"done","duration":9}"#
        );
        let cancel = CancellationToken::new();
        let mut consumer = StreamConsumer::new();

        let outcome = consumer.consume(body(&[&ndjson]), &cancel).await.unwrap();

        assert_eq!(outcome.completion, Completion::Done);
        assert_eq!(outcome.stats.malformed_lines, 1);
        assert_eq!(outcome.stats.lines_processed, 3);
    }

    #[tokio::test]
    async fn test_stale_index_ignored() {
        let ndjson = format!(
            "{}\n{}\n",
            CANDIDATES, r#"{"type":"media","index":5,"data":{"photo":{"url":"x"}}}"#
        );
        let cancel = CancellationToken::new();
        let mut consumer = StreamConsumer::new();

        let outcome = consumer.consume(body(&[&ndjson]), &cancel).await.unwrap();

        assert_eq!(outcome.candidates.len(), 2);
        assert!(outcome.candidates.iter().all(|c| c.media.is_none()));
        assert_eq!(outcome.stats.stale_events, 1);
    }

    #[tokio::test]
    async fn test_error_event_is_typed_failure() {
        let ndjson = format!(
            "{}\n{}\n",
            CANDIDATES, r#"{"type":"error","message":"Quota exceeded for vision model"}"#
        );
        let cancel = CancellationToken::new();
        let mut consumer = StreamConsumer::new();

        let err = consumer.consume(body(&[&ndjson]), &cancel).await.unwrap_err();

        assert!(matches!(err, StreamError::Server { .. }));
        assert!(err.is_rate_limited());
        // State gathered before the failure stays inspectable
        assert_eq!(consumer.state().enriched().len(), 2);
    }

    #[tokio::test]
    async fn test_transport_error_surfaces_once() {
        let items: Vec<Result<Bytes, ClientError>> = vec![
            Ok(Bytes::from(format!("{}\n", CANDIDATES))),
            Err(ClientError::Network {
                message: "connection reset".to_string(),
            }),
            Ok(Bytes::from(format!("{}\n", MEDIA_0))),
        ];
        let cancel = CancellationToken::new();
        let mut consumer = StreamConsumer::new();

        let err = consumer
            .consume(stream::iter(items), &cancel)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "connection reset");
        assert!(consumer.state().enriched()[0].media.is_none());
    }

    #[tokio::test]
    async fn test_cancel_stops_buffered_lines() {
        let ndjson = format!("{}\n{}\n", CANDIDATES, MEDIA_0);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let mut consumer = StreamConsumer::new();

        let outcome = consumer
            .consume_with(body(&[&ndjson]), &cancel, |kind, _| {
                if kind == "candidates" {
                    trigger.cancel();
                }
            })
            .await
            .unwrap();

        assert!(outcome.is_cancelled());
        assert_eq!(outcome.candidates.len(), 2);
        // The media line was already buffered but must not be applied
        assert!(outcome.candidates[0].media.is_none());
    }

    #[tokio::test]
    async fn test_cancel_before_first_chunk() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut consumer = StreamConsumer::new();

        let outcome = consumer
            .consume(stream::pending::<Result<Bytes, ClientError>>(), &cancel)
            .await
            .unwrap();

        assert!(outcome.is_cancelled());
        assert!(outcome.candidates.is_empty());
    }

    #[tokio::test]
    async fn test_unterminated_final_line_applied() {
        let ndjson = format!("{}\n{}", CANDIDATES, r#"{"type":"done","duration":7}"#);
        let cancel = CancellationToken::new();
        let mut consumer = StreamConsumer::new();

        let outcome = consumer.consume(body(&[&ndjson]), &cancel).await.unwrap();
        assert_eq!(outcome.completion, Completion::Done);
    }

    #[tokio::test]
    async fn test_consumer_reuse_discards_previous_request() {
        let cancel = CancellationToken::new();
        let mut consumer = StreamConsumer::new();
        consumer
            .consume(body(&[&format!("{}\n", CANDIDATES)]), &cancel)
            .await
            .unwrap();

        let outcome = consumer
            .consume(body(&["{\"type\":\"progress\",\"message\":\"hi\"}\n"]), &cancel)
            .await
            .unwrap();

        assert!(outcome.candidates.is_empty());
        assert!(outcome.primary.is_none());
    }
}
