//! Reconciliation of stream events into candidate state
//!
//! [`IdentificationState`] keeps three views of one identification request:
//! the raw candidate list as the server sent it (used for index lookups), the
//! primary result (index 0), and the enriched list that media and metadata
//! events patch in place. The `candidates` event is the only thing that
//! establishes the list; enrichment for an index outside it is dropped.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::app::models::{BirdMedia, CandidateRecord, Metadata, StreamEvent};

/// Counters for one identification request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Complete lines taken off the wire
    pub lines_processed: usize,
    /// Lines that failed to parse
    pub malformed_lines: usize,
    /// Events applied to state
    pub events_applied: usize,
    /// Enrichment events dropped for an unknown index
    pub stale_events: usize,
}

/// What the caller should do after an event has been applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Keep reading
    Continue,
    /// Server reported completion
    Done(Duration),
    /// Server reported failure
    Failed(String),
}

/// Mutable client state for a single identification request
#[derive(Debug, Clone, Default)]
pub struct IdentificationState {
    raw: Vec<CandidateRecord>,
    primary: Option<CandidateRecord>,
    enriched: Vec<CandidateRecord>,
    media_by_index: HashMap<usize, BirdMedia>,
    last_progress: Option<String>,
    stats: StreamStats,
}

impl IdentificationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard everything from a previous request
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Apply one event in arrival order
    pub fn apply(&mut self, event: StreamEvent) -> EventOutcome {
        match event {
            StreamEvent::Progress { message } => {
                debug!("Progress: {}", message);
                self.last_progress = Some(message);
            }
            StreamEvent::Candidates { data } => {
                info!("Received {} candidates", data.len());
                self.primary = data.first().cloned();
                self.raw = data.clone();
                self.enriched = data;
                self.media_by_index.clear();
            }
            StreamEvent::Media { index, data } => {
                if !self.knows_index(index, "media") {
                    return EventOutcome::Continue;
                }
                self.apply_media(index, data);
            }
            StreamEvent::Metadata { index, data } => {
                if !self.knows_index(index, "metadata") {
                    return EventOutcome::Continue;
                }
                self.apply_metadata(index, data);
            }
            StreamEvent::Done { duration } => {
                self.stats.events_applied += 1;
                return EventOutcome::Done(Duration::from_millis(duration));
            }
            StreamEvent::Error { message } => {
                self.stats.events_applied += 1;
                return EventOutcome::Failed(message);
            }
        }

        self.stats.events_applied += 1;
        EventOutcome::Continue
    }

    fn knows_index(&mut self, index: usize, kind: &str) -> bool {
        if index < self.raw.len() {
            return true;
        }
        warn!(
            "Dropping {} event for index {} (have {} candidates)",
            kind,
            index,
            self.raw.len()
        );
        self.stats.stale_events += 1;
        false
    }

    fn apply_media(&mut self, index: usize, media: BirdMedia) {
        self.media_by_index
            .entry(index)
            .and_modify(|existing| existing.merge(media.clone()))
            .or_insert_with(|| media.clone());

        if index == 0 {
            if let Some(primary) = self.primary.as_mut() {
                primary.merge_media(media.clone());
            }
        }
        if let Some(candidate) = self.enriched.get_mut(index) {
            candidate.merge_media(media);
        }
    }

    fn apply_metadata(&mut self, index: usize, metadata: Metadata) {
        if index == 0 {
            if let Some(primary) = self.primary.as_mut() {
                primary.merge_metadata(metadata.clone());
            }
        }
        if let Some(candidate) = self.enriched.get_mut(index) {
            candidate.merge_metadata(metadata);
        }
    }

    pub(crate) fn record_line(&mut self) {
        self.stats.lines_processed += 1;
    }

    pub(crate) fn record_malformed(&mut self) {
        self.stats.malformed_lines += 1;
    }

    /// Candidates exactly as the server declared them
    pub fn raw(&self) -> &[CandidateRecord] {
        &self.raw
    }

    /// Top-ranked candidate with its enrichment
    pub fn primary(&self) -> Option<&CandidateRecord> {
        self.primary.as_ref()
    }

    /// Candidates with all enrichment applied so far
    pub fn enriched(&self) -> &[CandidateRecord] {
        &self.enriched
    }

    /// Media received for the candidate at `index`
    pub fn media_for(&self, index: usize) -> Option<&BirdMedia> {
        self.media_by_index.get(&index)
    }

    /// Most recent progress message
    pub fn last_progress(&self) -> Option<&str> {
        self.last_progress.as_deref()
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::Photo;
    use serde_json::Value;

    fn candidate(name: &str) -> CandidateRecord {
        CandidateRecord {
            name: name.to_string(),
            scientific_name: format!("{} scientificus", name),
            confidence: 0.5,
            rarity: "Common".to_string(),
            fact: String::new(),
            media: None,
            metadata: None,
        }
    }

    fn photo_media(url: &str) -> BirdMedia {
        BirdMedia {
            photo: Some(Photo {
                url: url.to_string(),
                attribution: Some("someone".to_string()),
                license: None,
            }),
            ..Default::default()
        }
    }

    fn state_with_two() -> IdentificationState {
        let mut state = IdentificationState::new();
        state.apply(StreamEvent::Candidates {
            data: vec![candidate("Robin"), candidate("Wren")],
        });
        state
    }

    #[test]
    fn test_candidates_establish_all_views() {
        let state = state_with_two();
        assert_eq!(state.raw().len(), 2);
        assert_eq!(state.enriched().len(), 2);
        assert_eq!(state.primary().unwrap().name, "Robin");
    }

    #[test]
    fn test_media_for_index_zero_patches_primary_and_list() {
        let mut state = state_with_two();
        state.apply(StreamEvent::Media {
            index: 0,
            data: photo_media("https://img/robin.jpg"),
        });

        assert_eq!(state.primary().unwrap().photo_url(), Some("https://img/robin.jpg"));
        assert_eq!(state.enriched()[0].photo_url(), Some("https://img/robin.jpg"));
        assert!(state.raw()[0].media.is_none());
        assert!(state.enriched()[1].media.is_none());
        assert!(state.media_for(0).is_some());
    }

    #[test]
    fn test_metadata_for_other_index_leaves_primary() {
        let mut state = state_with_two();
        let mut data = Metadata::new();
        data.insert("habitat".to_string(), Value::from("hedges"));
        state.apply(StreamEvent::Metadata { index: 1, data });

        assert!(state.primary().unwrap().metadata.is_none());
        assert_eq!(
            state.enriched()[1].metadata.as_ref().unwrap()["habitat"],
            "hedges"
        );
    }

    #[test]
    fn test_metadata_for_index_zero_patches_primary_and_list() {
        let mut state = state_with_two();
        let mut data = Metadata::new();
        data.insert("habitat".to_string(), Value::from("reeds"));
        state.apply(StreamEvent::Metadata { index: 0, data });

        let primary = state.primary().unwrap();
        assert_eq!(primary.metadata.as_ref().unwrap()["habitat"], "reeds");
        assert_eq!(primary.metadata, state.enriched()[0].metadata);
        assert!(state.enriched()[1].metadata.is_none());
        assert!(state.raw()[0].metadata.is_none());
        assert_eq!(state.stats().stale_events, 0);
    }

    #[test]
    fn test_stale_metadata_index_ignored() {
        let mut state = IdentificationState::new();
        let mut early = Metadata::new();
        early.insert("habitat".to_string(), Value::from("marsh"));
        state.apply(StreamEvent::Metadata {
            index: 0,
            data: early,
        });

        state.apply(StreamEvent::Candidates {
            data: vec![candidate("Robin"), candidate("Wren")],
        });
        let mut late = Metadata::new();
        late.insert("habitat".to_string(), Value::from("ghost"));
        let outcome = state.apply(StreamEvent::Metadata {
            index: 9,
            data: late,
        });

        assert_eq!(outcome, EventOutcome::Continue);
        assert_eq!(state.stats().stale_events, 2);
        assert_eq!(state.enriched().len(), 2);
        assert!(state.enriched().iter().all(|c| c.metadata.is_none()));
        assert!(state.primary().unwrap().metadata.is_none());
    }

    #[test]
    fn test_enrichment_before_candidates_is_dropped() {
        let mut state = IdentificationState::new();
        let outcome = state.apply(StreamEvent::Media {
            index: 0,
            data: photo_media("https://img/early.jpg"),
        });
        assert_eq!(outcome, EventOutcome::Continue);
        assert_eq!(state.stats().stale_events, 1);

        state.apply(StreamEvent::Candidates {
            data: vec![candidate("Robin")],
        });
        // Not buffered: the early media never shows up
        assert!(state.enriched()[0].media.is_none());
    }

    #[test]
    fn test_out_of_range_index_ignored() {
        let mut state = state_with_two();
        state.apply(StreamEvent::Media {
            index: 5,
            data: photo_media("https://img/ghost.jpg"),
        });

        assert_eq!(state.enriched().len(), 2);
        assert!(state.enriched().iter().all(|c| c.media.is_none()));
        assert_eq!(state.stats().stale_events, 1);
    }

    #[test]
    fn test_new_candidates_replace_previous_enrichment() {
        let mut state = state_with_two();
        state.apply(StreamEvent::Media {
            index: 1,
            data: photo_media("https://img/wren.jpg"),
        });
        state.apply(StreamEvent::Candidates {
            data: vec![candidate("Blackbird")],
        });

        assert_eq!(state.enriched().len(), 1);
        assert!(state.media_for(1).is_none());
        assert_eq!(state.primary().unwrap().name, "Blackbird");
    }

    #[test]
    fn test_terminal_outcomes() {
        let mut state = IdentificationState::new();
        assert_eq!(
            state.apply(StreamEvent::Done { duration: 123 }),
            EventOutcome::Done(Duration::from_millis(123))
        );
        assert_eq!(
            state.apply(StreamEvent::Error {
                message: "model failed".to_string()
            }),
            EventOutcome::Failed("model failed".to_string())
        );
    }

    #[test]
    fn test_progress_only_records_message() {
        let mut state = state_with_two();
        state.apply(StreamEvent::Progress {
            message: "Fetching photos".to_string(),
        });
        assert_eq!(state.last_progress(), Some("Fetching photos"));
        assert_eq!(state.enriched().len(), 2);
    }
}
