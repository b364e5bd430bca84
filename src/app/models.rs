//! Data models for identification results, media, history and feedback
//!
//! These types mirror the JSON exchanged with the backend. Absent optional
//! fields are omitted on the wire rather than sent as `null`.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{ClientError, ClientResult};

/// Free-form enrichment map attached to a candidate
pub type Metadata = Map<String, Value>;

/// One identified species within a single identification request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Common name
    pub name: String,
    /// Scientific name, the join key for later enrichment
    pub scientific_name: String,
    /// Confidence in [0, 1]
    #[serde(default)]
    pub confidence: f64,
    /// Rarity description
    #[serde(default)]
    pub rarity: String,
    /// Short descriptive fact
    #[serde(default)]
    pub fact: String,
    /// Media attached by `media` events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<BirdMedia>,
    /// Enrichment attached by `metadata` events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl CandidateRecord {
    /// Merge a media payload into this record
    pub fn merge_media(&mut self, media: BirdMedia) {
        match self.media.as_mut() {
            Some(existing) => existing.merge(media),
            None => self.media = Some(media),
        }
    }

    /// Merge metadata, overwriting existing keys
    pub fn merge_metadata(&mut self, metadata: Metadata) {
        self.metadata.get_or_insert_with(Map::new).extend(metadata);
    }

    /// Confidence clamped to [0, 1] as a whole percentage
    pub fn confidence_percent(&self) -> u8 {
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u8
    }

    /// Primary photo URL, if media has arrived
    pub fn photo_url(&self) -> Option<&str> {
        self.media
            .as_ref()
            .and_then(|m| m.photo.as_ref())
            .map(|p| p.url.as_str())
    }
}

/// Media known for a species
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BirdMedia {
    /// Main photo with attribution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<Photo>,
    /// Range map tile reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<MapReference>,
    /// Per-sex/age image URLs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<SexAgeImages>,
    /// Community photos from iNaturalist
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inaturalist_photos: Option<Vec<Photo>>,
    /// Recorded sounds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sounds: Option<Vec<Sound>>,
    /// Extra key-value data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl BirdMedia {
    /// Field-wise merge; fields present in `other` win
    pub fn merge(&mut self, other: BirdMedia) {
        if other.photo.is_some() {
            self.photo = other.photo;
        }
        if other.map.is_some() {
            self.map = other.map;
        }
        if other.images.is_some() {
            self.images = other.images;
        }
        if other.inaturalist_photos.is_some() {
            self.inaturalist_photos = other.inaturalist_photos;
        }
        if other.sounds.is_some() {
            self.sounds = other.sounds;
        }
        if let Some(metadata) = other.metadata {
            self.metadata.get_or_insert_with(Map::new).extend(metadata);
        }
    }

    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        self == &BirdMedia::default()
    }
}

/// Photo URL with attribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
}

/// Range map reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapReference {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxon_id: Option<u64>,
}

/// Optional per-sex/age image URLs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SexAgeImages {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub male: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub female: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub juvenile: Option<String>,
}

/// A recorded call or song
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sound {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recordist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "type")]
    pub kind: Option<String>,
}

/// One line of the identification stream, discriminated on `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Informational status text
    Progress {
        #[serde(default)]
        message: String,
    },
    /// Full replacement of the candidate list, in server rank order
    Candidates { data: Vec<CandidateRecord> },
    /// Media for the candidate at `index`
    Media { index: usize, data: BirdMedia },
    /// Enrichment for the candidate at `index`
    Metadata { index: usize, data: Metadata },
    /// Terminal success; elapsed milliseconds
    Done {
        #[serde(default)]
        duration: u64,
    },
    /// Terminal failure
    Error {
        #[serde(default)]
        message: String,
    },
}

impl StreamEvent {
    /// Event kind as it appears on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Progress { .. } => "progress",
            StreamEvent::Candidates { .. } => "candidates",
            StreamEvent::Media { .. } => "media",
            StreamEvent::Metadata { .. } => "metadata",
            StreamEvent::Done { .. } => "done",
            StreamEvent::Error { .. } => "error",
        }
    }

    /// Whether the event ends the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done { .. } | StreamEvent::Error { .. })
    }
}

/// Body of the identification request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentifyRequest {
    /// Base64-encoded image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Base64-encoded audio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
}

impl IdentifyRequest {
    /// Build a request from raw capture bytes
    pub fn from_bytes(image: Option<&[u8]>, audio: Option<&[u8]>) -> ClientResult<Self> {
        if image.is_none() && audio.is_none() {
            return Err(ClientError::InvalidRequest {
                reason: "an image or an audio capture is required".to_string(),
            });
        }

        Ok(Self {
            image: image.map(|bytes| BASE64.encode(bytes)),
            audio: audio.map(|bytes| BASE64.encode(bytes)),
        })
    }

    /// Read capture files and build a request
    pub async fn from_files(image: Option<&Path>, audio: Option<&Path>) -> ClientResult<Self> {
        let image = match image {
            Some(path) => Some(read_capture(path).await?),
            None => None,
        };
        let audio = match audio {
            Some(path) => Some(read_capture(path).await?),
            None => None,
        };

        Self::from_bytes(image.as_deref(), audio.as_deref())
    }
}

async fn read_capture(path: &Path) -> ClientResult<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|e| ClientError::InvalidRequest {
            reason: format!("cannot read {}: {}", path.display(), e),
        })
}

/// Item handed to the history store before normalization
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryItem {
    pub id: String,
    pub name: String,
    /// Preferred label; falls back to `name` when missing or blank
    pub display_name: Option<String>,
    pub thumbnail: Option<String>,
}

impl From<&CandidateRecord> for HistoryItem {
    fn from(candidate: &CandidateRecord) -> Self {
        Self {
            id: candidate.scientific_name.clone(),
            name: candidate.scientific_name.clone(),
            display_name: Some(candidate.name.clone()),
            thumbnail: candidate.photo_url().map(str::to_string),
        }
    }
}

/// Persisted search history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHistoryEntry {
    pub id: String,
    pub name: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl SearchHistoryEntry {
    /// Normalize an item, stamping it with the current time
    pub fn from_item(item: HistoryItem) -> Self {
        let display_name = item
            .display_name
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| item.name.clone());

        Self {
            id: item.id,
            name: item.name,
            display_name,
            thumbnail: item.thumbnail,
            timestamp: Utc::now(),
        }
    }
}

/// Kind of feedback a user can send about a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    Like,
    IncorrectId,
    ContentError,
    Suggestion,
}

impl std::fmt::Display for FeedbackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Like => write!(f, "like"),
            Self::IncorrectId => write!(f, "incorrect_id"),
            Self::ContentError => write!(f, "content_error"),
            Self::Suggestion => write!(f, "suggestion"),
        }
    }
}

/// Review state of a feedback record; clients only ever create `new`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    New,
}

/// Structured feedback inserted into the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub scientific_name: String,
    pub feedback_type: FeedbackType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    pub app_metadata: Value,
    pub status: FeedbackStatus,
}

impl FeedbackRecord {
    /// Create a feedback record stamped with app metadata
    pub fn new(scientific_name: impl Into<String>, feedback_type: FeedbackType) -> Self {
        Self {
            user_id: None,
            scientific_name: scientific_name.into(),
            feedback_type,
            section_context: None,
            user_message: None,
            media_url: None,
            app_metadata: app_metadata(),
            status: FeedbackStatus::New,
        }
    }

    pub fn with_user_id(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section_context = Some(section.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.user_message = Some(message.into());
        self
    }

    pub fn with_media_url(mut self, url: impl Into<String>) -> Self {
        self.media_url = Some(url.into());
        self
    }
}

fn app_metadata() -> Value {
    serde_json::json!({
        "app_version": env!("CARGO_PKG_VERSION"),
        "platform": std::env::consts::OS,
        "submitted_at": Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, scientific: &str) -> CandidateRecord {
        CandidateRecord {
            name: name.to_string(),
            scientific_name: scientific.to_string(),
            confidence: 0.9,
            rarity: "Common".to_string(),
            fact: "Sings at dawn".to_string(),
            media: None,
            metadata: None,
        }
    }

    #[test]
    fn test_stream_event_tags() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"type":"progress","message":"Analyzing"}"#).unwrap();
        assert_eq!(
            event,
            StreamEvent::Progress {
                message: "Analyzing".to_string()
            }
        );
        assert!(!event.is_terminal());

        let event: StreamEvent = serde_json::from_str(r#"{"type":"done","duration":123}"#).unwrap();
        assert_eq!(event, StreamEvent::Done { duration: 123 });
        assert!(event.is_terminal());
        assert_eq!(event.kind(), "done");
    }

    #[test]
    fn test_unknown_event_type_rejected() {
        let result = serde_json::from_str::<StreamEvent>(r#"{"type":"telemetry","x":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_candidate_defaults_for_missing_scalars() {
        let record: CandidateRecord =
            serde_json::from_str(r#"{"name":"Robin","scientific_name":"Erithacus rubecula"}"#)
                .unwrap();
        assert_eq!(record.rarity, "");
        assert!(record.media.is_none());
    }

    #[test]
    fn test_media_merge_keeps_existing_fields() {
        let mut record = candidate("Robin", "Erithacus rubecula");
        record.merge_media(BirdMedia {
            photo: Some(Photo {
                url: "https://img/robin.jpg".to_string(),
                attribution: None,
                license: None,
            }),
            ..Default::default()
        });
        record.merge_media(BirdMedia {
            sounds: Some(vec![Sound {
                url: "https://snd/robin.mp3".to_string(),
                recordist: None,
                location: None,
                kind: Some("song".to_string()),
            }]),
            ..Default::default()
        });

        let media = record.media.as_ref().unwrap();
        assert_eq!(record.photo_url(), Some("https://img/robin.jpg"));
        assert_eq!(media.sounds.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_metadata_merge_overwrites() {
        let mut record = candidate("Robin", "Erithacus rubecula");
        let mut first = Metadata::new();
        first.insert("habitat".to_string(), Value::from("woodland"));
        first.insert("diet".to_string(), Value::from("insects"));
        record.merge_metadata(first);

        let mut second = Metadata::new();
        second.insert("habitat".to_string(), Value::from("gardens"));
        record.merge_metadata(second);

        let metadata = record.metadata.unwrap();
        assert_eq!(metadata["habitat"], "gardens");
        assert_eq!(metadata["diet"], "insects");
    }

    #[test]
    fn test_absent_media_fields_omitted() {
        let json = serde_json::to_value(BirdMedia::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn test_identify_request_requires_capture() {
        assert!(IdentifyRequest::from_bytes(None, None).is_err());

        let request = IdentifyRequest::from_bytes(Some(b"abc"), None).unwrap();
        assert_eq!(request.image.as_deref(), Some("YWJj"));
        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("audio").is_none());
    }

    #[test]
    fn test_history_display_name_fallback() {
        let entry = SearchHistoryEntry::from_item(HistoryItem {
            id: "1".to_string(),
            name: "Turdus merula".to_string(),
            display_name: Some("  ".to_string()),
            thumbnail: None,
        });
        assert_eq!(entry.display_name, "Turdus merula");

        let from_candidate = HistoryItem::from(&candidate("Robin", "Erithacus rubecula"));
        assert_eq!(from_candidate.id, "Erithacus rubecula");
        assert_eq!(from_candidate.display_name.as_deref(), Some("Robin"));
    }

    #[test]
    fn test_feedback_record_wire_shape() {
        let record = FeedbackRecord::new("Erithacus rubecula", FeedbackType::IncorrectId)
            .with_message("Looks like a chat");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["feedback_type"], "incorrect_id");
        assert_eq!(json["status"], "new");
        assert_eq!(json["user_message"], "Looks like a chat");
        assert!(json.get("user_id").is_none());
        assert!(json["app_metadata"]["app_version"].is_string());
    }
}
