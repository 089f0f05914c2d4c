//! Memory and reminder records stored by the memory store.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Open string-keyed metadata carried by each memory.
pub type Metadata = serde_json::Map<String, Value>;

/// Metadata keys inspected by ranking, ingestion and statistics.
///
/// Any other key is stored and returned untouched.
pub mod keys {
    pub const TYPE: &str = "type";
    pub const SOURCE: &str = "source";
    pub const TIMESTAMP: &str = "timestamp";
    pub const TRANSCRIBED: &str = "transcribed";
    pub const CONFIDENCE: &str = "confidence";
    pub const IMAGE_PATH: &str = "image_path";
    pub const PEOPLE_COUNT: &str = "people_count";
    pub const LOCATION: &str = "location";
    pub const ACTIVITY: &str = "activity";
    pub const VISION_MODEL: &str = "vision_model";
    pub const TITLE: &str = "title";
    pub const SCHEDULED_TIME: &str = "scheduled_time";
    pub const REMINDER_ID: &str = "reminder_id";
}

/// Recognized values of the `type` metadata key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    Photo,
    VoiceNote,
    TextNote,
    Note,
    Reminder,
    General,
}

impl MemoryKind {
    /// Metadata string for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            MemoryKind::Photo => "photo",
            MemoryKind::VoiceNote => "voice_note",
            MemoryKind::TextNote => "text_note",
            MemoryKind::Note => "note",
            MemoryKind::Reminder => "reminder",
            MemoryKind::General => "general",
        }
    }

    /// Parse a metadata string, ignoring case and surrounding whitespace.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "photo" => Some(MemoryKind::Photo),
            "voice_note" => Some(MemoryKind::VoiceNote),
            "text_note" => Some(MemoryKind::TextNote),
            "note" => Some(MemoryKind::Note),
            "reminder" => Some(MemoryKind::Reminder),
            "general" => Some(MemoryKind::General),
            _ => None,
        }
    }
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted memory record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryRecord {
    /// Record identifier.
    pub id: Uuid,
    /// Record content.
    pub content: String,
    /// Creation timestamp.
    pub timestamp: DateTime<Utc>,
    /// Additional metadata for recall and filtering.
    pub metadata: Metadata,
    /// Slot of the record's vector in the vector index.
    pub vector_position: u64,
}

impl MemoryRecord {
    /// Raw `type` metadata value, if any.
    pub fn kind_label(&self) -> Option<&str> {
        self.metadata.get(keys::TYPE).and_then(Value::as_str)
    }

    /// Recognized memory kind.
    pub fn kind(&self) -> Option<MemoryKind> {
        self.kind_label().and_then(MemoryKind::parse)
    }

    /// Provenance label used in formatted context: `source`, else `type`.
    pub fn source_label(&self) -> Option<&str> {
        self.metadata
            .get(keys::SOURCE)
            .and_then(Value::as_str)
            .or_else(|| self.kind_label())
            .filter(|label| !label.is_empty())
    }

    /// Whether the record came from a transcribed voice note.
    pub fn is_voice_transcribed(&self) -> bool {
        if self.kind() == Some(MemoryKind::VoiceNote) {
            return true;
        }
        if self.metadata.get(keys::TRANSCRIBED).and_then(Value::as_bool) == Some(true) {
            return true;
        }
        self.metadata
            .get(keys::SOURCE)
            .and_then(Value::as_str)
            .is_some_and(|source| source.contains("voice_note"))
    }
}

/// Persisted reminder record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReminderRecord {
    /// Reminder identifier.
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// ISO-8601 or caller-defined schedule string.
    pub scheduled_time: String,
    pub created_at: DateTime<Utc>,
    /// False once the reminder has been deactivated.
    pub active: bool,
}

/// Search result with its scores.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchHit {
    pub record: MemoryRecord,
    /// Cosine similarity between query and record vectors.
    pub similarity_score: f32,
    /// Keyword overlap, present for hybrid results.
    pub keyword_score: Option<f32>,
    /// Score the result list is ordered by.
    pub combined_score: f32,
}

impl SearchHit {
    /// Plain vector hit.
    pub fn from_similarity(record: MemoryRecord, similarity_score: f32) -> Self {
        Self {
            record,
            similarity_score,
            keyword_score: None,
            combined_score: similarity_score,
        }
    }
}

/// Fixed-width RFC 3339 form, so lexical order matches chronological order.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored RFC 3339 timestamp.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|timestamp| timestamp.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::{MemoryKind, MemoryRecord, format_timestamp, parse_timestamp};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use uuid::Uuid;

    fn record(metadata: serde_json::Value) -> MemoryRecord {
        MemoryRecord {
            id: Uuid::new_v4(),
            content: "content".to_string(),
            timestamp: Utc::now(),
            metadata: metadata.as_object().cloned().unwrap_or_default(),
            vector_position: 0,
        }
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!(MemoryKind::parse(" Voice_Note "), Some(MemoryKind::VoiceNote));
        assert_eq!(MemoryKind::parse("unknown"), None);
        assert_eq!(MemoryKind::TextNote.to_string(), "text_note");
    }

    #[test]
    fn source_label_prefers_source_over_type() {
        assert_eq!(
            record(json!({"type": "photo", "source": "camera"})).source_label(),
            Some("camera")
        );
        assert_eq!(record(json!({"type": "photo"})).source_label(), Some("photo"));
        assert_eq!(record(json!({})).source_label(), None);
    }

    #[test]
    fn voice_detection_covers_type_flag_and_source() {
        assert!(record(json!({"type": "voice_note"})).is_voice_transcribed());
        assert!(record(json!({"transcribed": true})).is_voice_transcribed());
        assert!(record(json!({"source": "voice_note_upload"})).is_voice_transcribed());
        assert!(!record(json!({"type": "text_note", "transcribed": false})).is_voice_transcribed());
    }

    #[test]
    fn timestamps_are_fixed_width_and_parse_back() {
        let early = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let late = early + chrono::Duration::microseconds(1);
        let early_text = format_timestamp(&early);
        let late_text = format_timestamp(&late);
        assert_eq!(early_text, "2024-01-02T03:04:05.000000Z");
        assert!(early_text < late_text);
        assert_eq!(parse_timestamp(&late_text), Some(late));
    }
}
