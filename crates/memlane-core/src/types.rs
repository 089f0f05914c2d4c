//! Request and result types exchanged with the assistant.

use crate::collaborators::AudioInput;
use memlane_memory::{IndexHealth, MemoryKind, MemoryRecord};
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

/// Result of storing a memory from user input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestOutcome {
    pub success: bool,
    pub memory_id: Option<Uuid>,
    pub kind: MemoryKind,
    /// Stored content; the transcript for voice notes.
    pub content: Option<String>,
    /// Transcriber confidence for voice notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Reason the input was not stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestOutcome {
    pub(crate) fn stored(memory_id: Uuid, kind: MemoryKind, content: String) -> Self {
        Self {
            success: true,
            memory_id: Some(memory_id),
            kind,
            content: Some(content),
            confidence: None,
            error: None,
        }
    }

    pub(crate) fn failed(kind: MemoryKind, error: impl Into<String>) -> Self {
        Self {
            success: false,
            memory_id: None,
            kind,
            content: None,
            confidence: None,
            error: Some(error.into()),
        }
    }
}

/// Answer to a question over stored memories.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub success: bool,
    pub question: String,
    pub answer: String,
    /// Memories placed in the generation context.
    pub memories_used: usize,
    /// Top context records, best first.
    pub context: Vec<MemoryRecord>,
    /// Whether a generator phrased the answer.
    pub generated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Answer {
    pub(crate) fn failed(question: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            question: question.to_string(),
            answer: String::new(),
            memories_used: 0,
            context: Vec::new(),
            generated: false,
            error: Some(error.into()),
        }
    }
}

/// A scheduled reminder and its searchable memory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReminderOutcome {
    pub reminder_id: Uuid,
    pub memory_id: Uuid,
    pub title: String,
    pub description: String,
    pub scheduled_time: String,
}

/// Input accepted by [`crate::Assistant::process`].
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Text(String),
    Audio(AudioInput),
    Image {
        path: PathBuf,
        description: Option<String>,
    },
}

/// Result of [`crate::Assistant::process`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ProcessOutcome {
    Stored(IngestOutcome),
    Answered(Answer),
    Scheduled(ReminderOutcome),
}

/// Snapshot of assistant state and wiring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssistantStatus {
    pub memory_count: usize,
    pub active_reminders: usize,
    /// Collaborator labels; `None` when not configured.
    pub generator: Option<String>,
    pub transcriber: Option<String>,
    pub vision: Option<String>,
    pub embedding_model: String,
    pub index_health: IndexHealth,
}
