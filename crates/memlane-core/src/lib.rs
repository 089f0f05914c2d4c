//! Assistant layer for memlane.
//!
//! This crate owns ingestion of text, voice and photo memories, reminder
//! scheduling, intent routing and question answering over a
//! `memlane-memory` store.

pub mod assistant;
pub mod collaborators;
pub mod error;
pub mod intent;
pub mod llm;
pub mod rate_limit;
pub mod types;

/// Assistant facade and builder.
pub use assistant::{Assistant, AssistantBuilder};
/// Collaborator interfaces.
pub use collaborators::{
    AudioInput, Generator, ImageAnalysis, Transcriber, Transcription, VisionAnalyzer,
};
pub use error::CoreError;
pub use intent::{Intent, ReminderDraft, classify};
pub use llm::{LlmGenerator, generator_from_config};
pub use rate_limit::RateLimiter;
pub use types::{Answer, AssistantStatus, IngestOutcome, Input, ProcessOutcome, ReminderOutcome};
