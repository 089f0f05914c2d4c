//! Memory assistant: ingestion, reminders and question answering over a
//! shared [`MemoryStore`].
//!
//! The store sits behind a read/write lock so concurrent questions share it
//! while writes are serialized. Locks are never held across collaborator
//! calls.

mod builder;
pub mod memory;
pub mod prompt;

pub use builder::AssistantBuilder;

use crate::collaborators::{AudioInput, Generator, Transcriber, VisionAnalyzer};
use crate::error::CoreError;
use crate::intent::{Intent, ReminderDraft, classify};
use crate::rate_limit::RateLimiter;
use crate::types::{
    Answer, AssistantStatus, IngestOutcome, Input, ProcessOutcome, ReminderOutcome,
};
use chrono::{Duration, Utc};
use log::{debug, info, warn};
use memlane_config::MemlaneConfig;
use memlane_memory::model::{format_timestamp, keys};
use memlane_memory::ranking::{assemble_context, format_context};
use memlane_memory::{ContextPolicy, MemoryKind, MemoryStore, Metadata, ReminderRecord};
use parking_lot::RwLock;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

const DEFAULT_PHOTO_DESCRIPTION: &str = "Family photo";
const MANUAL_ENTRY_HINT: &str = "please enter the note manually";

/// Personal memory assistant.
pub struct Assistant {
    config: MemlaneConfig,
    store: RwLock<MemoryStore>,
    policy: ContextPolicy,
    generator: Option<Arc<dyn Generator>>,
    transcriber: Option<Arc<dyn Transcriber>>,
    vision: Option<Arc<dyn VisionAnalyzer>>,
    limiter: RateLimiter,
}

impl std::fmt::Debug for Assistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant")
            .field("policy", &self.policy)
            .field("generator", &self.generator.as_ref().map(|g| g.name().to_string()))
            .field(
                "transcriber",
                &self.transcriber.as_ref().map(|t| t.name().to_string()),
            )
            .field("vision", &self.vision.as_ref().map(|v| v.name().to_string()))
            .finish()
    }
}

impl Assistant {
    /// Open an assistant with everything derived from config.
    pub fn open(config: MemlaneConfig) -> Result<Self, CoreError> {
        AssistantBuilder::new(config).build()
    }

    pub fn builder(config: MemlaneConfig) -> AssistantBuilder {
        AssistantBuilder::new(config)
    }

    pub fn config(&self) -> &MemlaneConfig {
        &self.config
    }

    /// Scoped shared access to the store.
    pub fn with_store<R>(&self, f: impl FnOnce(&MemoryStore) -> R) -> R {
        let store = self.store.read();
        f(&store)
    }

    /// Scoped exclusive access to the store.
    pub fn with_store_mut<R>(&self, f: impl FnOnce(&mut MemoryStore) -> R) -> R {
        let mut store = self.store.write();
        f(&mut store)
    }

    /// Store a memory of `kind`; `type` and `timestamp` metadata are added
    /// when absent.
    pub fn remember_text(
        &self,
        content: &str,
        kind: MemoryKind,
        mut metadata: Metadata,
    ) -> Result<IngestOutcome, CoreError> {
        let content = content.trim();
        if content.is_empty() {
            return Ok(IngestOutcome::failed(
                kind,
                "no content provided for memory storage",
            ));
        }
        metadata
            .entry(keys::TYPE)
            .or_insert_with(|| Value::from(kind.as_str()));
        metadata
            .entry(keys::TIMESTAMP)
            .or_insert_with(|| Value::from(format_timestamp(&Utc::now())));

        let id = self.store.write().store_memory(content, metadata)?;
        info!(
            "stored memory (id={}, kind={}, content_len={})",
            id,
            kind,
            content.len()
        );
        Ok(IngestOutcome::stored(id, kind, content.to_string()))
    }

    /// Transcribe audio and store the transcript as a voice note.
    pub async fn remember_voice(&self, audio: AudioInput) -> Result<IngestOutcome, CoreError> {
        let kind = MemoryKind::VoiceNote;
        let Some(transcriber) = self.transcriber.as_ref() else {
            return Ok(IngestOutcome::failed(
                kind,
                format!("speech transcription is unavailable; {MANUAL_ENTRY_HINT}"),
            ));
        };
        let transcription = match transcriber.transcribe(audio).await {
            Ok(transcription) => transcription,
            Err(err) => {
                warn!(
                    "transcription failed (transcriber={}, error={})",
                    transcriber.name(),
                    err
                );
                return Ok(IngestOutcome::failed(
                    kind,
                    format!("transcription failed; {MANUAL_ENTRY_HINT}"),
                ));
            }
        };
        if !transcription.success || transcription.text.trim().is_empty() {
            debug!(
                "transcription produced no text (transcriber={})",
                transcriber.name()
            );
            return Ok(IngestOutcome::failed(
                kind,
                format!("no speech was recognized; {MANUAL_ENTRY_HINT}"),
            ));
        }

        let mut metadata = Metadata::new();
        metadata.insert(keys::TRANSCRIBED.to_string(), Value::Bool(true));
        metadata.insert(
            keys::CONFIDENCE.to_string(),
            Value::from(f64::from(transcription.confidence)),
        );
        let mut outcome = self.remember_text(&transcription.text, kind, metadata)?;
        outcome.confidence = Some(transcription.confidence);
        Ok(outcome)
    }

    /// Analyze a photo and store the description with its analysis.
    pub async fn remember_photo(
        &self,
        image: &Path,
        description: Option<&str>,
    ) -> Result<IngestOutcome, CoreError> {
        let kind = MemoryKind::Photo;
        let Some(vision) = self.vision.as_ref() else {
            return Ok(IngestOutcome::failed(kind, "image analysis is unavailable"));
        };
        let analysis = match vision.analyze(image).await {
            Ok(analysis) => analysis,
            Err(err) => {
                warn!(
                    "image analysis failed (vision={}, path={}, error={})",
                    vision.name(),
                    image.display(),
                    err
                );
                return Ok(IngestOutcome::failed(
                    kind,
                    format!("image analysis failed: {err}"),
                ));
            }
        };

        let description = description
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .unwrap_or(DEFAULT_PHOTO_DESCRIPTION);
        let content = format!(
            "Photo: {description}\n\nAnalysis: {}\nPeople detected: {}\nLocation: {}\nActivity: {}",
            analysis.description, analysis.people_detected, analysis.location, analysis.activity
        );
        let mut metadata = Metadata::new();
        metadata.insert(
            keys::IMAGE_PATH.to_string(),
            Value::from(image.display().to_string()),
        );
        metadata.insert(
            keys::PEOPLE_COUNT.to_string(),
            Value::from(analysis.people_detected),
        );
        metadata.insert(keys::LOCATION.to_string(), Value::from(analysis.location));
        metadata.insert(keys::ACTIVITY.to_string(), Value::from(analysis.activity));
        metadata.insert(keys::VISION_MODEL.to_string(), Value::from(analysis.model));
        self.remember_text(&content, kind, metadata)
    }

    /// Store an active reminder.
    pub fn add_reminder(
        &self,
        title: &str,
        description: &str,
        scheduled_time: &str,
    ) -> Result<Uuid, CoreError> {
        let id = self
            .store
            .write()
            .store_reminder(title, description, scheduled_time)?;
        info!("added reminder (id={}, scheduled_time={})", id, scheduled_time);
        Ok(id)
    }

    /// Active reminders, soonest first.
    pub fn reminders(&self) -> Result<Vec<ReminderRecord>, CoreError> {
        Ok(self.store.read().get_active_reminders()?)
    }

    /// Mark a reminder done; false when unknown or already done.
    pub fn complete_reminder(&self, id: Uuid) -> Result<bool, CoreError> {
        Ok(self.store.write().deactivate_reminder(id)?)
    }

    /// Turn a free-form request into a reminder plus a searchable memory.
    ///
    /// Without `scheduled_time` the reminder is due one hour from now.
    pub fn schedule_reminder(
        &self,
        text: &str,
        scheduled_time: Option<&str>,
    ) -> Result<ReminderOutcome, CoreError> {
        if text.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "no reminder text provided".to_string(),
            ));
        }
        let draft = ReminderDraft::from_text(text);
        let now = Utc::now();
        let scheduled_time = match scheduled_time {
            Some(time) => time.to_string(),
            None => format_timestamp(&(now + Duration::hours(1))),
        };

        let mut store = self.store.write();
        let reminder_id = store.store_reminder(&draft.title, &draft.description, &scheduled_time)?;
        let mut metadata = Metadata::new();
        metadata.insert(keys::TYPE.to_string(), Value::from(MemoryKind::Reminder.as_str()));
        metadata.insert(keys::TITLE.to_string(), Value::from(draft.title.clone()));
        metadata.insert(
            keys::SCHEDULED_TIME.to_string(),
            Value::from(scheduled_time.clone()),
        );
        metadata.insert(
            keys::REMINDER_ID.to_string(),
            Value::from(reminder_id.to_string()),
        );
        metadata.insert(keys::TIMESTAMP.to_string(), Value::from(format_timestamp(&now)));
        let memory_id = match store.store_memory(&draft.description, metadata) {
            Ok(id) => id,
            Err(err) => {
                if let Err(undo) = store.deactivate_reminder(reminder_id) {
                    warn!(
                        "failed to withdraw reminder without memory (reminder_id={}, error={})",
                        reminder_id, undo
                    );
                }
                return Err(err.into());
            }
        };
        info!(
            "scheduled reminder (reminder_id={}, memory_id={}, scheduled_time={})",
            reminder_id, memory_id, scheduled_time
        );
        Ok(ReminderOutcome {
            reminder_id,
            memory_id,
            title: draft.title,
            description: draft.description,
            scheduled_time,
        })
    }

    /// Answer a question from stored memories.
    ///
    /// Generator failures never surface to the caller; the answer falls back
    /// to quoting the retrieved context.
    pub async fn ask(&self, question: &str) -> Result<Answer, CoreError> {
        let question = question.trim();
        if question.is_empty() {
            return Ok(Answer::failed(question, "no question provided"));
        }

        let entries = {
            let store = self.store.read();
            assemble_context(&*store, question, &self.policy)?
        };
        let context_records = entries
            .iter()
            .take(self.config.qa.returned_context)
            .map(|entry| entry.record.clone())
            .collect::<Vec<_>>();
        info!(
            "answering question (question_len={}, memories={})",
            question.len(),
            entries.len()
        );

        if entries.is_empty() {
            return Ok(Answer {
                success: true,
                question: question.to_string(),
                answer: prompt::no_memories_answer(question),
                memories_used: 0,
                context: Vec::new(),
                generated: false,
                error: None,
            });
        }

        let context = format_context(&entries);
        let snippet_chars = self.config.qa.fallback_snippet_chars;
        let (answer, generated) = match self.generator.as_ref() {
            None => (prompt::local_answer(&context, snippet_chars), false),
            Some(generator) => {
                self.limiter.wait().await;
                let user_prompt = prompt::user_prompt(question, &context);
                match generator.generate(prompt::SYSTEM_PROMPT, &user_prompt).await {
                    Ok(text) if !text.trim().is_empty() => (text, true),
                    Ok(_) => {
                        debug!("generator returned empty text (generator={})", generator.name());
                        (prompt::local_answer(&context, snippet_chars), false)
                    }
                    Err(err) => {
                        warn!(
                            "answer generation failed (generator={}, error={})",
                            generator.name(),
                            err
                        );
                        (prompt::recovery_answer(&context, snippet_chars), false)
                    }
                }
            }
        };

        Ok(Answer {
            success: true,
            question: question.to_string(),
            answer,
            memories_used: entries.len(),
            context: context_records,
            generated,
            error: None,
        })
    }

    /// Route one input to ingestion, scheduling or answering.
    pub async fn process(&self, input: Input) -> Result<ProcessOutcome, CoreError> {
        match input {
            Input::Text(text) => {
                let intent = classify(&text);
                debug!("routing text input (intent={:?})", intent);
                match intent {
                    Intent::Question => Ok(ProcessOutcome::Answered(self.ask(&text).await?)),
                    Intent::Reminder => Ok(ProcessOutcome::Scheduled(
                        self.schedule_reminder(&text, None)?,
                    )),
                    Intent::Note => Ok(ProcessOutcome::Stored(self.remember_text(
                        &text,
                        MemoryKind::TextNote,
                        Metadata::new(),
                    )?)),
                }
            }
            Input::Audio(audio) => Ok(ProcessOutcome::Stored(self.remember_voice(audio).await?)),
            Input::Image { path, description } => Ok(ProcessOutcome::Stored(
                self.remember_photo(&path, description.as_deref()).await?,
            )),
        }
    }

    pub fn status(&self) -> Result<AssistantStatus, CoreError> {
        let store = self.store.read();
        let statistics = store.statistics()?;
        Ok(AssistantStatus {
            memory_count: statistics.total_memories,
            active_reminders: statistics.active_reminders,
            generator: self.generator.as_ref().map(|g| g.name().to_string()),
            transcriber: self.transcriber.as_ref().map(|t| t.name().to_string()),
            vision: self.vision.as_ref().map(|v| v.name().to_string()),
            embedding_model: statistics.embedding_model,
            index_health: store.health(),
        })
    }
}
