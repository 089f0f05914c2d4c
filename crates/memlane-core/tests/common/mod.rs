//! Collaborator fakes and assistant setup shared by integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use memlane_config::MemlaneConfig;
use memlane_core::{
    Assistant, AssistantBuilder, AudioInput, CoreError, Generator, ImageAnalysis, Transcriber,
    Transcription, VisionAnalyzer,
};
use memlane_test_utils::VocabularyEmbedder;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// Config rooted at `dir` with every other setting at its default.
pub fn config_in(dir: &Path) -> MemlaneConfig {
    MemlaneConfig::builder()
        .data_dir(dir.to_string_lossy())
        .build()
}

/// Builder over the vocabulary embedder with no collaborators.
pub fn builder_in(dir: &Path) -> AssistantBuilder {
    Assistant::builder(config_in(dir)).embedder(Arc::new(VocabularyEmbedder::new()))
}

pub fn assistant_in(dir: &Path) -> Assistant {
    builder_in(dir).build().expect("assistant")
}

/// Generator that returns fixed text and records each prompt pair.
#[derive(Clone)]
pub struct FixedGenerator {
    text: String,
    pub prompts: Arc<Mutex<Vec<(String, String)>>>,
}

impl FixedGenerator {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Generator for FixedGenerator {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, CoreError> {
        self.prompts
            .lock()
            .push((system_prompt.to_string(), user_prompt.to_string()));
        Ok(self.text.clone())
    }
}

/// Generator whose calls fail with a provider-style message.
pub struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _system: &str, _user: &str) -> Result<String, CoreError> {
        Err(CoreError::Generation(
            "upstream 503: secret-token-abc".to_string(),
        ))
    }
}

/// Transcriber returning a canned transcription, or an error.
pub struct StubTranscriber {
    result: Result<Transcription, String>,
}

impl StubTranscriber {
    pub fn heard(text: &str, confidence: f32) -> Self {
        Self {
            result: Ok(Transcription {
                success: true,
                text: text.to_string(),
                confidence,
            }),
        }
    }

    pub fn silent() -> Self {
        Self {
            result: Ok(Transcription {
                success: false,
                text: String::new(),
                confidence: 0.0,
            }),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
        }
    }
}

#[async_trait]
impl Transcriber for StubTranscriber {
    fn name(&self) -> &str {
        "stub-asr"
    }

    async fn transcribe(&self, _audio: AudioInput) -> Result<Transcription, CoreError> {
        self.result.clone().map_err(CoreError::Transcription)
    }
}

/// Vision analyzer returning a canned analysis, or an error.
pub struct StubVision {
    result: Result<ImageAnalysis, String>,
}

impl StubVision {
    pub fn seeing(description: &str, people: u32, location: &str, activity: &str) -> Self {
        Self {
            result: Ok(ImageAnalysis {
                description: description.to_string(),
                people_detected: people,
                location: location.to_string(),
                activity: activity.to_string(),
                model: "stub-vision".to_string(),
            }),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
        }
    }
}

#[async_trait]
impl VisionAnalyzer for StubVision {
    fn name(&self) -> &str {
        "stub-vision"
    }

    async fn analyze(&self, _image: &Path) -> Result<ImageAnalysis, CoreError> {
        self.result.clone().map_err(CoreError::Vision)
    }
}
