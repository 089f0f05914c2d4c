//! External capabilities the assistant delegates to.
//!
//! Each collaborator is optional; the assistant degrades to local behavior
//! when one is absent or fails.

use crate::error::CoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Produces answer text from a system and a user prompt.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Backend label reported in status.
    fn name(&self) -> &str;

    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, CoreError>;
}

/// Audio handed to a transcriber.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioInput {
    /// Audio file on disk.
    Path(PathBuf),
    /// Encoded audio held in memory.
    Bytes(Vec<u8>),
}

/// Transcriber result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub success: bool,
    pub text: String,
    pub confidence: f32,
}

/// Speech-to-text capability.
#[async_trait]
pub trait Transcriber: Send + Sync {
    fn name(&self) -> &str;

    async fn transcribe(&self, audio: AudioInput) -> Result<Transcription, CoreError>;
}

/// Structured description of a photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysis {
    pub description: String,
    pub people_detected: u32,
    pub location: String,
    pub activity: String,
    /// Model that produced the analysis.
    pub model: String,
}

/// Image understanding capability.
#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    fn name(&self) -> &str;

    async fn analyze(&self, image: &Path) -> Result<ImageAnalysis, CoreError>;
}
