//! Error types for the assistant crate.

use memlane_config::ConfigError;
use memlane_memory::MemoryError;
use thiserror::Error;

/// Errors returned by assistant operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Memory store error.
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),
    /// Config loading or validation error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// Answer generation failed.
    #[error("generation error: {0}")]
    Generation(String),
    /// Speech transcription failed.
    #[error("transcription error: {0}")]
    Transcription(String),
    /// Image analysis failed.
    #[error("vision error: {0}")]
    Vision(String),
    /// Caller supplied unusable input.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
