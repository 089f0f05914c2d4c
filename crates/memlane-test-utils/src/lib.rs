//! Test helpers shared across memlane crates.

pub mod embedding;
pub mod llm;
pub mod memory;

pub use embedding::{FailingEmbedder, VocabularyEmbedder};
pub use llm::{FailingLLM, FixedChatResponse, FixedLLM};
pub use memory::{StubMemory, memory_record};
