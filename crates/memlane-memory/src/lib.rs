//! Personal memory store: embeddings, a positional vector index and a
//! relational metadata store kept in step with each other.

pub mod embedding;
pub mod error;
pub mod index;
pub mod metadata;
pub mod model;
pub mod provider;
pub mod ranking;
pub mod snapshot;
pub mod stats;
pub mod store;

/// Embedding interface and built-in embedders.
#[cfg(feature = "fastembed")]
pub use embedding::FastEmbedder;
pub use embedding::{Embedder, HashEmbedder};
/// Memory error type.
pub use error::MemoryError;
/// Vector index interface and flat implementation.
pub use index::{FlatIndex, VectorIndex};
/// Record models.
pub use model::{MemoryKind, MemoryRecord, Metadata, ReminderRecord, SearchHit};
/// Read capabilities used by question answering.
pub use provider::{HybridSearch, MemoryProvider};
/// Context assembly for question answering.
pub use ranking::{ContextEntry, ContextPolicy};
/// Snapshot documents and summaries.
pub use snapshot::{ExportSummary, ImportSummary, Snapshot};
/// Statistics and health.
pub use stats::{IndexHealth, RebuildSummary, StoreStatistics};
/// Memory store orchestrator.
pub use store::{MemoryStore, StoreOptions};
