//! Read-side capabilities consumed by question answering.

use crate::error::MemoryError;
use crate::model::{MemoryRecord, SearchHit};

/// Similarity and recency lookup over stored memories.
pub trait MemoryProvider: Send + Sync {
    /// Up to `limit` hits with similarity at or above `threshold`.
    fn search_memories(
        &self,
        query: &str,
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<SearchHit>, MemoryError>;

    /// The `limit` most recent memories, newest first.
    fn recent_memories(&self, limit: usize) -> Result<Vec<MemoryRecord>, MemoryError>;
}

/// Providers that can blend vector similarity with keyword overlap.
pub trait HybridSearch: MemoryProvider {
    /// Up to `limit` hits ordered by combined score.
    fn hybrid_search(
        &self,
        query: &str,
        limit: usize,
        keyword_weight: f32,
    ) -> Result<Vec<SearchHit>, MemoryError>;
}
