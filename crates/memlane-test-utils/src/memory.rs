use chrono::{DateTime, Utc};
use memlane_memory::{HybridSearch, MemoryError, MemoryProvider, MemoryRecord, SearchHit};
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

/// Build a record with the given metadata object and timestamp.
pub fn memory_record(
    content: &str,
    metadata: serde_json::Value,
    timestamp: DateTime<Utc>,
) -> MemoryRecord {
    MemoryRecord {
        id: Uuid::new_v4(),
        content: content.to_string(),
        timestamp,
        metadata: metadata.as_object().cloned().unwrap_or_default(),
        vector_position: 0,
    }
}

/// Canned search results; records the keyword weight of each hybrid call.
#[derive(Clone, Default)]
pub struct StubMemory {
    hits: Vec<SearchHit>,
    recent: Vec<MemoryRecord>,
    pub keyword_weights: Arc<Mutex<Vec<f32>>>,
}

impl StubMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hits(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            ..Self::default()
        }
    }

    pub fn with_recent(mut self, recent: Vec<MemoryRecord>) -> Self {
        self.recent = recent;
        self
    }
}

impl MemoryProvider for StubMemory {
    fn search_memories(
        &self,
        _query: &str,
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<SearchHit>, MemoryError> {
        Ok(self
            .hits
            .iter()
            .filter(|hit| hit.similarity_score >= threshold)
            .take(limit)
            .cloned()
            .collect())
    }

    fn recent_memories(&self, limit: usize) -> Result<Vec<MemoryRecord>, MemoryError> {
        Ok(self.recent.iter().take(limit).cloned().collect())
    }
}

impl HybridSearch for StubMemory {
    fn hybrid_search(
        &self,
        _query: &str,
        limit: usize,
        keyword_weight: f32,
    ) -> Result<Vec<SearchHit>, MemoryError> {
        self.keyword_weights.lock().push(keyword_weight);
        Ok(self.hits.iter().take(limit).cloned().collect())
    }
}
