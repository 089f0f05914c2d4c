//! Store statistics and health reporting.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Agreement between the vector index and the metadata store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum IndexHealth {
    /// Every metadata row has a vector slot.
    Consistent,
    /// The index holds fewer vectors than metadata positions require.
    /// Writes are refused until the index is rebuilt.
    MissingVectors { expected: u64, actual: u64 },
    /// The index file predates the last position renumbering, so its slots
    /// point at the wrong rows. Searches and writes are refused until the
    /// index is rebuilt.
    StaleIndex {
        index_generation: u64,
        metadata_generation: u64,
    },
}

impl IndexHealth {
    pub fn is_consistent(&self) -> bool {
        matches!(self, IndexHealth::Consistent)
    }
}

/// Snapshot of store counts and sizes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreStatistics {
    pub total_memories: usize,
    pub active_reminders: usize,
    /// Occupied index slots, tombstones included.
    pub vector_count: usize,
    /// Index slots with no metadata row.
    pub tombstones: usize,
    pub next_position: u64,
    pub index_size_bytes: u64,
    pub db_size_bytes: u64,
    /// Memories per `type` value; untyped rows count as "unknown".
    pub memory_types: BTreeMap<String, usize>,
    pub embedding_model: String,
    pub embedding_dimension: usize,
}

/// Result of an index rebuild.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct RebuildSummary {
    pub vectors_before: usize,
    pub vectors_after: usize,
}
