//! Self-describing JSON snapshot of a store.

use crate::model::{Metadata, ReminderRecord};
use crate::stats::StoreStatistics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Memory entry as written to a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotMemory {
    pub id: Uuid,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Full export document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Newest first.
    pub memories: Vec<SnapshotMemory>,
    #[serde(default)]
    pub reminders: Vec<ReminderRecord>,
    pub exported_at: DateTime<Utc>,
    /// Informational; ignored on import.
    #[serde(default)]
    pub statistics: Option<StoreStatistics>,
}

/// Counts reported by an import.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub memories: usize,
    pub reminders: usize,
    /// Entries with empty content or inactive reminders.
    pub skipped: usize,
}

/// Counts reported by an export.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct ExportSummary {
    pub memories: usize,
    pub reminders: usize,
}
