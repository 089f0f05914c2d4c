//! SQLite-backed metadata store for memories and reminders.

use crate::error::MemoryError;
use crate::model::{
    Metadata, MemoryRecord, ReminderRecord, format_timestamp, keys, parse_timestamp,
};
use log::info;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    metadata TEXT NOT NULL,
    vector_position INTEGER NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS reminders (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    scheduled_time TEXT NOT NULL,
    created_at TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1
);
CREATE TABLE IF NOT EXISTS store_meta (
    key TEXT PRIMARY KEY,
    value INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_memories_timestamp ON memories(timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_memories_vector_position ON memories(vector_position);
CREATE INDEX IF NOT EXISTS idx_reminders_active ON reminders(active);
";

const MEMORY_COLUMNS: &str = "id, content, timestamp, metadata, vector_position";
const REMINDER_COLUMNS: &str = "id, title, description, scheduled_time, created_at, active";

const INDEX_GENERATION_KEY: &str = "index_generation";

/// Type label counted for memories without a `type` key.
pub const UNKNOWN_TYPE: &str = "unknown";

/// Relational store for memory and reminder records.
///
/// One connection serialized behind a mutex; every write is a single
/// statement or transaction.
pub struct MetadataStore {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for MetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

struct RawMemory {
    id: String,
    content: String,
    timestamp: String,
    metadata: String,
    vector_position: i64,
}

impl RawMemory {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            content: row.get(1)?,
            timestamp: row.get(2)?,
            metadata: row.get(3)?,
            vector_position: row.get(4)?,
        })
    }

    fn into_record(self) -> Result<MemoryRecord, MemoryError> {
        Ok(MemoryRecord {
            id: parse_id(&self.id)?,
            content: self.content,
            timestamp: parse_stored_time(&self.timestamp)?,
            metadata: serde_json::from_str(&self.metadata)?,
            vector_position: to_position(self.vector_position)?,
        })
    }
}

struct RawReminder {
    id: String,
    title: String,
    description: String,
    scheduled_time: String,
    created_at: String,
    active: bool,
}

impl RawReminder {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            scheduled_time: row.get(3)?,
            created_at: row.get(4)?,
            active: row.get(5)?,
        })
    }

    fn into_record(self) -> Result<ReminderRecord, MemoryError> {
        Ok(ReminderRecord {
            id: parse_id(&self.id)?,
            title: self.title,
            description: self.description,
            scheduled_time: self.scheduled_time,
            created_at: parse_stored_time(&self.created_at)?,
            active: self.active,
        })
    }
}

fn parse_id(value: &str) -> Result<Uuid, MemoryError> {
    Uuid::parse_str(value)
        .map_err(|err| MemoryError::Corrupted(format!("invalid stored id {value}: {err}")))
}

fn parse_stored_time(value: &str) -> Result<chrono::DateTime<chrono::Utc>, MemoryError> {
    parse_timestamp(value)
        .ok_or_else(|| MemoryError::Corrupted(format!("invalid stored timestamp {value}")))
}

fn to_position(value: i64) -> Result<u64, MemoryError> {
    u64::try_from(value)
        .map_err(|_| MemoryError::Corrupted(format!("negative vector position {value}")))
}

fn from_position(position: u64) -> Result<i64, MemoryError> {
    i64::try_from(position)
        .map_err(|_| MemoryError::Validation(format!("vector position {position} out of range")))
}

fn sql_limit(limit: Option<usize>) -> i64 {
    limit
        .and_then(|limit| i64::try_from(limit).ok())
        .unwrap_or(-1)
}

impl MetadataStore {
    /// Open or create the database file and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        conn.execute_batch(SCHEMA)?;
        info!("opened metadata store (path={})", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Database file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Database file size in bytes.
    pub fn file_size(&self) -> u64 {
        std::fs::metadata(&self.path)
            .map(|meta| meta.len())
            .unwrap_or(0)
    }

    /// Insert a memory row; id or position collisions fail with `DuplicateKey`.
    pub fn insert_memory(&self, record: &MemoryRecord) -> Result<(), MemoryError> {
        let metadata = serde_json::to_string(&record.metadata)?;
        let position = from_position(record.vector_position)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO memories (id, content, timestamp, metadata, vector_position)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id.to_string(),
                record.content,
                format_timestamp(&record.timestamp),
                metadata,
                position
            ],
        )
        .map_err(|err| {
            MemoryError::from_insert(
                err,
                &format!(
                    "memory id={} or vector_position={}",
                    record.id, record.vector_position
                ),
            )
        })?;
        Ok(())
    }

    /// Insert a reminder row.
    pub fn insert_reminder(&self, record: &ReminderRecord) -> Result<(), MemoryError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO reminders (id, title, description, scheduled_time, created_at, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id.to_string(),
                record.title,
                record.description,
                record.scheduled_time,
                format_timestamp(&record.created_at),
                record.active
            ],
        )
        .map_err(|err| MemoryError::from_insert(err, &format!("reminder id={}", record.id)))?;
        Ok(())
    }

    pub fn get_memory(&self, id: Uuid) -> Result<Option<MemoryRecord>, MemoryError> {
        let raw = {
            let conn = self.conn.lock();
            conn.query_row(
                &format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE id = ?1"),
                params![id.to_string()],
                RawMemory::from_row,
            )
            .optional()?
        };
        raw.map(RawMemory::into_record).transpose()
    }

    pub fn get_by_position(&self, position: u64) -> Result<Option<MemoryRecord>, MemoryError> {
        let position = from_position(position)?;
        let raw = {
            let conn = self.conn.lock();
            conn.query_row(
                &format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE vector_position = ?1"),
                params![position],
                RawMemory::from_row,
            )
            .optional()?
        };
        raw.map(RawMemory::into_record).transpose()
    }

    /// Memories newest first; ties broken by descending position.
    pub fn list_memories(&self, limit: Option<usize>) -> Result<Vec<MemoryRecord>, MemoryError> {
        self.query_memories(
            &format!(
                "SELECT {MEMORY_COLUMNS} FROM memories
                 ORDER BY timestamp DESC, vector_position DESC LIMIT ?1"
            ),
            sql_limit(limit),
        )
    }

    /// Memories in ascending position order.
    pub fn memories_by_position(&self) -> Result<Vec<MemoryRecord>, MemoryError> {
        self.query_memories(
            &format!("SELECT {MEMORY_COLUMNS} FROM memories ORDER BY vector_position ASC LIMIT ?1"),
            -1,
        )
    }

    fn query_memories(&self, sql: &str, limit: i64) -> Result<Vec<MemoryRecord>, MemoryError> {
        let raws = {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt.query_map(params![limit], RawMemory::from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        raws.into_iter().map(RawMemory::into_record).collect()
    }

    /// Active reminders by ascending scheduled time.
    pub fn list_active_reminders(&self) -> Result<Vec<ReminderRecord>, MemoryError> {
        self.query_reminders(&format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders WHERE active = 1
             ORDER BY scheduled_time ASC, created_at ASC"
        ))
    }

    /// All reminders, active or not, by creation time.
    pub fn list_reminders(&self) -> Result<Vec<ReminderRecord>, MemoryError> {
        self.query_reminders(&format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders ORDER BY created_at ASC"
        ))
    }

    fn query_reminders(&self, sql: &str) -> Result<Vec<ReminderRecord>, MemoryError> {
        let raws = {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt.query_map([], RawReminder::from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        raws.into_iter().map(RawReminder::into_record).collect()
    }

    /// Update content and/or replace metadata in one transaction.
    ///
    /// Returns false when the id is unknown.
    pub fn update_memory(
        &self,
        id: Uuid,
        content: Option<&str>,
        metadata: Option<&Metadata>,
    ) -> Result<bool, MemoryError> {
        let metadata = metadata.map(serde_json::to_string).transpose()?;
        let id = id.to_string();
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut changed = 0;
        if let Some(content) = content {
            changed = tx.execute(
                "UPDATE memories SET content = ?1 WHERE id = ?2",
                params![content, id],
            )?;
        }
        if let Some(metadata) = metadata {
            changed = tx.execute(
                "UPDATE memories SET metadata = ?1 WHERE id = ?2",
                params![metadata, id],
            )?;
        }
        if changed == 0 {
            let exists: Option<i64> = tx
                .query_row("SELECT 1 FROM memories WHERE id = ?1", params![id], |row| {
                    row.get(0)
                })
                .optional()?;
            tx.commit()?;
            return Ok(exists.is_some());
        }
        tx.commit()?;
        Ok(true)
    }

    /// Delete a memory row; true iff a row was removed.
    pub fn delete_memory(&self, id: Uuid) -> Result<bool, MemoryError> {
        let conn = self.conn.lock();
        let removed = conn.execute(
            "DELETE FROM memories WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(removed > 0)
    }

    /// Flip an active reminder to inactive; true iff one was flipped.
    pub fn deactivate_reminder(&self, id: Uuid) -> Result<bool, MemoryError> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE reminders SET active = 0 WHERE id = ?1 AND active = 1",
            params![id.to_string()],
        )?;
        Ok(changed > 0)
    }

    /// Newest-first scan for records whose metadata contains every
    /// key/value pair of `filter`.
    ///
    /// At most `scan_cap` rows are inspected and the scan stops after
    /// `limit` matches.
    pub fn filter_by_metadata(
        &self,
        filter: &Metadata,
        limit: usize,
        scan_cap: usize,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let candidates = self.list_memories(Some(scan_cap))?;
        Ok(candidates
            .into_iter()
            .filter(|record| {
                filter
                    .iter()
                    .all(|(key, value)| record.metadata.get(key) == Some(value))
            })
            .take(limit)
            .collect())
    }

    /// Highest assigned vector position, if any row exists.
    pub fn max_vector_position(&self) -> Result<Option<u64>, MemoryError> {
        let max: Option<i64> = {
            let conn = self.conn.lock();
            conn.query_row("SELECT MAX(vector_position) FROM memories", [], |row| {
                row.get(0)
            })?
        };
        max.map(to_position).transpose()
    }

    pub fn count_memories(&self) -> Result<usize, MemoryError> {
        self.count("SELECT COUNT(*) FROM memories")
    }

    pub fn count_active_reminders(&self) -> Result<usize, MemoryError> {
        self.count("SELECT COUNT(*) FROM reminders WHERE active = 1")
    }

    fn count(&self, sql: &str) -> Result<usize, MemoryError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Per-type counts over every memory row.
    pub fn type_histogram(&self) -> Result<BTreeMap<String, usize>, MemoryError> {
        let blobs = {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare("SELECT metadata FROM memories")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        let mut histogram = BTreeMap::new();
        for blob in blobs {
            let metadata: Metadata = serde_json::from_str(&blob)?;
            let label = metadata
                .get(keys::TYPE)
                .and_then(serde_json::Value::as_str)
                .unwrap_or(UNKNOWN_TYPE)
                .to_string();
            *histogram.entry(label).or_insert(0) += 1;
        }
        Ok(histogram)
    }

    /// Generation of the vector index these positions belong to.
    ///
    /// Zero until the first rebuild.
    pub fn index_generation(&self) -> Result<u64, MemoryError> {
        let value: Option<i64> = {
            let conn = self.conn.lock();
            conn.query_row(
                "SELECT value FROM store_meta WHERE key = ?1",
                params![INDEX_GENERATION_KEY],
                |row| row.get(0),
            )
            .optional()?
        };
        value.map_or(Ok(0), to_position)
    }

    /// Move rows to new positions and record `generation` in one transaction.
    ///
    /// Assignments are applied in ascending target order; callers compact
    /// positions downward so targets are always free when written.
    pub fn reassign_positions(
        &self,
        assignments: &[(Uuid, u64)],
        generation: u64,
    ) -> Result<(), MemoryError> {
        let mut ordered = assignments.to_vec();
        ordered.sort_by_key(|(_, position)| *position);
        let generation = from_position(generation)?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare("UPDATE memories SET vector_position = ?1 WHERE id = ?2")?;
            for (id, position) in &ordered {
                stmt.execute(params![from_position(*position)?, id.to_string()])
                    .map_err(|err| {
                        MemoryError::from_insert(err, &format!("vector_position={position}"))
                    })?;
            }
        }
        tx.execute(
            "INSERT INTO store_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![INDEX_GENERATION_KEY, generation],
        )?;
        tx.commit()?;
        Ok(())
    }
}
