//! Memory store composing the embedder, vector index and metadata store.

use crate::embedding::{Embedder, normalize};
use crate::error::MemoryError;
use crate::index::{FlatIndex, VectorIndex};
use crate::metadata::MetadataStore;
use crate::model::{Metadata, MemoryRecord, ReminderRecord, SearchHit};
use crate::provider::{HybridSearch, MemoryProvider};
use crate::ranking::hybrid_rescore;
use crate::snapshot::{ExportSummary, ImportSummary, Snapshot, SnapshotMemory};
use crate::stats::{IndexHealth, RebuildSummary, StoreStatistics};
use chrono::Utc;
use log::{debug, info, warn};
use std::fs::OpenOptions;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Similarity floor for hybrid candidates before keyword rescoring.
const HYBRID_CANDIDATE_THRESHOLD: f32 = 0.0;

/// On-disk layout and write cadence of a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoreOptions {
    /// Directory holding the index and database files.
    pub data_dir: PathBuf,
    pub index_file: String,
    pub database_file: String,
    /// Persist the index after this many inserts.
    pub persist_every: usize,
    /// Metadata filters scan at most `limit * metadata_scan_factor` rows.
    pub metadata_scan_factor: usize,
}

impl StoreOptions {
    /// Default layout rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            index_file: "vectors.index".to_string(),
            database_file: "memories.db".to_string(),
            persist_every: 10,
            metadata_scan_factor: 10,
        }
    }

    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join(&self.index_file)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }
}

/// Hybrid vector and relational memory store.
///
/// Reads take `&self`; writes take `&mut self`, so a single owner (or a lock
/// around the store) serializes writers and keeps positions unique.
pub struct MemoryStore {
    options: StoreOptions,
    embedder: Arc<dyn Embedder>,
    index: Box<dyn VectorIndex>,
    metadata: MetadataStore,
    next_position: u64,
    inserts_since_persist: usize,
    /// Index holds changes not yet on disk.
    dirty: bool,
    health: IndexHealth,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("data_dir", &self.options.data_dir)
            .field("vectors", &self.index.len())
            .field("next_position", &self.next_position)
            .field("health", &self.health)
            .finish_non_exhaustive()
    }
}

impl MemoryStore {
    /// Open the store with a flat index under `options.data_dir`.
    ///
    /// An index file written for another dimension is discarded and the
    /// store reports [`IndexHealth::MissingVectors`] until rebuilt.
    pub fn open(options: StoreOptions, embedder: Arc<dyn Embedder>) -> Result<Self, MemoryError> {
        std::fs::create_dir_all(&options.data_dir)?;
        let index_path = options.index_path();
        let index = match FlatIndex::load(&index_path, embedder.dimension()) {
            Ok(index) => index,
            Err(MemoryError::DimensionMismatch { expected, actual }) => {
                warn!(
                    "vector index dimension changed, starting empty (path={}, stored={}, configured={})",
                    index_path.display(),
                    actual,
                    expected
                );
                FlatIndex::empty(&index_path, expected)?
            }
            Err(err) => return Err(err),
        };
        Self::with_index(options, embedder, Box::new(index))
    }

    /// Open the store around an already loaded index.
    pub fn with_index(
        options: StoreOptions,
        embedder: Arc<dyn Embedder>,
        mut index: Box<dyn VectorIndex>,
    ) -> Result<Self, MemoryError> {
        if options.persist_every == 0 || options.metadata_scan_factor == 0 {
            return Err(MemoryError::Validation(
                "persist_every and metadata_scan_factor must be at least 1".to_string(),
            ));
        }
        if index.dimension() != embedder.dimension() {
            return Err(MemoryError::DimensionMismatch {
                expected: embedder.dimension(),
                actual: index.dimension(),
            });
        }
        std::fs::create_dir_all(&options.data_dir)?;
        let metadata = MetadataStore::open(options.database_path())?;
        let next_position = metadata
            .max_vector_position()?
            .map_or(0, |position| position + 1);
        let generation = metadata.index_generation()?;
        if index.is_empty() {
            index.set_generation(generation);
        }
        let actual = index.len() as u64;
        let health = if index.generation() != generation {
            warn!(
                "vector index predates the last renumbering, rebuild required (index_generation={}, metadata_generation={})",
                index.generation(),
                generation
            );
            IndexHealth::StaleIndex {
                index_generation: index.generation(),
                metadata_generation: generation,
            }
        } else if actual < next_position {
            warn!(
                "vector index is missing vectors, rebuild required (expected={}, actual={})",
                next_position, actual
            );
            IndexHealth::MissingVectors {
                expected: next_position,
                actual,
            }
        } else {
            if actual > next_position {
                debug!(
                    "vector index has orphaned slots (orphans={})",
                    actual - next_position
                );
            }
            IndexHealth::Consistent
        };
        info!(
            "opened memory store (data_dir={}, memories={}, vectors={}, dimension={}, model={})",
            options.data_dir.display(),
            metadata.count_memories()?,
            actual,
            embedder.dimension(),
            embedder.model_name()
        );
        Ok(Self {
            options,
            embedder,
            index,
            metadata,
            next_position,
            inserts_since_persist: 0,
            dirty: false,
            health,
        })
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn health(&self) -> IndexHealth {
        self.health
    }

    /// Next position the store expects the index to assign.
    pub fn next_position(&self) -> u64 {
        self.next_position
    }

    fn embed_normalized(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let mut vector = self.embedder.embed(text)?;
        normalize(&mut vector);
        if vector.len() != self.index.dimension() {
            return Err(MemoryError::DimensionMismatch {
                expected: self.index.dimension(),
                actual: vector.len(),
            });
        }
        Ok(vector)
    }

    fn ensure_writable(&self) -> Result<(), MemoryError> {
        match self.health {
            IndexHealth::Consistent => Ok(()),
            IndexHealth::MissingVectors { expected, actual } => Err(MemoryError::Corrupted(
                format!("vector index holds {actual} of {expected} vectors; rebuild the index"),
            )),
            IndexHealth::StaleIndex { .. } => Err(stale_index_error()),
        }
    }

    fn tombstones(&self) -> Result<usize, MemoryError> {
        Ok(self
            .index
            .len()
            .saturating_sub(self.metadata.count_memories()?))
    }

    /// Store a memory and return its id.
    pub fn store_memory(&mut self, content: &str, metadata: Metadata) -> Result<Uuid, MemoryError> {
        if content.trim().is_empty() {
            return Err(MemoryError::Validation("memory content is empty".to_string()));
        }
        self.ensure_writable()?;
        let vector = self.embed_normalized(content)?;
        let position = self.index.append(&vector)?;
        self.dirty = true;
        if position < self.next_position {
            return Err(MemoryError::Corrupted(format!(
                "index assigned position {position} below next position {}",
                self.next_position
            )));
        }
        self.next_position = position + 1;

        let record = MemoryRecord {
            id: Uuid::new_v4(),
            content: content.to_string(),
            timestamp: Utc::now(),
            metadata,
            vector_position: position,
        };
        if let Err(err) = self.metadata.insert_memory(&record) {
            warn!(
                "metadata insert failed, vector orphaned (position={}, error={})",
                position, err
            );
            return Err(err);
        }
        debug!(
            "stored memory (id={}, position={}, content_len={})",
            record.id,
            position,
            content.len()
        );

        self.inserts_since_persist += 1;
        if self.inserts_since_persist >= self.options.persist_every {
            if let Err(err) = self.persist() {
                warn!("periodic index persist failed (error={})", err);
            }
        }
        Ok(record.id)
    }

    /// Vector search returning hits at or above `threshold`, best first.
    ///
    /// Slots whose metadata row was deleted are skipped; the candidate pool
    /// is widened by the tombstone count so they never crowd out live hits.
    pub fn search_memories(
        &self,
        query: &str,
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<SearchHit>, MemoryError> {
        if query.trim().is_empty() {
            return Err(MemoryError::Validation("search query is empty".to_string()));
        }
        if limit == 0 {
            return Err(MemoryError::Validation(
                "search limit must be at least 1".to_string(),
            ));
        }
        if matches!(self.health, IndexHealth::StaleIndex { .. }) {
            return Err(stale_index_error());
        }
        if self.index.is_empty() {
            return Ok(Vec::new());
        }
        let vector = self.embed_normalized(query)?;
        let k = limit
            .saturating_add(self.tombstones()?)
            .min(self.index.len());
        let mut hits = Vec::with_capacity(limit);
        for (position, score) in self.index.search(&vector, k)? {
            if hits.len() >= limit || score < threshold {
                break;
            }
            match self.metadata.get_by_position(position)? {
                Some(record) => hits.push(SearchHit::from_similarity(record, score)),
                None => debug!("dropped tombstoned vector (position={})", position),
            }
        }
        Ok(hits)
    }

    /// Vector search over `2 * limit` candidates rescored with keyword
    /// overlap.
    pub fn hybrid_search(
        &self,
        query: &str,
        limit: usize,
        keyword_weight: f32,
    ) -> Result<Vec<SearchHit>, MemoryError> {
        if !(0.0..=1.0).contains(&keyword_weight) {
            return Err(MemoryError::Validation(format!(
                "keyword weight {keyword_weight} outside [0, 1]"
            )));
        }
        let candidates = self.search_memories(
            query,
            limit.saturating_mul(2),
            HYBRID_CANDIDATE_THRESHOLD,
        )?;
        Ok(hybrid_rescore(candidates, query, keyword_weight, limit))
    }

    /// Memories whose metadata contains every pair in `filter`, newest first.
    pub fn search_by_metadata(
        &self,
        filter: &Metadata,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        let scan_cap = limit.saturating_mul(self.options.metadata_scan_factor);
        self.metadata.filter_by_metadata(filter, limit, scan_cap)
    }

    pub fn get_memory(&self, id: Uuid) -> Result<Option<MemoryRecord>, MemoryError> {
        self.metadata.get_memory(id)
    }

    /// Memories newest first.
    pub fn list_memories(&self, limit: Option<usize>) -> Result<Vec<MemoryRecord>, MemoryError> {
        self.metadata.list_memories(limit)
    }

    /// Update content and/or metadata of an existing memory.
    ///
    /// New content is re-embedded into the record's existing slot; metadata
    /// is replaced wholesale. Returns false when `id` is unknown.
    pub fn update_memory(
        &mut self,
        id: Uuid,
        content: Option<&str>,
        metadata: Option<Metadata>,
    ) -> Result<bool, MemoryError> {
        let Some(record) = self.metadata.get_memory(id)? else {
            return Ok(false);
        };
        let Some(content) = content else {
            return self.metadata.update_memory(id, None, metadata.as_ref());
        };
        if content.trim().is_empty() {
            return Err(MemoryError::Validation("memory content is empty".to_string()));
        }
        if !self.index.supports_in_place_overwrite() {
            return Err(MemoryError::UnsupportedOperation(
                "vector index cannot overwrite positions in place".to_string(),
            ));
        }
        let position = record.vector_position;
        let Some(previous) = self.index.vector(position) else {
            return Err(MemoryError::Corrupted(format!(
                "memory {id} has no vector at position {position}"
            )));
        };
        let vector = self.embed_normalized(content)?;
        self.index.overwrite(position, &vector)?;
        self.dirty = true;
        match self.metadata.update_memory(id, Some(content), metadata.as_ref()) {
            Ok(updated) => {
                if let Err(err) = self.persist() {
                    warn!(
                        "index persist after update failed, retrying on close (id={}, error={})",
                        id, err
                    );
                }
                debug!("updated memory (id={}, position={})", id, position);
                Ok(updated)
            }
            Err(err) => {
                self.index.overwrite(position, &previous)?;
                Err(err)
            }
        }
    }

    /// Remove a memory's metadata row. Its vector slot stays behind as a
    /// tombstone until [`MemoryStore::rebuild_index`].
    pub fn delete_memory(&mut self, id: Uuid) -> Result<bool, MemoryError> {
        let removed = self.metadata.delete_memory(id)?;
        if removed {
            debug!("deleted memory (id={})", id);
        }
        Ok(removed)
    }

    /// Store an active reminder and return its id.
    pub fn store_reminder(
        &mut self,
        title: &str,
        description: &str,
        scheduled_time: &str,
    ) -> Result<Uuid, MemoryError> {
        if title.trim().is_empty() {
            return Err(MemoryError::Validation("reminder title is empty".to_string()));
        }
        let record = ReminderRecord {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: description.to_string(),
            scheduled_time: scheduled_time.to_string(),
            created_at: Utc::now(),
            active: true,
        };
        self.metadata.insert_reminder(&record)?;
        debug!(
            "stored reminder (id={}, scheduled_time={})",
            record.id, record.scheduled_time
        );
        Ok(record.id)
    }

    /// Active reminders by ascending scheduled time.
    pub fn get_active_reminders(&self) -> Result<Vec<ReminderRecord>, MemoryError> {
        self.metadata.list_active_reminders()
    }

    /// Soft-delete a reminder; false when unknown or already inactive.
    pub fn deactivate_reminder(&mut self, id: Uuid) -> Result<bool, MemoryError> {
        self.metadata.deactivate_reminder(id)
    }

    /// Re-embed every memory into a fresh dense index.
    ///
    /// Positions are renumbered `0..n` in the metadata store, tombstones are
    /// reclaimed and missing vectors are restored.
    ///
    /// The renumbering commits together with a new index generation, which
    /// the rebuilt index file carries. An index file left over from before
    /// the commit no longer matches and opens as [`IndexHealth::StaleIndex`].
    pub fn rebuild_index(&mut self) -> Result<RebuildSummary, MemoryError> {
        let vectors_before = self.index.len();
        let records = self.metadata.memories_by_position()?;
        let mut entries = Vec::with_capacity(records.len());
        let mut assignments = Vec::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            let position = position as u64;
            entries.push((position, self.embed_normalized(&record.content)?));
            if record.vector_position != position {
                assignments.push((record.id, position));
            }
        }
        let vectors_after = entries.len();
        let generation = self.metadata.index_generation()? + 1;

        self.metadata.reassign_positions(&assignments, generation)?;
        if let Err(err) = self.index.rebuild(entries) {
            self.health = IndexHealth::StaleIndex {
                index_generation: self.index.generation(),
                metadata_generation: generation,
            };
            return Err(err);
        }
        self.index.set_generation(generation);
        self.dirty = true;
        self.next_position = vectors_after as u64;
        self.health = IndexHealth::Consistent;
        self.persist()?;
        info!(
            "rebuilt vector index (before={}, after={}, renumbered={}, generation={})",
            vectors_before,
            vectors_after,
            assignments.len(),
            generation
        );
        Ok(RebuildSummary {
            vectors_before,
            vectors_after,
        })
    }

    /// Persist the vector index now.
    ///
    /// On failure the pending changes stay marked and are retried by the
    /// next persist or on close.
    pub fn persist(&mut self) -> Result<(), MemoryError> {
        self.index.persist()?;
        self.inserts_since_persist = 0;
        self.dirty = false;
        Ok(())
    }

    /// Counts, sizes and the per-type histogram.
    pub fn statistics(&self) -> Result<StoreStatistics, MemoryError> {
        let total_memories = self.metadata.count_memories()?;
        Ok(StoreStatistics {
            total_memories,
            active_reminders: self.metadata.count_active_reminders()?,
            vector_count: self.index.len(),
            tombstones: self.index.len().saturating_sub(total_memories),
            next_position: self.next_position,
            index_size_bytes: self.index.persisted_size(),
            db_size_bytes: self.metadata.file_size(),
            memory_types: self.metadata.type_histogram()?,
            embedding_model: self.embedder.model_name().to_string(),
            embedding_dimension: self.embedder.dimension(),
        })
    }

    /// Build the export document without writing it.
    pub fn snapshot(&self) -> Result<Snapshot, MemoryError> {
        let memories = self
            .metadata
            .list_memories(None)?
            .into_iter()
            .map(|record| SnapshotMemory {
                id: record.id,
                content: record.content,
                timestamp: record.timestamp,
                metadata: record.metadata,
            })
            .collect();
        Ok(Snapshot {
            memories,
            reminders: self.metadata.list_reminders()?,
            exported_at: Utc::now(),
            statistics: Some(self.statistics()?),
        })
    }

    /// Write a JSON snapshot of all memories and reminders to `path`.
    pub fn export(&self, path: impl AsRef<Path>) -> Result<ExportSummary, MemoryError> {
        let path = path.as_ref();
        let snapshot = self.snapshot()?;
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &snapshot)?;
        writer.flush()?;
        let summary = ExportSummary {
            memories: snapshot.memories.len(),
            reminders: snapshot.reminders.len(),
        };
        info!(
            "exported memories (path={}, memories={}, reminders={})",
            path.display(),
            summary.memories,
            summary.reminders
        );
        Ok(summary)
    }

    /// Load a snapshot written by [`MemoryStore::export`].
    ///
    /// Memories are re-stored oldest first with new ids and positions; only
    /// active reminders are re-created.
    pub fn import(&mut self, path: impl AsRef<Path>) -> Result<ImportSummary, MemoryError> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).open(path)?;
        let snapshot: Snapshot = serde_json::from_reader(BufReader::new(file))?;
        let summary = self.import_snapshot(snapshot)?;
        info!(
            "imported memories (path={}, memories={}, reminders={}, skipped={})",
            path.display(),
            summary.memories,
            summary.reminders,
            summary.skipped
        );
        Ok(summary)
    }

    /// Apply an in-memory snapshot.
    pub fn import_snapshot(&mut self, snapshot: Snapshot) -> Result<ImportSummary, MemoryError> {
        let mut summary = ImportSummary::default();
        let mut memories = snapshot.memories;
        memories.sort_by_key(|memory| memory.timestamp);
        for memory in memories {
            if memory.content.trim().is_empty() {
                warn!("skipping empty memory during import (id={})", memory.id);
                summary.skipped += 1;
                continue;
            }
            self.store_memory(&memory.content, memory.metadata)?;
            summary.memories += 1;
        }
        for reminder in snapshot.reminders {
            if !reminder.active {
                summary.skipped += 1;
                continue;
            }
            self.store_reminder(
                &reminder.title,
                &reminder.description,
                &reminder.scheduled_time,
            )?;
            summary.reminders += 1;
        }
        self.persist()?;
        Ok(summary)
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        if !self.dirty {
            return;
        }
        if let Err(err) = self.index.persist() {
            warn!("failed to persist vector index on close (error={})", err);
        }
    }
}

fn stale_index_error() -> MemoryError {
    MemoryError::Corrupted(
        "vector index predates the last renumbering; rebuild the index".to_string(),
    )
}

impl MemoryProvider for MemoryStore {
    fn search_memories(
        &self,
        query: &str,
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<SearchHit>, MemoryError> {
        MemoryStore::search_memories(self, query, limit, threshold)
    }

    fn recent_memories(&self, limit: usize) -> Result<Vec<MemoryRecord>, MemoryError> {
        self.metadata.list_memories(Some(limit))
    }
}

impl HybridSearch for MemoryStore {
    fn hybrid_search(
        &self,
        query: &str,
        limit: usize,
        keyword_weight: f32,
    ) -> Result<Vec<SearchHit>, MemoryError> {
        MemoryStore::hybrid_search(self, query, limit, keyword_weight)
    }
}
