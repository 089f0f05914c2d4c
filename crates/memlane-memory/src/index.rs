//! Positional vector index with exact inner-product search.

use crate::embedding::dot;
use crate::error::MemoryError;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs::OpenOptions;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Dense, position-addressed vector index over unit vectors.
pub trait VectorIndex: Send + Sync {
    /// Vector dimension.
    fn dimension(&self) -> usize;

    /// Number of occupied slots, tombstones included.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a vector and return its position.
    fn append(&mut self, vector: &[f32]) -> Result<u64, MemoryError>;

    /// Up to `k` positions by descending inner product.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(u64, f32)>, MemoryError>;

    /// Copy of the vector at a position.
    fn vector(&self, position: u64) -> Option<Vec<f32>>;

    /// Whether `overwrite` keeps every other position stable.
    ///
    /// Indexes that reorder internally must return false; the store then
    /// refuses content updates rather than guessing.
    fn supports_in_place_overwrite(&self) -> bool;

    /// Replace the vector at an existing position.
    fn overwrite(&mut self, position: u64, vector: &[f32]) -> Result<(), MemoryError>;

    /// Replace the whole index. Positions must be exactly `0..n` in order.
    fn rebuild(&mut self, entries: Vec<(u64, Vec<f32>)>) -> Result<(), MemoryError>;

    /// Rebuild generation the slots were numbered under.
    fn generation(&self) -> u64;

    fn set_generation(&mut self, generation: u64);

    /// Write the index to durable storage.
    fn persist(&self) -> Result<(), MemoryError>;

    /// Size of the durable representation in bytes.
    fn persisted_size(&self) -> u64;
}

const INDEX_FORMAT_VERSION: u32 = 2;

#[derive(Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    dimension: u64,
    generation: u64,
    data: Vec<f32>,
}

/// Flat in-memory index persisted as a single bincode file.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    path: PathBuf,
    dimension: usize,
    generation: u64,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Load the index at `path`, or start empty if the file does not exist.
    pub fn load(path: impl AsRef<Path>, dimension: usize) -> Result<Self, MemoryError> {
        let path = path.as_ref().to_path_buf();
        if dimension == 0 {
            return Err(MemoryError::Validation(
                "index dimension must be at least 1".to_string(),
            ));
        }
        if !path.exists() {
            return Self::empty(path, dimension);
        }
        let file = OpenOptions::new().read(true).open(&path)?;
        let stored: IndexFile = bincode::deserialize_from(BufReader::new(file))?;
        if stored.version != INDEX_FORMAT_VERSION {
            return Err(MemoryError::Corrupted(format!(
                "unsupported index format version {}",
                stored.version
            )));
        }
        let stored_dimension = stored.dimension as usize;
        if stored_dimension != dimension {
            return Err(MemoryError::DimensionMismatch {
                expected: dimension,
                actual: stored_dimension,
            });
        }
        if stored.data.len() % dimension != 0 {
            return Err(MemoryError::Corrupted(format!(
                "index data length {} is not a multiple of dimension {}",
                stored.data.len(),
                dimension
            )));
        }
        let index = Self {
            path,
            dimension,
            generation: stored.generation,
            data: stored.data,
        };
        info!(
            "loaded vector index (path={}, vectors={}, dimension={}, generation={})",
            index.path.display(),
            index.len(),
            dimension,
            index.generation
        );
        Ok(index)
    }

    /// Empty index that will persist to `path`, replacing any existing file.
    pub fn empty(path: impl AsRef<Path>, dimension: usize) -> Result<Self, MemoryError> {
        if dimension == 0 {
            return Err(MemoryError::Validation(
                "index dimension must be at least 1".to_string(),
            ));
        }
        let path = path.as_ref().to_path_buf();
        info!(
            "initialized empty vector index (path={}, dimension={})",
            path.display(),
            dimension
        );
        Ok(Self {
            path,
            dimension,
            generation: 0,
            data: Vec::new(),
        })
    }

    /// Location of the index file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), MemoryError> {
        if vector.len() != self.dimension {
            return Err(MemoryError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    fn slot(&self, position: u64) -> Option<std::ops::Range<usize>> {
        let position = usize::try_from(position).ok()?;
        if position >= self.len() {
            return None;
        }
        let start = position * self.dimension;
        Some(start..start + self.dimension)
    }
}

impl VectorIndex for FlatIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    fn append(&mut self, vector: &[f32]) -> Result<u64, MemoryError> {
        self.check_dimension(vector)?;
        let position = self.len() as u64;
        self.data.extend_from_slice(vector);
        Ok(position)
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(u64, f32)>, MemoryError> {
        self.check_dimension(query)?;
        if k == 0 {
            return Ok(Vec::new());
        }
        let mut scored: Vec<(u64, f32)> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, vector)| (position as u64, dot(query, vector)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);
        Ok(scored)
    }

    fn vector(&self, position: u64) -> Option<Vec<f32>> {
        self.slot(position).map(|range| self.data[range].to_vec())
    }

    fn supports_in_place_overwrite(&self) -> bool {
        true
    }

    fn overwrite(&mut self, position: u64, vector: &[f32]) -> Result<(), MemoryError> {
        self.check_dimension(vector)?;
        let Some(range) = self.slot(position) else {
            return Err(MemoryError::Corrupted(format!(
                "no vector at position {position} (vectors={})",
                self.len()
            )));
        };
        self.data[range].copy_from_slice(vector);
        Ok(())
    }

    fn rebuild(&mut self, entries: Vec<(u64, Vec<f32>)>) -> Result<(), MemoryError> {
        let mut data = Vec::with_capacity(entries.len() * self.dimension);
        for (expected, (position, vector)) in entries.into_iter().enumerate() {
            if position != expected as u64 {
                return Err(MemoryError::Validation(format!(
                    "rebuild positions must be dense (expected={expected}, actual={position})"
                )));
            }
            self.check_dimension(&vector)?;
            data.extend_from_slice(&vector);
        }
        self.data = data;
        debug!("rebuilt vector index in memory (vectors={})", self.len());
        Ok(())
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn set_generation(&mut self, generation: u64) {
        self.generation = generation;
    }

    fn persist(&self) -> Result<(), MemoryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let temp_path = self.temp_path();
        {
            let file = OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(&temp_path)?;
            let mut writer = BufWriter::new(file);
            let stored = IndexFile {
                version: INDEX_FORMAT_VERSION,
                dimension: self.dimension as u64,
                generation: self.generation,
                data: self.data.clone(),
            };
            bincode::serialize_into(&mut writer, &stored)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        std::fs::rename(&temp_path, &self.path)?;
        debug!(
            "persisted vector index (path={}, vectors={})",
            self.path.display(),
            self.len()
        );
        Ok(())
    }

    fn persisted_size(&self) -> u64 {
        std::fs::metadata(&self.path)
            .map(|meta| meta.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::{FlatIndex, VectorIndex};
    use crate::error::MemoryError;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn unit(dimension: usize, axis: usize) -> Vec<f32> {
        let mut vector = vec![0.0; dimension];
        vector[axis] = 1.0;
        vector
    }

    #[test]
    fn append_assigns_dense_positions() {
        let temp = tempdir().expect("tempdir");
        let mut index = FlatIndex::load(temp.path().join("v.index"), 3).expect("load");
        assert_eq!(index.append(&unit(3, 0)).expect("append"), 0);
        assert_eq!(index.append(&unit(3, 1)).expect("append"), 1);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn append_rejects_wrong_dimension() {
        let temp = tempdir().expect("tempdir");
        let mut index = FlatIndex::load(temp.path().join("v.index"), 3).expect("load");
        let err = index.append(&[1.0, 0.0]).expect_err("mismatch");
        assert!(matches!(
            err,
            MemoryError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn search_orders_by_score_and_caps_at_len() {
        let temp = tempdir().expect("tempdir");
        let mut index = FlatIndex::load(temp.path().join("v.index"), 2).expect("load");
        index.append(&[1.0, 0.0]).expect("append");
        index.append(&[0.6, 0.8]).expect("append");
        index.append(&[0.0, 1.0]).expect("append");

        let hits = index.search(&[0.0, 1.0], 10).expect("search");
        let positions: Vec<u64> = hits.iter().map(|(position, _)| *position).collect();
        assert_eq!(positions, vec![2, 1, 0]);

        let top = index.search(&[0.0, 1.0], 1).expect("search");
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].0, 2);
    }

    #[test]
    fn overwrite_replaces_in_place() {
        let temp = tempdir().expect("tempdir");
        let mut index = FlatIndex::load(temp.path().join("v.index"), 2).expect("load");
        index.append(&[1.0, 0.0]).expect("append");
        index.append(&[1.0, 0.0]).expect("append");
        index.overwrite(0, &[0.0, 1.0]).expect("overwrite");

        assert_eq!(index.vector(0), Some(vec![0.0, 1.0]));
        assert_eq!(index.vector(1), Some(vec![1.0, 0.0]));
        assert!(matches!(
            index.overwrite(5, &[0.0, 1.0]),
            Err(MemoryError::Corrupted(_))
        ));
    }

    #[test]
    fn persist_and_load_round_trip() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("v.index");
        let mut index = FlatIndex::load(&path, 2).expect("load");
        index.append(&[1.0, 0.0]).expect("append");
        index.append(&[0.0, 1.0]).expect("append");
        index.set_generation(4);
        index.persist().expect("persist");
        assert!(index.persisted_size() > 0);

        let loaded = FlatIndex::load(&path, 2).expect("reload");
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.generation(), 4);
        assert_eq!(loaded.vector(1), Some(vec![0.0, 1.0]));
    }

    #[test]
    fn load_rejects_dimension_change() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("v.index");
        let mut index = FlatIndex::load(&path, 2).expect("load");
        index.append(&[1.0, 0.0]).expect("append");
        index.persist().expect("persist");

        let err = FlatIndex::load(&path, 4).expect_err("dimension");
        assert!(matches!(err, MemoryError::DimensionMismatch { .. }));
    }

    #[test]
    fn rebuild_requires_dense_positions() {
        let temp = tempdir().expect("tempdir");
        let mut index = FlatIndex::load(temp.path().join("v.index"), 2).expect("load");
        index.append(&[1.0, 0.0]).expect("append");

        let err = index
            .rebuild(vec![(1, vec![0.0, 1.0])])
            .expect_err("gap");
        assert!(matches!(err, MemoryError::Validation(_)));
        assert_eq!(index.len(), 1);

        index
            .rebuild(vec![(0, vec![0.0, 1.0]), (1, vec![1.0, 0.0])])
            .expect("rebuild");
        assert_eq!(index.len(), 2);
        assert_eq!(index.vector(0), Some(vec![0.0, 1.0]));
    }
}
