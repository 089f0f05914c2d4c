//! Text embedding functions.

use crate::error::MemoryError;

/// Default embedding dimension, matching all-MiniLM-L6-v2.
pub const DEFAULT_DIMENSION: usize = 384;

/// Maps text to a fixed-length vector.
///
/// Implementations must be deterministic for a given model configuration and
/// must not fail on empty text. The store normalizes every vector it
/// receives, so implementations may return unnormalized output.
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError>;

    /// Output dimension.
    fn dimension(&self) -> usize;

    /// Model identifier reported in statistics.
    fn model_name(&self) -> &str;
}

/// L2-normalize in place. A zero or non-finite vector becomes the first
/// basis vector so that every stored vector has unit norm.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
    if norm > f32::EPSILON && norm.is_finite() {
        for value in vector.iter_mut() {
            *value /= norm;
        }
        return;
    }
    vector.iter_mut().for_each(|value| *value = 0.0);
    if let Some(first) = vector.first_mut() {
        *first = 1.0;
    }
}

/// Inner product of two equal-length vectors.
pub fn dot(left: &[f32], right: &[f32]) -> f32 {
    left.iter().zip(right).map(|(a, b)| a * b).sum()
}

/// Deterministic feature-hashing embedder.
///
/// Words and boundary-marked character trigrams are hashed with FNV-1a into
/// signed buckets. Lexical overlap drives similarity; there is no semantic
/// knowledge, so this is the offline default rather than a model substitute.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
    model: String,
}

const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.25;

impl HashEmbedder {
    /// Create a hash embedder with the given dimension.
    pub fn new(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            dimension,
            model: format!("hash-fnv1a-{dimension}"),
        }
    }

    fn accumulate(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let hash = fnv1a(feature.as_bytes());
        let bucket = (hash % self.dimension as u64) as usize;
        let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let mut vector = vec![0.0f32; self.dimension];
        for word in tokenize(text) {
            self.accumulate(&mut vector, &word, WORD_WEIGHT);
            let marked: Vec<char> = format!("#{word}#").chars().collect();
            for window in marked.windows(3) {
                let trigram: String = window.iter().collect();
                self.accumulate(&mut vector, &trigram, TRIGRAM_WEIGHT);
            }
        }
        normalize(&mut vector);
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Lowercase alphanumeric word tokens.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|ch: char| !ch.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[cfg(feature = "fastembed")]
pub use local_model::FastEmbedder;

#[cfg(feature = "fastembed")]
mod local_model {
    use super::Embedder;
    use crate::error::MemoryError;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use log::info;
    use parking_lot::Mutex;

    /// Sentence-transformer embedder backed by fastembed.
    ///
    /// The model is downloaded and loaded on first use.
    pub struct FastEmbedder {
        model_name: String,
        model: EmbeddingModel,
        dimension: usize,
        runtime: Mutex<Option<TextEmbedding>>,
    }

    impl FastEmbedder {
        /// Resolve a model by its sentence-transformers name.
        pub fn new(model_name: &str) -> Result<Self, MemoryError> {
            let (model, dimension) = resolve_model(model_name).ok_or_else(|| {
                MemoryError::Validation(format!("unsupported embedding model: {model_name}"))
            })?;
            Ok(Self {
                model_name: model_name.to_string(),
                model,
                dimension,
                runtime: Mutex::new(None),
            })
        }
    }

    impl std::fmt::Debug for FastEmbedder {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("FastEmbedder")
                .field("model_name", &self.model_name)
                .field("dimension", &self.dimension)
                .finish_non_exhaustive()
        }
    }

    impl Embedder for FastEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
            let mut runtime = self.runtime.lock();
            if runtime.is_none() {
                let loaded = TextEmbedding::try_new(InitOptions::new(self.model.clone()))
                    .map_err(|err| MemoryError::Embedding(err.to_string()))?;
                info!("loaded embedding model (model={})", self.model_name);
                *runtime = Some(loaded);
            }
            let Some(embedding) = runtime.as_mut() else {
                return Err(MemoryError::Embedding("model not loaded".to_string()));
            };
            let mut vectors = embedding
                .embed(vec![text], None)
                .map_err(|err| MemoryError::Embedding(err.to_string()))?;
            vectors
                .pop()
                .ok_or_else(|| MemoryError::Embedding("model returned no vector".to_string()))
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn model_name(&self) -> &str {
            &self.model_name
        }
    }

    fn resolve_model(name: &str) -> Option<(EmbeddingModel, usize)> {
        let normalized = name
            .trim()
            .trim_start_matches("sentence-transformers/")
            .trim_start_matches("BAAI/")
            .to_ascii_lowercase();
        match normalized.as_str() {
            "all-minilm-l6-v2" => Some((EmbeddingModel::AllMiniLML6V2, 384)),
            "all-minilm-l12-v2" => Some((EmbeddingModel::AllMiniLML12V2, 384)),
            "bge-small-en-v1.5" => Some((EmbeddingModel::BGESmallENV15, 384)),
            "bge-base-en-v1.5" => Some((EmbeddingModel::BGEBaseENV15, 768)),
            "nomic-embed-text-v1.5" => Some((EmbeddingModel::NomicEmbedTextV15, 768)),
            _ => None,
        }
    }
}
