//! Configuration schema for memlane.

use serde::{Deserialize, Serialize};

/// Root config for a memlane deployment.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MemlaneConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub qa: QaConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

impl MemlaneConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> MemlaneConfigBuilder {
        MemlaneConfigBuilder::new()
    }
}

/// Builder for assembling a `MemlaneConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct MemlaneConfigBuilder {
    config: MemlaneConfig,
}

impl MemlaneConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: MemlaneConfig::default(),
        }
    }

    /// Point the store at a data directory.
    pub fn data_dir(mut self, data_dir: impl Into<String>) -> Self {
        self.config.store.data_dir = Some(data_dir.into());
        self
    }

    /// Replace the store configuration.
    pub fn store(mut self, store: StoreConfig) -> Self {
        self.config.store = store;
        self
    }

    /// Replace the embedding configuration.
    pub fn embedding(mut self, embedding: EmbeddingConfig) -> Self {
        self.config.embedding = embedding;
        self
    }

    /// Replace the search defaults.
    pub fn search(mut self, search: SearchConfig) -> Self {
        self.config.search = search;
        self
    }

    /// Replace the question-answering configuration.
    pub fn qa(mut self, qa: QaConfig) -> Self {
        self.config.qa = qa;
        self
    }

    /// Replace the answer generation configuration.
    pub fn generation(mut self, generation: GenerationConfig) -> Self {
        self.config.generation = generation;
        self
    }

    /// Finalize and return the built `MemlaneConfig`.
    pub fn build(self) -> MemlaneConfig {
        self.config
    }
}

/// Persisted state layout and write cadence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Data directory; defaults to `~/.memlane/data`.
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default = "default_index_file")]
    pub index_file: String,
    #[serde(default = "default_database_file")]
    pub database_file: String,
    /// Persist the vector index after this many inserts.
    #[serde(default = "default_persist_every")]
    pub persist_every: usize,
    #[serde(default = "default_metadata_scan_factor")]
    pub metadata_scan_factor: usize,
    /// Rebuild automatically when the index is missing vectors at open.
    #[serde(default = "default_rebuild_on_open")]
    pub rebuild_on_open: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            index_file: default_index_file(),
            database_file: default_database_file(),
            persist_every: default_persist_every(),
            metadata_scan_factor: default_metadata_scan_factor(),
            rebuild_on_open: default_rebuild_on_open(),
        }
    }
}

fn default_index_file() -> String {
    "vectors.index".to_string()
}

fn default_database_file() -> String {
    "memories.db".to_string()
}

fn default_persist_every() -> usize {
    10
}

fn default_metadata_scan_factor() -> usize {
    10
}

fn default_rebuild_on_open() -> bool {
    true
}

/// Embedding backend selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Offline feature hashing.
    #[default]
    Hash,
    /// Local sentence-transformer model via fastembed.
    Fastembed,
}

/// Embedding model configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProvider,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Vector dimension for the hash provider; fastembed models report their own.
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
        }
    }
}

fn default_embedding_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_embedding_dimension() -> usize {
    384
}

/// Defaults applied to direct searches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            similarity_threshold: default_similarity_threshold(),
            keyword_weight: default_keyword_weight(),
        }
    }
}

fn default_max_results() -> usize {
    5
}

fn default_similarity_threshold() -> f32 {
    0.3
}

fn default_keyword_weight() -> f32 {
    0.3
}

/// Context assembly and answer fallback settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QaConfig {
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,
    #[serde(default = "default_recent_count")]
    pub recent_count: usize,
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    #[serde(default = "default_relevance_weight")]
    pub relevance_weight: f32,
    #[serde(default = "default_voice_boost")]
    pub voice_boost: f32,
    /// Context entries returned alongside an answer.
    #[serde(default = "default_returned_context")]
    pub returned_context: usize,
    /// Characters of context quoted by the local fallback answer.
    #[serde(default = "default_fallback_snippet_chars")]
    pub fallback_snippet_chars: usize,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            candidate_limit: default_candidate_limit(),
            recent_count: default_recent_count(),
            context_window: default_context_window(),
            relevance_weight: default_relevance_weight(),
            voice_boost: default_voice_boost(),
            returned_context: default_returned_context(),
            fallback_snippet_chars: default_fallback_snippet_chars(),
        }
    }
}

fn default_candidate_limit() -> usize {
    10
}

fn default_recent_count() -> usize {
    3
}

fn default_context_window() -> usize {
    7
}

fn default_relevance_weight() -> f32 {
    2.0
}

fn default_voice_boost() -> f32 {
    1.0
}

fn default_returned_context() -> usize {
    3
}

fn default_fallback_snippet_chars() -> usize {
    250
}

/// Answer generation backend selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    /// Answers are composed locally from retrieved context.
    #[default]
    None,
    /// OpenAI-compatible chat completion.
    Openai,
}

/// Language model used to phrase answers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationConfig {
    #[serde(default)]
    pub provider: GenerationProvider,
    #[serde(default = "default_generation_model")]
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: GenerationProvider::default(),
            model: default_generation_model(),
            api_key_env: default_api_key_env(),
            requests_per_minute: default_requests_per_minute(),
        }
    }
}

fn default_generation_model() -> String {
    "gpt-4.1-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_requests_per_minute() -> u32 {
    38
}
