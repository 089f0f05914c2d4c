//! Store and ranking setup derived from config.

use crate::error::CoreError;
use log::{info, warn};
use memlane_config::{EmbeddingConfig, EmbeddingProvider, MemlaneConfig};
use memlane_memory::{ContextPolicy, Embedder, HashEmbedder, MemoryStore, StoreOptions};
use std::sync::Arc;

/// Construct the configured embedder.
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, CoreError> {
    match config.provider {
        EmbeddingProvider::Hash => Ok(Arc::new(HashEmbedder::new(config.dimension))),
        #[cfg(feature = "fastembed")]
        EmbeddingProvider::Fastembed => {
            let embedder = memlane_memory::FastEmbedder::new(&config.model)?;
            Ok(Arc::new(embedder))
        }
        #[cfg(not(feature = "fastembed"))]
        EmbeddingProvider::Fastembed => Err(CoreError::InvalidInput(format!(
            "embedding provider fastembed (model={}) requires the fastembed feature",
            config.model
        ))),
    }
}

pub fn store_options(config: &MemlaneConfig) -> StoreOptions {
    let mut options = StoreOptions::new(config.data_dir());
    options.index_file = config.store.index_file.clone();
    options.database_file = config.store.database_file.clone();
    options.persist_every = config.store.persist_every;
    options.metadata_scan_factor = config.store.metadata_scan_factor;
    options
}

pub fn context_policy(config: &MemlaneConfig) -> ContextPolicy {
    ContextPolicy {
        candidate_limit: config.qa.candidate_limit,
        recent_count: config.qa.recent_count,
        window: config.qa.context_window,
        relevance_weight: config.qa.relevance_weight,
        voice_boost: config.qa.voice_boost,
        keyword_weight: config.search.keyword_weight,
    }
}

/// Open the store, rebuilding the index when it is out of step and
/// `store.rebuild_on_open` is set.
pub fn open_store(
    config: &MemlaneConfig,
    embedder: Arc<dyn Embedder>,
) -> Result<MemoryStore, CoreError> {
    let options = store_options(config);
    info!(
        "opening memory store (data_dir={}, model={})",
        options.data_dir.display(),
        embedder.model_name()
    );
    let mut store = MemoryStore::open(options, embedder)?;
    if !store.health().is_consistent() {
        if config.store.rebuild_on_open {
            let summary = store.rebuild_index()?;
            info!(
                "rebuilt vector index at open (before={}, after={})",
                summary.vectors_before, summary.vectors_after
            );
        } else {
            warn!(
                "vector index needs a rebuild (health={:?}); writes stay blocked",
                store.health()
            );
        }
    }
    Ok(store)
}
