//! Explicit wiring of an [`Assistant`] and its collaborators.

use super::Assistant;
use super::memory::{build_embedder, context_policy, open_store};
use crate::collaborators::{Generator, Transcriber, VisionAnalyzer};
use crate::error::CoreError;
use crate::llm::generator_from_config;
use crate::rate_limit::RateLimiter;
use memlane_config::MemlaneConfig;
use memlane_memory::{Embedder, MemoryStore};
use parking_lot::RwLock;
use std::sync::Arc;

/// Builder for [`Assistant`].
///
/// Anything not injected is derived from the config: the embedder and store
/// from `embedding`/`store`, the generator from `generation`.
pub struct AssistantBuilder {
    config: MemlaneConfig,
    store: Option<MemoryStore>,
    embedder: Option<Arc<dyn Embedder>>,
    generator: Option<Arc<dyn Generator>>,
    transcriber: Option<Arc<dyn Transcriber>>,
    vision: Option<Arc<dyn VisionAnalyzer>>,
}

impl std::fmt::Debug for AssistantBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantBuilder")
            .field("config", &self.config)
            .field("store", &self.store.is_some())
            .field("generator", &self.generator.as_ref().map(|g| g.name().to_string()))
            .field(
                "transcriber",
                &self.transcriber.as_ref().map(|t| t.name().to_string()),
            )
            .field("vision", &self.vision.as_ref().map(|v| v.name().to_string()))
            .finish()
    }
}

impl AssistantBuilder {
    pub fn new(config: MemlaneConfig) -> Self {
        Self {
            config,
            store: None,
            embedder: None,
            generator: None,
            transcriber: None,
            vision: None,
        }
    }

    /// Use an already opened store instead of opening one from config.
    pub fn store(mut self, store: MemoryStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Embedder used when the builder opens the store.
    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn vision(mut self, vision: Arc<dyn VisionAnalyzer>) -> Self {
        self.vision = Some(vision);
        self
    }

    pub fn build(self) -> Result<Assistant, CoreError> {
        let store = match self.store {
            Some(store) => store,
            None => {
                let embedder = match self.embedder {
                    Some(embedder) => embedder,
                    None => build_embedder(&self.config.embedding)?,
                };
                open_store(&self.config, embedder)?
            }
        };
        let generator = match self.generator {
            Some(generator) => Some(generator),
            None => generator_from_config(&self.config.generation)?,
        };
        Ok(Assistant {
            policy: context_policy(&self.config),
            limiter: RateLimiter::new(self.config.generation.requests_per_minute),
            store: RwLock::new(store),
            generator,
            transcriber: self.transcriber,
            vision: self.vision,
            config: self.config,
        })
    }
}
