//! Layered configuration loader.
//!
//! Discovers configuration layers (user/project/cwd/runtime), validates the
//! schema of each, merges them and applies environment overrides to produce
//! the final `MemlaneConfig`.

mod layer_io;
mod merge;
mod schema;
mod paths;

#[cfg(test)]
mod tests;

use crate::{ConfigError, MemlaneConfig};
use log::{debug, info};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// File name looked up in the project root and the cwd.
const DEFAULT_CONFIG_FILE: &str = "memlane.json5";
/// Default config directory under the user's home.
const DEFAULT_CONFIG_DIR: &str = ".memlane";
/// Data directory under the user config directory.
const DEFAULT_DATA_DIR: &str = "data";
/// Data directory used when no home directory can be resolved.
const FALLBACK_DATA_DIR: &str = "./data/vector_db";
/// Entries that mark a directory as a project root.
const DEFAULT_PROJECT_ROOT_MARKERS: &[&str] = &[".git"];

/// Environment variable overriding `store.data_dir`.
pub const ENV_DATA_DIR: &str = "MEMLANE_DATA_DIR";
/// Environment variable overriding `embedding.model`.
pub const ENV_EMBEDDING_MODEL: &str = "MEMLANE_EMBEDDING_MODEL";

/// Effective config together with the layers it was merged from.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// Merged and validated.
    pub config: MemlaneConfig,
    /// Metadata for each layer applied during load.
    pub layers: Vec<ConfigLayer>,
}

/// Where a config layer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// `~/.memlane/memlane.json5`.
    User,
    /// `memlane.json5` at the nearest project root.
    Project,
    /// `memlane.json5` in the working directory.
    Cwd,
    /// Runtime override files.
    Runtime,
    /// Environment variable overrides (highest precedence).
    Environment,
}

/// Metadata about an applied config layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigLayer {
    /// Layer origin.
    pub source: ConfigLayerSource,
    /// Location on disk, if the layer came from a file.
    pub path: Option<PathBuf>,
}

/// Where to look for layers and which overrides to apply.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    /// Working directory used to resolve local layers.
    pub cwd: PathBuf,
    /// Optional user config path (defaults to `~/.memlane/memlane.json5`).
    pub user_config_path: Option<PathBuf>,
    /// Runtime override config paths applied after local layers.
    pub runtime_paths: Vec<PathBuf>,
    /// Entries that mark the project root.
    pub project_root_markers: Vec<String>,
    /// Environment overrides, keyed by variable name.
    pub environment: BTreeMap<String, String>,
}

impl LayeredConfigOptions {
    /// Default layer locations for `cwd`, with overrides read from the process environment.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        let cwd = cwd.as_ref().to_path_buf();
        Self {
            cwd,
            user_config_path: layer_io::default_user_config_path(),
            runtime_paths: Vec::new(),
            project_root_markers: DEFAULT_PROJECT_ROOT_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
            environment: layer_io::process_environment(),
        }
    }

    /// Add a runtime override config path.
    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }
}

impl MemlaneConfig {
    /// Load one config file, without layering.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading config file (path={})", path.as_ref().display());
        let value = layer_io::read_json5(path.as_ref())?;
        config_from_value(value, "config")
    }

    /// Parse config from JSON5 text, without layering.
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("parsing inline config (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        config_from_value(value, "config")
    }

    /// Load the layered stack from the default locations.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        info!(
            "loading layered config (cwd={})",
            cwd.as_ref().display()
        );
        let options = LayeredConfigOptions::new(cwd);
        Self::load_layered_with_options(options)
    }

    /// Load a layered config stack using explicit layer locations and overrides.
    ///
    /// Layer precedence (low -> high): user, project, cwd, runtime overrides,
    /// environment. The project and cwd layers are read once when they are
    /// the same file.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let cwd = paths::resolve_cwd(&options.cwd)?;
        debug!("resolved cwd for config load: {}", cwd.display());
        let mut stack = LayerStack::default();

        if let Some(layer) = layer_io::load_optional_layer(
            ConfigLayerSource::User,
            options.user_config_path.as_deref(),
        )? {
            stack.push(layer);
        }

        match paths::project_root(&cwd, &options.project_root_markers) {
            Some(root) => {
                debug!("project root found: {}", root.display());
                stack.push_local(ConfigLayerSource::Project, &root.join(DEFAULT_CONFIG_FILE))?;
            }
            None => debug!("no project root above {}", cwd.display()),
        }
        stack.push_local(ConfigLayerSource::Cwd, &cwd.join(DEFAULT_CONFIG_FILE))?;

        for path in &options.runtime_paths {
            stack.push(layer_io::load_required_layer(ConfigLayerSource::Runtime, path)?);
        }

        if let Some(overrides) = layer_io::environment_overrides(&options.environment) {
            debug!("applying environment overrides");
            stack.push(LoadedLayer {
                meta: ConfigLayer {
                    source: ConfigLayerSource::Environment,
                    path: None,
                },
                value: overrides,
            });
        }

        let (merged, layers) = stack.finish();
        let config = config_from_value(merged, "effective")?;
        info!("layered config loaded (layers={})", layers.len());
        Ok(LayeredConfig { config, layers })
    }

    /// Range and cross-field checks run after decoding.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("store.persist_every", self.store.persist_every),
            ("store.metadata_scan_factor", self.store.metadata_scan_factor),
            ("embedding.dimension", self.embedding.dimension),
            ("search.max_results", self.search.max_results),
            ("qa.candidate_limit", self.qa.candidate_limit),
            ("qa.context_window", self.qa.context_window),
            (
                "generation.requests_per_minute",
                self.generation.requests_per_minute as usize,
            ),
        ];
        for (path, value) in positive {
            if value == 0 {
                return Err(ConfigError::field(path, "must be at least 1"));
            }
        }
        if !(0.0..=1.0).contains(&self.search.keyword_weight) {
            return Err(ConfigError::field("search.keyword_weight", "must lie in [0, 1]"));
        }
        if !(-1.0..=1.0).contains(&self.search.similarity_threshold) {
            return Err(ConfigError::field(
                "search.similarity_threshold",
                "must lie in [-1, 1]",
            ));
        }
        if self.store.index_file == self.store.database_file {
            return Err(ConfigError::Invalid(
                "store.index_file and store.database_file must differ".to_string(),
            ));
        }

        Ok(())
    }

    /// Data directory with the default applied.
    pub fn data_dir(&self) -> PathBuf {
        match self.store.data_dir.as_deref() {
            Some(path) => PathBuf::from(path),
            None => layer_io::default_data_dir(),
        }
    }
}

/// A parsed layer and its origin.
#[derive(Debug, Clone)]
struct LoadedLayer {
    meta: ConfigLayer,
    value: Value,
}

fn config_from_value(value: Value, label: &str) -> Result<MemlaneConfig, ConfigError> {
    schema::validate_layer_schema(&value, label)?;
    let config: MemlaneConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}

/// Layers collected so far, lowest precedence first.
#[derive(Debug, Default)]
struct LayerStack {
    layers: Vec<LoadedLayer>,
    seen: HashSet<PathBuf>,
}

impl LayerStack {
    fn push(&mut self, layer: LoadedLayer) {
        if let Some(path) = layer.meta.path.as_deref() {
            self.seen.insert(paths::layer_key(path));
        }
        debug!(
            "config layer applied (source={:?}, path={:?})",
            layer.meta.source, layer.meta.path
        );
        self.layers.push(layer);
    }

    /// Push a discovered file layer; absent files and repeats are skipped.
    fn push_local(&mut self, source: ConfigLayerSource, path: &Path) -> Result<(), ConfigError> {
        if !path.exists() {
            debug!("no {:?} layer at {}", source, path.display());
            return Ok(());
        }
        if self.seen.contains(&paths::layer_key(path)) {
            debug!("{:?} layer already applied: {}", source, path.display());
            return Ok(());
        }
        self.push(layer_io::load_required_layer(source, path)?);
        Ok(())
    }

    /// Merged value plus the metadata of every applied layer.
    fn finish(self) -> (Value, Vec<ConfigLayer>) {
        let mut merged = Value::Object(serde_json::Map::new());
        let mut applied = Vec::with_capacity(self.layers.len());
        for layer in self.layers {
            merge::overlay(&mut merged, &layer.value);
            applied.push(layer.meta);
        }
        (merged, applied)
    }
}
