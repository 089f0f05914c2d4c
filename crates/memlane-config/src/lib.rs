//! Configuration models and layered config loading.
//!
//! This crate owns the memlane config schema, validation, and layer-merging
//! logic used by the assistant and the command-line tool.

mod error;
mod loader;
mod model;

/// Public error type returned by config loading and validation APIs.
pub use error::ConfigError;
/// Layered config types and loader options.
pub use loader::{
    ConfigLayer, ConfigLayerSource, ENV_DATA_DIR, ENV_EMBEDDING_MODEL, LayeredConfig,
    LayeredConfigOptions,
};
/// Configuration schema models.
pub use model::*;
