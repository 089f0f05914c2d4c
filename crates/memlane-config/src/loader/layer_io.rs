//! IO helpers for reading config layers and overrides.

use super::{
    ConfigLayer, ConfigLayerSource, DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILE, DEFAULT_DATA_DIR,
    ENV_DATA_DIR, ENV_EMBEDDING_MODEL, FALLBACK_DATA_DIR, LoadedLayer, schema,
};
use crate::ConfigError;
use directories::UserDirs;
use log::debug;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Load an optional layer if the provided path exists.
pub(super) fn load_optional_layer(
    source: ConfigLayerSource,
    path: Option<&Path>,
) -> Result<Option<LoadedLayer>, ConfigError> {
    let path = match path {
        Some(path) => path,
        None => return Ok(None),
    };

    if !path.exists() {
        debug!(
            "optional layer missing (source={:?}, path={})",
            source,
            path.display()
        );
        return Ok(None);
    }

    Ok(Some(load_required_layer(source, path)?))
}

/// Load and validate a required layer from disk.
pub(super) fn load_required_layer(
    source: ConfigLayerSource,
    path: &Path,
) -> Result<LoadedLayer, ConfigError> {
    debug!(
        "loading config layer (source={:?}, path={})",
        source,
        path.display()
    );
    let value = read_json5(path)?;
    let label = layer_label(source, path);
    schema::validate_layer_schema(&value, &label)?;
    Ok(LoadedLayer {
        meta: ConfigLayer {
            source,
            path: Some(path.to_path_buf()),
        },
        value,
    })
}

/// Read a JSON5 file, reporting a missing file as `MissingLayer`.
pub(super) fn read_json5(path: &Path) -> Result<Value, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => ConfigError::MissingLayer {
            path: path.to_path_buf(),
        },
        _ => ConfigError::ReadFailed(err),
    })?;
    Ok(json5::from_str(&contents)?)
}

/// Build a user-friendly label for schema validation errors.
pub(super) fn layer_label(source: ConfigLayerSource, path: &Path) -> String {
    let name = match source {
        ConfigLayerSource::User => "user",
        ConfigLayerSource::Project => "project",
        ConfigLayerSource::Cwd => "cwd",
        ConfigLayerSource::Runtime => "runtime",
        ConfigLayerSource::Environment => "env",
    };
    format!("{name}({})", path.display())
}

/// Default user config path under the home directory.
pub(super) fn default_user_config_path() -> Option<PathBuf> {
    UserDirs::new().map(|dirs| {
        dirs.home_dir()
            .join(DEFAULT_CONFIG_DIR)
            .join(DEFAULT_CONFIG_FILE)
    })
}

/// Default data directory under the home directory.
pub(super) fn default_data_dir() -> PathBuf {
    match UserDirs::new() {
        Some(dirs) => dirs.home_dir().join(DEFAULT_CONFIG_DIR).join(DEFAULT_DATA_DIR),
        None => PathBuf::from(FALLBACK_DATA_DIR),
    }
}

/// Capture the override variables from the process environment.
pub(super) fn process_environment() -> BTreeMap<String, String> {
    [ENV_DATA_DIR, ENV_EMBEDDING_MODEL]
        .into_iter()
        .filter_map(|name| std::env::var(name).ok().map(|value| (name.to_string(), value)))
        .collect()
}

/// Translate override variables into a partial config value.
pub(super) fn environment_overrides(env: &BTreeMap<String, String>) -> Option<Value> {
    let mut overrides = Map::new();
    if let Some(data_dir) = non_empty(env, ENV_DATA_DIR) {
        overrides.insert("store".to_string(), json!({ "data_dir": data_dir }));
    }
    if let Some(model) = non_empty(env, ENV_EMBEDDING_MODEL) {
        overrides.insert("embedding".to_string(), json!({ "model": model }));
    }
    if overrides.is_empty() {
        None
    } else {
        Some(Value::Object(overrides))
    }
}

fn non_empty<'a>(env: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    env.get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}
