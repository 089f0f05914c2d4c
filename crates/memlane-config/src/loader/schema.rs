//! Schema checks for memlane JSON5 configuration.
//!
//! Each block is described by a table of allowed keys and the JSON type
//! expected for each. Unknown keys are rejected.

use crate::ConfigError;
use serde_json::{Map, Value};

/// JSON type expected for a config field.
#[derive(Debug, Clone, Copy)]
enum Field {
    Str,
    /// Non-negative integer.
    Count,
    Number,
    Bool,
    /// String drawn from a fixed set.
    OneOf(&'static [&'static str]),
}

type Block = &'static [(&'static str, Field)];

const STORE: Block = &[
    ("data_dir", Field::Str),
    ("index_file", Field::Str),
    ("database_file", Field::Str),
    ("persist_every", Field::Count),
    ("metadata_scan_factor", Field::Count),
    ("rebuild_on_open", Field::Bool),
];

const EMBEDDING: Block = &[
    ("provider", Field::OneOf(&["hash", "fastembed"])),
    ("model", Field::Str),
    ("dimension", Field::Count),
];

const SEARCH: Block = &[
    ("max_results", Field::Count),
    ("similarity_threshold", Field::Number),
    ("keyword_weight", Field::Number),
];

const QA: Block = &[
    ("candidate_limit", Field::Count),
    ("recent_count", Field::Count),
    ("context_window", Field::Count),
    ("relevance_weight", Field::Number),
    ("voice_boost", Field::Number),
    ("returned_context", Field::Count),
    ("fallback_snippet_chars", Field::Count),
];

const GENERATION: Block = &[
    ("provider", Field::OneOf(&["none", "openai"])),
    ("model", Field::Str),
    ("api_key_env", Field::Str),
    ("requests_per_minute", Field::Count),
];

const BLOCKS: &[(&str, Block)] = &[
    ("store", STORE),
    ("embedding", EMBEDDING),
    ("search", SEARCH),
    ("qa", QA),
    ("generation", GENERATION),
];

/// Check key names and value types of a layer or of the merged document.
///
/// `layer` prefixes field paths in errors.
pub(super) fn validate_layer_schema(value: &Value, layer: &str) -> Result<(), ConfigError> {
    for (key, value) in as_object(value, layer, "root")? {
        if key == "$schema" {
            check_field(value, Field::Str, layer, key)?;
            continue;
        }
        let Some((_, block)) = BLOCKS.iter().find(|(name, _)| *name == key.as_str()) else {
            return Err(invalid(layer, key, "unknown key"));
        };
        validate_block(value, *block, layer, key)?;
    }
    Ok(())
}

fn validate_block(value: &Value, block: Block, layer: &str, name: &str) -> Result<(), ConfigError> {
    for (key, value) in as_object(value, layer, name)? {
        let path = format!("{name}.{key}");
        match block.iter().find(|(field, _)| *field == key.as_str()) {
            Some((_, field)) => check_field(value, *field, layer, &path)?,
            None => return Err(invalid(layer, &path, "unknown key")),
        }
    }
    Ok(())
}

fn check_field(value: &Value, field: Field, layer: &str, path: &str) -> Result<(), ConfigError> {
    let ok = match field {
        Field::Str => value.is_string(),
        Field::Count => value.is_u64(),
        Field::Number => value.is_number(),
        Field::Bool => value.is_boolean(),
        Field::OneOf(choices) => value
            .as_str()
            .is_some_and(|choice| choices.contains(&choice)),
    };
    if ok {
        return Ok(());
    }
    let message = match field {
        Field::Str => "expected string".to_string(),
        Field::Count => "expected non-negative integer".to_string(),
        Field::Number => "expected number".to_string(),
        Field::Bool => "expected bool".to_string(),
        Field::OneOf(choices) => format!("expected one of {}", choices.join(", ")),
    };
    Err(invalid(layer, path, message))
}

fn as_object<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    value
        .as_object()
        .ok_or_else(|| invalid(layer, path, "expected object"))
}

fn invalid(layer: &str, path: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::field(format!("{layer}:{path}"), message)
}
