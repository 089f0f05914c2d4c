//! Tests for layered configuration loading.

use super::*;
use crate::EmbeddingProvider;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Write JSON5 contents to a path, creating parent directories if needed.
fn write_json5(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("dir");
    }
    fs::write(path, contents).expect("write");
}

/// Options rooted at `cwd` with no user layer and an empty environment.
fn isolated_options(cwd: &Path) -> LayeredConfigOptions {
    let mut options = LayeredConfigOptions::new(cwd);
    options.user_config_path = None;
    options.environment.clear();
    options
}

/// Verify that a minimal config parses with defaults.
#[test]
fn parse_minimal_config() {
    let config = MemlaneConfig::load_from_str("{}").expect("config");
    assert_eq!(config, MemlaneConfig::default());
    assert_eq!(config.store.persist_every, 10);
    assert_eq!(config.search.max_results, 5);
    assert_eq!(config.qa.context_window, 7);
    assert_eq!(config.generation.requests_per_minute, 38);
    assert_eq!(config.embedding.provider, EmbeddingProvider::Hash);
}

/// Reject unexpected top-level config keys.
#[test]
fn rejects_unknown_top_level_key() {
    let err = MemlaneConfig::load_from_str(r#"{ unexpected: true }"#).unwrap_err();
    assert!(format!("{err}").contains("unknown key"));
}

/// Reject unknown embedding providers with the field path in the message.
#[test]
fn rejects_invalid_embedding_provider() {
    let err =
        MemlaneConfig::load_from_str(r#"{ embedding: { provider: "word2vec" } }"#).unwrap_err();
    assert!(format!("{err}").contains("embedding.provider"));
}

/// Reject a zero persist cadence.
#[test]
fn rejects_zero_persist_every() {
    let err = MemlaneConfig::load_from_str(r#"{ store: { persist_every: 0 } }"#).unwrap_err();
    assert!(format!("{err}").contains("store.persist_every"));
}

/// Reject keyword weights outside the unit interval.
#[test]
fn rejects_keyword_weight_out_of_range() {
    let err = MemlaneConfig::load_from_str(r#"{ search: { keyword_weight: 1.5 } }"#).unwrap_err();
    assert!(format!("{err}").contains("search.keyword_weight"));
}

/// Reject configs that point the index and database at the same file.
#[test]
fn rejects_shared_store_files() {
    let err = MemlaneConfig::load_from_str(
        r#"{ store: { index_file: "state.bin", database_file: "state.bin" } }"#,
    )
    .unwrap_err();
    assert!(format!("{err}").contains("must differ"));
}

/// Ensure cwd config takes precedence over project and user config.
#[test]
fn layered_config_prefers_cwd_over_project() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    let project_root = root.join("project");
    fs::create_dir_all(project_root.join(".git")).expect("git");
    let cwd = project_root.join("subdir");
    fs::create_dir_all(&cwd).expect("cwd");

    let user_config = root.join("user.json5");
    write_json5(
        &user_config,
        "{ search: { max_results: 2, similarity_threshold: 0.1 } }",
    );
    write_json5(
        &project_root.join(DEFAULT_CONFIG_FILE),
        "{ search: { max_results: 4 }, qa: { recent_count: 1 } }",
    );
    write_json5(
        &cwd.join(DEFAULT_CONFIG_FILE),
        "{ search: { max_results: 8 } }",
    );

    let mut options = isolated_options(&cwd);
    options.user_config_path = Some(user_config);
    let layered = MemlaneConfig::load_layered_with_options(options).expect("layered");

    assert_eq!(layered.config.search.max_results, 8);
    assert_eq!(layered.config.search.similarity_threshold, 0.1);
    assert_eq!(layered.config.qa.recent_count, 1);
    let sources: Vec<_> = layered.layers.iter().map(|layer| layer.source).collect();
    assert_eq!(
        sources,
        vec![
            ConfigLayerSource::User,
            ConfigLayerSource::Project,
            ConfigLayerSource::Cwd
        ]
    );
}

/// The project layer is loaded once when cwd is the project root.
#[test]
fn project_root_cwd_is_not_loaded_twice() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    fs::create_dir_all(root.join(".git")).expect("git");
    write_json5(&root.join(DEFAULT_CONFIG_FILE), "{ qa: { voice_boost: 0.5 } }");

    let layered =
        MemlaneConfig::load_layered_with_options(isolated_options(root)).expect("layered");
    assert_eq!(layered.layers.len(), 1);
    assert_eq!(layered.layers[0].source, ConfigLayerSource::Project);
    assert_eq!(layered.config.qa.voice_boost, 0.5);
}

/// Runtime override files win over local layers.
#[test]
fn runtime_override_wins() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    write_json5(
        &root.join(DEFAULT_CONFIG_FILE),
        "{ generation: { provider: \"openai\", model: \"local\" } }",
    );
    let runtime = root.join("override.json5");
    write_json5(&runtime, "{ generation: { model: \"override\" } }");

    let options = isolated_options(root).with_runtime_path(&runtime);
    let layered = MemlaneConfig::load_layered_with_options(options).expect("layered");
    assert_eq!(layered.config.generation.model, "override");
    assert_eq!(
        layered.config.generation.provider,
        crate::GenerationProvider::Openai
    );
}

/// A missing runtime override file is reported rather than skipped.
#[test]
fn missing_runtime_override_fails() {
    let temp = TempDir::new().expect("tmp");
    let options = isolated_options(temp.path()).with_runtime_path(temp.path().join("nope.json5"));
    let err = MemlaneConfig::load_layered_with_options(options).unwrap_err();
    assert!(matches!(err, ConfigError::MissingLayer { .. }));
}

/// Loading a single file by path names the missing file.
#[test]
fn load_from_missing_path_names_file() {
    let temp = TempDir::new().expect("tmp");
    let path = temp.path().join("absent.json5");
    match MemlaneConfig::load_from_path(&path) {
        Err(ConfigError::MissingLayer { path: missing }) => assert_eq!(missing, path),
        other => panic!("expected missing layer, got {other:?}"),
    }
}

/// Schema errors in a layer are labelled with the layer origin.
#[test]
fn layer_schema_errors_name_the_layer() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    write_json5(&root.join(DEFAULT_CONFIG_FILE), "{ store: { persist_every: \"often\" } }");

    let err = MemlaneConfig::load_layered_with_options(isolated_options(root)).unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("cwd("));
    assert!(msg.contains("store.persist_every"));
}

/// Environment overrides apply last and are recorded as a layer.
#[test]
fn environment_overrides_apply_last() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    write_json5(
        &root.join(DEFAULT_CONFIG_FILE),
        "{ store: { data_dir: \"/from/file\" } }",
    );

    let mut options = isolated_options(root);
    options
        .environment
        .insert(ENV_DATA_DIR.to_string(), "/from/env".to_string());
    options
        .environment
        .insert(ENV_EMBEDDING_MODEL.to_string(), "  ".to_string());
    let layered = MemlaneConfig::load_layered_with_options(options).expect("layered");

    assert_eq!(layered.config.store.data_dir.as_deref(), Some("/from/env"));
    assert_eq!(layered.config.embedding.model, "all-MiniLM-L6-v2");
    assert_eq!(
        layered.layers.last().map(|layer| layer.source),
        Some(ConfigLayerSource::Environment)
    );
}

/// An explicit data directory is used as given.
#[test]
fn data_dir_prefers_configured_value() {
    let config = MemlaneConfig::builder().data_dir("/tmp/memlane-data").build();
    assert_eq!(config.data_dir(), std::path::PathBuf::from("/tmp/memlane-data"));
}
