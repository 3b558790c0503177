//! Tests for layered configuration loading.

use super::*;
use crate::StoreBackendKind;
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

/// Options pointing every default location inside the temp dir.
fn options_in(root: &Path) -> LayeredConfigOptions {
    let mut options = LayeredConfigOptions::isolated(root.join("cwd"));
    options.system_config_path = Some(root.join("system.json5"));
    options.user_config_path = Some(root.join("user.json5"));
    options.requirements_path = Some(root.join("requirements.json5"));
    options
}

#[test]
fn parse_minimal_config() {
    let config = MemoriaConfig::load_from_str("{}").expect("config");
    assert_eq!(config.store.max_active_per_user, 500);
    assert_eq!(config.store.archive_batch_size, 100);
    assert_eq!(config.store.backend, StoreBackendKind::Sqlite);
    assert_eq!(config.server.bind, "127.0.0.1:8080");
    assert!(config.tagging.risk_keywords);
}

#[test]
fn rejects_unknown_nested_key_with_path() {
    let err = MemoriaConfig::load_from_str("{ store: { max_active: 3 } }").unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("store.max_active"), "{msg}");
    assert!(msg.contains("unknown key"), "{msg}");
}

#[test]
fn rejects_zero_bounds() {
    let err =
        MemoriaConfig::load_from_str("{ store: { archive_batch_size: 0 } }").unwrap_err();
    assert!(format!("{err}").contains("store.archive_batch_size"));
}

#[test]
fn rejects_unknown_backend() {
    let err = MemoriaConfig::load_from_str("{ store: { backend: \"postgres\" } }").unwrap_err();
    assert!(format!("{err}").contains("invalid store backend"));
}

#[test]
fn rejects_default_k_above_max() {
    let err = MemoriaConfig::load_from_str(
        "{ server: { max_relevant_k: 3, default_relevant_k: 4 } }",
    )
    .unwrap_err();
    assert!(format!("{err}").contains("server.default_relevant_k"));
}

#[test]
fn parses_keyword_tags() {
    let config = MemoriaConfig::load_from_str(
        r#"{
            // JSON5 comments are fine
            tagging: { keywords: { "topic:work": ["boss", "deadline"] }, slow_tagger_warn_ms: null },
        }"#,
    )
    .expect("config");
    assert_eq!(
        config.tagging.keywords.get("topic:work"),
        Some(&vec!["boss".to_string(), "deadline".to_string()])
    );
    assert_eq!(config.tagging.slow_tagger_warn_ms, None);
}

#[test]
fn later_layers_override_earlier_ones() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    write_json5(
        &root.join("system.json5"),
        "{ store: { max_active_per_user: 10, archive_batch_size: 2 } }",
    );
    write_json5(&root.join("user.json5"), "{ store: { max_active_per_user: 20 } }");
    write_json5(
        &root.join("cwd").join(DEFAULT_CONFIG_FILE),
        "{ store: { max_active_per_user: 30 } }",
    );
    let runtime = root.join("runtime.json5");
    write_json5(&runtime, "{ server: { bind: \"0.0.0.0:9000\" } }");

    let layered =
        MemoriaConfig::load_layered_with_options(options_in(root).with_runtime_path(&runtime))
            .expect("layered");
    assert_eq!(layered.config.store.max_active_per_user, 30);
    assert_eq!(layered.config.store.archive_batch_size, 2);
    assert_eq!(layered.config.server.bind, "0.0.0.0:9000");
    let sources: Vec<ConfigLayerSource> =
        layered.layers.iter().map(|layer| layer.source).collect();
    assert_eq!(
        sources,
        vec![
            ConfigLayerSource::System,
            ConfigLayerSource::User,
            ConfigLayerSource::Cwd,
            ConfigLayerSource::Runtime,
        ]
    );
}

#[test]
fn requirements_lock_overrides() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    write_json5(
        &root.join("requirements.json5"),
        "{ store: { max_active_per_user: 50 } }",
    );
    let runtime = root.join("runtime.json5");
    write_json5(
        &runtime,
        "{ store: { max_active_per_user: 5000, archive_batch_size: 7 } }",
    );

    let layered =
        MemoriaConfig::load_layered_with_options(options_in(root).with_runtime_path(&runtime))
            .expect("layered");
    assert_eq!(layered.config.store.max_active_per_user, 50);
    assert_eq!(layered.config.store.archive_batch_size, 7);
}

#[test]
fn env_database_path_overrides_files() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    write_json5(&root.join("user.json5"), "{ store: { path: \"user.db\" } }");

    let layered = load_layers(options_in(root), Some("/var/lib/memoria/env.db".to_string()))
        .expect("layered");
    assert_eq!(layered.config.store.path, "/var/lib/memoria/env.db");
    assert_eq!(
        layered.layers.last().map(|layer| layer.source),
        Some(ConfigLayerSource::Env)
    );
}

#[test]
fn relative_store_path_resolves_against_cwd() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    let cwd = root.join("cwd");
    fs::create_dir_all(&cwd).expect("cwd");
    write_json5(&cwd.join(DEFAULT_CONFIG_FILE), "{ store: { path: \"data/m.db\" } }");

    let layered = load_layers(options_in(root), None).expect("layered");
    let expected = utils::normalize_path(&cwd)
        .expect("normalize")
        .join("data/m.db");
    assert_eq!(Path::new(&layered.config.store.path), expected.as_path());
}

#[test]
fn in_memory_path_is_left_alone() {
    let temp = TempDir::new().expect("tmp");
    let layered = load_layers(options_in(temp.path()), Some(":memory:".to_string()))
        .expect("layered");
    assert_eq!(layered.config.store.path, ":memory:");
    assert!(layered.config.store.is_in_memory());
}

#[test]
fn invalid_layer_reports_its_origin() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    write_json5(&root.join("user.json5"), "{ server: { bind: 8080 } }");
    let err = load_layers(options_in(root), None).unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("user("), "{msg}");
    assert!(msg.contains("server.bind"), "{msg}");
}
