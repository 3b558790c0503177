//! Schema validation helpers for Memoria JSON5 configuration.

use super::SchemaMode;
use crate::ConfigError;
use serde_json::{Map, Value};

/// Validate a single config layer against the schema.
///
/// Unknown keys and wrong types fail in every mode; `Full` also rejects
/// zero where a positive integer is required.
pub(super) fn validate_layer_schema(
    value: &Value,
    mode: SchemaMode,
    layer: &str,
) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, "")?;
    ensure_allowed_keys(map, &["$schema", "store", "tagging", "server"], layer, "")?;

    if let Some(value) = map.get("$schema") {
        expect_string(value, layer, "$schema")?;
    }
    if let Some(value) = map.get("store") {
        validate_store(value, mode, layer, "store")?;
    }
    if let Some(value) = map.get("tagging") {
        validate_tagging(value, layer, "tagging")?;
    }
    if let Some(value) = map.get("server") {
        validate_server(value, mode, layer, "server")?;
    }
    Ok(())
}

/// Validate the "store" block.
fn validate_store(value: &Value, mode: SchemaMode, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["backend", "path", "max_active_per_user", "archive_batch_size"],
        layer,
        path,
    )?;

    if let Some(value) = map.get("backend") {
        validate_store_backend(value, layer, &join_path(path, "backend"))?;
    }
    if let Some(value) = map.get("path") {
        expect_string(value, layer, &join_path(path, "path"))?;
    }
    for key in ["max_active_per_user", "archive_batch_size"] {
        if let Some(value) = map.get(key) {
            expect_count(value, mode, layer, &join_path(path, key))?;
        }
    }
    Ok(())
}

/// Validate store backend names.
fn validate_store_backend(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let Some(backend) = value.as_str() else {
        return Err(invalid_field(layer, path, "expected string"));
    };
    if matches!(backend, "sqlite" | "memory") {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "invalid store backend"))
    }
}

/// Validate the "tagging" block.
fn validate_tagging(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["risk_keywords", "keywords", "slow_tagger_warn_ms"],
        layer,
        path,
    )?;

    if let Some(value) = map.get("risk_keywords") {
        expect_bool(value, layer, &join_path(path, "risk_keywords"))?;
    }
    if let Some(value) = map.get("slow_tagger_warn_ms") {
        if !value.is_null() {
            expect_u64(value, layer, &join_path(path, "slow_tagger_warn_ms"))?;
        }
    }
    if let Some(value) = map.get("keywords") {
        let keywords_path = join_path(path, "keywords");
        let keywords = expect_object(value, layer, &keywords_path)?;
        for (tag, entries) in keywords {
            validate_string_array(entries, layer, &join_path(&keywords_path, tag))?;
        }
    }
    Ok(())
}

/// Validate the "server" block.
fn validate_server(value: &Value, mode: SchemaMode, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["bind", "max_relevant_k", "default_relevant_k"],
        layer,
        path,
    )?;

    if let Some(value) = map.get("bind") {
        expect_string(value, layer, &join_path(path, "bind"))?;
    }
    for key in ["max_relevant_k", "default_relevant_k"] {
        if let Some(value) = map.get(key) {
            expect_count(value, mode, layer, &join_path(path, key))?;
        }
    }
    Ok(())
}

/// Expect a JSON object or return a typed error.
fn expect_object<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(invalid_field(layer, path, "expected object")),
    }
}

/// Expect a JSON string or return a typed error.
fn expect_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.as_str().is_some() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected string"))
    }
}

/// Expect a JSON boolean or return a typed error.
fn expect_bool(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if matches!(value, Value::Bool(_)) {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected bool"))
    }
}

/// Expect a non-negative JSON integer or return a typed error.
fn expect_u64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_u64() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected non-negative integer"))
    }
}

/// Expect a count; zero is rejected once layers are merged.
fn expect_count(value: &Value, mode: SchemaMode, layer: &str, path: &str) -> Result<(), ConfigError> {
    expect_u64(value, layer, path)?;
    if mode == SchemaMode::Full && value.as_u64() == Some(0) {
        return Err(invalid_field(layer, path, "must be positive"));
    }
    Ok(())
}

/// Validate that a value is an array of strings.
fn validate_string_array(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let Value::Array(arr) = value else {
        return Err(invalid_field(layer, path, "expected array"));
    };
    for (idx, entry) in arr.iter().enumerate() {
        if entry.as_str().is_none() {
            return Err(invalid_field(
                layer,
                &format!("{path}[{idx}]"),
                "expected string",
            ));
        }
    }
    Ok(())
}

/// Ensure an object contains only allowed keys.
fn ensure_allowed_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    for key in map.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(invalid_field(layer, &join_path(path, key), "unknown key"));
        }
    }
    Ok(())
}

/// Join nested paths for better error messages.
fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Build a structured invalid-field error.
fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let normalized_path = if path.is_empty() { "root" } else { path };
    ConfigError::InvalidField {
        path: format!("{layer}:{normalized_path}"),
        message: message.to_string(),
    }
}
