//! Layered configuration loader with locked settings.
//!
//! Discovers configuration layers (system/user/cwd/runtime), validates each
//! against the schema, merges them under optional requirements, applies
//! environment overrides, and produces a final `MemoriaConfig`.

mod layer_io;
mod merge;
mod schema;
mod utils;

#[cfg(test)]
mod tests;

use crate::{ConfigError, IN_MEMORY_PATH, MemoriaConfig};
use log::{debug, info};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Default config filename in local layers.
const DEFAULT_CONFIG_FILE: &str = "memoria.json5";
/// Default config directory under the user's home.
const DEFAULT_CONFIG_DIR: &str = ".memoria";
/// Environment variable overriding `store.path`.
pub const DATABASE_PATH_ENV: &str = "MEMORIA_DATABASE_PATH";

#[cfg(unix)]
/// Default system config path on Unix.
const SYSTEM_CONFIG_PATH: &str = "/etc/memoria/memoria.json5";
#[cfg(unix)]
/// Default requirements path on Unix.
const SYSTEM_REQUIREMENTS_PATH: &str = "/etc/memoria/requirements.json5";

/// Effective config plus metadata about which layers were loaded.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// The merged, validated config.
    pub config: MemoriaConfig,
    /// Metadata for each layer considered during load.
    pub layers: Vec<ConfigLayer>,
}

/// Origin for a single config layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// Locked settings that later layers cannot override.
    Requirements,
    /// System-wide configuration.
    System,
    /// User-specific configuration.
    User,
    /// Current working directory configuration.
    Cwd,
    /// Runtime overrides such as `--config` (highest file precedence).
    Runtime,
    /// Environment variables, applied after every file.
    Env,
}

/// Metadata about a config layer.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    /// Layer origin.
    pub source: ConfigLayerSource,
    /// Location on disk if present.
    pub path: Option<PathBuf>,
}

/// Schema validation mode for layered configs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchemaMode {
    /// Type and key checks only; a single layer may set a value that is
    /// only meaningful once merged.
    Partial,
    /// Type checks plus range checks for the effective config.
    Full,
}

/// Options controlling layered config discovery and overrides.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    /// Working directory used to resolve relative paths and the cwd layer.
    pub cwd: PathBuf,
    /// Optional system config path (defaults to `/etc/memoria/memoria.json5` on Unix).
    pub system_config_path: Option<PathBuf>,
    /// Optional user config path (defaults to `~/.memoria/memoria.json5`).
    pub user_config_path: Option<PathBuf>,
    /// Optional requirements path for locked settings.
    pub requirements_path: Option<PathBuf>,
    /// Runtime override config paths applied after the file layers.
    pub runtime_paths: Vec<PathBuf>,
    /// Read `MEMORIA_DATABASE_PATH` from the process environment.
    pub read_env: bool,
}

impl LayeredConfigOptions {
    /// Create options with default layer locations for the provided cwd.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            system_config_path: layer_io::default_system_config_path(),
            user_config_path: layer_io::default_user_config_path(),
            requirements_path: layer_io::default_requirements_path(),
            runtime_paths: Vec::new(),
            read_env: true,
        }
    }

    /// Options that only read the given runtime files, for tests and tools.
    pub fn isolated(cwd: impl AsRef<Path>) -> Self {
        Self {
            system_config_path: None,
            user_config_path: None,
            requirements_path: None,
            read_env: false,
            ..Self::new(cwd)
        }
    }

    /// Add a runtime override config path that is applied last.
    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }
}

impl MemoriaConfig {
    /// Load a single config from a path (no layering).
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("loading config from path: {}", path.display());
        let contents = fs::read_to_string(path).map_err(|err| ConfigError::read(path, err))?;
        let value: Value = json5::from_str(&contents)?;
        config_from_value(value, "config")
    }

    /// Load a single config from JSON5 contents (no layering).
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        config_from_value(value, "config")
    }

    /// Load a layered config stack using the default layer locations.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        info!(
            "loading layered config with defaults (cwd={})",
            cwd.as_ref().display()
        );
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Load a layered config stack using explicit layer locations and overrides.
    ///
    /// Layer precedence (low -> high): system, user, cwd, runtime overrides,
    /// environment. Keys present in the requirements layer win over all of them.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let env_database_path = if options.read_env {
            std::env::var(DATABASE_PATH_ENV)
                .ok()
                .filter(|value| !value.trim().is_empty())
        } else {
            None
        };
        load_layers(options, env_database_path)
    }

    /// Validate configuration invariants that cannot be expressed in serde.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("store.max_active_per_user", self.store.max_active_per_user)?;
        positive("store.archive_batch_size", self.store.archive_batch_size)?;
        positive("server.max_relevant_k", self.server.max_relevant_k)?;
        positive("server.default_relevant_k", self.server.default_relevant_k)?;
        if self.server.default_relevant_k > self.server.max_relevant_k {
            return Err(ConfigError::InvalidField {
                path: "server.default_relevant_k".to_string(),
                message: "must not exceed server.max_relevant_k".to_string(),
            });
        }
        if self.store.path.trim().is_empty() {
            return Err(ConfigError::InvalidField {
                path: "store.path".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        for (tag, keywords) in &self.tagging.keywords {
            if tag.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "tagging.keywords entries require a tag name".to_string(),
                ));
            }
            if keywords.iter().all(|keyword| keyword.trim().is_empty()) {
                return Err(ConfigError::InvalidField {
                    path: format!("tagging.keywords.{tag}"),
                    message: "requires at least one keyword".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn positive(path: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidField {
            path: path.to_string(),
            message: "must be positive".to_string(),
        });
    }
    Ok(())
}

/// Internal representation of a loaded config layer.
#[derive(Debug, Clone)]
struct LoadedLayer {
    meta: ConfigLayer,
    value: Value,
}

fn load_layers(
    options: LayeredConfigOptions,
    env_database_path: Option<String>,
) -> Result<LayeredConfig, ConfigError> {
    let cwd = utils::normalize_path(&options.cwd)?;
    debug!("normalized cwd for config load: {}", cwd.display());
    let mut layers = Vec::new();
    let mut merge_layers = Vec::new();
    let mut seen_paths = HashSet::new();

    let requirements = layer_io::load_optional_layer(
        ConfigLayerSource::Requirements,
        options.requirements_path.as_deref(),
    )?;
    let requirements_value = requirements.as_ref().map(|layer| layer.value.clone());
    if let Some(layer) = requirements {
        debug!("loaded requirements layer");
        layers.push(layer.meta);
    }

    let cwd_config = cwd.join(DEFAULT_CONFIG_FILE);
    for (source, path) in [
        (
            ConfigLayerSource::System,
            options.system_config_path.as_deref(),
        ),
        (ConfigLayerSource::User, options.user_config_path.as_deref()),
        (ConfigLayerSource::Cwd, Some(cwd_config.as_path())),
    ] {
        let Some(path) = path else {
            continue;
        };
        if path.exists() && !seen_paths.insert(utils::unique_path(path)) {
            debug!(
                "skipping duplicate layer (source={:?}, path={})",
                source,
                path.display()
            );
            continue;
        }
        if let Some(layer) = layer_io::load_optional_layer(source, Some(path))? {
            debug!("loaded {:?} layer", source);
            layers.push(layer.meta.clone());
            merge_layers.push(layer);
        }
    }

    for runtime_path in &options.runtime_paths {
        let loaded = layer_io::load_required_layer(ConfigLayerSource::Runtime, runtime_path)?;
        debug!("loaded runtime layer (path={})", runtime_path.display());
        layers.push(loaded.meta.clone());
        merge_layers.push(loaded);
    }

    if let Some(database_path) = env_database_path {
        debug!("applying {DATABASE_PATH_ENV} override");
        merge_layers.push(LoadedLayer {
            meta: ConfigLayer {
                source: ConfigLayerSource::Env,
                path: None,
            },
            value: serde_json::json!({ "store": { "path": database_path } }),
        });
        layers.push(ConfigLayer {
            source: ConfigLayerSource::Env,
            path: None,
        });
    }

    let mut merged = Value::Object(serde_json::Map::new());
    if let Some(requirements_value) = &requirements_value {
        merge::merge_layer(&mut merged, requirements_value, None);
    }
    for layer in merge_layers {
        merge::merge_layer(&mut merged, &layer.value, requirements_value.as_ref());
    }

    let mut config = config_from_value(merged, "effective")?;
    if config.store.path != IN_MEMORY_PATH {
        config.store.path = utils::resolve_relative(&cwd, &config.store.path);
    }
    info!(
        "layered config loaded (layers={}, store_path={})",
        layers.len(),
        config.store.path
    );
    Ok(LayeredConfig { config, layers })
}

fn config_from_value(value: Value, label: &str) -> Result<MemoriaConfig, ConfigError> {
    schema::validate_layer_schema(&value, SchemaMode::Full, label)?;
    let config: MemoriaConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}
