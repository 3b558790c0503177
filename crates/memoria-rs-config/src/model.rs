//! Configuration schema for Memoria.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Path value that selects an in-memory SQLite database.
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Root config for the Memoria store and its front ends.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MemoriaConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub tagging: TaggingConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl MemoriaConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> MemoriaConfigBuilder {
        MemoriaConfigBuilder::new()
    }
}

/// Builder for assembling a `MemoriaConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct MemoriaConfigBuilder {
    config: MemoriaConfig,
}

impl MemoriaConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: MemoriaConfig::default(),
        }
    }

    /// Replace the store configuration.
    pub fn store(mut self, store: StoreConfig) -> Self {
        self.config.store = store;
        self
    }

    /// Replace the tagging configuration.
    pub fn tagging(mut self, tagging: TaggingConfig) -> Self {
        self.config.tagging = tagging;
        self
    }

    /// Replace the HTTP server configuration.
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.config.server = server;
        self
    }

    /// Finalize and return the built `MemoriaConfig`.
    pub fn build(self) -> MemoriaConfig {
        self.config
    }
}

/// Storage engine backing the store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackendKind {
    /// SQLite file (or `:memory:`).
    #[default]
    Sqlite,
    /// Process-local maps; nothing survives a restart.
    Memory,
}

/// Persistence and retention settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackendKind,
    /// SQLite database path; `:memory:` keeps it in process memory.
    #[serde(default = "default_store_path")]
    pub path: String,
    #[serde(default = "default_max_active_per_user")]
    pub max_active_per_user: usize,
    #[serde(default = "default_archive_batch_size")]
    pub archive_batch_size: usize,
}

impl StoreConfig {
    /// Whether the SQLite path points at an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.backend == StoreBackendKind::Memory || self.path == IN_MEMORY_PATH
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackendKind::default(),
            path: default_store_path(),
            max_active_per_user: default_max_active_per_user(),
            archive_batch_size: default_archive_batch_size(),
        }
    }
}

fn default_store_path() -> String {
    "memoria.db".to_string()
}

fn default_max_active_per_user() -> usize {
    500
}

fn default_archive_batch_size() -> usize {
    100
}

/// Tagger pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaggingConfig {
    /// Run the built-in risk keyword tagger.
    #[serde(default = "default_true")]
    pub risk_keywords: bool,
    /// Tag name to keywords; a record gets the tag when its content contains any keyword.
    #[serde(default)]
    pub keywords: BTreeMap<String, Vec<String>>,
    /// Warn when a single tagger runs longer than this; `None` disables the warning.
    #[serde(default = "default_slow_tagger_warn_ms")]
    pub slow_tagger_warn_ms: Option<u64>,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            risk_keywords: true,
            keywords: BTreeMap::new(),
            slow_tagger_warn_ms: default_slow_tagger_warn_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_slow_tagger_warn_ms() -> Option<u64> {
    Some(250)
}

/// HTTP transport settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Upper bound for `k` on the relevant-records endpoint.
    #[serde(default = "default_max_relevant_k")]
    pub max_relevant_k: usize,
    /// `k` used when the relevant-records request omits it.
    #[serde(default = "default_relevant_k")]
    pub default_relevant_k: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_relevant_k: default_max_relevant_k(),
            default_relevant_k: default_relevant_k(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_relevant_k() -> usize {
    200
}

fn default_relevant_k() -> usize {
    5
}
