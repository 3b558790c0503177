//! Public SDK surface for Memoria.
//!
//! This crate re-exports the building blocks and wires a `MemoryStore` from a
//! loaded `MemoriaConfig` so the binary and embedders assemble it the same way.

/// Re-export for convenience.
pub use memoria_rs_config as config;
/// Re-export for convenience.
pub use memoria_rs_memory as memory;
/// Re-export for convenience.
pub use memoria_rs_server as server;
/// Re-export for convenience.
pub use memoria_rs_signals as signals;

use log::info;
use memoria_rs_config::{MemoriaConfig, StoreBackendKind, StoreConfig, TaggingConfig};
use memoria_rs_memory::{
    InMemoryBackend, MemoryBackend, MemoryError, MemoryStore, RetentionPolicy, SqliteBackend,
    TaggerPipeline, TaggingPolicy,
};
use memoria_rs_signals::{KeywordTagger, RiskKeywordTagger};
use std::sync::Arc;
use std::time::Duration;

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
///
/// This is a no-op if the feature is not enabled. Binaries are still expected
/// to call this early in startup to ensure log output is wired up.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::builder()
            .format_timestamp_millis()
            .parse_default_env()
            .try_init();
    }
}

/// Open the storage engine named by the store config.
pub fn open_backend(store: &StoreConfig) -> Result<Arc<dyn MemoryBackend>, MemoryError> {
    let backend: Arc<dyn MemoryBackend> = match store.backend {
        StoreBackendKind::Memory => Arc::new(InMemoryBackend::new()),
        StoreBackendKind::Sqlite if store.is_in_memory() => {
            Arc::new(SqliteBackend::open_in_memory()?)
        }
        StoreBackendKind::Sqlite => Arc::new(SqliteBackend::open(&store.path)?),
    };
    info!(
        "opened memory backend (backend={:?}, path={})",
        store.backend, store.path
    );
    Ok(backend)
}

/// Taggers enabled by the tagging config, in pipeline order.
pub fn build_taggers(tagging: &TaggingConfig) -> TaggerPipeline {
    let policy = TaggingPolicy {
        slow_tagger_warn: tagging.slow_tagger_warn_ms.map(Duration::from_millis),
    };
    let mut pipeline = TaggerPipeline::default().with_policy(policy);
    if tagging.risk_keywords {
        pipeline.push(Arc::new(RiskKeywordTagger::new()));
    }
    let keywords = KeywordTagger::new(tagging.keywords.clone());
    if !keywords.is_empty() {
        pipeline.push(Arc::new(keywords));
    }
    pipeline
}

/// Assemble a store from config: backend, retention bounds, and taggers.
pub fn build_store(config: &MemoriaConfig) -> Result<MemoryStore, MemoryError> {
    let retention = RetentionPolicy::new(
        config.store.max_active_per_user,
        config.store.archive_batch_size,
    )?;
    let taggers = build_taggers(&config.tagging);
    info!(
        "building memory store (max_active_per_user={}, archive_batch_size={}, taggers={})",
        retention.max_active_per_user,
        retention.archive_batch_size,
        taggers.len()
    );
    MemoryStore::new(open_backend(&config.store)?)
        .with_retention(retention)
        .map(|store| store.with_taggers(taggers))
}
