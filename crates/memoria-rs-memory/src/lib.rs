//! Tiered conversational memory: a bounded active tier per user, an
//! unbounded archive, best-effort tagging, and substring search.

pub mod backend;
pub mod error;
mod locks;
pub mod model;
pub mod policy;
pub mod query;
pub mod retention;
pub mod store;
pub mod tagger;

/// Storage port and built-in engines.
pub use backend::{ImportBatch, InMemoryBackend, MemoryBackend, SqliteBackend};
/// Memory error type.
pub use error::MemoryError;
/// Record and payload models.
pub use model::{ImportPayload, ImportRecord, MemoryExport, MemoryInfo, MemoryRecord, Tier};
/// Retention and tagging policies.
pub use policy::{RetentionPolicy, TaggingPolicy};
/// Query options.
pub use query::SearchOptions;
/// Store facade.
pub use store::MemoryStore;
/// Tagger interface and pipeline.
pub use tagger::{FnTagger, Tagger, TaggerError, TaggerOutcome, TaggerPipeline};
