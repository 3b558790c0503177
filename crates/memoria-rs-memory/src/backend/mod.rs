//! Storage port for the active and archive tiers.
//!
//! The store facade only talks to `MemoryBackend`; engines implement it with
//! whatever transactional primitive they have.

mod memory;
mod sqlite;

use crate::error::MemoryError;
use crate::model::{MemoryRecord, Tier};
use crate::query::RecordQuery;

pub use memory::InMemoryBackend;
pub use sqlite::SqliteBackend;

/// Fully resolved records to write during an import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportBatch {
    pub active: Vec<MemoryRecord>,
    pub archive: Vec<MemoryRecord>,
}

impl ImportBatch {
    pub fn len(&self) -> usize {
        self.active.len() + self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.archive.is_empty()
    }

    /// Records paired with their destination tier, active first.
    pub fn iter(&self) -> impl Iterator<Item = (Tier, &MemoryRecord)> {
        self.active
            .iter()
            .map(|record| (Tier::Active, record))
            .chain(self.archive.iter().map(|record| (Tier::Archive, record)))
    }
}

/// Row-store capabilities required by the memory store.
pub trait MemoryBackend: Send + Sync {
    /// Insert a new record into the active tier.
    fn insert_active(&self, record: &MemoryRecord) -> Result<(), MemoryError>;

    /// Atomically move up to `batch` of the user's oldest active records into
    /// the archive, returning them in migration order.
    ///
    /// Either every selected record ends up in the archive and out of the
    /// active tier, or nothing changes.
    fn archive_oldest(&self, user_id: &str, batch: usize) -> Result<Vec<MemoryRecord>, MemoryError>;

    /// Count records in a tier, optionally for one user.
    fn count(&self, tier: Tier, user_id: Option<&str>) -> Result<usize, MemoryError>;

    /// Number of distinct users with at least one record in the tier.
    fn distinct_users(&self, tier: Tier) -> Result<usize, MemoryError>;

    /// Read records from a tier.
    fn query(&self, tier: Tier, query: &RecordQuery) -> Result<Vec<MemoryRecord>, MemoryError>;

    /// Upsert records by id in one transaction, clearing both tiers first when
    /// `replace` is set. An id already stored in the other tier is moved.
    fn import(&self, batch: &ImportBatch, replace: bool) -> Result<(), MemoryError>;
}
