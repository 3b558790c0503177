use memoria_rs_memory::{
    ImportBatch, InMemoryBackend, MemoryBackend, MemoryError, MemoryRecord, Tier,
    query::RecordQuery,
};
use parking_lot::Mutex;

/// Backend operation that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Insert,
    Archive,
    Query,
    Import,
}

/// In-memory backend that fails selected operations a fixed number of times.
#[derive(Debug, Default)]
pub struct FlakyBackend {
    inner: InMemoryBackend,
    failures: Mutex<Vec<(FailPoint, usize)>>,
    archive_calls: Mutex<usize>,
}

impl FlakyBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` calls hitting `point`.
    pub fn fail(&self, point: FailPoint, times: usize) {
        self.failures.lock().push((point, times));
    }

    /// Number of `archive_oldest` calls seen so far, failed ones included.
    pub fn archive_calls(&self) -> usize {
        *self.archive_calls.lock()
    }

    fn trip(&self, point: FailPoint) -> Result<(), MemoryError> {
        let mut failures = self.failures.lock();
        let Some(entry) = failures
            .iter_mut()
            .find(|(candidate, remaining)| *candidate == point && *remaining > 0)
        else {
            return Ok(());
        };
        entry.1 -= 1;
        Err(MemoryError::StorageUnavailable(format!(
            "injected failure at {point:?}"
        )))
    }
}

impl MemoryBackend for FlakyBackend {
    fn insert_active(&self, record: &MemoryRecord) -> Result<(), MemoryError> {
        self.trip(FailPoint::Insert)?;
        self.inner.insert_active(record)
    }

    fn archive_oldest(&self, user_id: &str, batch: usize) -> Result<Vec<MemoryRecord>, MemoryError> {
        *self.archive_calls.lock() += 1;
        self.trip(FailPoint::Archive)?;
        self.inner.archive_oldest(user_id, batch)
    }

    fn count(&self, tier: Tier, user_id: Option<&str>) -> Result<usize, MemoryError> {
        self.inner.count(tier, user_id)
    }

    fn distinct_users(&self, tier: Tier) -> Result<usize, MemoryError> {
        self.inner.distinct_users(tier)
    }

    fn query(&self, tier: Tier, query: &RecordQuery) -> Result<Vec<MemoryRecord>, MemoryError> {
        self.trip(FailPoint::Query)?;
        self.inner.query(tier, query)
    }

    fn import(&self, batch: &ImportBatch, replace: bool) -> Result<(), MemoryError> {
        self.trip(FailPoint::Import)?;
        self.inner.import(batch, replace)
    }
}
