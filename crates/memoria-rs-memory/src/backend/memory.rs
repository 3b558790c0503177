//! Process-local backend used for tests and ephemeral deployments.

use super::{ImportBatch, MemoryBackend};
use crate::error::MemoryError;
use crate::model::{MemoryRecord, Tier};
use crate::query::{Order, RecordQuery};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Ordering key: timestamp, then insertion sequence.
type RowKey = (i64, u64);

#[derive(Debug, Default)]
struct TierRows {
    /// Rows per user keyed by `(timestamp, seq)`.
    by_user: HashMap<String, BTreeMap<RowKey, MemoryRecord>>,
    /// Id index pointing at the owning user and row key.
    by_id: HashMap<Uuid, (String, RowKey)>,
}

impl TierRows {
    fn insert(&mut self, key: RowKey, record: MemoryRecord) {
        self.by_id.insert(record.id, (record.user_id.clone(), key));
        self.by_user
            .entry(record.user_id.clone())
            .or_default()
            .insert(key, record);
    }

    fn remove(&mut self, id: &Uuid) -> Option<(RowKey, MemoryRecord)> {
        let (user_id, key) = self.by_id.remove(id)?;
        let rows = self.by_user.get_mut(&user_id)?;
        let record = rows.remove(&key)?;
        if rows.is_empty() {
            self.by_user.remove(&user_id);
        }
        Some((key, record))
    }

    fn len(&self) -> usize {
        self.by_id.len()
    }
}

#[derive(Debug, Default)]
struct State {
    next_seq: u64,
    active: TierRows,
    archive: TierRows,
}

impl State {
    fn tier(&self, tier: Tier) -> &TierRows {
        match tier {
            Tier::Active => &self.active,
            Tier::Archive => &self.archive,
        }
    }

    fn tier_mut(&mut self, tier: Tier) -> &mut TierRows {
        match tier {
            Tier::Active => &mut self.active,
            Tier::Archive => &mut self.archive,
        }
    }

    fn next_key(&mut self, record: &MemoryRecord) -> RowKey {
        self.next_seq += 1;
        (record.timestamp.timestamp_micros(), self.next_seq)
    }
}

/// In-memory tiers guarded by a single lock; every call is atomic.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: RwLock<State>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryBackend for InMemoryBackend {
    fn insert_active(&self, record: &MemoryRecord) -> Result<(), MemoryError> {
        let mut state = self.state.write();
        if state.active.by_id.contains_key(&record.id) || state.archive.by_id.contains_key(&record.id)
        {
            return Err(MemoryError::StorageUnavailable(format!(
                "duplicate record id {}",
                record.id
            )));
        }
        let key = state.next_key(record);
        state.active.insert(key, record.clone());
        Ok(())
    }

    fn archive_oldest(&self, user_id: &str, batch: usize) -> Result<Vec<MemoryRecord>, MemoryError> {
        let mut state = self.state.write();
        let oldest: Vec<Uuid> = state
            .active
            .by_user
            .get(user_id)
            .map(|rows| rows.values().take(batch).map(|record| record.id).collect())
            .unwrap_or_default();
        let mut moved = Vec::with_capacity(oldest.len());
        for id in oldest {
            if let Some((key, record)) = state.active.remove(&id) {
                state.archive.insert(key, record.clone());
                moved.push(record);
            }
        }
        Ok(moved)
    }

    fn count(&self, tier: Tier, user_id: Option<&str>) -> Result<usize, MemoryError> {
        let state = self.state.read();
        let rows = state.tier(tier);
        Ok(match user_id {
            Some(user_id) => rows.by_user.get(user_id).map_or(0, BTreeMap::len),
            None => rows.len(),
        })
    }

    fn distinct_users(&self, tier: Tier) -> Result<usize, MemoryError> {
        Ok(self.state.read().tier(tier).by_user.len())
    }

    fn query(&self, tier: Tier, query: &RecordQuery) -> Result<Vec<MemoryRecord>, MemoryError> {
        let state = self.state.read();
        let rows = state.tier(tier);
        let mut selected: Vec<(&RowKey, &MemoryRecord)> = match &query.user_id {
            Some(user_id) => rows
                .by_user
                .get(user_id)
                .map(|rows| rows.iter().collect())
                .unwrap_or_default(),
            None => rows.by_user.values().flat_map(|rows| rows.iter()).collect(),
        };
        selected.sort_by_key(|(key, _)| **key);
        if query.order == Order::NewestFirst {
            selected.reverse();
        }
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(selected
            .into_iter()
            .map(|(_, record)| record)
            .filter(|record| query.matches(&record.content, &record.tags))
            .take(limit)
            .cloned()
            .collect())
    }

    fn import(&self, batch: &ImportBatch, replace: bool) -> Result<(), MemoryError> {
        let mut state = self.state.write();
        if replace {
            state.active = TierRows::default();
            state.archive = TierRows::default();
        }
        for (tier, record) in batch.iter() {
            // Re-importing into the same tier keeps the original insertion sequence.
            let existing = state.tier_mut(tier).remove(&record.id);
            state.tier_mut(tier.other()).remove(&record.id);
            let key = match existing {
                Some(((_, seq), _)) => (record.timestamp.timestamp_micros(), seq),
                None => state.next_key(record),
            };
            state.tier_mut(tier).insert(key, record.clone());
        }
        Ok(())
    }
}
