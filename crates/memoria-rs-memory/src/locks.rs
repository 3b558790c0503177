//! Per-user write serialization.

use parking_lot::{ArcMutexGuard, Mutex, RawMutex};
use std::collections::HashMap;
use std::sync::Arc;

/// Entries beyond this count trigger pruning of idle user locks.
const PRUNE_THRESHOLD: usize = 1024;

/// Held while a user's add and retention pass run.
pub(crate) type UserGuard = ArcMutexGuard<RawMutex, ()>;

/// Lock table handing out one mutex per user id.
#[derive(Debug, Default)]
pub(crate) struct UserLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl UserLocks {
    /// Block until the user's lock is held. Other users never wait on it.
    pub(crate) fn lock(&self, user_id: &str) -> UserGuard {
        let lock = {
            let mut locks = self.locks.lock();
            if locks.len() >= PRUNE_THRESHOLD {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            locks
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_arc()
    }
}
