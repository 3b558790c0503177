//! Migration of a user's oldest active records into the archive.

use crate::backend::MemoryBackend;
use crate::error::MemoryError;
use crate::model::Tier;
use crate::policy::RetentionPolicy;
use log::{debug, info};

/// Outcome of one enforcement pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionReport {
    /// Records moved to the archive.
    pub moved: usize,
    /// Transactions committed.
    pub batches: usize,
}

/// Bring the user's active tier back under `max_active_per_user`.
///
/// Each batch commits on its own, so an error leaves earlier batches in place
/// and the next call resumes from a fresh count. Callers must hold the user's
/// lock.
pub fn enforce(
    backend: &dyn MemoryBackend,
    user_id: &str,
    policy: &RetentionPolicy,
) -> Result<RetentionReport, MemoryError> {
    let total = backend.count(Tier::Active, Some(user_id))?;
    if total <= policy.max_active_per_user {
        return Ok(RetentionReport::default());
    }

    let mut to_move = total - policy.max_active_per_user;
    let mut report = RetentionReport::default();
    while to_move > 0 {
        let requested = policy.archive_batch_size.min(to_move);
        let moved = backend.archive_oldest(user_id, requested)?;
        report.batches += 1;
        report.moved += moved.len();
        to_move = to_move.saturating_sub(moved.len());
        debug!(
            "archived batch (user_id={user_id}, requested={requested}, moved={})",
            moved.len()
        );
        if moved.len() < requested {
            break;
        }
    }

    info!(
        "retention enforced (user_id={user_id}, moved={}, batches={})",
        report.moved, report.batches
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::{RetentionReport, enforce};
    use crate::backend::{InMemoryBackend, MemoryBackend};
    use crate::model::{MemoryRecord, Tier};
    use crate::policy::RetentionPolicy;
    use pretty_assertions::assert_eq;

    fn fill(backend: &InMemoryBackend, user_id: &str, count: usize) {
        for idx in 0..count {
            let record = MemoryRecord::new(user_id, "user", format!("m{idx}"), Vec::new());
            backend.insert_active(&record).expect("insert");
        }
    }

    #[test]
    fn no_op_under_the_bound() {
        let backend = InMemoryBackend::new();
        fill(&backend, "u1", 3);
        let policy = RetentionPolicy::new(3, 1).expect("policy");
        let report = enforce(&backend, "u1", &policy).expect("enforce");
        assert_eq!(report, RetentionReport::default());
    }

    #[test]
    fn large_backlog_moves_in_batches() {
        let backend = InMemoryBackend::new();
        fill(&backend, "u1", 25);
        let policy = RetentionPolicy::new(5, 8).expect("policy");
        let report = enforce(&backend, "u1", &policy).expect("enforce");
        assert_eq!(report, RetentionReport { moved: 20, batches: 3 });
        assert_eq!(backend.count(Tier::Active, Some("u1")).expect("count"), 5);
        assert_eq!(backend.count(Tier::Archive, Some("u1")).expect("count"), 20);
    }

    #[test]
    fn leaves_other_users_alone() {
        let backend = InMemoryBackend::new();
        fill(&backend, "u1", 4);
        fill(&backend, "u2", 4);
        let policy = RetentionPolicy::new(2, 10).expect("policy");
        enforce(&backend, "u1", &policy).expect("enforce");
        assert_eq!(backend.count(Tier::Active, Some("u2")).expect("count"), 4);
    }
}
