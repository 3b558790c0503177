//! Retention and tagging policies.

use crate::error::MemoryError;
use std::time::Duration;

/// Default cap on active records per user.
pub const DEFAULT_MAX_ACTIVE_PER_USER: usize = 500;
/// Default number of records moved per archive transaction.
pub const DEFAULT_ARCHIVE_BATCH_SIZE: usize = 100;

/// Policy bounding the active tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Max active records kept per user.
    pub max_active_per_user: usize,
    /// Records moved per migration transaction.
    pub archive_batch_size: usize,
}

impl RetentionPolicy {
    /// Build a policy, rejecting zero bounds.
    pub fn new(max_active_per_user: usize, archive_batch_size: usize) -> Result<Self, MemoryError> {
        let policy = Self {
            max_active_per_user,
            archive_batch_size,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Check that both bounds are positive.
    pub fn validate(&self) -> Result<(), MemoryError> {
        if self.max_active_per_user == 0 {
            return Err(MemoryError::Validation(
                "max_active_per_user must be positive".to_string(),
            ));
        }
        if self.archive_batch_size == 0 {
            return Err(MemoryError::Validation(
                "archive_batch_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RetentionPolicy {
    /// Default retention settings.
    fn default() -> Self {
        Self {
            max_active_per_user: DEFAULT_MAX_ACTIVE_PER_USER,
            archive_batch_size: DEFAULT_ARCHIVE_BATCH_SIZE,
        }
    }
}

/// Policy for the tagger pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaggingPolicy {
    /// Taggers slower than this are reported in the log.
    pub slow_tagger_warn: Option<Duration>,
}

impl Default for TaggingPolicy {
    fn default() -> Self {
        Self {
            slow_tagger_warn: Some(Duration::from_millis(250)),
        }
    }
}
