//! Read-path options shared by the store and its backends.

/// Default cap on search results.
pub const DEFAULT_SEARCH_LIMIT: usize = 50;

/// Ordering by timestamp, ties broken by insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Most recent first.
    #[default]
    NewestFirst,
    /// Oldest first.
    OldestFirst,
}

/// Filter handed to `MemoryBackend::query`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    /// Restrict to one user; `None` scans every user.
    pub user_id: Option<String>,
    /// Lower-cased substring that content (or a tag) must contain.
    pub needle: Option<String>,
    /// Result ordering.
    pub order: Order,
    /// Optional cap on returned rows.
    pub limit: Option<usize>,
}

impl RecordQuery {
    /// Query every user.
    pub fn all() -> Self {
        Self::default()
    }

    /// Query a single user.
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    pub fn newest_first(mut self) -> Self {
        self.order = Order::NewestFirst;
        self
    }

    pub fn oldest_first(mut self) -> Self {
        self.order = Order::OldestFirst;
        self
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Match case-insensitively against content and tags.
    pub fn matching(mut self, text: &str) -> Self {
        self.needle = Some(text.to_lowercase());
        self
    }

    /// Whether a record passes the needle filter.
    pub(crate) fn matches(&self, content: &str, tags: &[String]) -> bool {
        let Some(needle) = self.needle.as_deref() else {
            return true;
        };
        content.to_lowercase().contains(needle)
            || tags.iter().any(|tag| tag.to_lowercase().contains(needle))
    }
}

/// Options for `MemoryStore::search`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Append archive matches after active matches.
    pub include_archive: bool,
    /// Cap on the combined result; `None` is unbounded.
    pub limit: Option<usize>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            include_archive: false,
            limit: Some(DEFAULT_SEARCH_LIMIT),
        }
    }
}
