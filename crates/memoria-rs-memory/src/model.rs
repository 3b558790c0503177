//! Memory record model and the payloads exchanged with the store.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Role for messages written by the end user.
pub const ROLE_USER: &str = "user";

/// One turn of conversation, immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemoryRecord {
    /// Record identifier, stable across tier migration.
    pub id: Uuid,
    /// Owning user.
    pub user_id: String,
    /// Creation timestamp; the sole ordering key.
    pub timestamp: DateTime<Utc>,
    /// Role or origin for the record.
    pub role: String,
    /// Record content.
    pub content: String,
    /// Deduplicated tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl MemoryRecord {
    /// Build a fresh record stamped with the current time.
    pub fn new(
        user_id: impl Into<String>,
        role: impl Into<String>,
        content: impl Into<String>,
        tags: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            timestamp: now_micros(),
            role: role.into(),
            content: content.into(),
            tags,
        }
    }

    /// Whether the record carries the given tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|existing| existing == tag)
    }
}

/// Current time truncated to the precision the backends persist.
pub fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Storage tier a record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Bounded, most-recent working set.
    Active,
    /// Unbounded cold storage for evicted records.
    Archive,
}

impl Tier {
    /// The opposite tier.
    pub fn other(self) -> Tier {
        match self {
            Tier::Active => Tier::Archive,
            Tier::Archive => Tier::Active,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Active => f.write_str("active"),
            Tier::Archive => f.write_str("archive"),
        }
    }
}

/// Full dump of both tiers, each ordered oldest-first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemoryExport {
    pub active: Vec<MemoryRecord>,
    pub archive: Vec<MemoryRecord>,
}

impl MemoryExport {
    /// Total number of records across both tiers.
    pub fn len(&self) -> usize {
        self.active.len() + self.archive.len()
    }

    /// True when neither tier has records.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.archive.is_empty()
    }
}

/// Import row; every field except `user_id` has a fallback.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportRecord {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl From<MemoryRecord> for ImportRecord {
    fn from(record: MemoryRecord) -> Self {
        Self {
            id: Some(record.id),
            user_id: Some(record.user_id),
            timestamp: Some(record.timestamp),
            role: Some(record.role),
            content: Some(record.content),
            tags: Some(record.tags),
        }
    }
}

/// Payload accepted by `MemoryStore::import`, shaped like `MemoryExport`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportPayload {
    #[serde(default)]
    pub active: Vec<ImportRecord>,
    #[serde(default)]
    pub archive: Vec<ImportRecord>,
}

impl From<MemoryExport> for ImportPayload {
    fn from(export: MemoryExport) -> Self {
        Self {
            active: export.active.into_iter().map(ImportRecord::from).collect(),
            archive: export.archive.into_iter().map(ImportRecord::from).collect(),
        }
    }
}

/// Aggregate counts across both tiers.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemoryInfo {
    pub active_total: usize,
    pub archive_total: usize,
    pub active_users: usize,
    pub archive_users: usize,
}

/// Remove blank tags and duplicates, keeping first-seen order.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.into();
        let trimmed = tag.trim();
        if trimmed.is_empty() || normalized.iter().any(|existing| existing == trimmed) {
            continue;
        }
        normalized.push(trimmed.to_string());
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::{ImportPayload, MemoryExport, MemoryRecord, normalize_tags};
    use pretty_assertions::assert_eq;

    #[test]
    fn normalize_tags_dedups_in_first_seen_order() {
        let tags = normalize_tags(["b", "a", " b ", "", "c", "a"]);
        assert_eq!(tags, vec!["b", "a", "c"]);
    }

    #[test]
    fn record_timestamp_survives_json() {
        let record = MemoryRecord::new("u1", "user", "hello", vec!["x".to_string()]);
        let json = serde_json::to_string(&record).expect("serialize");
        let decoded: MemoryRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded, record);
    }

    #[test]
    fn import_payload_accepts_sparse_rows() {
        let payload: ImportPayload =
            serde_json::from_str(r#"{ "active": [{ "user_id": "u1" }] }"#).expect("payload");
        assert_eq!(payload.active.len(), 1);
        assert_eq!(payload.active[0].role, None);
        assert!(payload.archive.is_empty());
    }

    #[test]
    fn export_converts_into_import_payload() {
        let record = MemoryRecord::new("u1", "assistant", "hi", Vec::new());
        let export = MemoryExport {
            active: vec![record.clone()],
            archive: Vec::new(),
        };
        let payload = ImportPayload::from(export);
        assert_eq!(payload.active[0].id, Some(record.id));
        assert_eq!(payload.active[0].user_id.as_deref(), Some("u1"));
    }
}
