//! Store facade combining tagging, tier storage, retention, and queries.

use crate::backend::{ImportBatch, MemoryBackend};
use crate::error::MemoryError;
use crate::locks::UserLocks;
use crate::model::{
    ImportPayload, ImportRecord, MemoryExport, MemoryInfo, MemoryRecord, ROLE_USER, Tier,
    normalize_tags, now_micros,
};
use crate::policy::RetentionPolicy;
use crate::query::{RecordQuery, SearchOptions};
use crate::retention::{self, RetentionReport};
use crate::tagger::{Tagger, TaggerPipeline};
use log::{debug, info, warn};
use std::sync::Arc;
use uuid::Uuid;

/// Entry point for the tiered conversational memory.
///
/// Construct once at startup and share behind an `Arc`.
pub struct MemoryStore {
    backend: Arc<dyn MemoryBackend>,
    retention: RetentionPolicy,
    taggers: TaggerPipeline,
    user_locks: UserLocks,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("retention", &self.retention)
            .field("taggers", &self.taggers)
            .finish_non_exhaustive()
    }
}

impl MemoryStore {
    /// Create a store over a backend with the default retention policy and no taggers.
    pub fn new(backend: Arc<dyn MemoryBackend>) -> Self {
        Self {
            backend,
            retention: RetentionPolicy::default(),
            taggers: TaggerPipeline::default(),
            user_locks: UserLocks::default(),
        }
    }

    /// Replace the retention policy.
    pub fn with_retention(mut self, retention: RetentionPolicy) -> Result<Self, MemoryError> {
        retention.validate()?;
        self.retention = retention;
        Ok(self)
    }

    /// Replace the tagger pipeline.
    pub fn with_taggers(mut self, taggers: TaggerPipeline) -> Self {
        self.taggers = taggers;
        self
    }

    /// Append a single tagger.
    pub fn with_tagger(mut self, tagger: Arc<dyn Tagger>) -> Self {
        self.taggers.push(tagger);
        self
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    /// Append a record for the user and enforce the active bound.
    ///
    /// Tagger failures never fail the call. If retention fails after the
    /// insert, the record stays in the active tier and the error is returned;
    /// the next add for the user resumes migration.
    pub fn add(
        &self,
        user_id: &str,
        role: &str,
        content: &str,
        tags: Option<Vec<String>>,
    ) -> Result<MemoryRecord, MemoryError> {
        require_non_empty("user_id", user_id)?;
        require_non_empty("role", role)?;

        let tags = self
            .taggers
            .tags_for(user_id, role, content, tags.unwrap_or_default());
        let record = MemoryRecord::new(user_id, role, content, tags);

        let _guard = self.user_locks.lock(user_id);
        self.backend.insert_active(&record)?;
        debug!(
            "stored memory record (user_id={}, id={}, role={}, content_len={})",
            record.user_id,
            record.id,
            record.role,
            record.content.len()
        );
        if let Err(err) = self.enforce_retention(user_id) {
            warn!(
                "retention failed after insert (user_id={user_id}, id={}): {err}",
                record.id
            );
            return Err(err);
        }
        Ok(record)
    }

    fn enforce_retention(&self, user_id: &str) -> Result<RetentionReport, MemoryError> {
        retention::enforce(self.backend.as_ref(), user_id, &self.retention)
    }

    /// Active records newest-first, then archive records newest-first when
    /// requested. `limit` caps each tier separately.
    ///
    /// The tiers are concatenated, not merged: an archive record newer than an
    /// active one (possible after an import) still sorts after it.
    pub fn get(
        &self,
        user_id: &str,
        limit: Option<usize>,
        include_archive: bool,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        require_non_empty("user_id", user_id)?;
        require_positive_limit(limit)?;
        let query = RecordQuery::for_user(user_id).newest_first().limit(limit);
        let mut records = self.backend.query(Tier::Active, &query)?;
        if include_archive {
            records.extend(self.backend.query(Tier::Archive, &query)?);
        }
        debug!(
            "get memory (user_id={user_id}, include_archive={include_archive}, returned={})",
            records.len()
        );
        Ok(records)
    }

    /// The `recent_k` most recent active records; never reads the archive.
    pub fn get_relevant(
        &self,
        user_id: &str,
        recent_k: usize,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        require_non_empty("user_id", user_id)?;
        if recent_k == 0 {
            return Err(MemoryError::InvalidArgument(
                "recent_k must be at least 1".to_string(),
            ));
        }
        let query = RecordQuery::for_user(user_id)
            .newest_first()
            .limit(Some(recent_k));
        self.backend.query(Tier::Active, &query)
    }

    /// Case-insensitive substring search, active matches first.
    pub fn search(
        &self,
        user_id: &str,
        query: &str,
        options: SearchOptions,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        require_non_empty("user_id", user_id)?;
        require_positive_limit(options.limit)?;
        if query.trim().is_empty() {
            return Err(MemoryError::Validation(
                "search query must not be empty".to_string(),
            ));
        }

        let filter = RecordQuery::for_user(user_id)
            .newest_first()
            .matching(query)
            .limit(options.limit);
        let mut hits = self.backend.query(Tier::Active, &filter)?;
        let remaining = options.limit.map(|limit| limit.saturating_sub(hits.len()));
        if options.include_archive && remaining != Some(0) {
            let filter = filter.limit(remaining);
            hits.extend(self.backend.query(Tier::Archive, &filter)?);
        }
        debug!(
            "search memory (user_id={user_id}, query_len={}, returned={})",
            query.len(),
            hits.len()
        );
        Ok(hits)
    }

    /// Dump both tiers oldest-first, optionally for one user.
    pub fn export(&self, user_id: Option<&str>) -> Result<MemoryExport, MemoryError> {
        let query = match user_id {
            Some(user_id) => RecordQuery::for_user(user_id),
            None => RecordQuery::all(),
        }
        .oldest_first();
        let export = MemoryExport {
            active: self.backend.query(Tier::Active, &query)?,
            archive: self.backend.query(Tier::Archive, &query)?,
        };
        info!(
            "exported memory (user_id={}, active={}, archive={})",
            user_id.unwrap_or("*"),
            export.active.len(),
            export.archive.len()
        );
        Ok(export)
    }

    /// Upsert records by id. With `merge == false` both tiers are wiped first.
    ///
    /// Every row is validated before anything is written.
    pub fn import(&self, payload: ImportPayload, merge: bool) -> Result<(), MemoryError> {
        let batch = ImportBatch {
            active: resolve_rows(payload.active, Tier::Active)?,
            archive: resolve_rows(payload.archive, Tier::Archive)?,
        };
        self.backend.import(&batch, !merge)?;
        info!(
            "imported memory (active={}, archive={}, merge={merge})",
            batch.active.len(),
            batch.archive.len()
        );
        Ok(())
    }

    /// Aggregate counts for observability.
    pub fn info(&self) -> Result<MemoryInfo, MemoryError> {
        Ok(MemoryInfo {
            active_total: self.backend.count(Tier::Active, None)?,
            archive_total: self.backend.count(Tier::Archive, None)?,
            active_users: self.backend.distinct_users(Tier::Active)?,
            archive_users: self.backend.distinct_users(Tier::Archive)?,
        })
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), MemoryError> {
    if value.trim().is_empty() {
        return Err(MemoryError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_positive_limit(limit: Option<usize>) -> Result<(), MemoryError> {
    if limit == Some(0) {
        return Err(MemoryError::Validation("limit must be positive".to_string()));
    }
    Ok(())
}

fn resolve_rows(rows: Vec<ImportRecord>, tier: Tier) -> Result<Vec<MemoryRecord>, MemoryError> {
    rows.into_iter()
        .enumerate()
        .map(|(idx, row)| resolve_row(row).map_err(|err| annotate(err, tier, idx)))
        .collect()
}

fn resolve_row(row: ImportRecord) -> Result<MemoryRecord, MemoryError> {
    let user_id = row
        .user_id
        .filter(|user_id| !user_id.trim().is_empty())
        .ok_or_else(|| MemoryError::Validation("record is missing user_id".to_string()))?;
    Ok(MemoryRecord {
        id: row.id.unwrap_or_else(Uuid::new_v4),
        user_id,
        timestamp: row.timestamp.unwrap_or_else(now_micros),
        role: row
            .role
            .filter(|role| !role.trim().is_empty())
            .unwrap_or_else(|| ROLE_USER.to_string()),
        content: row.content.unwrap_or_default(),
        tags: normalize_tags(row.tags.unwrap_or_default()),
    })
}

fn annotate(err: MemoryError, tier: Tier, idx: usize) -> MemoryError {
    match err {
        MemoryError::Validation(message) => {
            MemoryError::Validation(format!("{tier}[{idx}]: {message}"))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryStore;
    use crate::backend::InMemoryBackend;
    use crate::model::{ImportPayload, ImportRecord};
    use crate::query::SearchOptions;
    use crate::{MemoryError, RetentionPolicy};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn store(max_active: usize, batch: usize) -> MemoryStore {
        MemoryStore::new(Arc::new(InMemoryBackend::new()))
            .with_retention(RetentionPolicy::new(max_active, batch).expect("policy"))
            .expect("store")
    }

    #[test]
    fn add_rejects_empty_identifiers() {
        let store = store(5, 1);
        assert!(matches!(
            store.add("", "user", "hi", None),
            Err(MemoryError::Validation(_))
        ));
        assert!(matches!(
            store.add("u1", " ", "hi", None),
            Err(MemoryError::Validation(_))
        ));
    }

    #[test]
    fn get_relevant_rejects_zero() {
        let store = store(5, 1);
        assert!(matches!(
            store.get_relevant("u1", 0),
            Err(MemoryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn search_rejects_blank_query_and_zero_limit() {
        let store = store(5, 1);
        assert!(matches!(
            store.search("u1", "  ", SearchOptions::default()),
            Err(MemoryError::Validation(_))
        ));
        let options = SearchOptions {
            include_archive: false,
            limit: Some(0),
        };
        assert!(matches!(
            store.search("u1", "sad", options),
            Err(MemoryError::Validation(_))
        ));
    }

    #[test]
    fn import_fills_defaults_and_reports_row_position() {
        let store = store(5, 1);
        let payload = ImportPayload {
            active: vec![ImportRecord {
                user_id: Some("u1".to_string()),
                ..ImportRecord::default()
            }],
            archive: vec![ImportRecord::default()],
        };
        let err = store.import(payload.clone(), true).unwrap_err();
        assert!(err.to_string().contains("archive[0]"));
        assert_eq!(store.info().expect("info").active_total, 0);

        let payload = ImportPayload {
            archive: Vec::new(),
            ..payload
        };
        store.import(payload, true).expect("import");
        let records = store.get("u1", None, false).expect("get");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].role, "user");
        assert_eq!(records[0].content, "");
    }
}
