//! SQLite row store for the active and archive tiers.

use super::{ImportBatch, MemoryBackend};
use crate::error::MemoryError;
use crate::model::{MemoryRecord, Tier};
use crate::query::{Order, RecordQuery};
use chrono::{DateTime, Utc};
use log::{debug, info};
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{Connection, Row, Transaction, params, params_from_iter};
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

/// How long a writer waits on a locked database file.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS memory_active (
    seq       INTEGER PRIMARY KEY AUTOINCREMENT,
    id        TEXT    NOT NULL UNIQUE,
    user_id   TEXT    NOT NULL,
    timestamp INTEGER NOT NULL,
    role      TEXT    NOT NULL,
    content   TEXT    NOT NULL,
    tags      TEXT    NOT NULL DEFAULT '[]'
);
CREATE INDEX IF NOT EXISTS ix_memory_active_user_time
    ON memory_active (user_id, timestamp, seq);

CREATE TABLE IF NOT EXISTS memory_archive (
    seq       INTEGER PRIMARY KEY AUTOINCREMENT,
    id        TEXT    NOT NULL UNIQUE,
    user_id   TEXT    NOT NULL,
    timestamp INTEGER NOT NULL,
    role      TEXT    NOT NULL,
    content   TEXT    NOT NULL,
    tags      TEXT    NOT NULL DEFAULT '[]'
);
CREATE INDEX IF NOT EXISTS ix_memory_archive_user_time
    ON memory_archive (user_id, timestamp, seq);
"#;

const COLUMNS: &str = "id, user_id, timestamp, role, content, tags";

/// SQLite-backed tiers behind a single serialized connection.
///
/// Every call, for any user, holds the connection mutex for one round trip.
/// The store's per-user locks keep users independent at the facade, but
/// storage calls from different users still queue on this connection.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend").finish_non_exhaustive()
    }
}

impl SqliteBackend {
    /// Open (or create) a database file and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let backend = Self::from_connection(conn)?;
        info!("opened sqlite memory backend (path={})", path.display());
        Ok(backend)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, MemoryError> {
        let conn = Connection::open_in_memory()?;
        let backend = Self::from_connection(conn)?;
        debug!("opened in-memory sqlite memory backend");
        Ok(backend)
    }

    fn from_connection(conn: Connection) -> Result<Self, MemoryError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl MemoryBackend for SqliteBackend {
    fn insert_active(&self, record: &MemoryRecord) -> Result<(), MemoryError> {
        let conn = self.conn.lock();
        insert_row(&conn, Tier::Active, record)?;
        Ok(())
    }

    fn archive_oldest(&self, user_id: &str, batch: usize) -> Result<Vec<MemoryRecord>, MemoryError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let selected = select_oldest(&tx, user_id, batch)?;
        for (seq, record) in &selected {
            insert_row(&tx, Tier::Archive, record)?;
            tx.execute("DELETE FROM memory_active WHERE seq = ?1", params![seq])?;
        }
        tx.commit()?;
        Ok(selected.into_iter().map(|(_, record)| record).collect())
    }

    fn count(&self, tier: Tier, user_id: Option<&str>) -> Result<usize, MemoryError> {
        let conn = self.conn.lock();
        let table = table_name(tier);
        let count: i64 = match user_id {
            Some(user_id) => conn.query_row(
                &format!("SELECT COUNT(*) FROM {table} WHERE user_id = ?1"),
                params![user_id],
                |row| row.get(0),
            )?,
            None => conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?,
        };
        Ok(to_usize(count))
    }

    fn distinct_users(&self, tier: Tier) -> Result<usize, MemoryError> {
        let conn = self.conn.lock();
        let table = table_name(tier);
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(DISTINCT user_id) FROM {table}"),
            [],
            |row| row.get(0),
        )?;
        Ok(to_usize(count))
    }

    fn query(&self, tier: Tier, query: &RecordQuery) -> Result<Vec<MemoryRecord>, MemoryError> {
        let conn = self.conn.lock();
        let table = table_name(tier);
        let mut sql = format!("SELECT {COLUMNS} FROM {table}");
        let mut values: Vec<Value> = Vec::new();
        if let Some(user_id) = &query.user_id {
            sql.push_str(" WHERE user_id = ?");
            values.push(Value::Text(user_id.clone()));
        }
        sql.push_str(match query.order {
            Order::NewestFirst => " ORDER BY timestamp DESC, seq DESC",
            Order::OldestFirst => " ORDER BY timestamp ASC, seq ASC",
        });
        // Substring filtering happens below so case folding matches the other
        // backends; only unfiltered reads can push the limit into SQL.
        if query.needle.is_none() {
            if let Some(limit) = query.limit {
                sql.push_str(" LIMIT ?");
                values.push(Value::Integer(to_i64(limit)));
            }
        }

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(values.iter()))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            if query.limit.is_some_and(|limit| records.len() >= limit) {
                break;
            }
            let record = RawRow::read(row)?.into_record()?;
            if query.matches(&record.content, &record.tags) {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn import(&self, batch: &ImportBatch, replace: bool) -> Result<(), MemoryError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        if replace {
            let active = tx.execute("DELETE FROM memory_active", [])?;
            let archive = tx.execute("DELETE FROM memory_archive", [])?;
            info!("cleared memory tiers for import (active={active}, archive={archive})");
        }
        for (tier, record) in batch.iter() {
            let other = table_name(tier.other());
            tx.execute(
                &format!("DELETE FROM {other} WHERE id = ?1"),
                params![record.id.to_string()],
            )?;
            upsert_row(&tx, tier, record)?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn table_name(tier: Tier) -> &'static str {
    match tier {
        Tier::Active => "memory_active",
        Tier::Archive => "memory_archive",
    }
}

fn select_oldest(
    tx: &Transaction<'_>,
    user_id: &str,
    batch: usize,
) -> Result<Vec<(i64, MemoryRecord)>, MemoryError> {
    let mut stmt = tx.prepare(&format!(
        "SELECT seq, {COLUMNS} FROM memory_active WHERE user_id = ?1 \
         ORDER BY timestamp ASC, seq ASC LIMIT ?2"
    ))?;
    let mut rows = stmt.query(params![user_id, to_i64(batch)])?;
    let mut selected = Vec::new();
    while let Some(row) = rows.next()? {
        let seq: i64 = row.get(0)?;
        let raw = RawRow {
            id: row.get(1)?,
            user_id: row.get(2)?,
            timestamp: row.get(3)?,
            role: row.get(4)?,
            content: row.get(5)?,
            tags: row.get(6)?,
        };
        selected.push((seq, raw.into_record()?));
    }
    Ok(selected)
}

fn insert_row(conn: &Connection, tier: Tier, record: &MemoryRecord) -> Result<(), MemoryError> {
    let table = table_name(tier);
    conn.execute(
        &format!("INSERT INTO {table} ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
        params![
            record.id.to_string(),
            record.user_id,
            record.timestamp.timestamp_micros(),
            record.role,
            record.content,
            serde_json::to_string(&record.tags)?,
        ],
    )?;
    Ok(())
}

fn upsert_row(conn: &Connection, tier: Tier, record: &MemoryRecord) -> Result<(), MemoryError> {
    let table = table_name(tier);
    conn.execute(
        &format!(
            "INSERT INTO {table} ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT(id) DO UPDATE SET \
                user_id = excluded.user_id, \
                timestamp = excluded.timestamp, \
                role = excluded.role, \
                content = excluded.content, \
                tags = excluded.tags"
        ),
        params![
            record.id.to_string(),
            record.user_id,
            record.timestamp.timestamp_micros(),
            record.role,
            record.content,
            serde_json::to_string(&record.tags)?,
        ],
    )?;
    Ok(())
}

/// Row as stored, before decoding ids, timestamps, and tags.
struct RawRow {
    id: String,
    user_id: String,
    timestamp: i64,
    role: String,
    content: String,
    tags: String,
}

impl RawRow {
    fn read(row: &Row<'_>) -> Result<Self, MemoryError> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            timestamp: row.get(2)?,
            role: row.get(3)?,
            content: row.get(4)?,
            tags: row.get(5)?,
        })
    }

    fn into_record(self) -> Result<MemoryRecord, MemoryError> {
        let id = Uuid::parse_str(&self.id).map_err(|err| {
            MemoryError::StorageUnavailable(format!("corrupt record id {}: {err}", self.id))
        })?;
        let timestamp = DateTime::<Utc>::from_timestamp_micros(self.timestamp).ok_or_else(|| {
            MemoryError::StorageUnavailable(format!(
                "corrupt timestamp {} for record {id}",
                self.timestamp
            ))
        })?;
        let tags: Vec<String> = serde_json::from_str(&self.tags)?;
        Ok(MemoryRecord {
            id,
            user_id: self.user_id,
            timestamp,
            role: self.role,
            content: self.content,
            tags,
        })
    }
}

fn to_usize(count: i64) -> usize {
    usize::try_from(count).unwrap_or_default()
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
