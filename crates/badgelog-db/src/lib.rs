//! Storage layer for badge swipe logs.
//!
//! Provides persistence for swipe rows and the local subject directory
//! using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but
//! not `Sync`. A `Database` instance can be moved between threads but cannot
//! be shared across threads without external synchronization.
//!
//! # Schema
//!
//! Timestamps are stored as TEXT in RFC 3339 / ISO 8601 format
//! (e.g. `2025-10-06T09:30:00Z`), always UTC, so lexicographic ordering
//! matches chronological ordering. Extra per-row source fields are stored as
//! a JSON object in the `extra` column and flow through untouched.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, params, params_from_iter};
use thiserror::Error;

use badgelog_core::{RowId, SubjectId, SwipeRow};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored swipe timestamp.
    #[error("invalid timestamp for swipe {row_id}: {timestamp}")]
    TimestampParse {
        row_id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored swipe could not be converted to an engine row.
    #[error("invalid stored swipe {row_id}: {message}")]
    InvalidPayload { row_id: String, message: String },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A swipe row as stored, TEXT columns and all.
///
/// Convert to an engine row with [`StoredSwipe::into_row`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSwipe {
    pub id: String,
    pub occurred_at: String,
    pub subject_id: Option<String>,
    pub subject_name: Option<String>,
    pub action: Option<String>,
    pub category: Option<String>,
    /// JSON object of extra source fields, if any.
    pub extra: Option<String>,
}

/// Filter for [`Database::list_swipes_filtered`].
#[derive(Debug, Clone, Default)]
pub struct SwipeFilter {
    /// Inclusive lower bound.
    pub start: Option<DateTime<Utc>>,
    /// Exclusive upper bound.
    pub end: Option<DateTime<Utc>>,
    /// Exact category match; `None` selects all categories.
    pub category: Option<String>,
}

/// Row count and latest swipe grouped by category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySummary {
    pub category: Option<String>,
    pub rows: i64,
    pub last_swipe_at: String,
}

/// Formats a timestamp the way the schema stores them.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl StoredSwipe {
    /// Parses the TEXT columns into a typed engine row.
    ///
    /// An empty or whitespace subject id becomes `None` (the engine counts
    /// such rows as unattributable); a malformed timestamp or a non-object
    /// `extra` payload is an error.
    pub fn into_row(self) -> Result<SwipeRow, DbError> {
        let occurred_at = DateTime::parse_from_rfc3339(&self.occurred_at)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|source| DbError::TimestampParse {
                row_id: self.id.clone(),
                timestamp: self.occurred_at.clone(),
                source,
            })?;
        let id = RowId::new(self.id.clone()).map_err(|err| DbError::InvalidPayload {
            row_id: self.id.clone(),
            message: err.to_string(),
        })?;
        let subject_id = self
            .subject_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| SubjectId::new(s).ok());
        let extra = match self.extra.as_deref().map(str::trim) {
            None | Some("") => serde_json::Map::new(),
            Some(raw) => match serde_json::from_str::<serde_json::Value>(raw) {
                Ok(serde_json::Value::Object(map)) => map,
                Ok(_) => {
                    return Err(DbError::InvalidPayload {
                        row_id: id.to_string(),
                        message: "extra must be a JSON object".to_string(),
                    });
                }
                Err(err) => {
                    return Err(DbError::InvalidPayload {
                        row_id: id.to_string(),
                        message: err.to_string(),
                    });
                }
            },
        };

        Ok(SwipeRow {
            id,
            occurred_at,
            subject_id,
            subject_name: self.subject_name,
            action: self.action,
            category: self.category,
            extra,
        })
    }
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection
    /// closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// Idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Swipes table: one row per observed badge swipe
            -- occurred_at: RFC 3339 format (e.g. '2025-10-06T09:30:00Z')
            -- extra: JSON object of source fields the engine never inspects
            CREATE TABLE IF NOT EXISTS swipes (
                id TEXT PRIMARY KEY,
                occurred_at TEXT NOT NULL,
                subject_id TEXT,
                subject_name TEXT,
                action TEXT,
                category TEXT,
                extra TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_swipes_occurred ON swipes(occurred_at);
            CREATE INDEX IF NOT EXISTS idx_swipes_subject ON swipes(subject_id);
            CREATE INDEX IF NOT EXISTS idx_swipes_category ON swipes(category);

            -- Local subject directory for display-name resolution
            CREATE TABLE IF NOT EXISTS subjects (
                id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Inserts a batch of swipes, ignoring duplicates by ID.
    pub fn insert_swipes(&mut self, swipes: &[StoredSwipe]) -> Result<usize, DbError> {
        if swipes.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT OR IGNORE INTO swipes
                (id, occurred_at, subject_id, subject_name, action, category, extra)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ",
            )?;
            for swipe in swipes {
                inserted += stmt.execute(params![
                    swipe.id,
                    swipe.occurred_at,
                    swipe.subject_id,
                    swipe.subject_name,
                    swipe.action,
                    swipe.category,
                    swipe.extra,
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(inserted, total = swipes.len(), "inserted swipe batch");
        Ok(inserted)
    }

    /// Lists all swipes ordered by timestamp then ID.
    pub fn list_swipes(&self) -> Result<Vec<StoredSwipe>, DbError> {
        self.list_swipes_filtered(&SwipeFilter::default())
    }

    /// Lists swipes matching the filter, ordered by timestamp then ID.
    ///
    /// The time range is inclusive of `start` and exclusive of `end`; an
    /// inverted range yields no rows.
    pub fn list_swipes_filtered(&self, filter: &SwipeFilter) -> Result<Vec<StoredSwipe>, DbError> {
        let mut sql = String::from(
            "
            SELECT id, occurred_at, subject_id, subject_name, action, category, extra
            FROM swipes
            WHERE 1=1
            ",
        );
        let mut args: Vec<String> = Vec::new();
        if let Some(start) = filter.start {
            sql.push_str(" AND occurred_at >= ?");
            args.push(format_timestamp(start));
        }
        if let Some(end) = filter.end {
            sql.push_str(" AND occurred_at < ?");
            args.push(format_timestamp(end));
        }
        if let Some(category) = filter.category.as_deref().map(str::trim) {
            if !category.is_empty() {
                sql.push_str(" AND category = ?");
                args.push(category.to_string());
            }
        }
        sql.push_str(" ORDER BY occurred_at ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args), |row| {
            Ok(StoredSwipe {
                id: row.get(0)?,
                occurred_at: row.get(1)?,
                subject_id: row.get(2)?,
                subject_name: row.get(3)?,
                action: row.get(4)?,
                category: row.get(5)?,
                extra: row.get(6)?,
            })
        })?;
        let mut swipes = Vec::new();
        for row in rows {
            swipes.push(row?);
        }
        Ok(swipes)
    }

    /// Total number of stored swipes.
    pub fn swipe_count(&self) -> Result<i64, DbError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM swipes", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Row counts and latest swipe per category, uncategorized rows first.
    pub fn category_summaries(&self) -> Result<Vec<CategorySummary>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT category, COUNT(*) AS row_count, MAX(occurred_at) AS last_swipe
            FROM swipes
            GROUP BY category
            ORDER BY category ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(CategorySummary {
                category: row.get(0)?,
                rows: row.get(1)?,
                last_swipe_at: row.get(2)?,
            })
        })?;
        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?);
        }
        Ok(summaries)
    }

    /// Upserts subject directory entries, newest name winning.
    pub fn upsert_subjects(&mut self, entries: &[(String, String)]) -> Result<(), DbError> {
        if entries.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO subjects (id, display_name)
                VALUES (?, ?)
                ON CONFLICT(id) DO UPDATE SET display_name = excluded.display_name
                ",
            )?;
            for (id, name) in entries {
                stmt.execute(params![id, name])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Looks up display names for the given subject ids.
    ///
    /// Missing ids are simply absent from the result.
    pub fn subject_names(&self, ids: &[String]) -> Result<HashMap<String, String>, DbError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql =
            format!("SELECT id, display_name FROM subjects WHERE id IN ({placeholders})");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(ids), |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            Ok((id, name))
        })?;
        let mut names = HashMap::new();
        for row in rows {
            let (id, name) = row?;
            names.insert(id, name);
        }
        Ok(names)
    }

    /// Number of subject directory entries.
    pub fn subject_count(&self) -> Result<i64, DbError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM subjects", [], |row| row.get(0))?;
        Ok(count)
    }
}
