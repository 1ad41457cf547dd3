//! SQLite-backed Pair Store. One table per dataset, parameterized statements only.

use crate::store::{PairRecord, PairStore, Reply, StoreCounts, StoreError, StoreResult};
use regex::Regex;
use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension};
use std::io;
use std::path::Path;
use std::sync::OnceLock;

pub const DEFAULT_TABLE: &str = "replies";

pub struct SqliteStore {
    conn: Connection,
    table: String,
}

fn ident_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"))
}

/// Table names are spliced into SQL text, so only plain identifiers pass.
pub fn validate_table_name(name: &str) -> StoreResult<()> {
    if ident_re().is_match(name) {
        Ok(())
    } else {
        Err(StoreError::InvalidTable(name.to_string()))
    }
}

fn map_err(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::SqliteFailure(ref err, ref msg) if err.code == ErrorCode::ConstraintViolation => {
            StoreError::ConstraintViolation(msg.clone().unwrap_or_else(|| err.to_string()))
        }
        other => StoreError::Backend(other),
    }
}

impl SqliteStore {
    /// Open (or create) the database file and bind to `table`.
    pub fn open(path: impl AsRef<Path>, table: &str) -> StoreResult<Self> {
        validate_table_name(table)?;
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Ok(Self { conn, table: table.to_string() })
    }

    /// Open an existing database file without creating it.
    pub fn open_existing(path: impl AsRef<Path>, table: &str) -> StoreResult<Self> {
        validate_table_name(table)?;
        let path = path.as_ref();
        if !path.is_file() {
            return Err(StoreError::NotFound(path.display().to_string()));
        }
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Ok(Self { conn, table: table.to_string() })
    }

    /// Whether the bound table has been created in this database.
    pub fn table_exists(&self) -> StoreResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [&self.table],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn open_in_memory(table: &str) -> StoreResult<Self> {
        validate_table_name(table)?;
        Ok(Self { conn: Connection::open_in_memory()?, table: table.to_string() })
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl PairStore for SqliteStore {
    fn prepare(&self, reset: bool) -> StoreResult<()> {
        let t = &self.table;
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {t} (
                parent_id TEXT PRIMARY KEY,
                comment_id TEXT UNIQUE,
                parent TEXT,
                comment TEXT,
                subreddit TEXT,
                unix INT,
                score INT
            );"
        ))?;
        if reset {
            let n = self.conn.execute(&format!("DELETE FROM {t}"), [])?;
            tracing::info!(table = %t, rows = n, "reset pair table");
        }
        Ok(())
    }

    fn comment_text(&self, comment_id: &str) -> StoreResult<Option<String>> {
        let sql = format!("SELECT comment FROM {} WHERE comment_id = ?1 LIMIT 1", self.table);
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let v: Option<Option<String>> = stmt.query_row([comment_id], |r| r.get(0)).optional()?;
        Ok(v.flatten())
    }

    fn slot_score(&self, parent_id: &str) -> StoreResult<Option<i64>> {
        let sql = format!("SELECT score FROM {} WHERE parent_id = ?1 LIMIT 1", self.table);
        let mut stmt = self.conn.prepare_cached(&sql)?;
        Ok(stmt.query_row([parent_id], |r| r.get(0)).optional()?)
    }

    fn insert(&self, rec: &PairRecord) -> StoreResult<()> {
        let sql = format!(
            "INSERT INTO {} (parent_id, comment_id, parent, comment, subreddit, unix, score)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            self.table
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        stmt.execute(params![
            rec.parent_id,
            rec.comment_id,
            rec.parent_text,
            rec.comment_text,
            rec.subreddit,
            rec.created_utc,
            rec.score,
        ])
        .map_err(map_err)?;
        Ok(())
    }

    fn update(&self, parent_id: &str, reply: &Reply) -> StoreResult<()> {
        let sql = format!(
            "UPDATE {} SET comment_id = ?1, comment = ?2, subreddit = ?3, unix = ?4, score = ?5
             WHERE parent_id = ?6",
            self.table
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let n = stmt
            .execute(params![
                reply.comment_id,
                reply.comment_text,
                reply.subreddit,
                reply.created_utc,
                reply.score,
                parent_id,
            ])
            .map_err(map_err)?;
        if n == 0 {
            return Err(StoreError::NotFound(parent_id.to_string()));
        }
        Ok(())
    }

    fn attach_parent(&self, parent_id: &str, parent_text: &str) -> StoreResult<bool> {
        let sql = format!("UPDATE {} SET parent = ?1 WHERE parent_id = ?2 AND parent IS NULL", self.table);
        let mut stmt = self.conn.prepare_cached(&sql)?;
        Ok(stmt.execute(params![parent_text, parent_id])? > 0)
    }

    fn get(&self, parent_id: &str) -> StoreResult<Option<PairRecord>> {
        let sql = format!(
            "SELECT parent_id, comment_id, parent, comment, subreddit, unix, score
             FROM {} WHERE parent_id = ?1",
            self.table
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rec = stmt
            .query_row([parent_id], |r| {
                Ok(PairRecord {
                    parent_id: r.get(0)?,
                    comment_id: r.get(1)?,
                    parent_text: r.get(2)?,
                    comment_text: r.get(3)?,
                    subreddit: r.get(4)?,
                    created_utc: r.get(5)?,
                    score: r.get(6)?,
                })
            })
            .optional()?;
        Ok(rec)
    }

    fn counts(&self) -> StoreResult<StoreCounts> {
        let sql = format!(
            "SELECT COUNT(*), COUNT(parent) FROM {}",
            self.table
        );
        let (total, paired): (i64, i64) = self.conn.query_row(&sql, [], |r| Ok((r.get(0)?, r.get(1)?)))?;
        Ok(StoreCounts { total: total as u64, paired: paired as u64 })
    }

    fn for_each_pair(
        &self,
        min_score: i64,
        sink: &mut dyn FnMut(&str, &str) -> io::Result<()>,
    ) -> StoreResult<u64> {
        let sql = format!(
            "SELECT parent, comment FROM {} WHERE parent IS NOT NULL AND comment IS NOT NULL AND score >= ?1",
            self.table
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([min_score])?;
        let mut n = 0u64;
        while let Some(row) = rows.next()? {
            let parent: String = row.get(0)?;
            let comment: String = row.get(1)?;
            sink(&parent, &comment)?;
            n += 1;
        }
        Ok(n)
    }
}
