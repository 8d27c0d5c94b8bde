//! SQLite-backed thread store

use rusqlite::OptionalExtension;

use super::DbPool;
use crate::threads::ThreadStore;
use crate::{Error, Result};

/// Thread store persisted in `SQLite`, surviving restarts
#[derive(Clone)]
pub struct SqliteThreadStore {
    pool: DbPool,
}

impl SqliteThreadStore {
    /// Create a new store over an initialized pool
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<super::DbConn> {
        self.pool.get().map_err(|e| Error::Database(e.to_string()))
    }
}

impl ThreadStore for SqliteThreadStore {
    fn get(&self, user_id: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let thread_id: Option<String> = conn
            .query_row(
                "SELECT thread_id FROM user_threads WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(thread_id)
    }

    fn insert(&self, user_id: &str, thread_id: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO user_threads (user_id, thread_id) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET thread_id = excluded.thread_id",
            [user_id, thread_id],
        )?;
        Ok(())
    }

    fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM user_threads", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}
