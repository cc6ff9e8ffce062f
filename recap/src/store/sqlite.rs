//! SQLite-backed SummaryStore. Persistent across process restarts.
//!
//! One table `summaries(hash PRIMARY KEY, summary, updated_at)`. Each call opens a
//! connection inside `spawn_blocking` so the async caller never blocks.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};

use super::{StoreError, SummaryStore};

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn storage_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Storage(e.to_string())
}

/// SQLite-backed store. Key: block hash. Value: summary text.
///
/// **Interaction**: Used as `Arc<dyn SummaryStore>` under
/// [`SummaryCache`](crate::cache::SummaryCache).
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and ensures the table exists.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(storage_err)?;
        }
        let conn = rusqlite::Connection::open(&db_path).map_err(storage_err)?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS summaries (
                hash TEXT PRIMARY KEY NOT NULL,
                summary TEXT NOT NULL,
                updated_at INTEGER NOT NULL DEFAULT 0
            )
            "#,
            [],
        )
        .map_err(storage_err)?;
        Ok(Self { db_path })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> Result<T, rusqlite::Error> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path).map_err(storage_err)?;
            f(&conn).map_err(storage_err)
        })
        .await
        .map_err(storage_err)?
    }
}

#[async_trait]
impl SummaryStore for SqliteStore {
    async fn get(&self, hash: &str) -> Result<Option<String>, StoreError> {
        let hash = hash.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT summary FROM summaries WHERE hash = ?1",
                params![hash],
                |row| row.get::<_, String>(0),
            )
            .optional()
        })
        .await
    }

    async fn put(&self, hash: &str, summary: &str) -> Result<(), StoreError> {
        let hash = hash.to_string();
        let summary = summary.to_string();
        let now = now_millis();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO summaries (hash, summary, updated_at) VALUES (?1, ?2, ?3)",
                params![hash, summary, now],
            )
            .map(|_| ())
        })
        .await
    }

    async fn delete(&self, hash: &str) -> Result<(), StoreError> {
        let hash = hash.to_string();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM summaries WHERE hash = ?1", params![hash])
                .map(|_| ())
        })
        .await
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT hash FROM summaries")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect()
        })
        .await
    }

    async fn delete_all(&self) -> Result<usize, StoreError> {
        self.with_conn(|conn| conn.execute("DELETE FROM summaries", []))
            .await
    }
}
