//! SQLite persistence.
//!
//! One database file holds both collections:
//! - `knowledge` + `knowledge_fts`: medical concepts with a BM25-ranked
//!   FTS5 index over `term` and `description`
//! - `sessions`: chat sessions with their turn sequence stored as JSON
//!
//! A single pool is opened at startup and shared by both stores.

mod knowledge;
mod session;

pub use knowledge::SqliteKnowledgeStore;
pub use session::SqliteSessionStore;

use medtutor_core::error::KnowledgeError;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// An open SQLite database with migrations applied.
#[derive(Clone)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Open (creating if missing) the database at `url` and run all migrations.
    ///
    /// Accepts `sqlite://path`, `sqlite::memory:` and a leading `~/` in the path.
    pub async fn open(url: &str, max_connections: u32) -> medtutor_core::Result<Self> {
        let resolved = resolve_url(url);
        let in_memory = resolved.contains(":memory:");

        if !in_memory {
            if let Some(parent) = database_path(&resolved).and_then(|p| p.parent().map(PathBuf::from)) {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(&parent).map_err(|e| {
                        KnowledgeError::Storage(format!(
                            "Failed to create database directory {}: {e}",
                            parent.display()
                        ))
                    })?;
                }
            }
        }

        let options = SqliteConnectOptions::from_str(&resolved)
            .map_err(|e| KnowledgeError::Storage(format!("Invalid SQLite URL: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        // Every connection to `:memory:` is a separate database, so pin to one.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| KnowledgeError::Storage(format!("Failed to open SQLite: {e}")))?;

        let db = Self { pool };
        SqliteKnowledgeStore::migrate(&db.pool).await?;
        SqliteSessionStore::migrate(&db.pool).await?;
        info!(url = %resolved, "SQLite database initialized");
        Ok(db)
    }

    /// In-process ephemeral database (tests, `ask` without a configured file).
    pub async fn in_memory() -> medtutor_core::Result<Self> {
        Self::open("sqlite::memory:", 1).await
    }

    pub fn knowledge(&self) -> SqliteKnowledgeStore {
        SqliteKnowledgeStore::new(self.pool.clone())
    }

    pub fn sessions(&self) -> SqliteSessionStore {
        SqliteSessionStore::new(self.pool.clone())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool, waiting for in-flight queries to finish.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("SQLite database closed");
    }
}

/// Expand a leading `~/` in the path part of a SQLite URL.
fn resolve_url(url: &str) -> String {
    let Some(rest) = url.strip_prefix("sqlite://~/") else {
        return url.to_string();
    };
    match std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
        Some(home) => format!("sqlite://{}", PathBuf::from(home).join(rest).display()),
        None => format!("sqlite://{rest}"),
    }
}

/// Filesystem path of a file-backed SQLite URL.
fn database_path(url: &str) -> Option<PathBuf> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        None
    } else {
        Some(PathBuf::from(path))
    }
}

/// Timestamps are stored in one fixed-width RFC 3339 form so text order is time order.
pub(crate) fn timestamp(dt: &chrono::DateTime<chrono::Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tilde_is_expanded() {
        let resolved = resolve_url("sqlite://~/.medtutor/medtutor.db");
        assert!(resolved.starts_with("sqlite://"));
        assert!(!resolved.contains('~'));
        assert!(resolved.ends_with(".medtutor/medtutor.db"));
    }

    #[test]
    fn plain_urls_pass_through() {
        assert_eq!(resolve_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(resolve_url("sqlite:///tmp/x.db"), "sqlite:///tmp/x.db");
    }

    #[test]
    fn database_path_strips_scheme_and_params() {
        assert_eq!(
            database_path("sqlite:///tmp/med.db?mode=rwc"),
            Some(PathBuf::from("/tmp/med.db"))
        );
        assert_eq!(database_path("postgres://x"), None);
    }

    #[tokio::test]
    async fn opens_file_database_in_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("med.db");
        let url = format!("sqlite://{}", path.display());

        let db = SqliteDatabase::open(&url, 2).await.unwrap();
        assert!(path.exists());
        db.close().await;
    }

    #[tokio::test]
    async fn reopening_keeps_data() {
        use medtutor_core::knowledge::{Category, KnowledgeEntry, KnowledgeStore};

        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("med.db").display());

        let db = SqliteDatabase::open(&url, 2).await.unwrap();
        db.knowledge()
            .upsert(KnowledgeEntry::new("fever", Category::Symptom, "High temperature"))
            .await
            .unwrap();
        db.close().await;

        let db = SqliteDatabase::open(&url, 2).await.unwrap();
        assert_eq!(db.knowledge().count().await.unwrap(), 1);
        db.close().await;
    }
}
