//! SQLite knowledge store with FTS5 full-text search.
//!
//! - `knowledge`: one row per concept, the full entry kept as a JSON document
//! - `knowledge_fts`: external-content FTS5 table over `term` and `description`
//!
//! Triggers keep the FTS index in sync on insert/delete/update.

use async_trait::async_trait;
use medtutor_core::error::KnowledgeError;
use medtutor_core::knowledge::{
    Category, KnowledgeEntry, KnowledgeQuery, KnowledgeStore, UpsertOutcome,
};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use super::timestamp;

/// Knowledge base backed by SQLite with BM25-ranked search.
#[derive(Clone)]
pub struct SqliteKnowledgeStore {
    pool: SqlitePool,
}

impl SqliteKnowledgeStore {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create from an existing pool, running migrations first.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, KnowledgeError> {
        Self::migrate(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Create tables, the FTS5 virtual table, triggers and indexes.
    pub(crate) async fn migrate(pool: &SqlitePool) -> Result<(), KnowledgeError> {
        // `term_key` is the lowercased term; uniqueness is case-insensitive.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS knowledge (
                iid          INTEGER PRIMARY KEY AUTOINCREMENT,
                term         TEXT NOT NULL,
                term_key     TEXT UNIQUE NOT NULL,
                category     TEXT NOT NULL,
                description  TEXT NOT NULL DEFAULT '',
                document     TEXT NOT NULL,
                last_updated TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await
        .map_err(|e| KnowledgeError::MigrationFailed(format!("knowledge table: {e}")))?;

        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE IF NOT EXISTS knowledge_fts USING fts5(
                term,
                description,
                content='knowledge',
                content_rowid='iid',
                tokenize='porter unicode61'
            )
            "#,
        )
        .execute(pool)
        .await
        .map_err(|e| KnowledgeError::MigrationFailed(format!("FTS5 table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TRIGGER IF NOT EXISTS knowledge_ai AFTER INSERT ON knowledge BEGIN
                INSERT INTO knowledge_fts(rowid, term, description)
                VALUES (new.iid, new.term, new.description);
            END
            "#,
        )
        .execute(pool)
        .await
        .map_err(|e| KnowledgeError::MigrationFailed(format!("insert trigger: {e}")))?;

        sqlx::query(
            r#"
            CREATE TRIGGER IF NOT EXISTS knowledge_ad AFTER DELETE ON knowledge BEGIN
                INSERT INTO knowledge_fts(knowledge_fts, rowid, term, description)
                VALUES ('delete', old.iid, old.term, old.description);
            END
            "#,
        )
        .execute(pool)
        .await
        .map_err(|e| KnowledgeError::MigrationFailed(format!("delete trigger: {e}")))?;

        sqlx::query(
            r#"
            CREATE TRIGGER IF NOT EXISTS knowledge_au AFTER UPDATE ON knowledge BEGIN
                INSERT INTO knowledge_fts(knowledge_fts, rowid, term, description)
                VALUES ('delete', old.iid, old.term, old.description);
                INSERT INTO knowledge_fts(rowid, term, description)
                VALUES (new.iid, new.term, new.description);
            END
            "#,
        )
        .execute(pool)
        .await
        .map_err(|e| KnowledgeError::MigrationFailed(format!("update trigger: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_knowledge_category ON knowledge(category, last_updated DESC)",
        )
        .execute(pool)
        .await
        .map_err(|e| KnowledgeError::MigrationFailed(format!("category index: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_knowledge_last_updated ON knowledge(last_updated DESC)",
        )
        .execute(pool)
        .await
        .map_err(|e| KnowledgeError::MigrationFailed(format!("last_updated index: {e}")))?;

        debug!("Knowledge migrations complete");
        Ok(())
    }

    fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<KnowledgeEntry, KnowledgeError> {
        let document: String = row
            .try_get("document")
            .map_err(|e| KnowledgeError::QueryFailed(format!("document column: {e}")))?;
        serde_json::from_str(&document)
            .map_err(|e| KnowledgeError::QueryFailed(format!("corrupt knowledge document: {e}")))
    }

    /// Build a safe FTS5 query from free text.
    ///
    /// Text is split on anything that is not alphanumeric, the same way the
    /// `unicode61` tokenizer indexes it, so "beta-blockers" becomes two terms.
    /// Each piece is quoted and prefix-matched. Pieces are OR-joined so any
    /// one of them may match; BM25 puts entries matching more of them first.
    pub(crate) fn sanitize_fts_query(text: &str) -> String {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|piece| !piece.is_empty())
            .map(|piece| format!("\"{piece}\"*"))
            .collect::<Vec<_>>()
            .join(" OR ")
    }
}

#[async_trait]
impl KnowledgeStore for SqliteKnowledgeStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn search(&self, query: KnowledgeQuery) -> Result<Vec<KnowledgeEntry>, KnowledgeError> {
        let category = query.category.map(|c| c.as_str());

        if !query.has_text() {
            let rows = sqlx::query(
                r#"
                SELECT document FROM knowledge
                WHERE (?1 IS NULL OR category = ?1)
                ORDER BY last_updated DESC
                LIMIT ?2
                "#,
            )
            .bind(category)
            .bind(query.limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| KnowledgeError::QueryFailed(format!("Recent entries: {e}")))?;

            return rows.iter().map(Self::row_to_entry).collect();
        }

        let fts_query = Self::sanitize_fts_query(&query.text);
        if fts_query.is_empty() {
            return Ok(vec![]);
        }

        let rows = sqlx::query(
            r#"
            SELECT k.document, bm25(knowledge_fts) AS rank
            FROM knowledge_fts f
            JOIN knowledge k ON k.iid = f.rowid
            WHERE knowledge_fts MATCH ?1
              AND (?2 IS NULL OR k.category = ?2)
            ORDER BY rank
            LIMIT ?3
            "#,
        )
        .bind(&fts_query)
        .bind(category)
        .bind(query.limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| KnowledgeError::QueryFailed(format!("FTS5 search: {e}")))?;

        rows.iter()
            .map(|row| {
                let mut entry = Self::row_to_entry(row)?;
                // bm25() is negative, lower is better; flip so higher is better.
                let rank: f64 = row.try_get("rank").unwrap_or(0.0);
                entry.score = Some((-rank) as f32);
                Ok(entry)
            })
            .collect()
    }

    async fn find_by_term(
        &self,
        term: &str,
        category: Option<Category>,
    ) -> Result<Option<KnowledgeEntry>, KnowledgeError> {
        let row = sqlx::query(
            "SELECT document FROM knowledge WHERE term_key = ?1 AND (?2 IS NULL OR category = ?2)",
        )
        .bind(term.trim().to_lowercase())
        .bind(category.map(|c| c.as_str()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| KnowledgeError::QueryFailed(format!("Term lookup: {e}")))?;

        row.as_ref().map(Self::row_to_entry).transpose()
    }

    async fn upsert(&self, mut entry: KnowledgeEntry) -> Result<UpsertOutcome, KnowledgeError> {
        entry.validate()?;
        entry.term = entry.term.trim().to_string();
        entry.score = None;

        let term_key = entry.term.to_lowercase();
        let document = serde_json::to_string(&entry)
            .map_err(|e| KnowledgeError::Storage(format!("Entry serialization: {e}")))?;

        let description = entry.description.as_deref().unwrap_or("");
        let last_updated = timestamp(&entry.last_updated);

        // Insert-or-nothing first; the affected row count decides the outcome,
        // so concurrent writers of one term never both see `Inserted`.
        let inserted = sqlx::query(
            r#"
            INSERT INTO knowledge (term, term_key, category, description, document, last_updated)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(term_key) DO NOTHING
            "#,
        )
        .bind(&entry.term)
        .bind(&term_key)
        .bind(entry.category.as_str())
        .bind(description)
        .bind(&document)
        .bind(&last_updated)
        .execute(&self.pool)
        .await
        .map_err(|e| KnowledgeError::Storage(format!("INSERT failed: {e}")))?
        .rows_affected();

        if inserted > 0 {
            debug!(term = %entry.term, "Inserted knowledge entry");
            return Ok(UpsertOutcome::Inserted);
        }

        sqlx::query(
            r#"
            UPDATE knowledge
            SET term = ?1, category = ?3, description = ?4, document = ?5, last_updated = ?6
            WHERE term_key = ?2
            "#,
        )
        .bind(&entry.term)
        .bind(&term_key)
        .bind(entry.category.as_str())
        .bind(description)
        .bind(&document)
        .bind(&last_updated)
        .execute(&self.pool)
        .await
        .map_err(|e| KnowledgeError::Storage(format!("UPDATE failed: {e}")))?;

        debug!(term = %entry.term, "Updated knowledge entry");
        Ok(UpsertOutcome::Updated)
    }

    async fn count(&self) -> Result<usize, KnowledgeError> {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM knowledge")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| KnowledgeError::QueryFailed(format!("COUNT: {e}")))?;

        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| KnowledgeError::QueryFailed(format!("cnt column: {e}")))?;

        Ok(cnt as usize)
    }
}
