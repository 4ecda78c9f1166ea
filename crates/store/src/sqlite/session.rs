//! SQLite session store.
//!
//! Each session is one row; its turn sequence is a JSON array in `turns`,
//! so a save replaces the whole history in a single statement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use medtutor_core::error::SessionError;
use medtutor_core::message::ConversationTurn;
use medtutor_core::session::{Session, SessionStore};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use super::timestamp;

#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create from an existing pool, running migrations first.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, SessionError> {
        Self::migrate(&pool).await?;
        Ok(Self::new(pool))
    }

    pub(crate) async fn migrate(pool: &SqlitePool) -> Result<(), SessionError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                session_id TEXT PRIMARY KEY,
                user_id    TEXT NOT NULL DEFAULT '',
                turns      TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await
        .map_err(|e| SessionError::MigrationFailed(format!("sessions table: {e}")))?;

        debug!("Session migrations complete");
        Ok(())
    }

    fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> Result<Session, SessionError> {
        let session_id: String = row
            .try_get("session_id")
            .map_err(|e| SessionError::QueryFailed(format!("session_id column: {e}")))?;
        let user_id: String = row
            .try_get("user_id")
            .map_err(|e| SessionError::QueryFailed(format!("user_id column: {e}")))?;
        let turns_json: String = row
            .try_get("turns")
            .map_err(|e| SessionError::QueryFailed(format!("turns column: {e}")))?;
        let created_at_str: String = row
            .try_get("created_at")
            .map_err(|e| SessionError::QueryFailed(format!("created_at column: {e}")))?;
        let updated_at_str: String = row
            .try_get("updated_at")
            .map_err(|e| SessionError::QueryFailed(format!("updated_at column: {e}")))?;

        let turns: Vec<ConversationTurn> =
            serde_json::from_str(&turns_json).map_err(|e| SessionError::Corrupt {
                session_id: session_id.clone(),
                reason: e.to_string(),
            })?;

        let created_at = parse_timestamp(&session_id, "created_at", &created_at_str)?;
        let updated_at = parse_timestamp(&session_id, "updated_at", &updated_at_str)?;

        Ok(Session {
            session_id,
            user_id,
            turns,
            created_at,
            updated_at,
        })
    }
}

fn parse_timestamp(
    session_id: &str,
    column: &str,
    value: &str,
) -> Result<DateTime<Utc>, SessionError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SessionError::Corrupt {
            session_id: session_id.to_string(),
            reason: format!("{column} '{value}': {e}"),
        })
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn load_or_create(&self, session_id: &str, user_id: &str) -> Result<Session, SessionError> {
        let now = timestamp(&Utc::now());
        sqlx::query(
            r#"
            INSERT INTO sessions (session_id, user_id, turns, created_at, updated_at)
            VALUES (?1, ?2, '[]', ?3, ?3)
            ON CONFLICT(session_id) DO NOTHING
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::Storage(format!("Session create failed: {e}")))?;

        self.get(session_id).await?.ok_or_else(|| {
            SessionError::QueryFailed(format!("session '{session_id}' vanished after create"))
        })
    }

    async fn get(&self, session_id: &str) -> Result<Option<Session>, SessionError> {
        let row = sqlx::query("SELECT * FROM sessions WHERE session_id = ?1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SessionError::QueryFailed(format!("Session lookup: {e}")))?;

        row.as_ref().map(Self::row_to_session).transpose()
    }

    async fn save(&self, session: &Session) -> Result<(), SessionError> {
        let turns = serde_json::to_string(&session.turns)
            .map_err(|e| SessionError::Storage(format!("Turns serialization: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO sessions (session_id, user_id, turns, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(session_id) DO UPDATE SET
                turns = excluded.turns,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&session.session_id)
        .bind(&session.user_id)
        .bind(&turns)
        .bind(timestamp(&session.created_at))
        .bind(timestamp(&session.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::Storage(format!("Session save failed: {e}")))?;

        debug!(
            session_id = %session.session_id,
            turns = session.turns.len(),
            "Saved session"
        );
        Ok(())
    }

    async fn clear(&self, session_id: &str) -> Result<(), SessionError> {
        let result = sqlx::query(
            "UPDATE sessions SET turns = '[]', updated_at = ?2 WHERE session_id = ?1",
        )
        .bind(session_id)
        .bind(timestamp(&Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::Storage(format!("Session clear failed: {e}")))?;

        debug!(session_id, existed = result.rows_affected() > 0, "Cleared session");
        Ok(())
    }
}
