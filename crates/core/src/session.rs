//! Session trait: durable, append-only chat history per session id.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::message::ConversationTurn;

/// A chat session: an ordered sequence of turns under an opaque id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,

    pub user_id: String,

    /// Insertion-ordered turns
    pub turns: Vec<ConversationTurn>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new empty session.
    pub fn new(session_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append turns in order.
    pub fn append(&mut self, turns: impl IntoIterator<Item = ConversationTurn>) {
        self.turns.extend(turns);
        self.updated_at = Utc::now();
    }

    /// Empty the history; the session itself stays.
    pub fn clear(&mut self) {
        self.turns.clear();
        self.updated_at = Utc::now();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// The core SessionStore trait.
///
/// `save` must persist the full turn sequence in one write so a processed
/// message never ends up with only one of its two turns stored.
///
/// Implementations: SQLite, in-memory (for testing).
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Fetch the session, creating an empty one if none exists. Idempotent.
    async fn load_or_create(&self, session_id: &str, user_id: &str) -> Result<Session, SessionError>;

    /// Fetch a session without creating it.
    async fn get(&self, session_id: &str) -> Result<Option<Session>, SessionError>;

    /// Durably replace the stored turn sequence with `session.turns`.
    async fn save(&self, session: &Session) -> Result<(), SessionError>;

    /// Ordered turns, empty if the session does not exist.
    async fn read(&self, session_id: &str) -> Result<Vec<ConversationTurn>, SessionError> {
        Ok(self
            .get(session_id)
            .await?
            .map(|s| s.turns)
            .unwrap_or_default())
    }

    /// Empty the turn sequence without deleting the session record.
    async fn clear(&self, session_id: &str) -> Result<(), SessionError>;
}
