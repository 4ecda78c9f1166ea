//! Message, classification, and conversation-turn domain types.
//!
//! These are the core value objects that flow through the chat pipeline:
//! Student sends a message → classified → context retrieved → Provider generates response
//! → both turns persisted in the session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::knowledge::Category;

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The student
    User,
    /// The tutor model
    Assistant,
    /// System instructions and injected context
    System,
}

/// A single message in a provider request.
///
/// Unlike [`ConversationTurn`], this carries no metadata: it is exactly what
/// the language model sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Outcome of classifying one student message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    /// Always defined; `General` when no keyword matched.
    pub category: Category,
    /// Deduplicated tokens extracted from the message.
    pub terms: Vec<String>,
    /// Fixed study topics for the category.
    pub related_topics: Vec<String>,
}

/// Metadata stored with a student turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTurnMetadata {
    pub category: Category,
    pub terms: Vec<String>,
    pub related_topics: Vec<String>,
}

impl From<&ClassificationResult> for UserTurnMetadata {
    fn from(result: &ClassificationResult) -> Self {
        Self {
            category: result.category,
            terms: result.terms.clone(),
            related_topics: result.related_topics.clone(),
        }
    }
}

/// Metadata stored with a tutor turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantTurnMetadata {
    pub category: Category,
    pub related_topics: Vec<String>,
}

impl From<&ClassificationResult> for AssistantTurnMetadata {
    fn from(result: &ClassificationResult) -> Self {
        Self {
            category: result.category,
            related_topics: result.related_topics.clone(),
        }
    }
}

/// Turn metadata, shaped by the role that produced the turn.
///
/// Serialized without a tag so the wire shape is just the inner record;
/// `User` is tried first since it is the only one carrying `terms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnMetadata {
    User(UserTurnMetadata),
    Assistant(AssistantTurnMetadata),
}

/// One persisted message in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TurnMetadata>,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    /// A student turn carrying its classification.
    pub fn user(content: impl Into<String>, classification: &ClassificationResult) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            metadata: Some(TurnMetadata::User(classification.into())),
            timestamp: Utc::now(),
        }
    }

    /// A tutor turn carrying the category and related topics of the question it answers.
    pub fn assistant(content: impl Into<String>, classification: &ClassificationResult) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            metadata: Some(TurnMetadata::Assistant(classification.into())),
            timestamp: Utc::now(),
        }
    }

    /// Strip metadata for inclusion in a provider request.
    pub fn to_message(&self) -> Message {
        Message {
            role: self.role,
            content: self.content.clone(),
        }
    }
}
