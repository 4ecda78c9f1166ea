//! # MedTutor Core
//!
//! Domain types, traits and errors for the MedTutor medical tutor.
//!
//! Every external collaborator (knowledge base, session store, language
//! model) is a trait here; implementations live in `medtutor-store` and
//! `medtutor-providers`, and all crates depend inward on this one.

pub mod error;
pub mod knowledge;
pub mod message;
pub mod provider;
pub mod session;

pub use error::{Error, Result};
pub use knowledge::{Category, ContextEntry, KnowledgeEntry, KnowledgeQuery, KnowledgeStore};
pub use message::{ClassificationResult, ConversationTurn, Message, Role, TurnMetadata};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use session::{Session, SessionStore};
