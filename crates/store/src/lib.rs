//! Knowledge base and session store implementations for MedTutor.

pub mod in_memory;
pub mod seed;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::{InMemoryKnowledgeStore, InMemorySessionStore};
pub use seed::{SeedReport, seed_entries, seed_from_file};

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteDatabase, SqliteKnowledgeStore, SqliteSessionStore};
