//! JSON seed import for the knowledge base.
//!
//! A seed file is a JSON array of knowledge entries in their wire shape
//! (camelCase fields). Every entry is upserted on `term`, so re-running a seed
//! refreshes existing records instead of duplicating them.

use medtutor_core::error::KnowledgeError;
use medtutor_core::knowledge::{KnowledgeEntry, KnowledgeStore, UpsertOutcome};
use std::path::Path;
use tracing::{info, warn};

/// Counts from one seed run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl SeedReport {
    pub fn total(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Parse a seed document.
pub fn parse_seed(json: &str) -> Result<Vec<KnowledgeEntry>, KnowledgeError> {
    serde_json::from_str(json)
        .map_err(|e| KnowledgeError::InvalidEntry(format!("Invalid seed file: {e}")))
}

/// Upsert every entry; invalid entries are logged and skipped.
pub async fn seed_entries(
    store: &dyn KnowledgeStore,
    entries: Vec<KnowledgeEntry>,
) -> Result<SeedReport, KnowledgeError> {
    let mut report = SeedReport::default();

    for entry in entries {
        let term = entry.term.clone();
        match store.upsert(entry).await {
            Ok(UpsertOutcome::Inserted) => report.inserted += 1,
            Ok(UpsertOutcome::Updated) => report.updated += 1,
            Err(KnowledgeError::InvalidEntry(reason)) => {
                warn!(term = %term, %reason, "Skipping invalid seed entry");
                report.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        inserted = report.inserted,
        updated = report.updated,
        skipped = report.skipped,
        "Seed complete"
    );
    Ok(report)
}

/// Read `path` and upsert its entries into `store`.
pub async fn seed_from_file(
    store: &dyn KnowledgeStore,
    path: &Path,
) -> Result<SeedReport, KnowledgeError> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        KnowledgeError::Storage(format!("Failed to read seed file {}: {e}", path.display()))
    })?;
    let entries = parse_seed(&content)?;
    info!(path = %path.display(), entries = entries.len(), "Loaded seed file");
    seed_entries(store, entries).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::InMemoryKnowledgeStore;
    use medtutor_core::knowledge::Category;

    const SEED: &str = r#"[
        {"term": "fever", "category": "symptom", "definition": "High temperature"},
        {"term": "heart", "category": "anatomy", "definition": "Pumps blood",
         "description": "Four-chambered organ", "isVerified": true},
        {"term": "", "category": "general", "definition": "nameless"}
    ]"#;

    #[tokio::test]
    async fn seeding_twice_updates_instead_of_duplicating() {
        let store = InMemoryKnowledgeStore::new();
        let first = seed_entries(&store, parse_seed(SEED).unwrap()).await.unwrap();
        assert_eq!(
            first,
            SeedReport {
                inserted: 2,
                updated: 0,
                skipped: 1
            }
        );

        let second = seed_entries(&store, parse_seed(SEED).unwrap()).await.unwrap();
        assert_eq!(second.updated, 2);
        assert_eq!(second.total(), 2);
        assert_eq!(store.count().await.unwrap(), 2);

        let heart = store
            .find_by_term("heart", Some(Category::Anatomy))
            .await
            .unwrap()
            .unwrap();
        assert!(heart.is_verified);
    }

    #[tokio::test]
    async fn seed_from_file_reads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        std::fs::write(&path, SEED).unwrap();

        let store = InMemoryKnowledgeStore::new();
        let report = seed_from_file(&store, &path).await.unwrap();
        assert_eq!(report.inserted, 2);
    }

    #[tokio::test]
    async fn missing_file_is_storage_error() {
        let store = InMemoryKnowledgeStore::new();
        let err = seed_from_file(&store, Path::new("/definitely/not/here.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, KnowledgeError::Storage(_)));
    }

    #[test]
    fn malformed_seed_is_rejected() {
        assert!(matches!(
            parse_seed("{not an array}"),
            Err(KnowledgeError::InvalidEntry(_))
        ));
    }

    #[tokio::test]
    async fn bundled_seed_file_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/medical_knowledge.json");
        let content = std::fs::read_to_string(path).unwrap();
        let entries = parse_seed(&content).unwrap();
        assert!(entries.len() >= 7);
        assert!(entries.iter().all(|e| e.validate().is_ok()));
    }
}
