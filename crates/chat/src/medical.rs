//! Knowledge base browsing: term lookup, search and practice quizzes.

use medtutor_core::error::KnowledgeError;
use medtutor_core::knowledge::{
    Category, ContextEntry, KnowledgeEntry, KnowledgeQuery, KnowledgeStore,
};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::retriever::ContextRetriever;

/// Definition shown for a term the knowledge base knows nothing about.
pub const NO_DATA: &str = "No data available yet.";

const MISSING_DEFINITION: &str = "Definition not available";

const DISTRACTORS: [&str; 3] = [
    "A surgical procedure",
    "A laboratory test",
    "An imaging modality",
];

pub const DEFAULT_DIFFICULTY: &str = "medium";
pub const DEFAULT_QUIZ_COUNT: usize = 5;

/// Result of a term lookup, from most to least specific.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TermInfo {
    /// Exact term match.
    Entry(Box<KnowledgeEntry>),
    /// Best full-text match.
    Related(ContextEntry),
    /// Nothing found.
    Unknown {
        term: String,
        category: Category,
        definition: String,
    },
}

/// One row of search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub term: String,
    pub category: Category,
    pub definition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl From<KnowledgeEntry> for SearchHit {
    fn from(entry: KnowledgeEntry) -> Self {
        Self {
            term: entry.term,
            category: entry.category,
            definition: entry.definition,
            score: entry.score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizMetadata {
    pub category: Category,
    pub difficulty: String,
}

/// A multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub stem: String,
    pub options: Vec<String>,
    pub answer: String,
    pub metadata: QuizMetadata,
}

/// Limits applied by [`MedicalService`].
#[derive(Debug, Clone, Copy)]
pub struct MedicalLimits {
    /// Hits used when a lookup falls back to full-text search.
    pub lookup_limit: usize,
    pub search_limit: usize,
    pub quiz_pool_limit: usize,
}

impl Default for MedicalLimits {
    fn default() -> Self {
        Self {
            lookup_limit: 5,
            search_limit: 20,
            quiz_pool_limit: 200,
        }
    }
}

impl MedicalLimits {
    pub fn from_config(config: &medtutor_config::AppConfig) -> Self {
        Self {
            lookup_limit: config.retrieval.chat_limit,
            search_limit: config.retrieval.search_limit,
            quiz_pool_limit: config.retrieval.quiz_pool_limit,
        }
    }
}

#[derive(Clone)]
pub struct MedicalService {
    store: Arc<dyn KnowledgeStore>,
    retriever: ContextRetriever,
    limits: MedicalLimits,
}

impl MedicalService {
    pub fn new(store: Arc<dyn KnowledgeStore>, limits: MedicalLimits) -> Self {
        Self {
            retriever: ContextRetriever::new(Arc::clone(&store)),
            store,
            limits,
        }
    }

    /// Look up `term` within `category`.
    ///
    /// Tries an exact case-insensitive match, then the top full-text hit,
    /// then returns a placeholder.
    pub async fn lookup(&self, category: Category, term: &str) -> Result<TermInfo, KnowledgeError> {
        if let Some(entry) = self.store.find_by_term(term, Some(category)).await? {
            return Ok(TermInfo::Entry(Box::new(entry)));
        }

        let related = self
            .retriever
            .retrieve(category, &[term.to_string()], self.limits.lookup_limit)
            .await;
        if let Some(best) = related.into_iter().next() {
            debug!(term, matched = %best.term, "Lookup fell back to full-text match");
            return Ok(TermInfo::Related(best));
        }

        Ok(TermInfo::Unknown {
            term: term.to_string(),
            category,
            definition: NO_DATA.to_string(),
        })
    }

    /// Free-text search, optionally restricted to one category.
    ///
    /// An empty query lists the most recently updated entries.
    pub async fn search(
        &self,
        text: &str,
        category: Option<Category>,
    ) -> Result<Vec<SearchHit>, KnowledgeError> {
        let entries = self
            .store
            .search(KnowledgeQuery {
                text: text.to_string(),
                category,
                limit: self.limits.search_limit,
            })
            .await?;
        Ok(entries.into_iter().map(SearchHit::from).collect())
    }

    /// Generate up to `count` definition questions from `category` (all entries for `General`).
    pub async fn quiz(
        &self,
        category: Category,
        difficulty: &str,
        count: usize,
    ) -> Result<Vec<QuizQuestion>, KnowledgeError> {
        let pool = self
            .store
            .search(KnowledgeQuery {
                text: String::new(),
                category: category.as_filter(),
                limit: self.limits.quiz_pool_limit,
            })
            .await?;

        let items: Vec<(String, Category, String)> = if pool.is_empty() {
            builtin_quiz_items()
        } else {
            pool.into_iter()
                .map(|e| (e.term, e.category, e.definition))
                .collect()
        };

        let questions = items
            .into_iter()
            .take(count)
            .map(|(term, category, definition)| build_question(&term, category, &definition, difficulty))
            .collect();
        Ok(questions)
    }
}

fn builtin_quiz_items() -> Vec<(String, Category, String)> {
    [
        ("Hypertension", Category::Disease, "Elevated blood pressure"),
        ("Tachycardia", Category::Symptom, "Fast heart rate"),
        ("Ibuprofen", Category::Medication, "NSAID pain reliever"),
    ]
    .into_iter()
    .map(|(t, c, d)| (t.to_string(), c, d.to_string()))
    .collect()
}

fn build_question(term: &str, category: Category, definition: &str, difficulty: &str) -> QuizQuestion {
    let answer = if definition.is_empty() {
        MISSING_DEFINITION.to_string()
    } else {
        definition.to_string()
    };

    let mut options: Vec<String> = std::iter::once(answer.clone())
        .chain(DISTRACTORS.iter().map(|d| d.to_string()))
        .collect();
    options.shuffle(&mut rand::rng());

    QuizQuestion {
        stem: format!("What best describes {term}?"),
        options,
        answer,
        metadata: QuizMetadata {
            category,
            difficulty: difficulty.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingKnowledgeStore, seeded_store};
    use medtutor_store::InMemoryKnowledgeStore;

    async fn service() -> MedicalService {
        MedicalService::new(seeded_store().await, MedicalLimits::default())
    }

    #[tokio::test]
    async fn exact_lookup_returns_full_entry() {
        let info = service().await.lookup(Category::Symptom, "FEVER").await.unwrap();
        match info {
            TermInfo::Entry(entry) => assert_eq!(entry.term, "fever"),
            other => panic!("expected exact entry, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn lookup_falls_back_to_search() {
        let info = service()
            .await
            .lookup(Category::Anatomy, "chambers")
            .await
            .unwrap();
        match info {
            TermInfo::Related(ctx) => assert_eq!(ctx.term, "heart"),
            other => panic!("expected related entry, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn lookup_in_wrong_category_is_unknown() {
        let info = service()
            .await
            .lookup(Category::Medication, "zzzz")
            .await
            .unwrap();
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "term": "zzzz",
                "category": "medication",
                "definition": "No data available yet."
            })
        );
    }

    #[tokio::test]
    async fn lookup_propagates_store_errors() {
        let service = MedicalService::new(Arc::new(FailingKnowledgeStore), MedicalLimits::default());
        assert!(service.lookup(Category::Symptom, "fever").await.is_err());
    }

    #[tokio::test]
    async fn search_returns_slim_hits() {
        let hits = service().await.search("fever", None).await.unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].term, "fever");
        assert!(hits[0].score.is_some());

        let json = serde_json::to_value(&hits[0]).unwrap();
        assert!(json.get("description").is_none());
    }

    #[tokio::test]
    async fn search_with_category_filter() {
        let hits = service()
            .await
            .search("fever", Some(Category::Medication))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].term, "acetaminophen");
    }

    #[tokio::test]
    async fn empty_search_lists_recent_entries() {
        let hits = service().await.search("", None).await.unwrap();
        assert_eq!(hits.len(), 5);
        assert!(hits.iter().all(|h| h.score.is_none()));
    }

    #[tokio::test]
    async fn search_caps_results() {
        let entries = (0..30).map(|i| {
            KnowledgeEntry::new(format!("term {i}"), Category::General, "generic definition")
        });
        let store = Arc::new(InMemoryKnowledgeStore::with_entries(entries).await);
        let service = MedicalService::new(store, MedicalLimits::default());
        assert_eq!(service.search("generic term", None).await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn quiz_from_category_pool() {
        let questions = service()
            .await
            .quiz(Category::Symptom, "hard", 5)
            .await
            .unwrap();
        assert_eq!(questions.len(), 2);

        for q in &questions {
            assert!(q.stem.starts_with("What best describes "));
            assert_eq!(q.options.len(), 4);
            assert!(q.options.contains(&q.answer));
            for d in DISTRACTORS {
                assert!(q.options.iter().any(|o| o == d));
            }
            assert_eq!(q.metadata.category, Category::Symptom);
            assert_eq!(q.metadata.difficulty, "hard");
        }
    }

    #[tokio::test]
    async fn quiz_count_is_capped() {
        let questions = service()
            .await
            .quiz(Category::General, DEFAULT_DIFFICULTY, 2)
            .await
            .unwrap();
        assert_eq!(questions.len(), 2);
    }

    #[tokio::test]
    async fn quiz_uses_builtin_items_when_empty() {
        let service = MedicalService::new(
            Arc::new(InMemoryKnowledgeStore::new()),
            MedicalLimits::default(),
        );
        let questions = service
            .quiz(Category::Procedure, DEFAULT_DIFFICULTY, DEFAULT_QUIZ_COUNT)
            .await
            .unwrap();

        assert_eq!(questions.len(), 3);
        assert_eq!(questions[0].stem, "What best describes Hypertension?");
        assert_eq!(questions[0].answer, "Elevated blood pressure");
        assert_eq!(questions[1].metadata.category, Category::Symptom);
        assert_eq!(questions[2].answer, "NSAID pain reliever");
        assert_eq!(questions[2].metadata.difficulty, "medium");
    }

    #[test]
    fn missing_definition_has_placeholder_answer() {
        let q = build_question("X", Category::General, "", "easy");
        assert_eq!(q.answer, "Definition not available");
        assert!(q.options.contains(&q.answer));
    }
}
