//! In-memory stores for testing and ephemeral runs.

use async_trait::async_trait;
use chrono::Utc;
use medtutor_core::error::{KnowledgeError, SessionError};
use medtutor_core::knowledge::{
    Category, KnowledgeEntry, KnowledgeQuery, KnowledgeStore, UpsertOutcome,
};
use medtutor_core::session::{Session, SessionStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A knowledge base kept in a Vec.
///
/// Text search is a simple token-overlap count over `term` and
/// `description`, enough to mirror the ranking contract of the SQLite store.
pub struct InMemoryKnowledgeStore {
    entries: Arc<RwLock<Vec<KnowledgeEntry>>>,
}

impl InMemoryKnowledgeStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Build a store pre-filled with `entries` (later duplicates replace earlier ones).
    pub async fn with_entries(entries: impl IntoIterator<Item = KnowledgeEntry>) -> Self {
        let store = Self::new();
        for entry in entries {
            // Invalid entries are skipped, matching what upsert would reject.
            let _ = store.upsert(entry).await;
        }
        store
    }
}

impl Default for InMemoryKnowledgeStore {
    fn default() -> Self {
        Self::new()
    }
}

fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(String::from)
        .collect()
}

fn relevance(entry: &KnowledgeEntry, query_tokens: &[String]) -> f32 {
    let mut haystack = tokens(&entry.term);
    if let Some(description) = &entry.description {
        haystack.extend(tokens(description));
    }
    haystack
        .iter()
        .filter(|word| query_tokens.iter().any(|q| word.starts_with(q.as_str())))
        .count() as f32
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn search(&self, query: KnowledgeQuery) -> Result<Vec<KnowledgeEntry>, KnowledgeError> {
        let entries = self.entries.read().await;
        let in_category =
            |e: &&KnowledgeEntry| query.category.is_none_or(|c| e.category == c);

        let mut results: Vec<KnowledgeEntry> = if query.has_text() {
            let query_tokens = tokens(&query.text);
            entries
                .iter()
                .filter(in_category)
                .filter_map(|e| {
                    let score = relevance(e, &query_tokens);
                    (score > 0.0).then(|| {
                        let mut hit = e.clone();
                        hit.score = Some(score);
                        hit
                    })
                })
                .collect()
        } else {
            entries.iter().filter(in_category).cloned().collect()
        };

        if query.has_text() {
            results.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(b.last_updated.cmp(&a.last_updated))
            });
        } else {
            results.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        }
        results.truncate(query.limit);

        Ok(results)
    }

    async fn find_by_term(
        &self,
        term: &str,
        category: Option<Category>,
    ) -> Result<Option<KnowledgeEntry>, KnowledgeError> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .find(|e| {
                e.term.eq_ignore_ascii_case(term.trim()) && category.is_none_or(|c| e.category == c)
            })
            .cloned())
    }

    async fn upsert(&self, mut entry: KnowledgeEntry) -> Result<UpsertOutcome, KnowledgeError> {
        entry.validate()?;
        entry.term = entry.term.trim().to_string();
        entry.score = None;

        let mut entries = self.entries.write().await;
        match entries
            .iter_mut()
            .find(|e| e.term.eq_ignore_ascii_case(&entry.term))
        {
            Some(existing) => {
                *existing = entry;
                Ok(UpsertOutcome::Updated)
            }
            None => {
                entries.push(entry);
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    async fn count(&self) -> Result<usize, KnowledgeError> {
        Ok(self.entries.read().await.len())
    }
}

/// Sessions kept in a HashMap keyed by session id.
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn load_or_create(&self, session_id: &str, user_id: &str) -> Result<Session, SessionError> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id, user_id))
            .clone())
    }

    async fn get(&self, session_id: &str) -> Result<Option<Session>, SessionError> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn save(&self, session: &Session) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&session.session_id) {
            Some(stored) => {
                stored.turns = session.turns.clone();
                stored.updated_at = session.updated_at;
            }
            None => {
                sessions.insert(session.session_id.clone(), session.clone());
            }
        }
        Ok(())
    }

    async fn clear(&self, session_id: &str) -> Result<(), SessionError> {
        if let Some(session) = self.sessions.write().await.get_mut(session_id) {
            session.turns.clear();
            session.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use medtutor_core::message::{ClassificationResult, ConversationTurn};

    fn entry(term: &str, category: Category, description: &str) -> KnowledgeEntry {
        KnowledgeEntry::new(term, category, format!("Definition of {term}"))
            .with_description(description)
    }

    #[tokio::test]
    async fn search_ranks_by_overlap() {
        let store = InMemoryKnowledgeStore::with_entries([
            entry("chills", Category::Symptom, "Shivering with infection"),
            entry("fever", Category::Symptom, "Fever from infection"),
            entry("heart", Category::Anatomy, "Pumps blood"),
        ])
        .await;

        let results = store
            .search(KnowledgeQuery {
                text: "fever infection".into(),
                category: None,
                limit: 10,
            })
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].term, "fever");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn search_without_text_orders_by_recency() {
        let now = Utc::now();
        let mut old = entry("old", Category::Disease, "x");
        old.last_updated = now - Duration::days(2);
        let mut new = entry("new", Category::Disease, "x");
        new.last_updated = now;
        let store = InMemoryKnowledgeStore::with_entries([
            old,
            new,
            entry("other", Category::Anatomy, "x"),
        ])
        .await;

        let results = store
            .search(KnowledgeQuery {
                text: String::new(),
                category: Some(Category::Disease),
                limit: 5,
            })
            .await
            .unwrap();
        let terms: Vec<_> = results.iter().map(|e| e.term.as_str()).collect();
        assert_eq!(terms, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn upsert_is_case_insensitive_on_term() {
        let store = InMemoryKnowledgeStore::new();
        assert_eq!(
            store
                .upsert(entry("Asthma", Category::Disease, "v1"))
                .await
                .unwrap(),
            UpsertOutcome::Inserted
        );
        assert_eq!(
            store
                .upsert(entry("asthma", Category::Disease, "v2"))
                .await
                .unwrap(),
            UpsertOutcome::Updated
        );
        assert_eq!(store.count().await.unwrap(), 1);
        let found = store.find_by_term("ASTHMA", None).await.unwrap().unwrap();
        assert_eq!(found.description.as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn session_lifecycle() {
        let store = InMemorySessionStore::new();
        let classification = ClassificationResult {
            category: Category::General,
            terms: vec![],
            related_topics: vec![],
        };

        let mut session = store.load_or_create("s1", "u1").await.unwrap();
        session.append([
            ConversationTurn::user("q", &classification),
            ConversationTurn::assistant("a", &classification),
        ]);
        store.save(&session).await.unwrap();
        assert_eq!(store.read("s1").await.unwrap().len(), 2);

        store.clear("s1").await.unwrap();
        assert!(store.read("s1").await.unwrap().is_empty());
        assert!(store.get("s1").await.unwrap().is_some());
    }
}
