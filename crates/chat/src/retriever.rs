//! Context retrieval from the knowledge base.

use medtutor_core::knowledge::{Category, ContextEntry, KnowledgeQuery, KnowledgeStore};
use std::sync::Arc;
use tracing::{debug, warn};

/// Fetches grounding context for a classified question.
///
/// Retrieval never fails from the caller's point of view: a store error is
/// logged and treated as "nothing relevant found".
#[derive(Clone)]
pub struct ContextRetriever {
    store: Arc<dyn KnowledgeStore>,
}

impl ContextRetriever {
    pub fn new(store: Arc<dyn KnowledgeStore>) -> Self {
        Self { store }
    }

    /// Up to `limit` context entries for `(category, terms)`.
    ///
    /// With terms: full-text search over the space-joined terms, best first.
    /// Without: most recently updated entries. `General` does not filter.
    pub async fn retrieve(
        &self,
        category: Category,
        terms: &[String],
        limit: usize,
    ) -> Vec<ContextEntry> {
        let query = KnowledgeQuery {
            text: terms.join(" "),
            category: category.as_filter(),
            limit,
        };

        match self.store.search(query).await {
            Ok(entries) => {
                debug!(
                    category = %category,
                    terms = terms.len(),
                    hits = entries.len(),
                    "Retrieved knowledge context"
                );
                entries.into_iter().map(ContextEntry::from).collect()
            }
            Err(e) => {
                warn!(
                    store = %self.store.name(),
                    error = %e,
                    "Knowledge retrieval failed; continuing without context"
                );
                Vec::new()
            }
        }
    }
}
