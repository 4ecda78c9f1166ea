//! Knowledge base domain: medical concepts and the store trait over them.
//!
//! The knowledge store is a term-keyed document collection with a full-text
//! index over `term` and `description`. The chat core only reads from it;
//! seed tooling writes to it via upsert keyed on `term`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::KnowledgeError;

/// Coarse classification shared by knowledge entries and user queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Symptom,
    Disease,
    Medication,
    Anatomy,
    Procedure,
    #[default]
    General,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Symptom,
        Category::Disease,
        Category::Medication,
        Category::Anatomy,
        Category::Procedure,
        Category::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Symptom => "symptom",
            Category::Disease => "disease",
            Category::Medication => "medication",
            Category::Anatomy => "anatomy",
            Category::Procedure => "procedure",
            Category::General => "general",
        }
    }

    /// `None` for `General`, which never narrows a retrieval query.
    pub fn as_filter(&self) -> Option<Category> {
        match self {
            Category::General => None,
            other => Some(*other),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = KnowledgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == lower)
            .ok_or_else(|| KnowledgeError::InvalidEntry(format!("unknown category '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Emergency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reliability {
    High,
    Medium,
    Low,
}

/// A citation backing a knowledge entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reliability: Option<Reliability>,
}

/// One medical concept in the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeEntry {
    /// Canonical concept name; globally unique, matched case-insensitively.
    pub term: String,

    pub category: Category,

    /// Short canonical explanation.
    pub definition: String,

    /// Longer explanation; indexed for full-text search together with `term`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonyms: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_terms: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub common_causes: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symptoms: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub treatments: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prevention: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_to_see_doctor: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub medical_specialty: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub age_group: Vec<String>,

    #[serde(default)]
    pub sources: Vec<Source>,

    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,

    #[serde(default)]
    pub is_verified: bool,

    /// Text relevance score (set by full-text search operations)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl KnowledgeEntry {
    /// Create a minimal entry with only the required fields set.
    pub fn new(term: impl Into<String>, category: Category, definition: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            category,
            definition: definition.into(),
            description: None,
            synonyms: Vec::new(),
            related_terms: Vec::new(),
            severity: None,
            common_causes: Vec::new(),
            symptoms: Vec::new(),
            treatments: Vec::new(),
            prevention: Vec::new(),
            when_to_see_doctor: None,
            medical_specialty: Vec::new(),
            age_group: Vec::new(),
            sources: Vec::new(),
            last_updated: Utc::now(),
            is_verified: false,
            score: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Reject entries that would break store invariants.
    pub fn validate(&self) -> Result<(), KnowledgeError> {
        if self.term.trim().is_empty() {
            return Err(KnowledgeError::InvalidEntry("term must not be empty".into()));
        }
        if self.definition.trim().is_empty() {
            return Err(KnowledgeError::InvalidEntry(format!(
                "definition for '{}' must not be empty",
                self.term
            )));
        }
        Ok(())
    }
}

/// The slice of a knowledge entry injected into prompts as grounding context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub term: String,
    pub category: Category,
    pub definition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub sources: Vec<Source>,
}

impl From<KnowledgeEntry> for ContextEntry {
    fn from(entry: KnowledgeEntry) -> Self {
        Self {
            term: entry.term,
            category: entry.category,
            definition: entry.definition,
            description: entry.description,
            sources: entry.sources,
        }
    }
}

/// A query against the knowledge store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeQuery {
    /// Free text; any word may match. Empty means "no text filter".
    #[serde(default)]
    pub text: String,

    /// Equality filter on category.
    #[serde(default)]
    pub category: Option<Category>,

    /// Maximum number of results
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    5
}

impl KnowledgeQuery {
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Whether an upsert created a new record or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// The core KnowledgeStore trait.
///
/// Implementations: SQLite (FTS5), in-memory (for testing).
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Ranked search.
    ///
    /// With text: relevance-ranked (descending) and `score` is set.
    /// Without text: ordered by `last_updated` descending.
    async fn search(&self, query: KnowledgeQuery) -> Result<Vec<KnowledgeEntry>, KnowledgeError>;

    /// Exact, case-insensitive term lookup, optionally restricted to a category.
    async fn find_by_term(
        &self,
        term: &str,
        category: Option<Category>,
    ) -> Result<Option<KnowledgeEntry>, KnowledgeError>;

    /// Insert or replace the entry keyed on `term`.
    async fn upsert(&self, entry: KnowledgeEntry) -> Result<UpsertOutcome, KnowledgeError>;

    /// Total number of entries.
    async fn count(&self) -> Result<usize, KnowledgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("Disease".parse::<Category>().unwrap(), Category::Disease);
        assert_eq!(" anatomy ".parse::<Category>().unwrap(), Category::Anatomy);
        assert!("surgery".parse::<Category>().is_err());
    }

    #[test]
    fn general_is_not_a_filter() {
        assert_eq!(Category::General.as_filter(), None);
        assert_eq!(Category::Symptom.as_filter(), Some(Category::Symptom));
    }

    #[test]
    fn entry_deserializes_from_seed_shape() {
        let json = r#"{
            "term": "fever",
            "category": "symptom",
            "definition": "An elevated body temperature.",
            "synonyms": ["pyrexia"],
            "relatedTerms": ["chills"],
            "severity": "medium",
            "whenToSeeDoctor": "Above 103F",
            "sources": [{"name": "MedlinePlus", "url": "https://medlineplus.gov", "reliability": "high"}],
            "isVerified": true
        }"#;
        let entry: KnowledgeEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.category, Category::Symptom);
        assert_eq!(entry.related_terms, vec!["chills"]);
        assert_eq!(entry.severity, Some(Severity::Medium));
        assert_eq!(entry.sources[0].reliability, Some(Reliability::High));
        assert!(entry.is_verified);
        assert!(entry.score.is_none());
    }

    #[test]
    fn validate_rejects_blank_definition() {
        let entry = KnowledgeEntry::new("fever", Category::Symptom, "  ");
        assert!(entry.validate().is_err());
    }

    #[test]
    fn context_entry_keeps_only_prompt_fields() {
        let mut entry = KnowledgeEntry::new("Cough", Category::Symptom, "Forceful expulsion of air")
            .with_description("A reflex that clears the airways.");
        entry.synonyms = vec!["tussis".into()];
        let ctx = ContextEntry::from(entry);
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["term"], "Cough");
        assert_eq!(json["category"], "symptom");
        assert!(json.get("synonyms").is_none());
    }
}
