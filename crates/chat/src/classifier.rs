//! Keyword classifier for student questions.
//!
//! Pure and total: every input, including the empty string, yields a
//! classification. The first keyword list with a substring hit decides the
//! category, checked in the order symptom, disease, anatomy.

use medtutor_core::knowledge::Category;
use medtutor_core::message::ClassificationResult;
use std::collections::HashSet;

const SYMPTOM_KEYWORDS: &[&str] = &[
    "pain", "fever", "cough", "nausea", "headache", "fatigue", "dizzy", "rash",
];

const DISEASE_KEYWORDS: &[&str] = &[
    "diabetes",
    "hypertension",
    "asthma",
    "influenza",
    "covid",
    "cancer",
];

const ANATOMY_KEYWORDS: &[&str] = &["heart", "lung", "liver", "kidney", "brain", "stomach"];

/// Keyword lists in match priority order.
const RULES: &[(Category, &[&str])] = &[
    (Category::Symptom, SYMPTOM_KEYWORDS),
    (Category::Disease, DISEASE_KEYWORDS),
    (Category::Anatomy, ANATOMY_KEYWORDS),
];

/// Shortest token kept as a term.
const MIN_TERM_LEN: usize = 4;

/// Classify a free-text question.
pub fn classify(text: &str) -> ClassificationResult {
    let lower = text.to_lowercase();

    let category = RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or_default();

    ClassificationResult {
        category,
        terms: extract_terms(&lower),
        related_topics: related_topics(category),
    }
}

/// Split lowercased text into deduplicated candidate terms.
///
/// Anything other than `a-z`, digits, whitespace and `-` becomes a separator.
/// First occurrence order is kept.
pub fn extract_terms(lower: &str) -> Vec<String> {
    let cleaned: String = lower
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    let mut seen = HashSet::new();
    cleaned
        .split_whitespace()
        .filter(|w| w.len() >= MIN_TERM_LEN)
        .filter(|w| seen.insert(*w))
        .map(String::from)
        .collect()
}

/// Fixed study topics for a category; categories without their own list use the general one.
pub fn related_topics(category: Category) -> Vec<String> {
    let topics: [&str; 3] = match category {
        Category::Symptom => ["differential diagnosis", "red flags", "history taking"],
        Category::Disease => ["pathophysiology", "risk factors", "management"],
        Category::Anatomy => ["structure", "function", "clinical correlations"],
        _ => ["vital signs", "SOAP notes", "basic pharmacology"],
    };
    topics.iter().map(|t| t.to_string()).collect()
}
