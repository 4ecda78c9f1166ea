//! Knowledge-only answer used when the language model is unavailable.

use medtutor_core::knowledge::ContextEntry;

const HEADER: &str = "Educational summary based on local knowledge base (LLM unavailable):";
const EMPTY_BODY: &str = "No relevant items found in knowledge base.";
const FOOTER: &str = "\nNote: This is for educational purposes only and not medical advice.";

/// Compose a numbered summary of `context`.
///
/// Each item shows its definition, or its description when the definition
/// is empty.
pub fn compose_fallback(context: &[ContextEntry]) -> String {
    let body = if context.is_empty() {
        EMPTY_BODY.to_string()
    } else {
        context
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let text = if entry.definition.is_empty() {
                    entry.description.as_deref().unwrap_or("")
                } else {
                    entry.definition.as_str()
                };
                format!("{}. {}: {}", i + 1, entry.term, text)
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    [HEADER, body.as_str(), FOOTER].join("\n")
}
