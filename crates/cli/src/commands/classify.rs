//! `medtutor classify`: print the classification of a question.

use medtutor_chat::{classify, suggestions};

pub fn run(text: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = classify(text);
    println!("{}", serde_json::to_string_pretty(&result)?);

    println!("\nSuggested follow-ups:");
    for s in suggestions(result.category) {
        println!("  - {s}");
    }
    Ok(())
}
