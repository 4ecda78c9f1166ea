//! The MedTutor chat core.
//!
//! A student message flows through a fixed pipeline:
//!
//! 1. **Classify** the question by keyword into a category and search terms
//! 2. **Retrieve** matching knowledge base entries as grounding context
//! 3. **Assemble** the prompt: system prompt, recent history, context, question
//! 4. **Generate** an answer with the configured language model
//! 5. **Fall back** to a knowledge-only summary when generation fails
//! 6. **Persist** the user and assistant turns to the session
//!
//! Retrieval and generation failures are absorbed; only persistence failures
//! reach the caller.

pub mod classifier;
pub mod fallback;
pub mod medical;
pub mod prompt;
pub mod retriever;
pub mod service;
pub mod suggestions;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use classifier::classify;
pub use fallback::compose_fallback;
pub use medical::{MedicalLimits, MedicalService, QuizQuestion, SearchHit, TermInfo};
pub use prompt::PromptAssembler;
pub use retriever::ContextRetriever;
pub use service::{ChatReply, ChatRequest, ChatService, GenerationSettings};
pub use suggestions::{suggestions, suggestions_for};
