//! Prompt assembly.
//!
//! Builds the message list sent to the language model:
//!
//! | Position | Message |
//! |----------|---------|
//! | first | system prompt |
//! | ... | history window (role + content only) |
//! | second to last | retrieved context, only when non-empty |
//! | last | current user message |
//!
//! Assembly is deterministic: identical inputs always produce identical
//! output.

use medtutor_core::knowledge::ContextEntry;
use medtutor_core::message::{ConversationTurn, Message};

/// Prefix of the system message carrying retrieved knowledge.
pub const CONTEXT_PREFIX: &str = "Relevant medical information: ";

/// Stateless assembler; create one and reuse it.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    system_prompt: String,
    history_window: usize,
}

impl PromptAssembler {
    /// `history_window` caps how many of the most recent turns are replayed.
    pub fn new(system_prompt: impl Into<String>, history_window: usize) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            history_window,
        }
    }

    pub fn assemble(
        &self,
        history: &[ConversationTurn],
        context: &[ContextEntry],
        user_message: &str,
    ) -> Result<Vec<Message>, serde_json::Error> {
        let window_start = history.len().saturating_sub(self.history_window);
        let window = &history[window_start..];

        let mut messages = Vec::with_capacity(window.len() + 3);
        messages.push(Message::system(self.system_prompt.clone()));
        messages.extend(window.iter().map(ConversationTurn::to_message));

        if !context.is_empty() {
            let payload = serde_json::to_string(context)?;
            messages.push(Message::system(format!("{CONTEXT_PREFIX}{payload}")));
        }

        messages.push(Message::user(user_message));
        Ok(messages)
    }
}
