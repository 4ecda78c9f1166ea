//! Provider selection: hosted or local, based on config.

use std::sync::Arc;

use medtutor_config::{AppConfig, LlmMode};
use medtutor_core::provider::Provider;
use tracing::info;

use crate::openai_compat::OpenAiCompatProvider;
use crate::timeout::TimeoutProvider;

/// Build the completion provider described by `config.llm`.
///
/// Both modes speak the OpenAI chat-completions protocol; they differ only in
/// endpoint, model and credential. Every call is bounded by `llm.timeout_secs`.
pub fn build_from_config(config: &AppConfig) -> Arc<dyn Provider> {
    let llm = &config.llm;
    let name = match llm.mode {
        LlmMode::Hosted => "openai",
        LlmMode::Local => "local",
    };

    info!(
        provider = name,
        base_url = %llm.base_url(),
        model = %llm.model(),
        "Configured LLM provider"
    );

    let inner: Arc<dyn Provider> = Arc::new(OpenAiCompatProvider::new(
        name,
        llm.base_url(),
        llm.effective_api_key(),
    ));

    Arc::new(TimeoutProvider::new(inner, llm.timeout()))
}
