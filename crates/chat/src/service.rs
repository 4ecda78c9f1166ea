//! The chat pipeline.
//!
//! For every student message:
//!
//! 1. **Load** the session (created on first use)
//! 2. **Classify** the question
//! 3. **Retrieve** grounding context from the knowledge base
//! 4. **Assemble** the prompt and call the language model
//! 5. **Fall back** to a knowledge-only summary if the call fails
//! 6. **Persist** the user and assistant turns together
//!
//! Steps 1 to 6 run under a per-session lock, so two messages for the same
//! session are processed one after the other and neither overwrites the
//! other's turns. The pipeline runs on its own task: a caller that goes away
//! mid-request does not stop the turns from being saved.

use medtutor_config::AppConfig;
use medtutor_core::error::Error;
use medtutor_core::knowledge::KnowledgeStore;
use medtutor_core::message::{ClassificationResult, ConversationTurn};
use medtutor_core::provider::{Provider, ProviderRequest};
use medtutor_core::session::SessionStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, info, warn};

use crate::classifier::classify;
use crate::fallback::compose_fallback;
use crate::prompt::PromptAssembler;
use crate::retriever::ContextRetriever;
use crate::suggestions::suggestions;

/// User id recorded when the client does not send one.
pub const ANONYMOUS_USER: &str = "anonymous";

/// One incoming student message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub session_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// The reply to one student message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub response: String,
    pub session_id: String,
    pub metadata: ClassificationResult,
    pub suggestions: Vec<String>,
}

/// Generation parameters for each completion request.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Maximum context entries retrieved per message.
    pub context_limit: usize,
}

impl GenerationSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.llm.model().to_string(),
            max_tokens: config.llm.max_tokens,
            temperature: config.llm.temperature,
            context_limit: config.retrieval.chat_limit,
        }
    }
}

/// Hands out one async mutex per session id.
///
/// Entries are weak so a lock lives only while some request holds it; dead
/// entries are swept when the map grows.
#[derive(Default)]
struct SessionLocks {
    locks: Mutex<HashMap<String, Weak<tokio::sync::Mutex<()>>>>,
}

impl SessionLocks {
    const SWEEP_THRESHOLD: usize = 1024;

    fn get(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(lock) = locks.get(session_id).and_then(Weak::upgrade) {
            return lock;
        }

        if locks.len() >= Self::SWEEP_THRESHOLD {
            locks.retain(|_, weak| weak.strong_count() > 0);
        }

        let lock = Arc::new(tokio::sync::Mutex::new(()));
        locks.insert(session_id.to_string(), Arc::downgrade(&lock));
        lock
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks
            .lock()
            .map(|l| l.values().filter(|w| w.strong_count() > 0).count())
            .unwrap_or(0)
    }
}

struct Inner {
    provider: Arc<dyn Provider>,
    sessions: Arc<dyn SessionStore>,
    retriever: ContextRetriever,
    assembler: PromptAssembler,
    settings: GenerationSettings,
    locks: SessionLocks,
}

/// Entry point for chat operations. Cheap to clone.
#[derive(Clone)]
pub struct ChatService {
    inner: Arc<Inner>,
}

impl ChatService {
    pub fn new(
        provider: Arc<dyn Provider>,
        knowledge: Arc<dyn KnowledgeStore>,
        sessions: Arc<dyn SessionStore>,
        assembler: PromptAssembler,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                provider,
                sessions,
                retriever: ContextRetriever::new(knowledge),
                assembler,
                settings,
                locks: SessionLocks::default(),
            }),
        }
    }

    /// Wire a service from application config.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        knowledge: Arc<dyn KnowledgeStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self::new(
            provider,
            knowledge,
            sessions,
            PromptAssembler::new(&config.chat.system_prompt, config.chat.history_window),
            GenerationSettings::from_config(config),
        )
    }

    /// Process one message and persist both resulting turns.
    ///
    /// Only persistence failures surface as errors; retrieval and generation
    /// failures are absorbed.
    pub async fn send_message(&self, request: ChatRequest) -> Result<ChatReply, Error> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.process(request).await })
            .await
            .map_err(|e| Error::Internal(format!("chat task failed: {e}")))?
    }

    /// Ordered turns of a session; empty if it does not exist.
    pub async fn history(&self, session_id: &str) -> Result<Vec<ConversationTurn>, Error> {
        Ok(self.inner.sessions.read(session_id).await?)
    }

    /// Empty a session's history, keeping the session itself.
    pub async fn clear(&self, session_id: &str) -> Result<(), Error> {
        let lock = self.inner.locks.get(session_id);
        let _guard = lock.lock().await;
        self.inner.sessions.clear(session_id).await?;
        info!(session_id, "Cleared chat history");
        Ok(())
    }

    pub fn provider_name(&self) -> &str {
        self.inner.provider.name()
    }
}

impl Inner {
    async fn process(&self, request: ChatRequest) -> Result<ChatReply, Error> {
        let ChatRequest {
            message,
            session_id,
            user_id,
        } = request;
        let user_id = user_id
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| ANONYMOUS_USER.to_string());

        let lock = self.locks.get(&session_id);
        let _guard = lock.lock().await;

        let mut session = self.sessions.load_or_create(&session_id, &user_id).await?;

        let classification = classify(&message);
        debug!(
            session_id = %session_id,
            category = %classification.category,
            terms = classification.terms.len(),
            "Classified message"
        );

        let context = self
            .retriever
            .retrieve(
                classification.category,
                &classification.terms,
                self.settings.context_limit,
            )
            .await;

        let messages = self.assembler.assemble(&session.turns, &context, &message)?;

        let request = ProviderRequest {
            model: self.settings.model.clone(),
            messages,
            temperature: self.settings.temperature,
            max_tokens: Some(self.settings.max_tokens),
        };

        let response = match self.provider.complete(request).await {
            Ok(response) => {
                if let Some(usage) = &response.usage {
                    debug!(
                        model = %response.model,
                        total_tokens = usage.total_tokens,
                        "LLM response received"
                    );
                }
                response.message.content
            }
            Err(e) => {
                warn!(
                    provider = %self.provider.name(),
                    error = %e,
                    "LLM call failed, falling back to knowledge-only answer"
                );
                compose_fallback(&context)
            }
        };

        session.append([
            ConversationTurn::user(message, &classification),
            ConversationTurn::assistant(response.clone(), &classification),
        ]);
        self.sessions.save(&session).await?;

        info!(
            session_id = %session_id,
            turns = session.len(),
            context = context.len(),
            "Processed chat message"
        );

        Ok(ChatReply {
            response,
            session_id,
            suggestions: suggestions(classification.category),
            metadata: classification,
        })
    }
}
