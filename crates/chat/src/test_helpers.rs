//! Shared test doubles for the chat crate.

use async_trait::async_trait;
use medtutor_core::error::{KnowledgeError, ProviderError, SessionError};
use medtutor_core::knowledge::{
    Category, KnowledgeEntry, KnowledgeQuery, KnowledgeStore, UpsertOutcome,
};
use medtutor_core::message::{ConversationTurn, Message};
use medtutor_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use medtutor_core::session::{Session, SessionStore};
use medtutor_store::InMemoryKnowledgeStore;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A provider that returns scripted results in order and records every request.
///
/// Once the script runs out the last result repeats.
pub struct ScriptedProvider {
    script: Mutex<Vec<Result<String, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn answering(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    pub fn failing() -> Self {
        Self::new(vec![Err(ProviderError::Network("connection refused".into()))])
    }

    /// Sleep before answering, to hold a session lock open in concurrency tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = {
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.remove(0)
            } else {
                script
                    .first()
                    .cloned()
                    .unwrap_or_else(|| Ok(String::new()))
            }
        };

        next.map(|text| ProviderResponse {
            message: Message::assistant(text),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model,
        })
    }
}

/// A knowledge store whose every call fails, like an unreachable database.
pub struct FailingKnowledgeStore;

#[async_trait]
impl KnowledgeStore for FailingKnowledgeStore {
    fn name(&self) -> &str {
        "failing"
    }

    async fn search(&self, _query: KnowledgeQuery) -> Result<Vec<KnowledgeEntry>, KnowledgeError> {
        Err(KnowledgeError::QueryFailed("database unreachable".into()))
    }

    async fn find_by_term(
        &self,
        _term: &str,
        _category: Option<Category>,
    ) -> Result<Option<KnowledgeEntry>, KnowledgeError> {
        Err(KnowledgeError::QueryFailed("database unreachable".into()))
    }

    async fn upsert(&self, _entry: KnowledgeEntry) -> Result<UpsertOutcome, KnowledgeError> {
        Err(KnowledgeError::Storage("database unreachable".into()))
    }

    async fn count(&self) -> Result<usize, KnowledgeError> {
        Err(KnowledgeError::QueryFailed("database unreachable".into()))
    }
}

/// A session store whose writes fail; reads see no sessions.
pub struct FailingSessionStore;

#[async_trait]
impl SessionStore for FailingSessionStore {
    fn name(&self) -> &str {
        "failing"
    }

    async fn load_or_create(&self, session_id: &str, user_id: &str) -> Result<Session, SessionError> {
        Ok(Session::new(session_id, user_id))
    }

    async fn get(&self, _session_id: &str) -> Result<Option<Session>, SessionError> {
        Err(SessionError::QueryFailed("database unreachable".into()))
    }

    async fn save(&self, _session: &Session) -> Result<(), SessionError> {
        Err(SessionError::Storage("database unreachable".into()))
    }

    async fn read(&self, _session_id: &str) -> Result<Vec<ConversationTurn>, SessionError> {
        Err(SessionError::QueryFailed("database unreachable".into()))
    }

    async fn clear(&self, _session_id: &str) -> Result<(), SessionError> {
        Err(SessionError::Storage("database unreachable".into()))
    }
}

/// A small knowledge base covering each chat category.
pub fn sample_entries() -> Vec<KnowledgeEntry> {
    vec![
        KnowledgeEntry::new(
            "fever",
            Category::Symptom,
            "An elevated body temperature above the normal range.",
        )
        .with_description("Fever is the body's immune response to infection or inflammation."),
        KnowledgeEntry::new("headache", Category::Symptom, "Pain in the head, scalp, or neck.")
            .with_description("Headaches range from mild tension to migraine."),
        KnowledgeEntry::new(
            "hypertension",
            Category::Disease,
            "Persistently elevated blood pressure in the arteries.",
        )
        .with_description("Hypertension is often asymptomatic but damages the heart and kidneys."),
        KnowledgeEntry::new("heart", Category::Anatomy, "A muscular organ that pumps blood.")
            .with_description("The heart has four chambers: two atria and two ventricles."),
        KnowledgeEntry::new(
            "acetaminophen",
            Category::Medication,
            "An analgesic and antipyretic medication.",
        )
        .with_description("Acetaminophen relieves pain and reduces fever."),
    ]
}

pub async fn seeded_store() -> Arc<dyn KnowledgeStore> {
    Arc::new(InMemoryKnowledgeStore::with_entries(sample_entries()).await)
}
