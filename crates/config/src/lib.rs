//! Configuration loading, validation, and management for MedTutor.
//!
//! Loads configuration from `~/.medtutor/config.toml` (or an explicit path)
//! with environment variable overrides. Validates all settings at startup.
//! The resulting [`AppConfig`] is built once and passed by reference into
//! every component that needs it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default tutor instructions sent as the first system message.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a medical education assistant designed to help medical students learn about basic health issues.

Key guidelines:
- Provide educational information for learning purposes only
- Always emphasize that this is for educational purposes, not medical diagnosis
- Encourage students to consult qualified healthcare professionals for real medical advice
- Focus on common conditions, symptoms, and basic medical knowledge
- Use clear, educational language appropriate for medical students
- Include relevant medical terminology with explanations
- Suggest related topics for further study

Remember: You are an educational tool, not a replacement for professional medical consultation.";

/// The root configuration structure.
///
/// Maps directly to `~/.medtutor/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Language-model backend settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Database settings (knowledge base + sessions)
    #[serde(default)]
    pub database: DatabaseConfig,

    /// HTTP gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Knowledge retrieval caps
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Chat pipeline settings
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Which kind of OpenAI-compatible endpoint to call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmMode {
    /// Hosted API (OpenAI or another cloud endpoint)
    #[default]
    Hosted,
    /// Local OpenAI-compatible server (Ollama, llama.cpp, vLLM)
    Local,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub mode: LlmMode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_hosted_base_url")]
    pub hosted_base_url: String,

    #[serde(default = "default_hosted_model")]
    pub hosted_model: String,

    #[serde(default = "default_local_base_url")]
    pub local_base_url: String,

    #[serde(default = "default_local_model")]
    pub local_model: String,

    /// Completion token ceiling per response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on a single completion call; expiry triggers the fallback.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_hosted_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_hosted_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_local_base_url() -> String {
    "http://localhost:11434/v1".into()
}
fn default_local_model() -> String {
    "llama3.1:8b".into()
}
fn default_max_tokens() -> u32 {
    500
}
fn default_temperature() -> f32 {
    0.7
}
fn default_timeout_secs() -> u64 {
    30
}

impl LlmConfig {
    pub fn base_url(&self) -> &str {
        match self.mode {
            LlmMode::Hosted => &self.hosted_base_url,
            LlmMode::Local => &self.local_base_url,
        }
    }

    pub fn model(&self) -> &str {
        match self.mode {
            LlmMode::Hosted => &self.hosted_model,
            LlmMode::Local => &self.local_model,
        }
    }

    /// Local servers accept any bearer token, so a placeholder is used when none is set.
    pub fn effective_api_key(&self) -> String {
        match (&self.api_key, self.mode) {
            (Some(key), _) => key.clone(),
            (None, LlmMode::Local) => "local-llm".into(),
            (None, LlmMode::Hosted) => String::new(),
        }
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            mode: LlmMode::default(),
            api_key: None,
            hosted_base_url: default_hosted_base_url(),
            hosted_model: default_hosted_model(),
            local_base_url: default_local_base_url(),
            local_model: default_local_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("mode", &self.mode)
            .field("api_key", &redact(&self.api_key))
            .field("hosted_base_url", &self.hosted_base_url)
            .field("hosted_model", &self.hosted_model)
            .field("local_base_url", &self.local_base_url)
            .field("local_model", &self.local_model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection string, e.g. `sqlite:///var/lib/medtutor/medtutor.db`
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String {
    format!(
        "sqlite://{}",
        AppConfig::config_dir().join("medtutor.db").display()
    )
}
fn default_max_connections() -> u32 {
    4
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Browser origin allowed by CORS
    #[serde(default = "default_frontend_origin")]
    pub frontend_origin: String,

    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_port() -> u16 {
    5000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_frontend_origin() -> String {
    "http://localhost:3000".into()
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            frontend_origin: default_frontend_origin(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Context entries injected per chat turn
    #[serde(default = "default_chat_limit")]
    pub chat_limit: usize,

    /// Results returned by the search endpoint
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    /// Entries sampled when generating a quiz
    #[serde(default = "default_quiz_pool_limit")]
    pub quiz_pool_limit: usize,
}

fn default_chat_limit() -> usize {
    5
}
fn default_search_limit() -> usize {
    20
}
fn default_quiz_pool_limit() -> usize {
    200
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chat_limit: default_chat_limit(),
            search_limit: default_search_limit(),
            quiz_pool_limit: default_quiz_pool_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Most recent turns forwarded to the model; stored history is never trimmed.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.into()
}
fn default_history_window() -> usize {
    20
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            history_window: default_history_window(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`, or the default path (~/.medtutor/config.toml),
    /// then apply environment overrides:
    ///
    /// - `LOCAL_MODE=true` selects the local backend
    /// - `LOCAL_LLM_BASE_URL`, `LOCAL_LLM_MODEL`
    /// - `OPENAI_API_KEY`, `OPENAI_MODEL`, `OPENAI_BASE_URL`
    /// - `MEDTUTOR_DATABASE_URL`
    /// - `PORT`, `FRONTEND_URL`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| Self::config_dir().join("config.toml"));
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(flag) = lookup("LOCAL_MODE") {
            self.llm.mode = if flag.trim().eq_ignore_ascii_case("true") {
                LlmMode::Local
            } else {
                LlmMode::Hosted
            };
        }
        if let Some(url) = lookup("LOCAL_LLM_BASE_URL") {
            self.llm.local_base_url = url;
        }
        if let Some(model) = lookup("LOCAL_LLM_MODEL") {
            self.llm.local_model = model;
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.llm.hosted_base_url = url;
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            self.llm.hosted_model = model;
        }
        if self.llm.api_key.is_none() {
            self.llm.api_key = lookup("OPENAI_API_KEY").filter(|k| !k.is_empty());
        }
        if let Some(url) = lookup("MEDTUTOR_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(port) = lookup("PORT") {
            self.gateway.port = port.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("PORT must be a port number, got '{port}'"))
            })?;
        }
        if let Some(origin) = lookup("FRONTEND_URL") {
            self.gateway.frontend_origin = origin;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".medtutor")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.temperature < 0.0 || self.llm.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "llm.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "llm.timeout_secs must be > 0".into(),
            ));
        }

        if self.retrieval.chat_limit == 0 || self.retrieval.search_limit == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval limits must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if a usable credential is available for the selected backend.
    pub fn has_api_key(&self) -> bool {
        self.llm.mode == LlmMode::Local || self.llm.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
