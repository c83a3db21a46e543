//! Configuration for the assistant.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::assistant::core::errors::{AssistantError, AssistantResult};

/// Prefix shared by every environment variable read by [`AssistantConfig::from_env`].
pub const ENV_PREFIX: &str = "LLMEDICARE_";

/// Top-level configuration for the assistant.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Session history settings.
    pub session: SessionConfig,
    /// Model backend settings.
    pub llm: LlmConfig,
    /// Intent classification settings.
    pub classifier: ClassifierConfig,
    /// Prompt construction settings.
    pub prompt: PromptConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
}

impl AssistantConfig {
    /// Build a configuration from defaults overlaid with `LLMEDICARE_*` variables.
    ///
    /// # Errors
    /// Returns an error if a variable holds an unparsable value.
    pub fn from_env() -> AssistantResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AssistantConfig::from_env`] with an injectable variable source.
    ///
    /// # Errors
    /// Returns an error if a variable holds an unparsable value.
    pub fn from_lookup<F>(lookup: F) -> AssistantResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        config.session.apply_env(&var)?;
        config.llm.apply_env(&var)?;
        config.classifier.apply_env(&var)?;

        if let Some(turns) = var("PROMPT_HISTORY_TURNS") {
            config.prompt.history_turns = parse_number("PROMPT_HISTORY_TURNS", &turns)?;
        }
        if let Some(port) = var("PORT") {
            config.server.port = parse_number("PORT", &port)?;
        }

        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> AssistantResult<()> {
        if self.session.max_turns == 0 {
            return Err(AssistantError::InvalidConfig(
                "session.max_turns must be > 0".to_string(),
            ));
        }

        if self.llm.model.trim().is_empty() && self.llm.backend != BackendKind::KnowledgeBase {
            return Err(AssistantError::InvalidConfig(
                "llm.model must not be empty".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(AssistantError::InvalidConfig(
                "llm.temperature must be within 0.0..=2.0".to_string(),
            ));
        }

        if self.llm.timeout_secs == 0 {
            return Err(AssistantError::InvalidConfig(
                "llm.timeout_secs must be > 0".to_string(),
            ));
        }

        if self.classifier.timeout_ms == 0 {
            return Err(AssistantError::InvalidConfig(
                "classifier.timeout_ms must be > 0".to_string(),
            ));
        }

        if let Some(base_url) = &self.llm.base_url {
            Url::parse(base_url)?;
        }

        if self.llm.backend.requires_api_key() && self.llm.api_key.is_none() {
            return Err(AssistantError::InvalidConfig(format!(
                "{} backend requires {ENV_PREFIX}API_KEY",
                self.llm.backend
            )));
        }

        Ok(())
    }
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> AssistantResult<T> {
    value.parse().map_err(|_| {
        AssistantError::InvalidConfig(format!("{ENV_PREFIX}{name} is not a valid number: {value}"))
    })
}

/// Where session histories are persisted.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryBackendKind {
    /// One JSON file per user inside a directory.
    JsonDir,
    /// One row per user in a `SQLite` database file.
    Sqlite,
}

impl FromStr for HistoryBackendKind {
    type Err = AssistantError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "json" | "json_dir" | "file" => Ok(Self::JsonDir),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(AssistantError::InvalidConfig(format!(
                "unknown history backend: {other}"
            ))),
        }
    }
}

/// Session history settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Persistence backend.
    pub backend: HistoryBackendKind,
    /// Directory (JSON) or database file (`SQLite`).
    pub path: PathBuf,
    /// Turns kept per user; older turns are evicted first.
    pub max_turns: usize,
}

impl SessionConfig {
    fn apply_env(&mut self, var: &impl Fn(&str) -> Option<String>) -> AssistantResult<()> {
        if let Some(kind) = var("HISTORY_BACKEND") {
            self.backend = kind.parse()?;
        }
        if let Some(path) = var("HISTORY_PATH") {
            self.path = PathBuf::from(path);
        }
        if let Some(max) = var("MAX_TURNS") {
            self.max_turns = parse_number("MAX_TURNS", &max)?;
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: HistoryBackendKind::JsonDir,
            path: PathBuf::from("chat_history"),
            max_turns: 10,
        }
    }
}

/// Model backend selector.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Static knowledge base, no network.
    KnowledgeBase,
    /// Ollama `/api/generate`.
    Ollama,
    /// llama.cpp server `/completion`.
    LlamaCpp,
    /// OpenAI-compatible chat completions.
    OpenAi,
    /// `HuggingFace` inference API.
    HuggingFace,
}

impl BackendKind {
    /// Stable string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KnowledgeBase => "knowledge_base",
            Self::Ollama => "ollama",
            Self::LlamaCpp => "llama_cpp",
            Self::OpenAi => "openai",
            Self::HuggingFace => "hugging_face",
        }
    }

    /// Model used when none is configured.
    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::KnowledgeBase => "knowledge-base",
            Self::Ollama => "gemma:2b",
            Self::LlamaCpp => "llama-2-7b-chat",
            Self::OpenAi => "gpt-3.5-turbo",
            Self::HuggingFace => "mistralai/Mistral-7B-Instruct-v0.2",
        }
    }

    /// Base URL used when none is configured.
    #[must_use]
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::KnowledgeBase => "",
            Self::Ollama => "http://127.0.0.1:11434",
            Self::LlamaCpp => "http://127.0.0.1:8080",
            Self::OpenAi => "https://api.openai.com",
            Self::HuggingFace => "https://api-inference.huggingface.co",
        }
    }

    /// Whether the backend refuses anonymous calls.
    #[must_use]
    pub const fn requires_api_key(self) -> bool {
        matches!(self, Self::OpenAi | Self::HuggingFace)
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = AssistantError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().replace('-', "_").as_str() {
            "knowledge_base" | "knowledge" | "rules" => Ok(Self::KnowledgeBase),
            "ollama" | "gemma" => Ok(Self::Ollama),
            "llama_cpp" | "llamacpp" | "llama" => Ok(Self::LlamaCpp),
            "openai" | "open_ai" => Ok(Self::OpenAi),
            "hugging_face" | "huggingface" | "hf" => Ok(Self::HuggingFace),
            other => Err(AssistantError::InvalidConfig(format!(
                "unknown model backend: {other}"
            ))),
        }
    }
}

/// Model backend settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Which backend answers queries.
    pub backend: BackendKind,
    /// Model name understood by the backend.
    pub model: String,
    /// Optional custom base URL.
    pub base_url: Option<String>,
    /// Bearer token for hosted backends.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Temperature for generation.
    pub temperature: f64,
    /// Token budget per generation.
    pub max_tokens: u32,
    /// Context window requested from local runtimes.
    pub context_length: u32,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
}

impl LlmConfig {
    /// Configured base URL or the backend default, without a trailing slash.
    #[must_use]
    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.backend.default_base_url())
            .trim_end_matches('/')
            .to_string()
    }

    /// Request timeout as a `Duration`.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn apply_env(&mut self, var: &impl Fn(&str) -> Option<String>) -> AssistantResult<()> {
        if let Some(kind) = var("BACKEND") {
            self.backend = kind.parse()?;
            self.model = self.backend.default_model().to_string();
        }
        if let Some(model) = var("MODEL") {
            self.model = model;
        }
        self.base_url = var("LLM_URL");
        self.api_key = var("API_KEY");
        if let Some(temperature) = var("TEMPERATURE") {
            self.temperature = parse_number("TEMPERATURE", &temperature)?;
        }
        if let Some(max_tokens) = var("MAX_TOKENS") {
            self.max_tokens = parse_number("MAX_TOKENS", &max_tokens)?;
        }
        if let Some(timeout) = var("LLM_TIMEOUT_SECS") {
            self.timeout_secs = parse_number("LLM_TIMEOUT_SECS", &timeout)?;
        }
        Ok(())
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::KnowledgeBase,
            model: BackendKind::KnowledgeBase.default_model().to_string(),
            base_url: None,
            api_key: None,
            temperature: 0.7,
            max_tokens: 512,
            context_length: 4096,
            timeout_secs: 120,
        }
    }
}

/// Intent classification settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Ask the model backend before falling back to keyword rules.
    pub remote: bool,
    /// Upper bound for the remote classification call.
    pub timeout_ms: u64,
}

impl ClassifierConfig {
    /// Remote classification timeout as a `Duration`.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn apply_env(&mut self, var: &impl Fn(&str) -> Option<String>) -> AssistantResult<()> {
        if let Some(remote) = var("REMOTE_CLASSIFIER") {
            self.remote = matches!(remote.as_str(), "1" | "true" | "yes" | "on");
        }
        if let Some(timeout) = var("CLASSIFIER_TIMEOUT_MS") {
            self.timeout_ms = parse_number("CLASSIFIER_TIMEOUT_MS", &timeout)?;
        }
        Ok(())
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            remote: false,
            timeout_ms: 5_000,
        }
    }
}

/// Prompt construction settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Recent turns rendered into the prompt.
    pub history_turns: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self { history_turns: 5 }
    }
}

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listening port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8000 }
    }
}
