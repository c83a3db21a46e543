//! Ollama backend (`/api/generate`), used for Gemma and other local models.
//!
//! Behaviour:
//! - Non-streaming generation with runtime options on every request.
//! - `GET /api/version` readiness probe.
//! - `GET /api/tags` / `POST /api/pull` so startup can fetch a missing model.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::assistant::core::config::LlmConfig;
use crate::llm::backend::{GenerateFuture, Prompt, TextGenerator, http_client, non_empty, post_json};
use crate::llm::errors::LlmError;

/// Keep the model loaded between requests.
const KEEP_ALIVE: &str = "30m";
/// Nucleus sampling cut-off.
const TOP_P: f64 = 0.9;
/// Top-k sampling cut-off.
const TOP_K: u32 = 40;
/// Default thread count if `available_parallelism()` is unavailable.
const DEFAULT_NUM_THREAD: u32 = 8;

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f64,
    top_p: f64,
    top_k: u32,
    num_ctx: u32,
    num_predict: u32,
    num_thread: u32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    keep_alive: &'a str,
    options: GenerateOptions,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}

#[derive(Serialize)]
struct PullRequest<'a> {
    name: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct PullResponse {
    #[serde(default)]
    status: String,
}

/// Ollama text generator.
pub struct OllamaGenerator {
    client: Client,
    base_url: String,
    model: String,
    temperature: f64,
    num_ctx: u32,
    num_predict: u32,
}

impl OllamaGenerator {
    /// Create a generator from the model settings.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(config.timeout())?,
            base_url: config.resolved_base_url(),
            model: config.model.clone(),
            temperature: config.temperature,
            num_ctx: config.context_length,
            num_predict: config.max_tokens,
        })
    }

    /// Model this generator asks for.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether the Ollama server answers `GET /api/version`.
    ///
    /// # Errors
    /// Returns an error if the server cannot be reached.
    pub async fn is_ready(&self) -> Result<bool, LlmError> {
        let url = format!("{}/api/version", self.base_url);
        let response = self.client.get(&url).send().await?;
        Ok(response.status().is_success())
    }

    /// Whether the configured model is already pulled.
    ///
    /// # Errors
    /// Returns an error if the tag listing fails.
    pub async fn has_model(&self) -> Result<bool, LlmError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::status(status.as_u16(), ""));
        }
        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|err| LlmError::MalformedResponse(err.to_string()))?;

        let family = self.model.split(':').next().unwrap_or(&self.model);
        Ok(tags
            .models
            .iter()
            .any(|tag| tag.name == self.model || tag.name.starts_with(family)))
    }

    /// Pull the configured model if the server does not have it yet.
    ///
    /// # Errors
    /// Returns an error if listing or pulling fails.
    pub async fn ensure_model(&self) -> Result<(), LlmError> {
        if self.has_model().await? {
            debug!(model = %self.model, "ollama model already present");
            return Ok(());
        }

        info!(model = %self.model, "pulling ollama model");
        let url = format!("{}/api/pull", self.base_url);
        let reply: PullResponse = post_json(
            &self.client,
            &url,
            None,
            &PullRequest {
                name: &self.model,
                stream: false,
            },
        )
        .await?;
        info!(model = %self.model, status = %reply.status, "ollama pull finished");
        Ok(())
    }

    async fn post_generate(&self, prompt: &Prompt) -> Result<String, LlmError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: &prompt.user,
            system: &prompt.system,
            stream: false,
            keep_alive: KEEP_ALIVE,
            options: GenerateOptions {
                temperature: self.temperature,
                top_p: TOP_P,
                top_k: TOP_K,
                num_ctx: self.num_ctx,
                num_predict: self.num_predict,
                num_thread: detect_num_thread(),
            },
        };

        let url = format!("{}/api/generate", self.base_url);
        let response: GenerateResponse = post_json(&self.client, &url, None, &request).await?;
        non_empty(response.response, "ollama")
    }
}

impl TextGenerator for OllamaGenerator {
    fn name(&self) -> &str {
        "ollama"
    }

    fn generate<'a>(&'a self, prompt: &'a Prompt) -> GenerateFuture<'a> {
        Box::pin(self.post_generate(prompt))
    }
}

fn detect_num_thread() -> u32 {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .map_or(DEFAULT_NUM_THREAD, |v| u32::try_from(v).unwrap_or(u32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::core::config::BackendKind;

    #[test]
    fn test_generate_request_shape() {
        let request = GenerateRequest {
            model: "gemma:2b",
            prompt: "User Query: hi",
            system: "sys",
            stream: false,
            keep_alive: KEEP_ALIVE,
            options: GenerateOptions {
                temperature: 0.7,
                top_p: TOP_P,
                top_k: TOP_K,
                num_ctx: 4096,
                num_predict: 512,
                num_thread: 4,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gemma:2b");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_ctx"], 4096);
        assert_eq!(json["options"]["top_k"], 40);
    }

    #[test]
    fn test_generator_uses_backend_default_url() {
        let config = LlmConfig {
            backend: BackendKind::Ollama,
            model: "gemma:2b".to_string(),
            ..LlmConfig::default()
        };
        let generator = OllamaGenerator::new(&config).unwrap();
        assert_eq!(generator.base_url, "http://127.0.0.1:11434");
        assert_eq!(generator.model(), "gemma:2b");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error() {
        let config = LlmConfig {
            backend: BackendKind::Ollama,
            model: "gemma:2b".to_string(),
            base_url: Some("http://127.0.0.1:9".to_string()),
            timeout_secs: 2,
            ..LlmConfig::default()
        };
        let generator = OllamaGenerator::new(&config).unwrap();
        let result = generator.generate(&Prompt::new("", "hello", "hello")).await;
        assert!(result.is_err());
    }
}
