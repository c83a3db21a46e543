//! llama.cpp server backend (`POST /completion`).

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::assistant::core::config::LlmConfig;
use crate::llm::backend::{GenerateFuture, Prompt, TextGenerator, http_client, non_empty, post_json};
use crate::llm::errors::LlmError;

#[derive(Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    n_predict: u32,
    temperature: f64,
    top_p: f64,
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionResponse {
    content: Option<String>,
}

/// Generator backed by a local llama.cpp HTTP server.
pub struct LlamaCppGenerator {
    client: Client,
    base_url: String,
    temperature: f64,
    n_predict: u32,
}

impl LlamaCppGenerator {
    /// Create a generator from the model settings.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(config.timeout())?,
            base_url: config.resolved_base_url(),
            temperature: config.temperature,
            n_predict: config.max_tokens,
        })
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, LlmError> {
        let rendered = prompt.render();
        let request = CompletionRequest {
            prompt: &rendered,
            n_predict: self.n_predict,
            temperature: self.temperature,
            top_p: 1.0,
            stream: false,
        };
        let url = format!("{}/completion", self.base_url);
        let response: CompletionResponse = post_json(&self.client, &url, None, &request).await?;
        non_empty(response.content, "llama.cpp")
    }
}

impl TextGenerator for LlamaCppGenerator {
    fn name(&self) -> &str {
        "llama_cpp"
    }

    fn generate<'a>(&'a self, prompt: &'a Prompt) -> GenerateFuture<'a> {
        Box::pin(self.complete(prompt))
    }
}
