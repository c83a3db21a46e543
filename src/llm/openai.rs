//! OpenAI-compatible chat completions backend.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::assistant::core::config::LlmConfig;
use crate::llm::backend::{GenerateFuture, Prompt, TextGenerator, http_client, non_empty, post_json};
use crate::llm::errors::LlmError;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Generator calling `/v1/chat/completions`.
pub struct OpenAiGenerator {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl OpenAiGenerator {
    /// Create a generator from the model settings.
    ///
    /// # Errors
    /// Returns an error if no API key is configured or the client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| LlmError::Config("openai backend requires an api key".to_string()))?;
        Ok(Self {
            client: http_client(config.timeout())?,
            base_url: config.resolved_base_url(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    async fn chat(&self, prompt: &Prompt) -> Result<String, LlmError> {
        let mut messages = Vec::with_capacity(2);
        if !prompt.system.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: &prompt.system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &prompt.user,
        });

        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let url = format!("{}/v1/chat/completions", self.base_url);
        let response: ChatResponse =
            post_json(&self.client, &url, Some(&self.api_key), &request).await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content);
        non_empty(text, "openai")
    }
}

impl TextGenerator for OpenAiGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    fn generate<'a>(&'a self, prompt: &'a Prompt) -> GenerateFuture<'a> {
        Box::pin(self.chat(prompt))
    }
}
