//! `HuggingFace` inference API backend (`POST /models/{model}`).

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::assistant::core::config::LlmConfig;
use crate::llm::backend::{GenerateFuture, Prompt, TextGenerator, http_client, non_empty, post_json};
use crate::llm::errors::LlmError;

#[derive(Serialize)]
struct InferenceParameters {
    max_new_tokens: u32,
    temperature: f64,
    return_full_text: bool,
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

/// Text-generation pipelines answer with a list; some deployments with one object.
#[derive(Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Many(Vec<GeneratedText>),
    One(GeneratedText),
}

#[derive(Deserialize)]
struct GeneratedText {
    generated_text: Option<String>,
}

impl InferenceResponse {
    fn into_text(self) -> Option<String> {
        match self {
            Self::Many(items) => items.into_iter().next().and_then(|item| item.generated_text),
            Self::One(item) => item.generated_text,
        }
    }
}

/// Generator calling the hosted inference API.
pub struct HuggingFaceGenerator {
    client: Client,
    url: String,
    api_key: String,
    temperature: f64,
    max_new_tokens: u32,
}

impl HuggingFaceGenerator {
    /// Create a generator from the model settings.
    ///
    /// # Errors
    /// Returns an error if no API key is configured or the client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            LlmError::Config("hugging_face backend requires an api key".to_string())
        })?;
        Ok(Self {
            client: http_client(config.timeout())?,
            url: format!("{}/models/{}", config.resolved_base_url(), config.model),
            api_key,
            temperature: config.temperature,
            max_new_tokens: config.max_tokens,
        })
    }

    async fn infer(&self, prompt: &Prompt) -> Result<String, LlmError> {
        let rendered = prompt.render();
        let request = InferenceRequest {
            inputs: &rendered,
            parameters: InferenceParameters {
                max_new_tokens: self.max_new_tokens,
                temperature: self.temperature,
                return_full_text: false,
            },
        };
        let response: InferenceResponse =
            post_json(&self.client, &self.url, Some(&self.api_key), &request).await?;
        non_empty(response.into_text(), "hugging_face")
    }
}

impl TextGenerator for HuggingFaceGenerator {
    fn name(&self) -> &str {
        "hugging_face"
    }

    fn generate<'a>(&'a self, prompt: &'a Prompt) -> GenerateFuture<'a> {
        Box::pin(self.infer(prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_response_shapes_decode() {
        let many: InferenceResponse =
            serde_json::from_str(r#"[{"generated_text":"first"},{"generated_text":"second"}]"#)
                .unwrap();
        assert_eq!(many.into_text().as_deref(), Some("first"));

        let one: InferenceResponse = serde_json::from_str(r#"{"generated_text":"only"}"#).unwrap();
        assert_eq!(one.into_text().as_deref(), Some("only"));
    }
}
