//! Model backends behind one [`TextGenerator`] capability.
//!
//! - `backend`: the trait, [`Prompt`], and shared HTTP helpers
//! - `knowledge`: static medical knowledge base (also a backend)
//! - `ollama`, `llama_cpp`, `openai`, `huggingface`: remote runtimes
//!
//! The backend is chosen once at configuration time with [`build_generator`].

pub mod backend;
pub mod errors;
pub mod huggingface;
pub mod knowledge;
pub mod llama_cpp;
pub mod ollama;
pub mod openai;

use std::sync::Arc;

use tracing::info;

pub use backend::{GenerateFuture, Prompt, TextGenerator, http_client};
pub use errors::LlmError;
pub use huggingface::HuggingFaceGenerator;
pub use knowledge::{GENERIC_RESPONSE, KnowledgeBase, KnowledgeBaseGenerator, KnowledgeEntry};
pub use llama_cpp::LlamaCppGenerator;
pub use ollama::OllamaGenerator;
pub use openai::OpenAiGenerator;

use crate::assistant::core::config::{BackendKind, LlmConfig};

/// Build the generator selected by `config.backend`.
///
/// # Errors
/// Returns an error if the backend is misconfigured (e.g. a hosted backend without a key).
pub fn build_generator(config: &LlmConfig) -> Result<Arc<dyn TextGenerator>, LlmError> {
    let generator: Arc<dyn TextGenerator> = match config.backend {
        BackendKind::KnowledgeBase => Arc::new(KnowledgeBaseGenerator::default()),
        BackendKind::Ollama => Arc::new(OllamaGenerator::new(config)?),
        BackendKind::LlamaCpp => Arc::new(LlamaCppGenerator::new(config)?),
        BackendKind::OpenAi => Arc::new(OpenAiGenerator::new(config)?),
        BackendKind::HuggingFace => Arc::new(HuggingFaceGenerator::new(config)?),
    };
    info!(
        backend = generator.name(),
        model = %config.model,
        "model backend ready"
    );
    Ok(generator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_generator_per_backend() {
        let mut config = LlmConfig::default();
        assert_eq!(build_generator(&config).unwrap().name(), "knowledge_base");

        config.backend = BackendKind::LlamaCpp;
        assert_eq!(build_generator(&config).unwrap().name(), "llama_cpp");

        config.backend = BackendKind::HuggingFace;
        assert!(build_generator(&config).is_err());
        config.api_key = Some("hf_test".to_string());
        assert_eq!(build_generator(&config).unwrap().name(), "hugging_face");
    }
}
