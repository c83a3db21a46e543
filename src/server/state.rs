//! Application state shared across all request handlers.

use std::sync::Arc;

use crate::assistant::core::config::AssistantConfig;
use crate::assistant::core::errors::AssistantResult;
use crate::assistant::orchestrator::ChatbotOrchestrator;

/// Shared application state.
pub struct AppState {
    /// Request pipeline.
    pub orchestrator: ChatbotOrchestrator,
    /// Configuration the pipeline was built from.
    pub config: AssistantConfig,
}

impl AppState {
    /// Build the orchestrator described by `config`.
    ///
    /// # Errors
    /// Returns an error if the session store or model backend cannot be created.
    pub async fn new(config: AssistantConfig) -> AssistantResult<Arc<Self>> {
        let orchestrator = ChatbotOrchestrator::from_config(&config).await?;
        Ok(Self::with_orchestrator(orchestrator, config))
    }

    /// Wrap an already-built orchestrator.
    #[must_use]
    pub fn with_orchestrator(orchestrator: ChatbotOrchestrator, config: AssistantConfig) -> Arc<Self> {
        Arc::new(Self {
            orchestrator,
            config,
        })
    }
}
