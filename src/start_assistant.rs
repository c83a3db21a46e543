//! Startup helpers for the chatbot server.

use std::future::Future;
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::assistant::core::config::{AssistantConfig, BackendKind};
use crate::assistant::core::errors::AssistantResult;
use crate::llm::OllamaGenerator;
use crate::server::{self, AppState, ServerError};

/// Run the server (used by the `llmedicare-server` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    init_tracing();

    info!(version = env!("CARGO_PKG_VERSION"), "starting llmedicare agent");

    let config = match load_config() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "invalid configuration");
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            error!(error = %err, "failed to create runtime");
            return ExitCode::from(1);
        }
    };

    let result = rt.block_on(async {
        let state = initialize(config).await?;
        let port = get_port(&state.config);
        server::run_server(state, port).await
    });

    if let Err(err) = result {
        error!(error = %err, "server error");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

/// Install the global `tracing` subscriber (`RUST_LOG` overrides, INFO by default).
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());
    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
        warn!("tracing subscriber already installed");
    }
}

/// Read `LLMEDICARE_*` variables and validate the result.
///
/// # Errors
/// Returns an error if a variable is malformed or the combination is invalid.
pub fn load_config() -> AssistantResult<AssistantConfig> {
    let config = AssistantConfig::from_env()?;
    config.validate()?;
    info!(
        backend = %config.llm.backend,
        model = %config.llm.model,
        history = ?config.session.backend,
        port = config.server.port,
        "configuration loaded"
    );
    Ok(config)
}

/// Build application state without starting the server.
///
/// With the Ollama backend the model is pulled if the server lacks it; an
/// unreachable Ollama is logged and requests fall back to templated replies.
///
/// # Errors
/// Returns an error if state creation fails.
pub async fn initialize(config: AssistantConfig) -> Result<Arc<AppState>, ServerError> {
    if config.llm.backend == BackendKind::Ollama {
        prepare_ollama(&config).await;
    }
    Ok(AppState::new(config).await?)
}

async fn prepare_ollama(config: &AssistantConfig) {
    let ollama = match OllamaGenerator::new(&config.llm) {
        Ok(ollama) => ollama,
        Err(err) => {
            warn!(error = %err, "cannot build ollama client");
            return;
        }
    };
    match ollama.is_ready().await {
        Ok(true) => {
            if let Err(err) = ollama.ensure_model().await {
                warn!(model = ollama.model(), error = %err, "model pull failed");
            }
        }
        Ok(false) => warn!("ollama answered but is not ready"),
        Err(err) => warn!(error = %err, "ollama unreachable"),
    }
}

/// Run server with graceful shutdown.
///
/// # Errors
/// Returns an error if the server fails.
pub async fn run_server_with_shutdown<F>(
    state: Arc<AppState>,
    shutdown_signal: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let port = get_port(&state.config);
    server::run_server_with_shutdown(state, port, shutdown_signal).await
}

/// Configured server port, or [`server::DEFAULT_PORT`] when unset.
#[must_use]
pub const fn get_port(config: &AssistantConfig) -> u16 {
    if config.server.port == 0 {
        server::DEFAULT_PORT
    } else {
        config.server.port
    }
}
