//! The one capability every model backend provides: turn a prompt into text.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::llm::errors::LlmError;

/// Boxed future type for generation calls.
pub type GenerateFuture<'a> = Pin<Box<dyn Future<Output = Result<String, LlmError>> + Send + 'a>>;

/// HTTP connect timeout shared by remote backends.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A prompt as handed to a backend.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Prompt {
    /// Role and formatting instructions.
    pub system: String,
    /// Body: context, history, and the query.
    pub user: String,
    /// The raw user query, for backends that match on it directly.
    pub query: String,
}

impl Prompt {
    /// Build a prompt from its parts.
    #[must_use]
    pub fn new(system: impl Into<String>, user: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            query: query.into(),
        }
    }

    /// Single-string form for completion-style endpoints.
    #[must_use]
    pub fn render(&self) -> String {
        if self.system.is_empty() {
            self.user.clone()
        } else {
            format!("{}\n\n{}", self.system, self.user)
        }
    }
}

/// Trait abstraction over text generation backends.
pub trait TextGenerator: Send + Sync {
    /// Short backend label for logs.
    fn name(&self) -> &str;

    /// Generate raw text for a prompt.
    ///
    /// # Errors
    /// Returns an error if the backend is unreachable, refuses the call, or answers
    /// with something that is not text.
    fn generate<'a>(&'a self, prompt: &'a Prompt) -> GenerateFuture<'a>;
}

/// Build the async HTTP client used by remote backends.
///
/// # Errors
/// Returns an error if the client cannot be built.
pub fn http_client(timeout: Duration) -> Result<Client, LlmError> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(timeout)
        .build()
        .map_err(LlmError::from)
}

/// POST a JSON body and decode a JSON reply.
pub(crate) async fn post_json<B, R>(
    client: &Client,
    url: &str,
    bearer: Option<&str>,
    body: &B,
) -> Result<R, LlmError>
where
    B: Serialize + Sync,
    R: DeserializeOwned,
{
    let mut request = client.post(url).json(body);
    if let Some(token) = bearer {
        request = request.bearer_auth(token);
    }

    let response = request.send().await.map_err(map_transport)?;
    let status = response.status();
    let text = response.text().await.map_err(map_transport)?;

    if !status.is_success() {
        return Err(LlmError::status(status.as_u16(), &text));
    }

    serde_json::from_str(&text).map_err(|err| LlmError::MalformedResponse(err.to_string()))
}

fn map_transport(err: reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::HttpRequest(err)
    }
}

/// Reject empty generations; a blank answer is as useless as none.
pub(crate) fn non_empty(text: Option<String>, backend: &str) -> Result<String, LlmError> {
    match text {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(LlmError::MalformedResponse(format!(
            "{backend} returned no text"
        ))),
    }
}

/// Serve `app` on an ephemeral local port and return its base URL.
#[cfg(test)]
pub(crate) async fn serve_stub(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}
