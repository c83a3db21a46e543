//! HTTP route handlers for the chatbot API.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::assistant::core::ids::UserId;
use crate::assistant::core::intent::Intent;
use crate::assistant::core::turn::ConversationTurn;
use crate::assistant::handlers::{APPOINTMENT_INFO_KEY, ChatContext};

use super::state::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/chat", post(chat))
        .route("/api/appointment-query", post(appointment_query))
        .route("/api/summarize-report", post(summarize_report))
        .route("/api/clear", post(clear_conversation))
        .route("/api/history/{user_id}", get(history))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "llmedicare-agent",
        "backend": state.config.llm.backend.as_str(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable reason.
    pub error: String,
}

fn bad_request(message: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

fn present(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|text| !text.is_empty())
}

fn user_id_or_default(raw: Option<&str>) -> Result<String, ApiError> {
    UserId::from_optional(raw)
        .map(String::from)
        .map_err(|err| bad_request(&format!("Invalid user_id: {err}")))
}

/// Chat request.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Conversation owner; `"default"` when omitted.
    pub user_id: Option<String>,
    /// The user's message.
    pub query: Option<String>,
    /// Extra keys folded into the prompt.
    pub context: Option<ChatContext>,
}

/// Chat response.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// Normalized answer.
    pub response: String,
    /// Intent chosen for the query.
    pub intent: Intent,
}

/// Handle chat requests.
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let query = present(request.query.as_deref()).ok_or_else(|| bad_request("Query is required"))?;
    let user_id = user_id_or_default(request.user_id.as_deref())?;

    let reply = state
        .orchestrator
        .process_detailed(&user_id, query, request.context.as_ref())
        .await;

    Ok(Json(ChatResponse {
        response: reply.text,
        intent: reply.intent,
    }))
}

/// Appointment query request.
#[derive(Debug, Deserialize)]
pub struct AppointmentRequest {
    /// Conversation owner.
    pub user_id: Option<String>,
    /// The user's message.
    pub query: Option<String>,
    /// Appointment details (doctor, date, reason, ...).
    pub appointment_info: Option<serde_json::Value>,
}

/// Plain response body.
#[derive(Debug, Serialize)]
pub struct TextResponse {
    /// Normalized answer.
    pub response: String,
}

/// Handle appointment-specific queries.
async fn appointment_query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AppointmentRequest>,
) -> Result<Json<TextResponse>, ApiError> {
    let query = present(request.query.as_deref()).ok_or_else(|| bad_request("Query is required"))?;
    let user_id = user_id_or_default(request.user_id.as_deref())?;

    let mut context = ChatContext::new();
    if let Some(info) = request.appointment_info {
        context.insert(APPOINTMENT_INFO_KEY.to_string(), info);
    }

    let response = state
        .orchestrator
        .process(&user_id, query, Some(&context))
        .await;
    Ok(Json(TextResponse { response }))
}

/// Report summary request.
#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    /// Conversation owner.
    pub user_id: Option<String>,
    /// Report text to summarize.
    pub report_text: Option<String>,
}

/// Report summary response.
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    /// Normalized summary.
    pub summary: String,
}

/// Handle report summarization.
async fn summarize_report(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SummarizeRequest>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let report = present(request.report_text.as_deref())
        .ok_or_else(|| bad_request("Report text is required"))?;
    let user_id = user_id_or_default(request.user_id.as_deref())?;

    let reply = state.orchestrator.summarize_report(&user_id, report).await;
    Ok(Json(SummaryResponse {
        summary: reply.text,
    }))
}

/// Clear request.
#[derive(Debug, Default, Deserialize)]
pub struct ClearRequest {
    /// Conversation owner.
    pub user_id: Option<String>,
}

/// Clear response.
#[derive(Debug, Serialize)]
pub struct ClearResponse {
    /// `success` or `error`.
    pub status: &'static str,
    /// Human-readable outcome.
    pub message: String,
}

impl ClearRequest {
    /// Parse a request body; an empty body means the default user.
    fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|err| bad_request(&format!("Invalid JSON body: {err}")))
    }
}

fn clear_error((status, Json(body)): ApiError) -> (StatusCode, Json<ClearResponse>) {
    (
        status,
        Json(ClearResponse {
            status: "error",
            message: body.error,
        }),
    )
}

/// Clear a user's conversation memory.
///
/// The body is optional: clients may post nothing to clear the default user.
async fn clear_conversation(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> (StatusCode, Json<ClearResponse>) {
    let user_id = match ClearRequest::from_body(&body)
        .and_then(|request| user_id_or_default(request.user_id.as_deref()))
    {
        Ok(user_id) => user_id,
        Err(err) => return clear_error(err),
    };

    match state.orchestrator.clear(&user_id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ClearResponse {
                status: "success",
                message: "Conversation memory cleared successfully".to_string(),
            }),
        ),
        Err(err) => {
            tracing::error!(user_id = %user_id, error = %err, "clear failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ClearResponse {
                    status: "error",
                    message: err.to_string(),
                }),
            )
        }
    }
}

/// History response.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// Conversation owner.
    pub user_id: String,
    /// Turns, oldest first.
    pub turns: Vec<ConversationTurn>,
}

/// Return a user's stored turns.
async fn history(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let history = state
        .orchestrator
        .history(&user_id)
        .await
        .map_err(|err| bad_request(&err.to_string()))?;

    Ok(Json(HistoryResponse {
        user_id,
        turns: history.to_vec(),
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::assistant::core::config::{AssistantConfig, HistoryBackendKind};

    async fn test_router(dir: &tempfile::TempDir) -> Router {
        let mut config = AssistantConfig::default();
        config.session.backend = HistoryBackendKind::JsonDir;
        config.session.path = dir.path().join("history");
        let state = AppState::new(config).await.unwrap();
        create_router(state)
    }

    async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_router(&dir).await;
        let (status, body) = send(&router, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["backend"], "knowledge_base");
    }

    #[tokio::test]
    async fn test_chat_requires_query() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_router(&dir).await;
        let (status, body) = send(&router, "POST", "/api/chat", Some(json!({"query": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Query is required");
    }

    #[tokio::test]
    async fn test_chat_returns_sections_and_history() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_router(&dir).await;

        let (status, body) = send(
            &router,
            "POST",
            "/api/chat",
            Some(json!({"user_id": "u1", "query": "I have a fever and a cough"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["intent"], "general");
        let text = body["response"].as_str().unwrap();
        assert_eq!(text.matches("**Medical Disclaimer**").count(), 1);
        assert!(text.contains("- Fever and chills"));

        let (status, body) = send(&router, "GET", "/api/history/u1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["turns"].as_array().unwrap().len(), 2);
        assert_eq!(body["turns"][0]["role"], "user");
    }

    #[tokio::test]
    async fn test_summarize_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_router(&dir).await;

        let (status, _) = send(&router, "POST", "/api/summarize-report", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &router,
            "POST",
            "/api/summarize-report",
            Some(json!({"report_text": "Cholesterol 240 mg/dL"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["summary"].as_str().unwrap().contains("**Next Steps**"));

        let (status, body) = send(&router, "POST", "/api/clear", Some(json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");

        let (_, body) = send(&router, "GET", "/api/history/default", None).await;
        assert!(body["turns"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_accepts_empty_body() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_router(&dir).await;

        let (status, _) = send(&router, "POST", "/api/chat", Some(json!({"query": "hello"}))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&router, "POST", "/api/clear", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");

        let (_, body) = send(&router, "GET", "/api/history/default", None).await;
        assert!(body["turns"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_rejects_malformed_body() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_router(&dir).await;

        let request = Request::builder()
            .method("POST")
            .uri("/api/clear")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_appointment_query_and_bad_user() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_router(&dir).await;

        let (status, body) = send(
            &router,
            "POST",
            "/api/appointment-query",
            Some(json!({"query": "what should I bring?", "appointment_info": {"doctor": "Dr. Rao"}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["response"].as_str().unwrap().contains("**Recommendations**"));

        let (status, _) = send(
            &router,
            "POST",
            "/api/chat",
            Some(json!({"user_id": "bad id!", "query": "hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
