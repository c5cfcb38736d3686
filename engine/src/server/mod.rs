//! HTTP surface
//!
//! Serves the chat widget and a small JSON API over the agent.
//!
//! # Endpoints
//!
//! - GET / - Chat widget
//! - POST /api/chat - Run one turn
//! - GET /api/sessions/:id/transcript - Full transcript of a session
//! - DELETE /api/sessions/:id - Reset a session
//! - GET /api/tools - Tool descriptors bound to the model
//! - GET /api/status - Server status

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use sdk::errors::{AlfredErrorExt, EngineError, ErrorKind};
use sdk::types::ToolSpec;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::agent::{exchanges, AgentCore};
use crate::llm::Message;

const WIDGET_HTML: &str = include_str!("widget.html");

/// Server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    agent: Arc<AgentCore>,
}

impl AppState {
    pub fn new(agent: Arc<AgentCore>) -> Self {
        Self { agent }
    }
}

/// Chat request body
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
}

/// Chat response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub response: String,
    pub history: Vec<(String, String)>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptResponse {
    pub session_id: String,
    pub messages: Vec<Message>,
}

/// JSON error body `{error, hint}` with a status code
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    hint: String,
}

impl ApiError {
    pub fn bad_request(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: error.into(),
            hint: "Check the request body".to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let status = match err.kind() {
            ErrorKind::ModelService => StatusCode::BAD_GATEWAY,
            ErrorKind::ToolInvocation
            | ErrorKind::Configuration
            | ErrorKind::Turn
            | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            error: err.to_string(),
            hint: err.user_hint().to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({"error": self.error, "hint": self.hint})),
        )
            .into_response()
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/sessions/:id/transcript", get(transcript_handler))
        .route("/api/sessions/:id", delete(reset_handler))
        .route("/api/tools", get(tools_handler))
        .route("/api/status", get(status_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C
pub async fn serve(agent: Arc<AgentCore>, addr: &str) -> Result<(), EngineError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| EngineError::Network(format!("Failed to bind to {}: {}", addr, e)))?;

    let local = listener
        .local_addr()
        .map_err(|e| EngineError::Network(format!("Failed to get local address: {}", e)))?;
    tracing::info!("Chat widget listening on http://{}", local);

    axum::serve(listener, router(AppState::new(agent)))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Server shutting down gracefully");
        })
        .await
        .map_err(|e| EngineError::Network(format!("Server error: {}", e)))
}

async fn index_handler() -> Html<&'static str> {
    Html(WIDGET_HTML)
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(ApiError::bad_request("Message must not be empty"));
    }

    let session_id = payload
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let result = state.agent.submit(&session_id, &payload.message).await?;

    Ok(Json(ChatResponse {
        session_id: result.session_id,
        response: result.answer,
        history: exchanges(&result.transcript),
    }))
}

async fn transcript_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<TranscriptResponse> {
    let messages = state.agent.sessions().transcript(&id).await;
    Json(TranscriptResponse {
        session_id: id,
        messages,
    })
}

async fn reset_handler(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    if state.agent.sessions().reset(&id).await {
        tracing::info!("Session {} reset", id);
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn tools_handler(State(state): State<AppState>) -> Json<Vec<ToolSpec>> {
    Json(state.agent.router().model().tools().to_vec())
}

async fn status_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let model = state.agent.router().model();
    Json(json!({
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
        "commit": option_env!("GIT_COMMIT_HASH").unwrap_or("unknown"),
        "model": model.provider().model(),
        "sessions": state.agent.sessions().len(),
    }))
}
