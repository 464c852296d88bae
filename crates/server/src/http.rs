//! HTTP Endpoints
//!
//! REST surface for text analysis and service health; the websocket
//! endpoint for live streams is in [`crate::websocket`].

use std::collections::HashMap;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use phishguard_scoring::{warning_message, ComprehensiveResult, ImmediateResult};

use crate::state::AppState;
use crate::websocket::transcribe_ws;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Realtime transcription stream
        .route("/api/transcribe/ws", get(transcribe_ws))
        .route("/api/transcribe/ws-info", get(ws_info))
        // Non-streaming analysis
        .route("/api/voice-phishing/analyze", post(analyze_text))
        // Health check
        .route("/health", get(health_check))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Text analysis request
#[derive(Debug, Deserialize)]
pub(crate) struct AnalyzeRequest {
    text: String,
    #[serde(default = "default_method")]
    method: String,
}

fn default_method() -> String {
    "hybrid".to_string()
}

/// Text analysis response
#[derive(Debug, Serialize)]
pub(crate) struct AnalyzeResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    immediate: Option<ImmediateResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comprehensive: Option<ComprehensiveResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning_message: Option<String>,
}

/// Non-streaming text analysis: immediate, comprehensive, or both.
pub(crate) async fn analyze_text(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, StatusCode> {
    if request.text.trim().chars().count() < 10 {
        return Err(StatusCode::BAD_REQUEST);
    }
    if !matches!(request.method.as_str(), "immediate" | "comprehensive" | "hybrid") {
        return Err(StatusCode::BAD_REQUEST);
    }

    let immediate = if request.method != "comprehensive" {
        // A one-shot request has no call history to carry over.
        Some(state.engine.detect_immediate(&request.text, &HashMap::new()))
    } else {
        None
    };

    let comprehensive = if request.method != "immediate" {
        Some(state.engine.detect_comprehensive(&request.text).await)
    } else {
        None
    };

    let warning = warning_message(immediate.as_ref(), comprehensive.as_ref());

    Ok(Json(AnalyzeResponse {
        immediate,
        comprehensive,
        warning_message: warning,
    }))
}

/// Connection metadata for websocket clients
async fn ws_info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let base = &state.settings.server.public_ws_base;
    Json(serde_json::json!({
        "connect_to": format!("{base}/api/transcribe/ws?sr=16000"),
        "send": "PCM16LE mono binary frames (e.g. 200ms)",
        "end": "__END__ (text frame)",
        "receive": "JSON: kind=state/partial/final/risk/error",
    }))
}

/// Health check
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "lexicon_entries": state.lexicon_entries,
    }))
}
