//! HTTP endpoints
//!
//! REST surface for the query pipeline: chat (buffered and streaming),
//! language support, health, and metrics.

use axum::{
    extract::{Json, State},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use climate_agent_core::{parse_history, Citation, Language, ModelFamily, QueryOutcome, QueryRequest};

use crate::metrics::{metrics_handler, record_latency, record_request};
use crate::state::AppState;
use crate::streaming;
use crate::ServerError;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(
        &state.settings.server.cors_origins,
        state.settings.server.cors_enabled,
    );
    // Transport-level ceiling a little above the pipeline's own deadline,
    // so the pipeline gets to shape its own timeout responses
    let request_timeout =
        Duration::from_millis(state.settings.pipeline.request_deadline_ms.saturating_add(5_000));

    Router::new()
        // Chat endpoints
        .route("/api/v1/chat/query", post(chat))
        .route("/api/v1/chat/stream", post(chat_stream))
        // Language support
        .route("/api/v1/languages/supported", get(supported_languages))
        // Health checks
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Prometheus metrics
        .route("/metrics", get(metrics_handler))
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(cors_layer),
        )
        .with_state(state)
}

/// Build the CORS layer from configured origins.
///
/// Disabled CORS means a permissive layer (development only); no configured
/// origins defaults to localhost for safety.
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!(origin, "invalid CORS origin");
                None
            })
        })
        .collect();

    if parsed.is_empty() {
        tracing::info!("no CORS origins configured, defaulting to localhost:3000");
        return CorsLayer::new()
            .allow_origin("http://localhost:3000".parse::<HeaderValue>().expect("static origin"))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any);
    }

    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Chat request body
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub conversation_history: Vec<serde_json::Value>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub skip_cache: bool,
}

fn default_language() -> String {
    "en".to_string()
}

/// Buffered chat response
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    #[serde(flatten)]
    pub outcome: QueryOutcome,
    pub request_id: String,
}

impl ChatRequest {
    /// Convert into a pipeline request, standardizing the history shapes
    pub fn into_query_request(self) -> QueryRequest {
        let history = parse_history(&self.conversation_history);
        QueryRequest::new(self.query, self.language)
            .with_history(history)
            .with_skip_cache(self.skip_cache)
    }
}

/// Reject malformed requests before they reach the pipeline
fn validate_request(request: &ChatRequest) -> Result<(), ServerError> {
    if request.query.trim().is_empty() {
        return Err(ServerError::InvalidRequest("query must not be blank".to_string()));
    }
    if request.query.chars().count() > 2000 {
        return Err(ServerError::InvalidRequest(
            "query must be at most 2000 characters".to_string(),
        ));
    }
    Ok(())
}

fn invalid_request_response(error: ServerError, request_id: &str) -> Response {
    let message = error.to_string();
    (
        StatusCode::from(error),
        Json(serde_json::json!({ "error": message, "request_id": request_id })),
    )
        .into_response()
}

/// Process a chat query. `stream: true` upgrades to the SSE envelope.
async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Response {
    let request_id = Uuid::new_v4().to_string();
    tracing::info!(
        request_id,
        query_len = request.query.chars().count(),
        language = %request.language,
        stream = request.stream,
        "chat request"
    );

    if let Err(e) = validate_request(&request) {
        return invalid_request_response(e, &request_id);
    }

    if request.stream {
        return streaming::stream_response(state, request, request_id).into_response();
    }

    let outcome = state
        .pipeline
        .process(request.into_query_request(), None, CancellationToken::new())
        .await;

    record_request(outcome.success, false);
    record_latency(outcome.processing_time);

    Json(ChatResponse { outcome, request_id }).into_response()
}

/// Stream a chat response over SSE
async fn chat_stream(State(state): State<AppState>, Json(mut request): Json<ChatRequest>) -> Response {
    let request_id = Uuid::new_v4().to_string();
    tracing::info!(request_id, query_len = request.query.chars().count(), "stream request");

    if let Err(e) = validate_request(&request) {
        return invalid_request_response(e, &request_id);
    }

    request.stream = true;
    streaming::stream_response(state, request, request_id).into_response()
}

/// Language info entry
#[derive(Debug, Serialize)]
struct LanguageInfo {
    code: &'static str,
    name: &'static str,
}

/// Supported-languages listing, split by serving family
#[derive(Debug, Serialize)]
struct SupportedLanguagesResponse {
    primary_languages: Vec<LanguageInfo>,
    secondary_languages: Vec<LanguageInfo>,
    default_language: &'static str,
    total_supported: usize,
}

async fn supported_languages() -> Json<SupportedLanguagesResponse> {
    let (mut primary, mut secondary) = (Vec::new(), Vec::new());
    for lang in Language::all() {
        let info = LanguageInfo {
            code: lang.code(),
            name: lang.name(),
        };
        match lang.family() {
            ModelFamily::Primary => primary.push(info),
            ModelFamily::Secondary => secondary.push(info),
        }
    }

    let total = primary.len() + secondary.len();
    Json(SupportedLanguagesResponse {
        primary_languages: primary,
        secondary_languages: secondary,
        default_language: "en",
        total_supported: total,
    })
}

/// Health check
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness check
async fn readiness_check(State(_state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ready",
    }))
}

/// Citation payload for streaming events
pub(crate) fn citation_json(citation: &Citation) -> serde_json::Value {
    serde_json::json!({
        "title": citation.title,
        "url": citation.url,
        "content": citation.content,
        "snippet": citation.snippet,
    })
}
