//! Minimal HTTP front end over the resolver.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::signal;
use tracing::{info, warn};
use transcript_fetcher::{FetchOptions, Resolver};

#[derive(Clone)]
pub struct AppState {
    resolver: Arc<Resolver>,
    health: Arc<Value>,
}

impl AppState {
    pub fn new(options: FetchOptions) -> Self {
        let health = crate::health_payload(&options);
        Self {
            resolver: Arc::new(Resolver::new(options)),
            health: Arc::new(health),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TranscriptRequest {
    #[serde(rename = "videoUrl", default)]
    video_url: Option<String>,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/transcript", post(fetch_transcript))
        .route("/api/health", get(health))
        .with_state(state)
}

pub async fn run(addr: SocketAddr, options: FetchOptions) -> std::io::Result<()> {
    let app = router(AppState::new(options));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        warn!(error = %err, "failed to install Ctrl+C handler");
    }
}

async fn fetch_transcript(
    State(state): State<AppState>,
    payload: Result<Json<TranscriptRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload.map_err(|rejection| ApiError {
        status: rejection.status(),
        message: rejection.body_text(),
    })?;
    let video_url = request
        .video_url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Video URL is required"))?;

    let result = state.resolver.resolve(&video_url).await;
    let status =
        StatusCode::from_u16(result.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    info!(video_id = result.video_id(), status = status.as_u16(), "served transcript request");
    Ok((status, Json(result)).into_response())
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(state.health.as_ref().clone())
}
