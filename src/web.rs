use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn};

use crate::error::WcloudError;
use crate::pipeline::Pipeline;
use crate::title::TimeMode;

type SharedState = Arc<Pipeline>;

#[derive(Debug, Deserialize)]
struct GenRequest {
    content: Option<String>,
    chat_room_id: Option<String>,
    mode: Option<String>,
}

pub async fn serve(pipeline: Pipeline, port: u16) -> std::io::Result<()> {
    let router = build_router(Arc::new(pipeline));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "word cloud server starting");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");

    Ok(())
}

fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(api_description))
        .route(
            "/api/v1/word-cloud/gen",
            // non-POST methods get 404 rather than axum's default 405
            post(generate).fallback(not_found),
        )
        .fallback(not_found)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new())
                .on_response(DefaultOnResponse::new()),
        )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
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

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<WcloudError> for ApiError {
    fn from(err: WcloudError) -> Self {
        match err {
            WcloudError::Validation(message) => ApiError::bad_request(message),
            // distinguishable "no content to render" signal
            WcloudError::EmptyResult => ApiError::internal(err.to_string()),
            WcloudError::Config(_) | WcloudError::Io(_) | WcloudError::Image(_) => {
                ApiError::internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.message });
        (self.status, Json(payload)).into_response()
    }
}

async fn generate(State(state): State<SharedState>, body: Bytes) -> Result<Response, ApiError> {
    let request: GenRequest =
        serde_json::from_slice(&body).map_err(|_| ApiError::bad_request("invalid JSON body"))?;

    let missing = || ApiError::bad_request("missing required parameters: content and chat_room_id");
    let content = request.content.filter(|c| !c.is_empty()).ok_or_else(missing)?;
    let chat_room_id = request
        .chat_room_id
        .filter(|c| !c.is_empty())
        .ok_or_else(missing)?;

    let mode: TimeMode = request
        .mode
        .as_deref()
        .unwrap_or(TimeMode::default().as_str())
        .parse()?;

    info!(%chat_room_id, mode = %mode, "generating word cloud");

    let pipeline = state.clone();
    let room = chat_room_id.clone();
    let artifact = tokio::task::spawn_blocking(move || {
        pipeline.generate(&content, &room, mode, Local::now().date_naive())
    })
    .await
    .map_err(|err| ApiError::internal(format!("render task failed: {err}")))??;

    let bytes = artifact.bytes()?;
    let filename = artifact.download_name.clone();

    // already streaming a response; cleanup failures must not surface
    if let Err(err) = artifact.close() {
        warn!(%err, "failed to remove transient artifact");
    }

    info!(%chat_room_id, %filename, "word cloud image sent");

    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

async fn api_description() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Word Cloud API Server",
        "version": "1.0",
        "endpoints": {
            "POST /api/v1/word-cloud/gen": {
                "description": "Generate word cloud image",
                "parameters": {
                    "content": "string (required) - Text content for word cloud",
                    "chat_room_id": "string (required) - Chat room identifier",
                    "mode": "string (optional) - Time mode: yesterday, week, month, year (default: yesterday)"
                },
                "returns": "PNG image file"
            }
        }
    }))
}

async fn not_found() -> ApiError {
    ApiError {
        status: StatusCode::NOT_FOUND,
        message: "Not Found".to_string(),
    }
}
