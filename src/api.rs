//! HTTP surface for Rusty Digest.
//!
//! This module exposes a compact Axum router:
//!
//! - `POST /summarize-file` – Multipart upload with a `file` field (pdf, xlsx, xml or csv).
//!   Returns `{ "summary": string }`; failures return `{ "error": string }` with a 4xx status
//!   for caller mistakes (missing file, unsupported format, unreadable file, no text) and a 5xx
//!   status when the summarization provider fails or times out.
//! - `GET /health` – Liveness probe.
//! - `GET /metrics` – Summarization counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! CORS is permissive so browser front-ends on any origin can upload directly.

use crate::processing::{ProcessingError, SummaryApi};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::Instrument;
use uuid::Uuid;

const FILE_FIELD: &str = "file";

/// Build the HTTP router exposing the summarization API surface.
pub fn create_router<S>(service: Arc<S>, max_upload_bytes: usize) -> Router
where
    S: SummaryApi + 'static,
{
    Router::new()
        .route("/summarize-file", post(summarize_file::<S>))
        .route("/health", get(health))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(service)
}

/// Success response for `POST /summarize-file`.
#[derive(Serialize)]
struct SummaryResponse {
    summary: String,
}

/// Summarize the uploaded `file` field.
async fn summarize_file<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<SummaryResponse>, AppError>
where
    S: SummaryApi,
{
    let request_id = Uuid::new_v4();
    let Some((filename, bytes)) = read_file_field(&mut multipart).await? else {
        tracing::info!(%request_id, "Upload rejected: no file field");
        return Err(AppError::bad_request("No file was provided"));
    };

    let span = tracing::info_span!("summarize_file", %request_id, filename = %filename);
    let outcome = service
        .summarize_upload(&filename, bytes)
        .instrument(span)
        .await?;
    Ok(Json(SummaryResponse {
        summary: outcome.summary,
    }))
}

/// Pull the first `file` field out of the form, skipping anything else.
async fn read_file_field(
    multipart: &mut Multipart,
) -> Result<Option<(String, Vec<u8>)>, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        return Ok(Some((filename, bytes.to_vec())));
    }
    Ok(None)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Return the summarization counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<crate::metrics::MetricsSnapshot>
where
    S: SummaryApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "summarize_file",
                method: "POST",
                path: "/summarize-file",
                description: "Upload a pdf, xlsx, xml or csv file as multipart field 'file'. Response returns { \"summary\": string } or { \"error\": string }.",
            },
            CommandDescriptor {
                name: "health",
                method: "GET",
                path: "/health",
                description: "Liveness probe returning { \"status\": \"ok\" }.",
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return summarization counters useful for observability dashboards.",
            },
        ],
    })
}

enum AppError {
    Processing(ProcessingError),
    Upload { status: StatusCode, message: String },
}

impl AppError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self::Upload {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Processing(error) => (error.status_code(), error.to_string()),
            Self::Upload { status, message } => (status, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<ProcessingError> for AppError {
    fn from(inner: ProcessingError) -> Self {
        Self::Processing(inner)
    }
}

impl From<MultipartError> for AppError {
    fn from(inner: MultipartError) -> Self {
        Self::Upload {
            status: inner.status(),
            message: inner.body_text(),
        }
    }
}
