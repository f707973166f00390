//! HTTP server for lecture transcripts.
//!
//! Lets the discussion app ingest a lecture's transcript, read it back, clear
//! it, and list the caption languages a video offers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/transcript?id=<lecture>` | Stored lines, ascending by start |
//! | `POST` | `/transcript` | Ingest `{lecture, video_id \| link, language?}` |
//! | `POST` | `/delete-transcript?id=<lecture>` | Remove a lecture's lines |
//! | `GET`  | `/transcript-language?link=<url>` | Caption tracks of a video |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "upstream_unavailable", "message": "GET http://… returned HTTP 404" } }
//! ```
//!
//! | Code | Status | Raised for |
//! |------|--------|-----------|
//! | `bad_request` | 400 | missing parameters, unusable video id or language |
//! | `upstream_unavailable` | 502 | feed unreachable or non-2xx |
//! | `upstream_malformed` | 502 | feed not XML, bad `start`/`dur`, out-of-range times |
//! | `storage_unavailable` | 503 | database failure |

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use lecture_transcripts_core::video::video_id_from_url;
use lecture_transcripts_core::{
    LectureKey, TranscriptError, TranscriptLanguage, TranscriptLine, VideoId,
};

use crate::config::Config;
use crate::db;
use crate::fetch::HttpFeedFetcher;
use crate::ingest::TranscriptPipeline;
use crate::migrate;
use crate::sqlite_store::SqliteStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    pipeline: Arc<TranscriptPipeline>,
}

/// Starts the transcript HTTP server.
///
/// Opens the database (applying the schema if needed), builds the feed
/// fetcher from `[feed]`, and binds to `[server].bind`. Runs until Ctrl-C or
/// SIGTERM.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(&config.db).await?;
    migrate::apply(&pool).await?;

    let fetcher = HttpFeedFetcher::from_config(&config.feed)?;
    let store = SqliteStore::new(pool.clone());
    let pipeline = Arc::new(TranscriptPipeline::new(Arc::new(fetcher), Arc::new(store)));

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    tracing::info!(
        addr = %config.server.bind,
        feed = %config.feed.base_url,
        "transcript server listening"
    );

    axum::serve(listener, router(pipeline))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("transcript server stopped");
    Ok(())
}

/// Build the router over an existing pipeline.
pub fn router(pipeline: Arc<TranscriptPipeline>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/transcript", get(handle_get_transcript).post(handle_ingest))
        .route("/delete-transcript", post(handle_delete_transcript))
        .route("/transcript-language", get(handle_languages))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(AppState { pipeline })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

/// Error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

impl From<TranscriptError> for AppError {
    fn from(err: TranscriptError) -> Self {
        let (status, code) = match &err {
            TranscriptError::UrlBuild(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            TranscriptError::Network(_) => (StatusCode::BAD_GATEWAY, "upstream_unavailable"),
            TranscriptError::Parse(_)
            | TranscriptError::MalformedAttribute { .. }
            | TranscriptError::InvalidDuration(_) => {
                (StatusCode::BAD_GATEWAY, "upstream_malformed")
            }
            TranscriptError::StorageUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable")
            }
        };
        AppError {
            status,
            code,
            message: err.to_string(),
        }
    }
}

/// Non-empty, trimmed lecture key from a request parameter.
fn lecture_param(value: Option<&str>, name: &str) -> Result<LectureKey, AppError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(LectureKey::new(v)),
        _ => Err(bad_request(format!("{} must not be empty", name))),
    }
}

fn video_from_link(link: &str) -> Result<VideoId, AppError> {
    video_id_from_url(link)
        .ok_or_else(|| bad_request(format!("no video id found in link '{}'", link)))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============ GET /transcript ============

#[derive(Deserialize)]
struct LectureQuery {
    id: Option<String>,
}

#[derive(Serialize)]
struct LinesResponse {
    lines: Vec<TranscriptLine>,
}

async fn handle_get_transcript(
    State(state): State<AppState>,
    Query(query): Query<LectureQuery>,
) -> Result<Json<LinesResponse>, AppError> {
    let lecture = lecture_param(query.id.as_deref(), "id")?;
    let lines = state.pipeline.list_lines(&lecture).await?;
    Ok(Json(LinesResponse { lines }))
}

// ============ POST /transcript ============

#[derive(Deserialize)]
struct IngestRequest {
    lecture: String,
    #[serde(default)]
    video_id: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    language: Option<String>,
}

/// Ingest a lecture's transcript and return the stored lines.
///
/// `video_id` wins over `link` when both are given.
async fn handle_ingest(
    State(state): State<AppState>,
    body: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<Json<LinesResponse>, AppError> {
    let Json(req) = body.map_err(|e| bad_request(e.body_text()))?;
    let lecture = lecture_param(Some(&req.lecture), "lecture")?;

    let video = match (req.video_id.as_deref(), req.link.as_deref()) {
        (Some(id), _) => VideoId::new(id.trim()),
        (None, Some(link)) => video_from_link(link)?,
        (None, None) => return Err(bad_request("one of video_id or link is required")),
    };

    let language = req
        .language
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty());

    state
        .pipeline
        .ingest_in(&video, &lecture, language)
        .await?;
    let lines = state.pipeline.list_lines(&lecture).await?;
    Ok(Json(LinesResponse { lines }))
}

// ============ POST /delete-transcript ============

#[derive(Serialize)]
struct DeleteResponse {
    deleted: u64,
}

async fn handle_delete_transcript(
    State(state): State<AppState>,
    Query(query): Query<LectureQuery>,
) -> Result<Json<DeleteResponse>, AppError> {
    let lecture = lecture_param(query.id.as_deref(), "id")?;
    let deleted = state.pipeline.clear(&lecture).await?;
    Ok(Json(DeleteResponse { deleted }))
}

// ============ GET /transcript-language ============

#[derive(Deserialize)]
struct LanguageQuery {
    link: Option<String>,
}

#[derive(Serialize)]
struct LanguagesResponse {
    languages: Vec<TranscriptLanguage>,
}

async fn handle_languages(
    State(state): State<AppState>,
    Query(query): Query<LanguageQuery>,
) -> Result<Json<LanguagesResponse>, AppError> {
    let link = query
        .link
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .ok_or_else(|| bad_request("link must not be empty"))?;
    let video = video_from_link(link)?;
    let languages = state.pipeline.fetch_languages(&video).await?;
    Ok(Json(LanguagesResponse { languages }))
}
