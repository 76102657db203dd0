//! Playback API routes.
//!
//! Video and audio streaming, progress heartbeats and handing files to an
//! external player.

use std::path::PathBuf;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use reelhouse_common::paths::needs_compat_stream;
use reelhouse_common::MediaKind;
use serde::{Deserialize, Serialize};

use super::{AppContext, AppError};
use crate::playback::{open_external, ProgressEntry, ProgressUpdate};
use crate::streaming::{compat_response, serve_file};

/// Create playback routes.
pub fn playback_routes() -> Router<AppContext> {
    Router::new()
        .route("/playback/video/:kind/:id", get(stream_video))
        .route("/playback/audio/track/:id", get(stream_audio))
        .route("/playback/progress", put(put_progress))
        .route("/playback/progress/:kind/:id", get(get_progress))
        .route("/playback/open-external/:kind/:id", post(open_in_player))
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct VideoQuery {
    /// Seek offset in seconds for compatibility streams
    pub start: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub progress: Option<ProgressEntry>,
    /// Stored duration, or one probed from the file when none is stored
    pub duration_seconds: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct OpenExternalResponse {
    pub ok: bool,
}

fn parse_kind(kind: &str) -> Result<MediaKind, AppError> {
    kind.parse::<MediaKind>().map_err(AppError::bad_request)
}

async fn resolve(ctx: &AppContext, kind: MediaKind, id: String) -> Result<PathBuf, AppError> {
    let resolver = ctx.resolver.clone();
    let path = tokio::task::spawn_blocking(move || resolver.resolve(kind, &id)).await??;
    Ok(path)
}

// ============================================================================
// Handlers
// ============================================================================

async fn stream_video(
    State(ctx): State<AppContext>,
    Path((kind, id)): Path<(String, String)>,
    Query(query): Query<VideoQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let kind = parse_kind(&kind)?;
    if !kind.is_video() {
        return Err(AppError::bad_request(format!("{kind} is not a video")));
    }

    let path = resolve(&ctx, kind, id).await?;

    if needs_compat_stream(&path) {
        // the stream owns the encoder; a dropped connection drops it
        let stream = ctx
            .transcoder
            .start(&path, query.start, ctx.shutdown.child_token())
            .await?;
        return Ok(compat_response(stream)?);
    }

    Ok(serve_file(&path, &headers).await?)
}

async fn stream_audio(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let path = resolve(&ctx, MediaKind::Track, id).await?;
    Ok(serve_file(&path, &headers).await?)
}

async fn put_progress(
    State(ctx): State<AppContext>,
    Json(update): Json<ProgressUpdate>,
) -> Result<Json<ProgressResponse>, AppError> {
    if update.media_id.trim().is_empty() {
        return Err(AppError::bad_request("mediaId must not be empty"));
    }

    let store = ctx.progress.clone();
    let entry = tokio::task::spawn_blocking(move || store.update(update)).await?;
    let duration_seconds = entry.as_ref().and_then(|e| e.duration_seconds);

    Ok(Json(ProgressResponse {
        progress: entry,
        duration_seconds,
    }))
}

async fn get_progress(
    State(ctx): State<AppContext>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<ProgressResponse>, AppError> {
    let kind = parse_kind(&kind)?;
    let progress = ctx.progress.get(kind, &id);

    let mut duration_seconds = progress.as_ref().and_then(|p| p.duration_seconds);
    if duration_seconds.is_none() {
        // best effort; an unresolvable item just has no duration
        if let Ok(path) = resolve(&ctx, kind, id).await {
            duration_seconds = ctx.prober.duration(&path).await;
        }
    }

    Ok(Json(ProgressResponse {
        progress,
        duration_seconds,
    }))
}

async fn open_in_player(
    State(ctx): State<AppContext>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<OpenExternalResponse>, AppError> {
    let kind = parse_kind(&kind)?;
    let path = resolve(&ctx, kind, id).await?;
    open_external(&path, ctx.config.playback.external_opener.as_deref())?;
    Ok(Json(OpenExternalResponse { ok: true }))
}
