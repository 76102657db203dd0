//! Library API routes.
//!
//! Catalog reads and on-demand reconciliation. Every read first asks the
//! reconciler to refresh its scope; the cooldown keeps that cheap, and a
//! failed pass still serves whatever rows the catalog already holds.

use std::str::FromStr;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use reelhouse_common::{LibraryKind, SeriesId};
use reelhouse_db::{
    models::{AlbumWithArtist, Episode, Movie},
    pool::get_conn,
    queries::{movies, music, series},
};

use super::{AppContext, AppError};
use crate::reconcile::ReconcileReport;

/// Create library routes.
pub fn library_routes() -> Router<AppContext> {
    Router::new()
        .route("/library/:kind/reconcile", post(reconcile_library))
        .route("/library/movies", get(list_movies))
        .route("/library/series/:id/episodes", get(list_episodes))
        .route("/library/albums", get(list_albums))
}

/// Run a reconciliation pass before a read. Failures only log.
async fn refresh(ctx: &AppContext, kind: LibraryKind, only: Option<SeriesId>) {
    let reconciler = ctx.reconciler.clone();
    let result = tokio::task::spawn_blocking(move || match (kind, only) {
        (LibraryKind::Tv, Some(id)) => reconciler.reconcile_series(Some(id)),
        _ => reconciler.reconcile(kind),
    })
    .await;

    match result {
        Ok(Ok(report)) if report.changed() => {
            tracing::debug!(%kind, "{}", report);
        }
        Ok(Ok(_)) => {}
        Ok(Err(e)) => {
            tracing::warn!(%kind, error = %e, "Reconciliation before read failed; serving stored rows");
        }
        Err(e) => {
            tracing::warn!(%kind, error = %e, "Reconciliation task panicked; serving stored rows");
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn reconcile_library(
    State(ctx): State<AppContext>,
    Path(kind): Path<String>,
) -> Result<Json<ReconcileReport>, AppError> {
    let kind = LibraryKind::from_str(&kind).map_err(AppError::bad_request)?;
    let reconciler = ctx.reconciler.clone();
    let report = tokio::task::spawn_blocking(move || reconciler.reconcile(kind)).await??;
    Ok(Json(report))
}

async fn list_movies(State(ctx): State<AppContext>) -> Result<Json<Vec<Movie>>, AppError> {
    refresh(&ctx, LibraryKind::Movies, None).await;

    let pool = ctx.pool.clone();
    let rows = tokio::task::spawn_blocking(move || {
        let conn = get_conn(&pool)?;
        movies::list_movies(&conn)
    })
    .await??;
    Ok(Json(rows))
}

async fn list_episodes(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Episode>>, AppError> {
    let series_id = SeriesId::from_str(&id)
        .map_err(|_| AppError::bad_request(format!("invalid series id: {id}")))?;

    let pool = ctx.pool.clone();
    let exists = tokio::task::spawn_blocking(move || {
        let conn = get_conn(&pool)?;
        series::get_series(&conn, series_id)
    })
    .await??;
    if exists.is_none() {
        return Err(reelhouse_common::Error::not_found(format!("series {id}")).into());
    }

    refresh(&ctx, LibraryKind::Tv, Some(series_id)).await;

    let pool = ctx.pool.clone();
    let rows = tokio::task::spawn_blocking(move || {
        let conn = get_conn(&pool)?;
        series::list_episodes(&conn, series_id)
    })
    .await??;
    Ok(Json(rows))
}

async fn list_albums(
    State(ctx): State<AppContext>,
) -> Result<Json<Vec<AlbumWithArtist>>, AppError> {
    refresh(&ctx, LibraryKind::Music, None).await;

    let pool = ctx.pool.clone();
    let rows = tokio::task::spawn_blocking(move || {
        let conn = get_conn(&pool)?;
        music::list_albums_with_artist(&conn)
    })
    .await??;
    Ok(Json(rows))
}
