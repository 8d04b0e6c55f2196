//! Source CRUD endpoints (/sources/*)

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tracing::{info, warn};

use contenthub::source::media_folder;
use contenthub::{NewSource, Source, SourceUpdate};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sources", get(list_sources).post(create_source))
        .route(
            "/sources/{id}",
            get(get_source).put(update_source).delete(delete_source),
        )
}

async fn list_sources(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Source>>> {
    Ok(Json(state.repo.list().await?))
}

async fn create_source(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewSource>,
) -> ApiResult<(StatusCode, Json<Source>)> {
    if body.title.trim().is_empty() {
        return Err(ApiError::bad_request("title must not be empty"));
    }
    let source = state.repo.create(body).await?;
    info!(source_id = %source.source_id, "Source created");
    Ok((StatusCode::CREATED, Json(source)))
}

async fn get_source(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Source>> {
    state
        .repo
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Source not found: {}", id)))
}

async fn update_source(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<SourceUpdate>,
) -> ApiResult<Json<Source>> {
    if body.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(ApiError::bad_request("title must not be empty"));
    }
    Ok(Json(state.repo.update(&id, body).await?))
}

/// Removes the record, then its media folder.
async fn delete_source(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.repo.delete(&id).await?;

    let storage = state.storage.clone();
    let folder = media_folder(&id);
    let removed = tokio::task::spawn_blocking(move || storage.remove_folder(&folder))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    match removed {
        Ok(removed) => info!(source_id = %id, media_removed = removed, "Source deleted"),
        // The record is already gone; a leftover folder is only logged.
        Err(e) => warn!(source_id = %id, error = %e, "Failed to remove media folder"),
    }

    Ok(StatusCode::NO_CONTENT)
}
