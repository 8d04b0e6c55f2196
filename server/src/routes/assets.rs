//! Asset endpoints (/assets/*, /resolve)

use std::sync::Arc;

use axum::extract::{Multipart, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use contenthub::source::media_folder;
use contenthub::{resolve_video_id, sanitize, MediaArtifacts};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Upper bound for a single uploaded file.
pub const MAX_UPLOAD_SIZE: usize = 512 * 1024 * 1024;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/resolve", get(resolve))
        .route("/assets/add_youtube_video", post(add_youtube_video))
        .route(
            "/assets/upload",
            post(upload_asset).layer(axum::extract::DefaultBodyLimit::max(MAX_UPLOAD_SIZE)),
        )
}

/// Role an asset plays in the edited story.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    #[default]
    ARoll,
    BRoll,
    Output,
}

impl AssetType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "a_roll" => Some(AssetType::ARoll),
            "b_roll" => Some(AssetType::BRoll),
            "output" => Some(AssetType::Output),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResolveQuery {
    url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub video_id: Option<String>,
}

async fn resolve(Query(query): Query<ResolveQuery>) -> Json<ResolveResponse> {
    Json(ResolveResponse {
        video_id: resolve_video_id(&query.url),
    })
}

#[derive(Debug, Deserialize)]
struct AddVideoRequest {
    source_id: String,
    video_id: String,
    #[serde(default)]
    asset_type: AssetType,
}

#[derive(Debug, Serialize)]
struct AddVideoResponse {
    source_id: String,
    asset_type: AssetType,
    #[serde(flatten)]
    artifacts: MediaArtifacts,
}

/// Downloads a video straight into the source's media folder without going
/// through the import job; statuses are untouched. Answers 409 while an
/// import of the same source is in flight.
async fn add_youtube_video(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AddVideoRequest>,
) -> ApiResult<Json<AddVideoResponse>> {
    let artifacts = state
        .runner
        .acquire_for_source(&body.source_id, &body.video_id)
        .await?;

    Ok(Json(AddVideoResponse {
        source_id: body.source_id,
        asset_type: body.asset_type,
        artifacts,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub source_id: String,
    pub asset_type: AssetType,
    pub filename: String,
    pub key: String,
}

/// Multipart fields: `source_id`, optional `asset_type`, and `file`.
/// Text fields must come before the file.
async fn upload_asset(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut source_id: Option<String> = None;
    let mut asset_type = AssetType::default();
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Multipart field error: {}", e)))?
    {
        match field.name() {
            Some("source_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(e.to_string()))?;
                source_id = Some(text.trim().to_string());
            }
            Some("asset_type") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(e.to_string()))?;
                asset_type = AssetType::parse(text.trim()).ok_or_else(|| {
                    ApiError::bad_request(format!("Unknown asset type: {}", text))
                })?;
            }
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| ApiError::bad_request("file field has no filename"))?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(e.to_string()))?;
                upload = Some((filename, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let source_id = source_id.ok_or_else(|| ApiError::bad_request("missing source_id"))?;
    let (filename, content) = upload.ok_or_else(|| ApiError::bad_request("missing file"))?;
    ensure_source(&state, &source_id).await?;

    let storage = state.storage.clone();
    let folder = media_folder(&source_id);
    let artifact = tokio::task::spawn_blocking(move || storage.store(&content, &folder, &filename))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))??;

    let stored_name = sanitize::redact_path(&artifact.path);
    info!(source_id = %source_id, file = %stored_name, "Asset uploaded");

    Ok(Json(UploadResponse {
        source_id,
        asset_type,
        filename: stored_name,
        key: artifact.key,
    }))
}

async fn ensure_source(state: &AppState, source_id: &str) -> ApiResult<()> {
    match state.repo.get(source_id).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::not_found(format!(
            "Source not found: {}",
            source_id
        ))),
    }
}
