//! Job endpoints (/sources/{id}/jobs/*)

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use contenthub::JobType;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/sources/{id}/jobs/{job_type}", post(start_job))
}

#[derive(Debug, Default, Deserialize)]
struct JobQuery {
    /// Run to completion before responding.
    #[serde(default)]
    wait: bool,
}

/// POST /sources/{id}/jobs/{job_type}
///
/// Queues the job and answers 202 with the source in `pending`. With
/// `?wait=true` the job runs inside the request and the response carries
/// the final source (and artifacts for imports).
async fn start_job(
    State(state): State<Arc<AppState>>,
    Path((id, job_type)): Path<(String, String)>,
    Query(query): Query<JobQuery>,
) -> ApiResult<Response> {
    let job = JobType::parse(&job_type)
        .ok_or_else(|| ApiError::bad_request(format!("Unknown job type: {}", job_type)))?;

    if query.wait {
        let outcome = state
            .runner
            .run_with_timeout(&id, job, state.job_timeout)
            .await?;
        return Ok((StatusCode::OK, Json(outcome)).into_response());
    }

    let source = state.runner.submit(&id, job).await?;
    Ok((StatusCode::ACCEPTED, Json(source)).into_response())
}
