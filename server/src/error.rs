//! Error responses: every failure becomes `{"detail": "..."}` with a status
//! code chosen from the error kind.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use contenthub::{AcquisitionError, ErrorKind, JobError, RepositoryError, StorageError};

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::UnsupportedSource => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::PreconditionFailed | ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Download
        | ErrorKind::Transcode
        | ErrorKind::Verification
        | ErrorKind::Hook => StatusCode::BAD_GATEWAY,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Storage | ErrorKind::Repository => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        Self::new(status_for(err.kind()), err.to_string())
    }
}

impl From<AcquisitionError> for ApiError {
    fn from(err: AcquisitionError) -> Self {
        JobError::from(err).into()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        JobError::from(err).into()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidKey(_) => Self::bad_request(err.to_string()),
            other => Self::internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, detail = %self.detail, "Request failed");
        }
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
