use std::time::Duration;

use thiserror::Error;

use super::{JobStatus, JobType};
use crate::media::AcquisitionError;
use crate::repository::RepositoryError;

/// Flat classification of a [`JobError`] for callers that only need to pick
/// a response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    UnsupportedSource,
    PreconditionFailed,
    Conflict,
    Download,
    Transcode,
    Verification,
    Hook,
    Timeout,
    Storage,
    Repository,
}

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Source not found: {0}")]
    NotFound(String),

    #[error("Source {source_id} has no supported video url ({})", .url.as_deref().unwrap_or("none"))]
    UnsupportedSource {
        source_id: String,
        url: Option<String>,
    },

    #[error("Cannot run {job}: {prerequisite} is {status}, expected completed")]
    PreconditionFailed {
        job: JobType,
        prerequisite: JobType,
        status: JobStatus,
    },

    #[error("Media acquisition failed: {0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("{job} hook failed: {message}")]
    Hook { job: JobType, message: String },

    #[error("{job} is already running or was changed concurrently for source {source_id}")]
    Conflict { source_id: String, job: JobType },

    #[error("Job timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for JobError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => JobError::NotFound(id),
            other => JobError::Repository(other),
        }
    }
}

impl JobError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            JobError::NotFound(_) => ErrorKind::NotFound,
            JobError::UnsupportedSource { .. } => ErrorKind::UnsupportedSource,
            JobError::PreconditionFailed { .. } => ErrorKind::PreconditionFailed,
            JobError::Conflict { .. } => ErrorKind::Conflict,
            JobError::Acquisition(e) => match e {
                AcquisitionError::InvalidVideoId(_) => ErrorKind::UnsupportedSource,
                AcquisitionError::Storage(_) => ErrorKind::Storage,
                AcquisitionError::Download { .. } => ErrorKind::Download,
                AcquisitionError::Transcode { .. } => ErrorKind::Transcode,
                AcquisitionError::Verification { .. } => ErrorKind::Verification,
            },
            JobError::Hook { .. } => ErrorKind::Hook,
            JobError::Timeout(_) => ErrorKind::Timeout,
            JobError::Repository(_) => ErrorKind::Repository,
        }
    }
}
