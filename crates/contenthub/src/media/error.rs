use std::path::PathBuf;

use thiserror::Error;

use crate::error::StorageError;

/// Which derived artifact a transcode step was producing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodeStage {
    Audio,
    Video,
}

impl std::fmt::Display for TranscodeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscodeStage::Audio => write!(f, "audio"),
            TranscodeStage::Video => write!(f, "video"),
        }
    }
}

/// Failure of one acquisition stage. Nothing is retried internally.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("Invalid video id '{0}'")]
    InvalidVideoId(String),

    #[error("Failed to prepare media folder: {0}")]
    Storage(#[from] StorageError),

    #[error("Download of {video_id} failed: {message}")]
    Download { video_id: String, message: String },

    #[error("Failed to extract {stage} into '{output}': {diagnostics}")]
    Transcode {
        stage: TranscodeStage,
        output: PathBuf,
        diagnostics: String,
    },

    #[error("Expected output missing after transcode: {}", display_paths(.missing))]
    Verification { missing: Vec<PathBuf> },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Error reported by an external tool invocation: launch failure or
/// non-zero exit, with whatever the tool printed.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ToolFailure {
    pub message: String,
}

impl ToolFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
