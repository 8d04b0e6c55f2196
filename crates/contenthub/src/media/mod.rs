//! Media acquisition: download a remote video and split it into audio-only
//! and video-only files.

pub mod error;
pub mod pipeline;
pub mod toolchain;

pub use error::{AcquisitionError, ToolFailure, TranscodeStage};
pub use pipeline::{is_valid_video_id, ArtifactPaths, MediaAcquirer, MediaArtifacts};
pub use toolchain::{MediaToolchain, ProcessToolchain, StreamSelection};
