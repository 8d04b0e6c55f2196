use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};

use super::error::{AcquisitionError, TranscodeStage};
use super::toolchain::{MediaToolchain, StreamSelection};
use crate::resolver::watch_url;
use crate::sanitize;
use crate::storage::{ArtifactRef, MediaStorage};

/// The three files produced by one acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaArtifacts {
    /// Muxed audio+video as downloaded.
    pub combined: ArtifactRef,
    pub audio: ArtifactRef,
    pub video: ArtifactRef,
}

/// Output paths for a video id inside a media folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub combined: PathBuf,
    pub audio: PathBuf,
    pub video: PathBuf,
}

impl ArtifactPaths {
    pub fn new(dir: &Path, video_id: &str) -> Self {
        Self {
            combined: dir.join(format!("{}.mp4", video_id)),
            audio: dir.join(format!("{}.audio.m4a", video_id)),
            video: dir.join(format!("{}.video.mp4", video_id)),
        }
    }
}

/// Downloads a remote video and derives audio-only and video-only files.
///
/// Stages run one after another so a failure always names a single stage.
/// Partial output is left in place; a rerun overwrites it.
pub struct MediaAcquirer {
    storage: MediaStorage,
    toolchain: Arc<dyn MediaToolchain>,
}

impl MediaAcquirer {
    pub fn new(storage: MediaStorage, toolchain: Arc<dyn MediaToolchain>) -> Self {
        Self { storage, toolchain }
    }

    pub fn storage(&self) -> &MediaStorage {
        &self.storage
    }

    pub async fn acquire(
        &self,
        video_id: &str,
        subfolder: &str,
    ) -> Result<MediaArtifacts, AcquisitionError> {
        if !is_valid_video_id(video_id) {
            return Err(AcquisitionError::InvalidVideoId(video_id.to_string()));
        }

        let span = info_span!("acquire", video_id = %video_id, subfolder = %subfolder);
        self.acquire_inner(video_id, subfolder).instrument(span).await
    }

    async fn acquire_inner(
        &self,
        video_id: &str,
        subfolder: &str,
    ) -> Result<MediaArtifacts, AcquisitionError> {
        // Step 1: Destination folder
        let dir = self.storage.ensure_folder(subfolder)?;
        let paths = ArtifactPaths::new(&dir, video_id);

        // Step 2: Download combined audio+video
        let url = watch_url(video_id);
        self.toolchain
            .download(&url, &paths.combined)
            .instrument(info_span!("download"))
            .await
            .map_err(|e| AcquisitionError::Download {
                video_id: video_id.to_string(),
                message: e.message,
            })?;
        if !paths.combined.exists() {
            return Err(AcquisitionError::Download {
                video_id: video_id.to_string(),
                message: format!(
                    "downloader finished but {} is missing",
                    sanitize::redact_path(&paths.combined)
                ),
            });
        }
        info!(file = %sanitize::redact_path(&paths.combined), "Downloaded combined file");

        // Step 3: Audio only
        self.extract(&paths.combined, &paths.audio, TranscodeStage::Audio)
            .await?;

        // Step 4: Video only
        self.extract(&paths.combined, &paths.video, TranscodeStage::Video)
            .await?;

        // Step 5: Verify derived files
        let missing: Vec<PathBuf> = [&paths.audio, &paths.video]
            .into_iter()
            .filter(|p| !p.exists())
            .cloned()
            .collect();
        if !missing.is_empty() {
            warn!(count = missing.len(), "Transcoder reported success but output is missing");
            return Err(AcquisitionError::Verification { missing });
        }

        Ok(MediaArtifacts {
            combined: self.storage.artifact(paths.combined)?,
            audio: self.storage.artifact(paths.audio)?,
            video: self.storage.artifact(paths.video)?,
        })
    }

    async fn extract(
        &self,
        input: &Path,
        output: &Path,
        stage: TranscodeStage,
    ) -> Result<(), AcquisitionError> {
        let selection = match stage {
            TranscodeStage::Audio => StreamSelection::AudioOnly,
            TranscodeStage::Video => StreamSelection::VideoOnly,
        };
        self.toolchain
            .transcode(input, output, selection)
            .instrument(info_span!("transcode", stage = %stage))
            .await
            .map_err(|e| AcquisitionError::Transcode {
                stage,
                output: output.to_path_buf(),
                diagnostics: e.message,
            })?;
        info!(stage = %stage, file = %sanitize::redact_path(output), "Extracted stream");
        Ok(())
    }
}

/// Video and playlist ids are URL-safe base64-ish tokens. Anything else
/// could escape the media folder once used as a file name.
pub fn is_valid_video_id(video_id: &str) -> bool {
    !video_id.is_empty()
        && video_id.len() <= 64
        && video_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::error::ToolFailure;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Writes placeholder files instead of running real tools.
    #[derive(Default)]
    struct ScriptedToolchain {
        fail_download: bool,
        skip_download_output: bool,
        fail_stage: Option<StreamSelection>,
        skip_output: Option<StreamSelection>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MediaToolchain for ScriptedToolchain {
        async fn download(&self, url: &str, destination: &Path) -> Result<(), ToolFailure> {
            self.calls.lock().unwrap().push(format!("download {}", url));
            if self.fail_download {
                return Err(ToolFailure::new("ERROR: Video unavailable"));
            }
            if !self.skip_download_output {
                std::fs::write(destination, b"combined").unwrap();
            }
            Ok(())
        }

        async fn transcode(
            &self,
            _input: &Path,
            output: &Path,
            selection: StreamSelection,
        ) -> Result<(), ToolFailure> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("transcode {:?}", selection));
            if self.fail_stage == Some(selection) {
                return Err(ToolFailure::new("Invalid data found when processing input"));
            }
            if self.skip_output != Some(selection) {
                std::fs::write(output, b"derived").unwrap();
            }
            Ok(())
        }
    }

    fn acquirer(dir: &TempDir, toolchain: ScriptedToolchain) -> (MediaAcquirer, Arc<ScriptedToolchain>) {
        let toolchain = Arc::new(toolchain);
        let acquirer = MediaAcquirer::new(
            MediaStorage::new(dir.path()),
            Arc::clone(&toolchain) as Arc<dyn MediaToolchain>,
        );
        (acquirer, toolchain)
    }

    #[tokio::test]
    async fn test_acquire_writes_three_artifacts() {
        let dir = TempDir::new().unwrap();
        let (acquirer, toolchain) = acquirer(&dir, ScriptedToolchain::default());

        let artifacts = acquirer.acquire("abc123", "sources/s1").await.unwrap();

        assert_eq!(artifacts.combined.key, "sources/s1/abc123.mp4");
        assert_eq!(artifacts.audio.key, "sources/s1/abc123.audio.m4a");
        assert_eq!(artifacts.video.key, "sources/s1/abc123.video.mp4");
        assert!(dir.path().join("sources/s1/abc123.mp4").exists());
        assert!(artifacts.audio.path.exists());
        assert!(artifacts.video.path.exists());

        let calls = toolchain.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                "download https://www.youtube.com/watch?v=abc123".to_string(),
                "transcode AudioOnly".to_string(),
                "transcode VideoOnly".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_download_failure_stops_pipeline() {
        let dir = TempDir::new().unwrap();
        let (acquirer, toolchain) = acquirer(
            &dir,
            ScriptedToolchain {
                fail_download: true,
                ..Default::default()
            },
        );

        let err = acquirer.acquire("abc123", "sources/s1").await.unwrap_err();
        match err {
            AcquisitionError::Download { video_id, message } => {
                assert_eq!(video_id, "abc123");
                assert!(message.contains("Video unavailable"));
            }
            other => panic!("expected Download, got {other:?}"),
        }
        assert_eq!(toolchain.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_combined_file_is_a_download_error() {
        let dir = TempDir::new().unwrap();
        let (acquirer, _) = acquirer(
            &dir,
            ScriptedToolchain {
                skip_download_output: true,
                ..Default::default()
            },
        );

        let err = acquirer.acquire("abc123", "sources/s1").await.unwrap_err();
        assert!(matches!(err, AcquisitionError::Download { .. }));
    }

    #[tokio::test]
    async fn test_audio_failure_carries_diagnostics_and_keeps_partial_output() {
        let dir = TempDir::new().unwrap();
        let (acquirer, toolchain) = acquirer(
            &dir,
            ScriptedToolchain {
                fail_stage: Some(StreamSelection::AudioOnly),
                ..Default::default()
            },
        );

        let err = acquirer.acquire("abc123", "sources/s1").await.unwrap_err();
        match err {
            AcquisitionError::Transcode {
                stage, diagnostics, ..
            } => {
                assert_eq!(stage, TranscodeStage::Audio);
                assert!(diagnostics.contains("Invalid data"));
            }
            other => panic!("expected Transcode, got {other:?}"),
        }
        // Video extraction never started and the download is left for reuse.
        assert_eq!(toolchain.calls.lock().unwrap().len(), 2);
        assert!(dir.path().join("sources/s1/abc123.mp4").exists());
    }

    #[tokio::test]
    async fn test_video_failure_names_video_stage() {
        let dir = TempDir::new().unwrap();
        let (acquirer, _) = acquirer(
            &dir,
            ScriptedToolchain {
                fail_stage: Some(StreamSelection::VideoOnly),
                ..Default::default()
            },
        );

        let err = acquirer.acquire("abc123", "sources/s1").await.unwrap_err();
        assert!(matches!(
            err,
            AcquisitionError::Transcode {
                stage: TranscodeStage::Video,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_silent_transcode_output_loss_is_verification_error() {
        let dir = TempDir::new().unwrap();
        let (acquirer, _) = acquirer(
            &dir,
            ScriptedToolchain {
                skip_output: Some(StreamSelection::VideoOnly),
                ..Default::default()
            },
        );

        let err = acquirer.acquire("abc123", "sources/s1").await.unwrap_err();
        match err {
            AcquisitionError::Verification { missing } => {
                assert_eq!(missing.len(), 1);
                assert!(missing[0].ends_with("abc123.video.mp4"));
            }
            other => panic!("expected Verification, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rerun_overwrites_in_place() {
        let dir = TempDir::new().unwrap();
        let (acquirer, _) = acquirer(&dir, ScriptedToolchain::default());

        let first = acquirer.acquire("abc123", "sources/s1").await.unwrap();
        let second = acquirer.acquire("abc123", "sources/s1").await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_invalid_inputs_are_rejected_before_any_tool_runs() {
        let dir = TempDir::new().unwrap();
        let (acquirer, toolchain) = acquirer(&dir, ScriptedToolchain::default());

        assert!(matches!(
            acquirer.acquire("../evil", "sources/s1").await,
            Err(AcquisitionError::InvalidVideoId(_))
        ));
        assert!(matches!(
            acquirer.acquire("abc123", "../outside").await,
            Err(AcquisitionError::Storage(_))
        ));
        assert!(toolchain.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_video_id_validation() {
        assert!(is_valid_video_id("dQw4w9WgXcQ"));
        assert!(is_valid_video_id("PL-abc_123"));
        assert!(!is_valid_video_id(""));
        assert!(!is_valid_video_id("a/b"));
        assert!(!is_valid_video_id("a b"));
        assert!(!is_valid_video_id(&"x".repeat(65)));
    }
}
