//! External tools used by the acquisition pipeline.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command as TokioCommand;
use tracing::debug;

use super::error::ToolFailure;

/// Lines of stderr kept for diagnostics.
const DIAGNOSTIC_TAIL_LINES: usize = 40;

/// Stream selection for a transcode step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSelection {
    /// Re-encode audio to AAC and drop the video track.
    AudioOnly,
    /// Copy the video stream and drop the audio track.
    VideoOnly,
}

impl StreamSelection {
    /// Codec/stream flags passed to the transcoder.
    pub fn transcoder_args(&self) -> &'static [&'static str] {
        match self {
            StreamSelection::AudioOnly => &["-acodec", "aac", "-vn"],
            StreamSelection::VideoOnly => &["-vcodec", "copy", "-an"],
        }
    }
}

/// Download and transcode backend.
#[async_trait]
pub trait MediaToolchain: Send + Sync {
    /// Downloads the best combined audio+video stream at `url` into
    /// `destination`.
    async fn download(&self, url: &str, destination: &Path) -> Result<(), ToolFailure>;

    /// Writes `output` from `input` keeping only the selected streams.
    /// Overwrites an existing `output`.
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        selection: StreamSelection,
    ) -> Result<(), ToolFailure>;
}

/// Toolchain that shells out to `yt-dlp` and `ffmpeg`.
#[derive(Debug, Clone)]
pub struct ProcessToolchain {
    downloader: PathBuf,
    transcoder: PathBuf,
}

impl ProcessToolchain {
    pub fn new(downloader: impl Into<PathBuf>, transcoder: impl Into<PathBuf>) -> Self {
        Self {
            downloader: downloader.into(),
            transcoder: transcoder.into(),
        }
    }

    pub fn downloader(&self) -> &Path {
        &self.downloader
    }

    pub fn transcoder(&self) -> &Path {
        &self.transcoder
    }

    pub fn download_args(url: &str, destination: &Path) -> Vec<String> {
        vec![
            "--format".to_string(),
            "bestvideo+bestaudio/best".to_string(),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
            "--no-playlist".to_string(),
            "--newline".to_string(),
            "--no-warnings".to_string(),
            "--output".to_string(),
            destination.to_string_lossy().into_owned(),
            url.to_string(),
        ]
    }

    pub fn transcode_args(input: &Path, output: &Path, selection: StreamSelection) -> Vec<String> {
        let mut args = vec![
            "-nostdin".to_string(),
            "-hide_banner".to_string(),
            "-y".to_string(),
            "-i".to_string(),
            input.to_string_lossy().into_owned(),
        ];
        args.extend(selection.transcoder_args().iter().map(|a| a.to_string()));
        args.push(output.to_string_lossy().into_owned());
        args
    }

    /// Runs `program`, logging stdout at debug level and keeping the stderr
    /// tail for the failure message. The child is killed if the future is
    /// dropped.
    async fn run(&self, program: &Path, args: &[String]) -> Result<(), ToolFailure> {
        let tool = program.display().to_string();
        let mut cmd = TokioCommand::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| ToolFailure::new(format!("failed to start {}: {}", tool, e)))?;

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        let stdout_task = async {
            if let Some(stdout) = stdout_pipe {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(tool = %tool, "{}", line);
                }
            }
        };

        let stderr_task = async {
            let mut tail = VecDeque::with_capacity(DIAGNOSTIC_TAIL_LINES);
            if let Some(stderr) = stderr_pipe {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    push_tail(&mut tail, line);
                }
            }
            tail
        };

        let ((), stderr_tail) = tokio::join!(stdout_task, stderr_task);

        let status = child
            .wait()
            .await
            .map_err(|e| ToolFailure::new(format!("failed to wait for {}: {}", tool, e)))?;

        if status.success() {
            Ok(())
        } else {
            let code = status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            let diagnostics = Vec::from(stderr_tail).join("\n");
            Err(ToolFailure::new(format!(
                "{} exited with {}: {}",
                tool,
                code,
                diagnostics.trim()
            )))
        }
    }
}

/// Keeps the last `DIAGNOSTIC_TAIL_LINES` lines.
fn push_tail(tail: &mut VecDeque<String>, line: String) {
    if tail.len() == DIAGNOSTIC_TAIL_LINES {
        tail.pop_front();
    }
    tail.push_back(line);
}

impl Default for ProcessToolchain {
    fn default() -> Self {
        Self::new("yt-dlp", "ffmpeg")
    }
}

#[async_trait]
impl MediaToolchain for ProcessToolchain {
    async fn download(&self, url: &str, destination: &Path) -> Result<(), ToolFailure> {
        let args = Self::download_args(url, destination);
        self.run(&self.downloader, &args).await
    }

    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        selection: StreamSelection,
    ) -> Result<(), ToolFailure> {
        let args = Self::transcode_args(input, output, selection);
        self.run(&self.transcoder, &args).await
    }
}
