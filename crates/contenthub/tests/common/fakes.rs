#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use contenthub::jobs::{HookFailure, JobHook};
use contenthub::media::{MediaToolchain, StreamSelection, ToolFailure};
use contenthub::Source;

/// Writes small placeholder files where the real tools would write media.
/// Failure and latency can be switched at any time from the test.
#[derive(Default)]
pub struct FakeToolchain {
    fail_download: AtomicBool,
    fail_audio: AtomicBool,
    download_delay_ms: AtomicU64,
    downloads: AtomicUsize,
    transcodes: AtomicUsize,
    last_url: Mutex<Option<String>>,
}

impl FakeToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_download(&self, fail: bool) {
        self.fail_download.store(fail, Ordering::SeqCst);
    }

    pub fn fail_audio(&self, fail: bool) {
        self.fail_audio.store(fail, Ordering::SeqCst);
    }

    pub fn set_download_delay(&self, delay: Duration) {
        self.download_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    pub fn transcodes(&self) -> usize {
        self.transcodes.load(Ordering::SeqCst)
    }

    pub fn last_url(&self) -> Option<String> {
        self.last_url.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaToolchain for FakeToolchain {
    async fn download(&self, url: &str, destination: &Path) -> Result<(), ToolFailure> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        *self.last_url.lock().unwrap() = Some(url.to_string());

        let delay = self.download_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_download.load(Ordering::SeqCst) {
            return Err(ToolFailure::new("ERROR: [youtube] abc123: Video unavailable"));
        }
        std::fs::write(destination, b"combined").map_err(|e| ToolFailure::new(e.to_string()))
    }

    async fn transcode(
        &self,
        _input: &Path,
        output: &Path,
        selection: StreamSelection,
    ) -> Result<(), ToolFailure> {
        self.transcodes.fetch_add(1, Ordering::SeqCst);
        if selection == StreamSelection::AudioOnly && self.fail_audio.load(Ordering::SeqCst) {
            return Err(ToolFailure::new("ffmpeg exited with 1: Invalid data found"));
        }
        std::fs::write(output, b"derived").map_err(|e| ToolFailure::new(e.to_string()))
    }
}

/// Logs `start:{source_id}` and `end:{source_id}` around a short sleep.
pub struct RecordingHook {
    pub log: Mutex<Vec<String>>,
    pub delay: Duration,
    pub fail: AtomicBool,
}

impl RecordingHook {
    pub fn new(delay: Duration) -> Self {
        Self {
            log: Mutex::new(Vec::new()),
            delay,
            fail: AtomicBool::new(false),
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobHook for RecordingHook {
    async fn run(&self, source: &Source) -> Result<(), HookFailure> {
        self.log
            .lock()
            .unwrap()
            .push(format!("start:{}", source.source_id));
        tokio::time::sleep(self.delay).await;
        self.log
            .lock()
            .unwrap()
            .push(format!("end:{}", source.source_id));
        if self.fail.load(Ordering::SeqCst) {
            return Err(HookFailure::new("transcription service returned 503"));
        }
        Ok(())
    }
}
