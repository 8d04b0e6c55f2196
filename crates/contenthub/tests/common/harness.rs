//! Test harness for isolated job execution.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use contenthub::jobs::HookRegistry;
use contenthub::{
    Database, JobRunner, MediaAcquirer, MediaStorage, NewSource, Source, SourceRepository,
    SourceType, SqliteSourceRepository,
};

use super::FakeToolchain;

/// Temp data root, in-memory repository and a fake toolchain.
pub struct TestHarness {
    temp_dir: TempDir,
    /// Media root, `{temp}/data`.
    pub data_home: PathBuf,
    pub repo: Arc<dyn SourceRepository>,
    pub toolchain: Arc<FakeToolchain>,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let data_home = temp_dir.path().join("data");
        let db = Database::open_in_memory().expect("Failed to open database");

        Self {
            temp_dir,
            data_home,
            repo: Arc::new(SqliteSourceRepository::new(db)),
            toolchain: Arc::new(FakeToolchain::new()),
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn storage(&self) -> MediaStorage {
        MediaStorage::new(&self.data_home)
    }

    pub fn acquirer(&self) -> Arc<MediaAcquirer> {
        Arc::new(MediaAcquirer::new(
            self.storage(),
            Arc::clone(&self.toolchain) as Arc<dyn contenthub::MediaToolchain>,
        ))
    }

    /// Runner with default hooks. Each call builds its own lock registry,
    /// so clone one runner when serialization matters.
    pub fn runner(&self) -> JobRunner {
        JobRunner::new(Arc::clone(&self.repo), self.acquirer())
    }

    pub fn runner_with_hooks(&self, hooks: HookRegistry) -> JobRunner {
        self.runner().with_hooks(hooks)
    }

    pub async fn create_source(&self, url: Option<&str>) -> Source {
        self.repo
            .create(NewSource {
                title: "Evening news".to_string(),
                url: url.map(str::to_string),
                source_type: SourceType::Video,
            })
            .await
            .expect("Failed to create source")
    }

    /// Fresh read from the repository.
    pub async fn reload(&self, id: &str) -> Source {
        self.repo
            .get(id)
            .await
            .expect("Failed to read source")
            .expect("Source disappeared")
    }

    /// Absolute path of a storage key.
    pub fn media_path(&self, key: &str) -> PathBuf {
        self.data_home.join(key)
    }
}
