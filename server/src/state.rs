//! Shared application state handed to every handler.

use std::sync::Arc;
use std::time::Duration;

use contenthub::{
    Config, ContentHubError, Database, JobRunner, MediaAcquirer, MediaStorage, MediaToolchain,
    ProcessToolchain, SourceRepository, SqliteSourceRepository,
};

pub struct AppState {
    pub repo: Arc<dyn SourceRepository>,
    pub runner: JobRunner,
    pub storage: MediaStorage,
    /// Limit for synchronous (`?wait=true`) job runs.
    pub job_timeout: Duration,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn SourceRepository>,
        storage: MediaStorage,
        toolchain: Arc<dyn MediaToolchain>,
        job_timeout: Duration,
    ) -> Self {
        let acquirer = Arc::new(MediaAcquirer::new(storage.clone(), toolchain));
        let runner = JobRunner::new(Arc::clone(&repo), acquirer).with_submit_timeout(job_timeout);
        Self {
            repo,
            runner,
            storage,
            job_timeout,
        }
    }

    /// Production wiring: SQLite file database and the subprocess toolchain.
    pub fn from_config(config: &Config) -> Result<Self, ContentHubError> {
        let db = Database::open(&config.database_path())?;
        let repo: Arc<dyn SourceRepository> = Arc::new(SqliteSourceRepository::new(db));
        let toolchain = Arc::new(ProcessToolchain::new(
            &config.tools.downloader,
            &config.tools.transcoder,
        ));
        Ok(Self::new(
            repo,
            MediaStorage::new(&config.data_home),
            toolchain,
            config.jobs.timeout(),
        ))
    }
}
