//! Source repository: the document-store seam the job runner and the HTTP
//! layer are written against.

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use crate::db::{source_repo, Database, DatabaseError};
use crate::jobs::{JobStatus, JobType};
use crate::source::{NewSource, Source, SourceUpdate};

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Source not found: {0}")]
    NotFound(String),

    #[error("Stored source '{source_id}' cannot be decoded: {column} = '{value}'")]
    Corrupt {
        source_id: String,
        column: &'static str,
        value: String,
    },

    #[error(transparent)]
    Database(DatabaseError),

    #[error("Blocking database task failed: {0}")]
    Blocking(String),
}

impl From<DatabaseError> for RepositoryError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::InvalidRow {
                source_id,
                column,
                value,
            } => RepositoryError::Corrupt {
                source_id,
                column,
                value,
            },
            other => RepositoryError::Database(other),
        }
    }
}

/// Key-document CRUD over sources, plus single-field status writes.
#[async_trait]
pub trait SourceRepository: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Source>, RepositoryError>;

    /// Creates a source with a fresh id, server timestamp and every job
    /// `NotStarted`.
    async fn create(&self, new: NewSource) -> Result<Source, RepositoryError>;

    /// Merges the supplied fields; `NotFound` if the id is absent.
    async fn update(&self, id: &str, changes: SourceUpdate) -> Result<Source, RepositoryError>;

    async fn delete(&self, id: &str) -> Result<(), RepositoryError>;

    async fn list(&self) -> Result<Vec<Source>, RepositoryError>;

    async fn set_status(
        &self,
        id: &str,
        job: JobType,
        status: JobStatus,
    ) -> Result<(), RepositoryError>;

    /// Conditional single-field write. `Ok(false)` means the stored value was
    /// no longer `expected`.
    async fn compare_and_set_status(
        &self,
        id: &str,
        job: JobType,
        expected: JobStatus,
        next: JobStatus,
    ) -> Result<bool, RepositoryError>;
}

/// `SourceRepository` backed by the SQLite `sources` table.
#[derive(Clone)]
pub struct SqliteSourceRepository {
    db: Database,
}

impl SqliteSourceRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Runs a blocking database call on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&Database) -> Result<T, DatabaseError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| RepositoryError::Blocking(e.to_string()))?
            .map_err(RepositoryError::from)
    }
}

#[async_trait]
impl SourceRepository for SqliteSourceRepository {
    async fn get(&self, id: &str) -> Result<Option<Source>, RepositoryError> {
        let id = id.to_string();
        self.blocking(move |db| source_repo::find_by_id(db, &id)).await
    }

    async fn create(&self, new: NewSource) -> Result<Source, RepositoryError> {
        let source = Source {
            source_id: uuid::Uuid::new_v4().to_string(),
            title: new.title,
            url: new.url,
            source_type: new.source_type,
            created: Utc::now(),
            video: None,
            import_status: JobStatus::NotStarted,
            transcript_status: JobStatus::NotStarted,
            text_insights_status: JobStatus::NotStarted,
            image_insights_status: JobStatus::NotStarted,
        };
        let row = source.clone();
        self.blocking(move |db| source_repo::insert(db, &row)).await?;
        Ok(source)
    }

    async fn update(&self, id: &str, changes: SourceUpdate) -> Result<Source, RepositoryError> {
        let key = id.to_string();
        let found = self
            .blocking(move |db| {
                if !source_repo::update_fields(db, &key, &changes)? {
                    return Ok(None);
                }
                source_repo::find_by_id(db, &key)
            })
            .await?;
        found.ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let key = id.to_string();
        if self
            .blocking(move |db| source_repo::delete(db, &key))
            .await?
        {
            Ok(())
        } else {
            Err(RepositoryError::NotFound(id.to_string()))
        }
    }

    async fn list(&self) -> Result<Vec<Source>, RepositoryError> {
        self.blocking(|db| source_repo::list(db)).await
    }

    async fn set_status(
        &self,
        id: &str,
        job: JobType,
        status: JobStatus,
    ) -> Result<(), RepositoryError> {
        let key = id.to_string();
        if self
            .blocking(move |db| source_repo::set_status(db, &key, job, status))
            .await?
        {
            Ok(())
        } else {
            Err(RepositoryError::NotFound(id.to_string()))
        }
    }

    async fn compare_and_set_status(
        &self,
        id: &str,
        job: JobType,
        expected: JobStatus,
        next: JobStatus,
    ) -> Result<bool, RepositoryError> {
        let key = id.to_string();
        self.blocking(move |db| source_repo::compare_and_set_status(db, &key, job, expected, next))
            .await
    }
}
