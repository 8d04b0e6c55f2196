pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod jobs;
pub mod media;
pub mod repository;
pub mod resolver;
pub mod sanitize;
pub mod source;
pub mod storage;

pub use config::{load_config, Config};
pub use db::{Database, DatabaseError};
pub use error::{ConfigError, ContentHubError, Result, StorageError};
pub use events::{JobEvent, JobEventBroadcaster};
pub use jobs::{ErrorKind, JobError, JobOutcome, JobRunner, JobStatus, JobType};
pub use media::{AcquisitionError, MediaAcquirer, MediaArtifacts, MediaToolchain, ProcessToolchain};
pub use repository::{RepositoryError, SourceRepository, SqliteSourceRepository};
pub use resolver::resolve_video_id;
pub use source::{NewSource, Source, SourceType, SourceUpdate};
pub use storage::{ArtifactRef, MediaStorage};
