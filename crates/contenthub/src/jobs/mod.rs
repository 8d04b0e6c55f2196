//! Job state machine: per-source status fields, the dependency table
//! between job types, and the runner that moves statuses.

pub mod error;
pub mod hooks;
pub mod locks;
pub mod runner;
pub mod types;

pub use error::{ErrorKind, JobError};
pub use hooks::{CompleteImmediately, HookFailure, HookRegistry, JobHook};
pub use locks::{JobGuard, JobLocks};
pub use runner::{JobOutcome, JobRunner};
pub use types::{JobStatus, JobType};
