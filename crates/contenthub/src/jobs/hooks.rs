//! Pluggable work for the jobs that run after import.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::JobType;
use crate::source::Source;

#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct HookFailure {
    pub message: String,
}

impl HookFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Work performed for one job type once its prerequisite is complete.
///
/// Hooks receive the source as read at the start of the run. They must not
/// write the source's status fields; the runner does that from the result.
#[async_trait]
pub trait JobHook: Send + Sync {
    async fn run(&self, source: &Source) -> Result<(), HookFailure>;
}

/// Hook used for job types nothing was registered for.
#[derive(Debug, Default, Clone, Copy)]
pub struct CompleteImmediately;

#[async_trait]
impl JobHook for CompleteImmediately {
    async fn run(&self, _source: &Source) -> Result<(), HookFailure> {
        Ok(())
    }
}

/// Hooks by job type. `ImportSource` is handled by media acquisition and
/// never consults this registry.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: HashMap<JobType, Arc<dyn JobHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, job: JobType, hook: Arc<dyn JobHook>) -> &mut Self {
        self.hooks.insert(job, hook);
        self
    }

    pub fn with(mut self, job: JobType, hook: Arc<dyn JobHook>) -> Self {
        self.register(job, hook);
        self
    }

    pub fn get(&self, job: JobType) -> Arc<dyn JobHook> {
        self.hooks
            .get(&job)
            .cloned()
            .unwrap_or_else(|| Arc::new(CompleteImmediately))
    }

    pub fn is_registered(&self, job: JobType) -> bool {
        self.hooks.contains_key(&job)
    }
}
