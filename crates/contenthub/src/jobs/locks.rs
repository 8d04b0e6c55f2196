//! In-process lock registry keyed by `(source_id, job_type)`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::JobType;

type Key = (String, JobType);

/// Hands out one async mutex per key. Entries nobody holds or waits on are
/// pruned whenever a new key is inserted.
#[derive(Default)]
pub struct JobLocks {
    entries: Mutex<HashMap<Key, Arc<AsyncMutex<()>>>>,
}

/// Held for the whole duration of a job invocation.
pub type JobGuard = OwnedMutexGuard<()>;

impl JobLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, source_id: &str, job: JobType) -> Arc<AsyncMutex<()>> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let key = (source_id.to_string(), job);
        if let Some(lock) = entries.get(&key) {
            return Arc::clone(lock);
        }
        // Only the map holds a reference: nobody is running or queued.
        entries.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(entries.entry(key).or_default())
    }

    /// Waits until no other invocation of `job` on `source_id` is running.
    pub async fn acquire(&self, source_id: &str, job: JobType) -> JobGuard {
        self.entry(source_id, job).lock_owned().await
    }

    /// Returns `None` if another invocation currently holds the lock.
    pub fn try_acquire(&self, source_id: &str, job: JobType) -> Option<JobGuard> {
        self.entry(source_id, job).try_lock_owned().ok()
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .map(|entries| entries.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
