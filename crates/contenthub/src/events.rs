//! Job event broadcaster for real-time status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::jobs::{JobStatus, JobType};

/// One status transition made by the job runner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobEvent {
    pub source_id: String,
    pub job_type: JobType,
    /// Status the job moved to.
    pub status: JobStatus,
    /// Human-readable description of the transition.
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Error message (set on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobEvent {
    pub fn new(source_id: &str, job_type: JobType, status: JobStatus) -> Self {
        let message = match status {
            JobStatus::NotStarted => "Not started",
            JobStatus::Pending => "Job queued",
            JobStatus::Processing => "Job started",
            JobStatus::Completed => "Job completed",
            JobStatus::Failed => "Job failed",
        };
        Self {
            source_id: source_id.to_string(),
            job_type,
            status,
            message: message.to_string(),
            timestamp: Utc::now(),
            error: None,
        }
    }

    /// Creates a failure event carrying the error text.
    pub fn failed(source_id: &str, job_type: JobType, error: &str) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(source_id, job_type, JobStatus::Failed)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

/// Broadcasts job events to any number of subscribers.
#[derive(Clone)]
pub struct JobEventBroadcaster {
    sender: Arc<broadcast::Sender<JobEvent>>,
}

impl JobEventBroadcaster {
    /// Creates a broadcaster with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends an event to all subscribers.
    pub fn send(&self, event: JobEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for JobEventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
