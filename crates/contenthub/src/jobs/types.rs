//! Job types, job statuses and the dependency table between them.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a single job on a single source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    NotStarted,
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::NotStarted => "not_started",
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_started" => Some(JobStatus::NotStarted),
            "pending" => Some(JobStatus::Pending),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// Terminal states. Both may be re-entered by invoking the job again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        match (self, next) {
            (NotStarted | Completed | Failed, Pending) => true,
            (NotStarted | Pending | Completed | Failed, Processing) => true,
            (Processing, Completed | Failed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stage of processing applied to a source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    ImportSource,
    Transcript,
    TextInsights,
    ImageInsights,
}

/// Dependency table: each job type and the job that must be completed first.
const DEPENDENCIES: &[(JobType, Option<JobType>)] = &[
    (JobType::ImportSource, None),
    (JobType::Transcript, Some(JobType::ImportSource)),
    (JobType::TextInsights, Some(JobType::ImportSource)),
    (JobType::ImageInsights, Some(JobType::ImportSource)),
];

impl JobType {
    pub const ALL: [JobType; 4] = [
        JobType::ImportSource,
        JobType::Transcript,
        JobType::TextInsights,
        JobType::ImageInsights,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::ImportSource => "import_source",
            JobType::Transcript => "transcript",
            JobType::TextInsights => "text_insights",
            JobType::ImageInsights => "image_insights",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|job| job.as_str() == s)
    }

    /// The job that must be `Completed` before this one may start processing.
    pub fn prerequisite(&self) -> Option<JobType> {
        DEPENDENCIES
            .iter()
            .find(|(job, _)| job == self)
            .and_then(|(_, prerequisite)| *prerequisite)
    }

    /// Column holding this job's status on the `sources` table.
    pub fn status_column(&self) -> &'static str {
        match self {
            JobType::ImportSource => "import_status",
            JobType::Transcript => "transcript_status",
            JobType::TextInsights => "text_insights_status",
            JobType::ImageInsights => "image_insights_status",
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
