//! Source records: trackable external content items and their job statuses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::jobs::{JobStatus, JobType};

/// Kind of content a source points at.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Video,
    Audio,
    Article,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Video => "video",
            SourceType::Audio => "audio",
            SourceType::Article => "article",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "video" => Some(SourceType::Video),
            "audio" => Some(SourceType::Audio),
            "article" => Some(SourceType::Article),
            _ => None,
        }
    }
}

/// A source as stored in the repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    pub source_id: String,
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    pub source_type: SourceType,
    pub created: DateTime<Utc>,
    /// Storage key of the combined media file, set by a completed import.
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default)]
    pub import_status: JobStatus,
    #[serde(default)]
    pub transcript_status: JobStatus,
    #[serde(default)]
    pub text_insights_status: JobStatus,
    #[serde(default)]
    pub image_insights_status: JobStatus,
}

impl Source {
    /// Returns the status field owned by `job`.
    pub fn status(&self, job: JobType) -> JobStatus {
        match job {
            JobType::ImportSource => self.import_status,
            JobType::Transcript => self.transcript_status,
            JobType::TextInsights => self.text_insights_status,
            JobType::ImageInsights => self.image_insights_status,
        }
    }

    pub fn set_status(&mut self, job: JobType, status: JobStatus) {
        match job {
            JobType::ImportSource => self.import_status = status,
            JobType::Transcript => self.transcript_status = status,
            JobType::TextInsights => self.text_insights_status = status,
            JobType::ImageInsights => self.image_insights_status = status,
        }
    }

    /// Storage subfolder holding this source's media.
    pub fn media_folder(&self) -> String {
        media_folder(&self.source_id)
    }
}

/// Storage subfolder for a source id: `sources/{source_id}`.
pub fn media_folder(source_id: &str) -> String {
    format!("sources/{}", source_id)
}

/// Fields supplied when creating a source. Identity, timestamp and
/// statuses are assigned by the repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSource {
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    pub source_type: SourceType,
}

/// Partial update: only `Some` fields change. For the nullable `url` and
/// `video`, `Some(None)` (an explicit JSON `null`) clears the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub url: Option<Option<String>>,
    #[serde(default)]
    pub source_type: Option<SourceType>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub video: Option<Option<String>>,
}

/// Maps a present field to `Some`, so `null` becomes `Some(None)`. Absent
/// fields fall back to `None` through `#[serde(default)]`.
fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl SourceUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.url.is_none()
            && self.source_type.is_none()
            && self.video.is_none()
    }

    /// Applies the supplied fields to `source`.
    pub fn apply(&self, source: &mut Source) {
        if let Some(title) = &self.title {
            source.title = title.clone();
        }
        if let Some(url) = &self.url {
            source.url = url.clone();
        }
        if let Some(source_type) = self.source_type {
            source.source_type = source_type;
        }
        if let Some(video) = &self.video {
            source.video = video.clone();
        }
    }
}
