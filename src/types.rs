//! Core types for tube-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// File name of the archive produced for multi-item jobs
pub const ARCHIVE_FILE_NAME: &str = "videos.zip";

/// Unique identifier for a job
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Create a new random JobId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Name of the job's working directory under the staging root
    pub fn staging_dir_name(&self) -> String {
        format!("staging_{}", self.0)
    }

    /// Name of the job's deliverable directory under the result root
    pub fn result_dir_name(&self) -> String {
        format!("job_{}", self.0)
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for JobId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Job lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Registered, waiting for a retrieval slot
    Pending,
    /// Items are being retrieved or assembled
    Running,
    /// Deliverable is ready
    Completed,
    /// Failed with error
    Failed,
}

impl JobState {
    /// Whether no further transitions can happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// One requested video, captured at submission
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VideoItem {
    /// Extracted identifier (not yet validated)
    pub id: String,
    /// Title from the metadata lookup, or the identifier when unavailable
    pub title: String,
    /// Uploader from the metadata lookup, or empty when unavailable
    pub uploader: String,
}

impl VideoItem {
    /// Item with placeholder metadata
    pub fn untitled(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            title: id.clone(),
            id,
            uploader: String::new(),
        }
    }
}

/// Normalized progress of the item currently being retrieved
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProgressSnapshot {
    /// Percentage complete, one decimal place
    pub percent: f64,
    /// Bytes downloaded so far
    pub downloaded: u64,
    /// Total bytes (0 when unknown)
    pub total: u64,
    /// Bytes per second as reported by the retriever
    pub speed: Option<f64>,
    /// Estimated seconds remaining
    pub eta: Option<u64>,
}

/// Status reported with a raw progress event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressStatus {
    /// Bytes are flowing
    Downloading,
    /// The current file finished
    Finished,
    /// Anything else the retriever reports (e.g., "error")
    Other(String),
}

impl From<&str> for ProgressStatus {
    fn from(s: &str) -> Self {
        match s {
            "downloading" => ProgressStatus::Downloading,
            "finished" => ProgressStatus::Finished,
            other => ProgressStatus::Other(other.to_string()),
        }
    }
}

/// Raw progress event emitted by a retriever
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressEvent {
    /// Event status
    pub status: ProgressStatus,
    /// Bytes downloaded so far
    pub downloaded_bytes: Option<u64>,
    /// Exact size, when the server reports it
    pub total_bytes: Option<u64>,
    /// Estimated size, when only an estimate is known
    pub total_bytes_estimate: Option<u64>,
    /// Bytes per second
    pub speed: Option<f64>,
    /// Estimated seconds remaining
    pub eta: Option<u64>,
}

/// Where a finished job's deliverable can be fetched
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResultLocation {
    /// File name inside the job's result directory
    pub file_name: String,
    /// Relative URL of the delivery endpoint
    pub url: String,
}

impl ResultLocation {
    /// Location for a file delivered by the given job
    pub fn new(job_id: JobId, file_name: impl Into<String>) -> Self {
        let file_name = file_name.into();
        Self {
            url: format!("/download_file/{job_id}/{file_name}"),
            file_name,
        }
    }
}

/// A batch job as stored in the registry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier
    pub id: JobId,
    /// Current lifecycle state
    pub state: JobState,
    /// Requested videos, in submission order
    pub items: Vec<VideoItem>,
    /// Latest progress of the current item
    pub progress: Option<ProgressSnapshot>,
    /// Deliverable location, set once on success
    pub result: Option<ResultLocation>,
    /// Failure message, set once on failure
    pub error: Option<String>,
    /// When the job was submitted
    pub created_at: DateTime<Utc>,
    /// When the job reached a terminal state
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// A fresh pending job
    pub fn new(id: JobId, items: Vec<VideoItem>) -> Self {
        Self {
            id,
            state: JobState::Pending,
            items,
            progress: None,
            result: None,
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// A job is terminal once it carries a result or an error
    pub fn is_terminal(&self) -> bool {
        self.result.is_some() || self.error.is_some()
    }
}

/// Client-facing view of a job, sent on the progress stream and the job endpoint
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct JobSnapshot {
    /// Job identifier
    #[schema(value_type = String)]
    pub job_id: JobId,
    /// Lifecycle state
    pub state: JobState,
    /// Latest progress of the current item
    pub progress: Option<ProgressSnapshot>,
    /// Whether the deliverable is ready
    pub completed: bool,
    /// Relative URL of the deliverable, once completed
    pub download_url: Option<String>,
    /// Failure message, once failed
    pub error: Option<String>,
    /// Requested videos with their metadata
    pub videos: Vec<VideoItem>,
}

impl JobSnapshot {
    /// Whether this is the last frame a stream should emit
    pub fn is_final(&self) -> bool {
        self.completed || self.error.is_some()
    }
}

impl From<&Job> for JobSnapshot {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id,
            state: job.state,
            progress: job.progress.clone(),
            completed: job.result.is_some(),
            download_url: job.result.as_ref().map(|r| r.url.clone()),
            error: job.error.clone(),
            videos: job.items.clone(),
        }
    }
}

/// Submission request body
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitRequest {
    /// Newline separated video URLs
    #[serde(rename = "videoUrls")]
    pub video_urls: String,
}

/// Submission response body
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitResponse {
    /// Identifier of the created job
    #[schema(value_type = String)]
    pub job_id: JobId,
}
