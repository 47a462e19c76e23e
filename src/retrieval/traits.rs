//! Traits and types for the retrieval collaborators

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::format_selection::FormatPolicy;
use crate::types::ProgressEvent;

/// Output file name template, expanded by the retriever relative to the staging directory
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Callback receiving raw progress events during a fetch
///
/// Invoked synchronously from the retriever's reader task, in event order.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// One item to retrieve
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Normalized source URL
    pub source_url: String,
    /// Directory the artifact must be written into
    pub staging_dir: PathBuf,
    /// File name template inside `staging_dir`
    pub output_template: String,
}

impl FetchRequest {
    /// Request writing into `staging_dir` with the default output template
    pub fn new(source_url: impl Into<String>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_url: source_url.into(),
            staging_dir: staging_dir.into(),
            output_template: OUTPUT_TEMPLATE.to_string(),
        }
    }

    /// Full output path template handed to the retriever
    pub fn output_path(&self) -> PathBuf {
        self.staging_dir.join(&self.output_template)
    }
}

/// Trait for retrieving media
///
/// This trait defines the interface the job orchestrator needs from a downloader.
/// Implementations perform the network fetch, apply the format policy to the
/// encodings they discover, write the merged artifact under the request's staging
/// directory, and report byte-level progress through the callback.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use tube_dl::config::{NetworkConfig, RetrievalConfig};
/// use tube_dl::format_selection::BestVideoAudioPolicy;
/// use tube_dl::retrieval::{FetchRequest, MediaRetriever, YtDlpRetriever};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let retriever =
///     YtDlpRetriever::from_config(&RetrievalConfig::default(), &NetworkConfig::default());
/// let request = FetchRequest::new("https://www.youtube.com/watch?v=dQw4w9WgXcQ", "/tmp/staging");
///
/// retriever
///     .fetch(&request, &BestVideoAudioPolicy::default(), Arc::new(|event| println!("{event:?}")))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait MediaRetriever: Send + Sync {
    /// Retrieve one item into the request's staging directory
    ///
    /// # Errors
    ///
    /// Returns a [`RetrievalError`](crate::error::RetrievalError) when the tool is
    /// missing, no format satisfies the policy, or the fetch itself fails.
    async fn fetch(
        &self,
        request: &FetchRequest,
        policy: &dyn FormatPolicy,
        on_progress: ProgressCallback,
    ) -> crate::Result<()>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Title and uploader of a video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Video title
    pub title: Option<String>,
    /// Channel or uploader name
    pub uploader: Option<String>,
}

/// Trait for looking up video metadata without downloading
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    /// Look up metadata for a source URL
    ///
    /// Returns `Ok(None)` when the service has no record of the video.
    async fn lookup(&self, url: &str) -> crate::Result<Option<VideoMetadata>>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
