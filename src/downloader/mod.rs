//! Core downloader implementation split into focused submodules.
//!
//! The `TubeDownloader` struct and its methods are organized by domain:
//! - [`submission`] - URL parsing, metadata resolution, job creation and spawning
//! - [`job_task`] - Per-job retrieval and result assembly
//! - [`progress_stream`] - Live job snapshots for streaming clients
//! - [`delivery`] - One-shot result transfer with cleanup
//! - [`reaper`] - Removal of finished jobs nobody collected
//! - [`lifecycle`] - Shutdown coordination

mod delivery;
mod job_task;
mod lifecycle;
mod progress_stream;
mod reaper;
mod submission;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use delivery::{Delivery, DeliveryBody};

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::format_selection::{BestVideoAudioPolicy, FormatPolicy};
use crate::registry::JobRegistry;
use crate::retrieval::{MediaRetriever, MetadataLookup, OEmbedMetadata, YtDlpRetriever};
use crate::types::{JobId, JobSnapshot};

/// Job scheduling state
#[derive(Clone)]
pub(crate) struct JobRuntime {
    /// Semaphore to limit concurrently running jobs (respects max_concurrent_jobs config)
    pub(crate) concurrent_limit: Arc<Semaphore>,
    /// Tracks every spawned job task and the reaper, so shutdown can wait for them
    pub(crate) tracker: TaskTracker,
    /// Cancelled on shutdown to stop background services
    pub(crate) shutdown_token: CancellationToken,
    /// Flag to indicate whether new jobs are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
}

/// External collaborators used by job tasks
#[derive(Clone)]
pub(crate) struct Collaborators {
    /// Media retriever (trait object for pluggable implementations)
    pub(crate) retriever: Arc<dyn MediaRetriever>,
    /// Metadata lookup used at submission time
    pub(crate) metadata: Arc<dyn MetadataLookup>,
    /// Format selection policy handed to the retriever
    pub(crate) policy: Arc<dyn FormatPolicy>,
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct TubeDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Job registry shared with every job task, stream and delivery
    pub(crate) registry: Arc<JobRegistry>,
    /// External collaborators
    pub(crate) collaborators: Collaborators,
    /// Job scheduling state
    pub(crate) runtime: JobRuntime,
}

impl TubeDownloader {
    /// Create a new TubeDownloader with the production collaborators
    ///
    /// The yt-dlp binary is taken from the configuration or searched on PATH. Its absence
    /// is reported per job, not here.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tube_dl::{Config, TubeDownloader};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let downloader = TubeDownloader::new(Config::default()).await?;
    ///
    ///     let job_id = downloader.submit("https://youtu.be/dQw4w9WgXcQ").await?;
    ///     println!("submitted {job_id}");
    ///
    ///     downloader.shutdown().await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let retriever = YtDlpRetriever::from_config(&config.retrieval, &config.network);
        match retriever.binary_path() {
            Some(path) => tracing::info!(path = %path.display(), "Using yt-dlp binary"),
            None => tracing::warn!("yt-dlp not found on PATH, jobs will fail until it is installed"),
        }
        let metadata = OEmbedMetadata::from_config(&config.retrieval, &config.network)?;

        Self::with_collaborators(config, Arc::new(retriever), Arc::new(metadata)).await
    }

    /// Create a new TubeDownloader with custom collaborators
    ///
    /// This initializes all core components:
    /// - Creates the staging and result roots
    /// - Sets up the job registry and the concurrency limiter
    /// - Starts the reaper for uncollected jobs
    pub async fn with_collaborators(
        config: Config,
        retriever: Arc<dyn MediaRetriever>,
        metadata: Arc<dyn MetadataLookup>,
    ) -> Result<Self> {
        config.validate()?;

        // Ensure storage roots exist
        for (label, dir) in [
            ("staging", &config.storage.staging_root),
            ("result", &config.storage.result_root),
        ] {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create {} directory '{}': {}",
                        label,
                        dir.display(),
                        e
                    ),
                ))
            })?;
        }

        let policy: Arc<dyn FormatPolicy> =
            Arc::new(BestVideoAudioPolicy::new(config.retrieval.merge_format.clone()));

        tracing::info!(
            retriever = retriever.name(),
            metadata = metadata.name(),
            max_concurrent_jobs = config.jobs.max_concurrent_jobs,
            "Collaborators initialized"
        );

        let runtime = JobRuntime {
            concurrent_limit: Arc::new(Semaphore::new(config.jobs.max_concurrent_jobs)),
            tracker: TaskTracker::new(),
            shutdown_token: CancellationToken::new(),
            accepting_new: Arc::new(AtomicBool::new(true)),
        };

        let downloader = Self {
            config: Arc::new(config),
            registry: Arc::new(JobRegistry::new()),
            collaborators: Collaborators {
                retriever,
                metadata,
                policy,
            },
            runtime,
        };

        downloader.start_reaper();

        Ok(downloader)
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Get a job's current snapshot
    pub fn job(&self, id: JobId) -> Option<JobSnapshot> {
        self.registry.get(id).map(|job| JobSnapshot::from(&job))
    }

    /// The shared job registry
    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }
}
