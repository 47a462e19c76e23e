//! # tube-dl
//!
//! Batch video download engine with live progress and one-shot delivery.
//!
//! A client submits a newline separated list of video URLs and gets a job id back
//! at once. The job runs in the background: each video is fetched by an external
//! retriever (yt-dlp by default) into a private staging directory, then the
//! results are assembled into a single deliverable. One video is delivered as
//! is; several are bundled into `videos.zip`. Progress can be followed as a
//! stream of snapshots, and the deliverable can be downloaded exactly once,
//! after which every trace of the job is removed.
//!
//! ## Quick Start
//!
//! ```no_run
//! use futures::StreamExt;
//! use tube_dl::{Config, TubeDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = TubeDownloader::new(Config::default()).await?;
//!
//!     let job_id = downloader
//!         .submit("https://youtu.be/dQw4w9WgXcQ\nhttps://www.youtube.com/watch?v=9bZkp7q19f0")
//!         .await?;
//!
//!     let mut progress = Box::pin(downloader.progress_stream(job_id));
//!     while let Some(snapshot) = progress.next().await {
//!         println!("{:?} {:?}", snapshot.state, snapshot.progress);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Format selection policies
pub mod format_selection;
/// Progress event aggregation
pub mod progress;
/// In-memory job registry
pub mod registry;
/// Media retrieval and metadata collaborators
pub mod retrieval;
/// Core types
pub mod types;
/// Video identifier extraction and validation
pub mod video_id;

// Re-export commonly used types
pub use config::Config;
pub use downloader::{Delivery, TubeDownloader};
pub use error::{
    ApiError, AssemblyError, Error, ErrorDetail, ResourceError, Result, RetrievalError,
    ToHttpStatus, ValidationError,
};
pub use format_selection::{BestVideoAudioPolicy, FormatPolicy};
pub use registry::JobRegistry;
pub use retrieval::{MediaRetriever, MetadataLookup};
pub use types::{JobId, JobSnapshot, JobState, ProgressSnapshot, VideoItem};

/// Wait for a termination signal, then shut the downloader down
///
/// SIGTERM and SIGINT are honored on Unix, Ctrl+C elsewhere. Submissions are refused
/// from the moment the signal arrives; jobs already running get the usual shutdown grace
/// period.
///
/// # Example
///
/// ```no_run
/// use tube_dl::{Config, TubeDownloader, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = TubeDownloader::new(Config::default()).await?;
///     run_with_shutdown(downloader).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: TubeDownloader) -> Result<()> {
    let signal = shutdown_signal().await;
    tracing::info!(signal, "Shutting down tube-dl");
    downloader.shutdown().await
}

/// Name of the first termination signal received
#[cfg(unix)]
async fn shutdown_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = terminate => "SIGTERM",
        _ = ctrl_c() => "SIGINT",
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> &'static str {
    ctrl_c().await;
    "Ctrl+C"
}

// A handler that cannot be installed never fires
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Ctrl+C handler unavailable");
        std::future::pending::<()>().await;
    }
}
