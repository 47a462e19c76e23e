//! Job task context: shared state and the staging directory guard.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::error::ResourceError;
use crate::format_selection::FormatPolicy;
use crate::progress;
use crate::registry::JobRegistry;
use crate::retrieval::{MediaRetriever, ProgressCallback};
use crate::types::{JobId, VideoItem};

/// Shared context for a single job task, reducing parameter passing between helpers.
pub(crate) struct JobTaskContext {
    pub(crate) id: JobId,
    pub(crate) items: Vec<VideoItem>,
    pub(crate) registry: Arc<JobRegistry>,
    pub(crate) retriever: Arc<dyn MediaRetriever>,
    pub(crate) policy: Arc<dyn FormatPolicy>,
    pub(crate) config: Arc<Config>,
}

impl JobTaskContext {
    /// Path of this job's staging directory
    pub(super) fn staging_path(&self) -> PathBuf {
        self.config
            .storage
            .staging_root
            .join(self.id.staging_dir_name())
    }

    /// Path of this job's result directory
    pub(super) fn result_path(&self) -> PathBuf {
        self.config
            .storage
            .result_root
            .join(self.id.result_dir_name())
    }

    /// Callback forwarding retriever events through the aggregator into the registry
    pub(super) fn progress_callback(&self) -> ProgressCallback {
        let registry = Arc::clone(&self.registry);
        let id = self.id;
        Arc::new(move |event| {
            if let Some(snapshot) = progress::aggregate(&event) {
                registry.apply_progress(id, snapshot);
            }
        })
    }

    /// Mark the job as failed with an error message.
    pub(super) fn mark_failed(&self, error: &str) {
        tracing::warn!(job_id = %self.id, error, "Job failed");
        self.registry.mark_failed(self.id, error);
    }
}

/// Owns a job's staging directory and removes it when the task finishes.
///
/// [`remove`](Self::remove) is the normal path. Dropping the guard without calling it
/// (a panic inside the task) still removes the directory synchronously.
pub(crate) struct StagingDir {
    path: PathBuf,
    armed: bool,
}

impl StagingDir {
    /// Create the directory and take ownership of it
    pub(super) async fn create(path: PathBuf) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(&path).await?;
        Ok(Self { path, armed: true })
    }

    pub(super) fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory and everything left in it, logging failures
    pub(super) async fn remove(mut self, id: JobId) {
        self.armed = false;
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => {
                tracing::debug!(job_id = %id, path = %self.path.display(), "Removed staging directory")
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                let err = ResourceError::CleanupFailed {
                    path: self.path.clone(),
                    reason: e.to_string(),
                };
                tracing::warn!(job_id = %id, error = %err, "Failed to remove staging directory");
            }
        }
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if self.armed
            && let Err(e) = std::fs::remove_dir_all(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove staging directory on drop");
        }
    }
}
