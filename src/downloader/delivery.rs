//! One-shot result delivery.
//!
//! Opening a delivery claims the job in the registry, so concurrent requests for the
//! same result cannot both stream it. The returned body owns a guard; when the body is
//! dropped (transfer finished, failed, or the client went away) the job is removed from
//! the registry and its result directory is deleted.

use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use axum::body::Bytes;
use futures::{Stream, StreamExt};
use tokio_util::io::ReaderStream;

use crate::error::{Error, ResourceError, Result};
use crate::registry::{DeliveryClaim, JobRegistry};
use crate::types::JobId;

use super::TubeDownloader;

/// Byte stream of a delivered file
pub type DeliveryBody = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// An open result file, ready to be streamed once
pub struct Delivery {
    /// File name presented to the client
    pub file_name: String,
    /// File size in bytes
    pub size: u64,
    /// File contents; dropping it triggers cleanup
    pub body: DeliveryBody,
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("file_name", &self.file_name)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl TubeDownloader {
    /// Open a job's result file for a single transfer
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the name is not a plain file name, the job has no
    /// deliverable, another request is already delivering it, or the file is missing.
    /// None of these mutate the job.
    pub async fn open_delivery(&self, id: JobId, file_name: &str) -> Result<Delivery> {
        let not_found = || Error::NotFound(file_name.to_string());

        if !is_plain_file_name(file_name) {
            return Err(not_found());
        }

        match self.registry.claim_delivery(id) {
            DeliveryClaim::Claimed(_) => {}
            claim => {
                tracing::debug!(job_id = %id, file = file_name, ?claim, "Delivery refused");
                return Err(not_found());
            }
        }

        let result_dir = self
            .config
            .storage
            .result_root
            .join(id.result_dir_name());
        let path = result_dir.join(file_name);

        let Ok(file) = tokio::fs::File::open(&path).await else {
            self.registry.release_delivery(id);
            return Err(not_found());
        };
        let metadata = match file.metadata().await {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => {
                self.registry.release_delivery(id);
                return Err(not_found());
            }
        };

        tracing::info!(job_id = %id, file = file_name, size = metadata.len(), "Delivering result");

        let guard = CleanupGuard {
            id,
            registry: Arc::clone(&self.registry),
            result_dir,
        };
        let body = ReaderStream::new(file).map(move |chunk| {
            let _ = &guard;
            chunk
        });

        Ok(Delivery {
            file_name: file_name.to_string(),
            size: metadata.len(),
            body: Box::pin(body),
        })
    }
}

/// Rejects empty names, `.` and `..`, and anything containing a path separator
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && Path::new(name).file_name().is_some_and(|n| n == name)
}

/// Removes the delivered job when the response body is dropped
struct CleanupGuard {
    id: JobId,
    registry: Arc<JobRegistry>,
    result_dir: PathBuf,
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        self.registry.remove(self.id);

        let id = self.id;
        let dir = std::mem::take(&mut self.result_dir);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    remove_result_dir(id, &dir).await;
                });
            }
            Err(_) => {
                if let Err(e) = std::fs::remove_dir_all(&dir)
                    && e.kind() != std::io::ErrorKind::NotFound
                {
                    tracing::warn!(job_id = %id, error = %e, "Failed to remove result directory");
                }
            }
        }
    }
}

/// Delete a job's result directory, logging failures
pub(crate) async fn remove_result_dir(id: JobId, dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => tracing::debug!(job_id = %id, path = %dir.display(), "Removed result directory"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            let err = ResourceError::CleanupFailed {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            };
            tracing::warn!(job_id = %id, error = %err, "Failed to remove result directory");
        }
    }
}
