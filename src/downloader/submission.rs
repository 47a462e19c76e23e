//! Job submission: identifier extraction, metadata resolution and task spawning.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use futures::FutureExt;
use futures::future::join_all;

use crate::error::{Error, Result, ValidationError};
use crate::types::{JobId, VideoItem};
use crate::video_id::{extract_video_id, submission_lines};

use super::TubeDownloader;
use super::job_task::{JobTaskContext, run_job_task};

impl TubeDownloader {
    /// Submit a newline separated list of video URLs as one job
    ///
    /// Every line is trimmed and blank lines are skipped. Lines that yield no identifier
    /// are dropped. Identifiers are not validated here; a malformed one fails the job
    /// when its turn comes.
    ///
    /// # Errors
    ///
    /// [`ValidationError::NoValidUrls`] when no line yields an identifier,
    /// [`Error::ShuttingDown`] once shutdown has started.
    pub async fn submit(&self, video_urls: &str) -> Result<JobId> {
        self.ensure_accepting()?;

        let candidates: Vec<(String, String)> = submission_lines(video_urls)
            .filter_map(|line| extract_video_id(line).map(|id| (line.to_string(), id)))
            .collect();

        if candidates.is_empty() {
            return Err(ValidationError::NoValidUrls.into());
        }

        let items = join_all(
            candidates
                .into_iter()
                .map(|(url, id)| self.resolve_item(url, id)),
        )
        .await;

        self.submit_items(items)
    }

    /// Register a job for already resolved items and spawn its task
    pub fn submit_items(&self, items: Vec<VideoItem>) -> Result<JobId> {
        self.ensure_accepting()?;

        let id = JobId::new();
        self.registry.create(id, items.clone())?;
        tracing::info!(job_id = %id, items = items.len(), "Job submitted");

        self.spawn_job(id, items);
        Ok(id)
    }

    /// Look up title and uploader, falling back to the identifier and an empty uploader
    async fn resolve_item(&self, url: String, id: String) -> VideoItem {
        let metadata = &self.collaborators.metadata;
        match metadata.lookup(&url).await {
            Ok(Some(found)) => VideoItem {
                title: found.title.unwrap_or_else(|| id.clone()),
                uploader: found.uploader.unwrap_or_default(),
                id,
            },
            Ok(None) => {
                tracing::debug!(video_id = %id, "No metadata available");
                VideoItem::untitled(id)
            }
            Err(e) => {
                tracing::debug!(video_id = %id, error = %e, "Metadata lookup failed");
                VideoItem::untitled(id)
            }
        }
    }

    /// Spawn the job task; it waits as Pending until a concurrency permit is available
    fn spawn_job(&self, id: JobId, items: Vec<VideoItem>) {
        let concurrent_limit = Arc::clone(&self.runtime.concurrent_limit);
        let registry = Arc::clone(&self.registry);
        let ctx = JobTaskContext {
            id,
            items,
            registry: Arc::clone(&self.registry),
            retriever: Arc::clone(&self.collaborators.retriever),
            policy: Arc::clone(&self.collaborators.policy),
            config: Arc::clone(&self.config),
        };

        self.runtime.tracker.spawn(async move {
            let _permit = match concurrent_limit.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    registry.mark_failed(id, "job scheduler closed");
                    return;
                }
            };
            if AssertUnwindSafe(run_job_task(ctx)).catch_unwind().await.is_err() {
                tracing::error!(job_id = %id, "Job task panicked");
                registry.mark_failed(id, "internal error");
            }
        });
    }

    fn ensure_accepting(&self) -> Result<()> {
        if self.runtime.accepting_new.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::ShuttingDown)
        }
    }
}
