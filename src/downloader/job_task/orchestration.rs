//! Job task orchestration: top-level lifecycle for a single job.

use std::path::{Path, PathBuf};

use crate::error::{RetrievalError, Result, ValidationError};
use crate::retrieval::FetchRequest;
use crate::types::ResultLocation;
use crate::video_id::is_valid_video_id;

use super::assembly::{assemble, find_new_artifact};
use super::context::{JobTaskContext, StagingDir};

/// Core job task -- orchestrates the full lifecycle of a single job.
///
/// Phases:
/// 1. Transition to Running and create the staging directory
/// 2. Retrieve every item in order, recording one artifact per item
/// 3. Assemble the artifacts into the result directory
/// 4. Remove the staging directory, then record the outcome
pub(crate) async fn run_job_task(ctx: JobTaskContext) {
    let id = ctx.id;

    // Phase 1: Take ownership of the job
    if !ctx.registry.mark_running(id) {
        tracing::debug!(job_id = %id, "Job no longer pending, skipping");
        return;
    }
    tracing::info!(job_id = %id, items = ctx.items.len(), "Job started");

    let staging = match StagingDir::create(ctx.staging_path()).await {
        Ok(dir) => dir,
        Err(e) => {
            ctx.mark_failed(&format!("Failed to create staging directory: {e}"));
            return;
        }
    };

    // Phases 2-3
    let outcome = retrieve_and_assemble(&ctx, staging.path()).await;

    // Phase 4: the outcome becomes visible only once staging is gone
    staging.remove(id).await;
    match outcome {
        Ok(location) => {
            tracing::info!(job_id = %id, file = %location.file_name, "Job completed");
            ctx.registry.mark_completed(id, location);
        }
        Err(e) => ctx.mark_failed(&e.to_string()),
    }
}

async fn retrieve_and_assemble(ctx: &JobTaskContext, staging_dir: &Path) -> Result<ResultLocation> {
    let artifacts = retrieve_items(ctx, staging_dir).await?;
    assemble(ctx.id, &artifacts, staging_dir, &ctx.result_path()).await
}

/// Retrieve each item in order; the first invalid identifier or failed fetch aborts the job.
async fn retrieve_items(ctx: &JobTaskContext, staging_dir: &Path) -> Result<Vec<PathBuf>> {
    let container = ctx.policy.output_container().to_string();
    let mut artifacts: Vec<PathBuf> = Vec::with_capacity(ctx.items.len());

    for (index, item) in ctx.items.iter().enumerate() {
        if !is_valid_video_id(&item.id) {
            return Err(ValidationError::InvalidVideoId(item.id.clone()).into());
        }

        let request =
            FetchRequest::new(ctx.config.retrieval.source_url(&item.id), staging_dir);
        tracing::debug!(
            job_id = %ctx.id,
            video_id = %item.id,
            index,
            retriever = ctx.retriever.name(),
            "Retrieving item"
        );

        let fetch = ctx
            .retriever
            .fetch(&request, ctx.policy.as_ref(), ctx.progress_callback());
        match ctx.config.jobs.fetch_timeout {
            Some(limit) => tokio::time::timeout(limit, fetch)
                .await
                .map_err(|_| RetrievalError::Timeout(limit.as_secs()))??,
            None => fetch.await?,
        }

        match find_new_artifact(staging_dir, &container, &artifacts).await? {
            Some(path) => {
                tracing::debug!(job_id = %ctx.id, video_id = %item.id, path = %path.display(), "Recorded artifact");
                artifacts.push(path);
            }
            None => {
                tracing::warn!(job_id = %ctx.id, video_id = %item.id, "Retriever produced no artifact");
            }
        }
    }

    Ok(artifacts)
}
