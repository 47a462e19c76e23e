//! Job submission and snapshot handlers.

use super::parse_job_id;
use crate::api::AppState;
use crate::error::{Error, ValidationError};
use crate::types::{JobSnapshot, SubmitResponse};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::Value;

/// POST /api/download - Submit a batch of video URLs
///
/// The body is read as loose JSON so that a missing or non-string `videoUrls`
/// is reported as `missing_video_urls` instead of a generic rejection.
#[utoipa::path(
    post,
    path = "/api/download",
    tag = "jobs",
    request_body = crate::types::SubmitRequest,
    responses(
        (status = 201, description = "Job created", body = SubmitResponse),
        (status = 400, description = "Missing videoUrls or no recognizable video URL", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn submit_download(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<SubmitResponse>), Error> {
    let video_urls = body
        .get("videoUrls")
        .and_then(Value::as_str)
        .ok_or(ValidationError::MissingField("videoUrls"))?;

    let job_id = state.downloader.submit(video_urls).await?;

    Ok((StatusCode::CREATED, Json(SubmitResponse { job_id })))
}

/// GET /api/jobs/:job_id - Current snapshot of a job
#[utoipa::path(
    get,
    path = "/api/jobs/{job_id}",
    tag = "jobs",
    params(
        ("job_id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job snapshot", body = JobSnapshot),
        (status = 404, description = "Job not found", body = crate::error::ApiError)
    )
)]
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobSnapshot>, Error> {
    let id = parse_job_id(&job_id).ok_or_else(|| Error::NotFound(job_id.clone()))?;
    state
        .downloader
        .job(id)
        .map(Json)
        .ok_or(Error::JobNotFound(id))
}
