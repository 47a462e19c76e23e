//! Live progress over server-sent events.

use super::parse_job_id;
use crate::api::AppState;
use axum::{
    extract::{Path, State},
    response::sse::{Event as SseEvent, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};

/// GET /api/progress/:job_id - Server-sent events stream of job snapshots
///
/// Each `data:` frame is one JSON snapshot. The stream ends after the snapshot that
/// reports completion or an error. An unknown job yields a stream with no frames.
#[utoipa::path(
    get,
    path = "/api/progress/{job_id}",
    tag = "progress",
    params(
        ("job_id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Server-sent events stream of job snapshots (text/event-stream)", content_type = "text/event-stream")
    )
)]
pub async fn progress_events(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Sse<impl Stream<Item = Result<SseEvent, axum::Error>>> {
    let snapshots = match parse_job_id(&job_id) {
        Some(id) => state.downloader.progress_stream(id).left_stream(),
        None => {
            tracing::debug!(job_id = %job_id, "Progress requested for malformed job id");
            futures::stream::empty().right_stream()
        }
    };

    let events = snapshots.map(|snapshot| SseEvent::default().json_data(snapshot));

    Sse::new(events).keep_alive(KeepAlive::default())
}
