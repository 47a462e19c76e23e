//! Result download handler.

use super::parse_job_id;
use crate::api::AppState;
use crate::error::Error;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};

/// GET /download_file/:job_id/:filename - Download a job's result once
///
/// The job and its files are removed as soon as the transfer ends, whether it
/// finished or the client disconnected. Any later request returns 404.
#[utoipa::path(
    get,
    path = "/download_file/{job_id}/{filename}",
    tag = "delivery",
    params(
        ("job_id" = String, Path, description = "Job ID"),
        ("filename" = String, Path, description = "Result file name from the job's download_url")
    ),
    responses(
        (status = 200, description = "Result file as an attachment", content_type = "application/octet-stream"),
        (status = 404, description = "No such result, or already delivered", body = crate::error::ApiError)
    )
)]
pub async fn download_file(
    State(state): State<AppState>,
    Path((job_id, filename)): Path<(String, String)>,
) -> Result<Response, Error> {
    let id = parse_job_id(&job_id).ok_or_else(|| Error::NotFound(filename.clone()))?;
    let delivery = state.downloader.open_delivery(id, &filename).await?;

    let mut response = Response::new(Body::from_stream(delivery.body));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&delivery.file_name)),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(delivery.size));
    if let Ok(disposition) = HeaderValue::from_str(&content_disposition(&delivery.file_name)) {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }

    Ok(response)
}

fn content_type_for(file_name: &str) -> &'static str {
    let extension = std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("zip") => "application/zip",
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        _ => "application/octet-stream",
    }
}

/// `attachment` disposition with an ASCII fallback name and the exact name in `filename*`
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if fallback == file_name {
        format!("attachment; filename=\"{file_name}\"")
    } else {
        format!(
            "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
            urlencoding::encode(file_name)
        )
    }
}
