//! Video identifier validation and extraction
//!
//! Extraction and validation are separate: [`extract_video_id`] pulls
//! whatever the URL carries in the identifier position, and [`is_valid_video_id`] is
//! applied later by the job orchestrator before each item is retrieved.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

#[allow(clippy::expect_used)]
static VIDEO_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("literal pattern compiles"));

/// Whether `video_id` is exactly 11 characters from `[A-Za-z0-9_-]`
pub fn is_valid_video_id(video_id: &str) -> bool {
    VIDEO_ID_PATTERN.is_match(video_id)
}

/// Extract the identifier from a video URL
///
/// Recognized forms:
/// - `https://youtu.be/<id>`
/// - `https://www.youtube.com/watch?v=<id>` (any `youtube.com` host)
/// - `https://www.youtube.com/shorts/<id>`
///
/// Returns `None` when the line is not a URL or carries no identifier. The returned
/// identifier is not validated.
pub fn extract_video_id(line: &str) -> Option<String> {
    let url = Url::parse(line.trim()).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();

    if host == "youtu.be" || host.ends_with(".youtu.be") {
        let id = url.path().trim_start_matches('/');
        return (!id.is_empty()).then(|| id.to_string());
    }

    if host == "youtube.com" || host.ends_with(".youtube.com") {
        if let Some((_, v)) = url.query_pairs().find(|(k, _)| k == "v")
            && !v.is_empty()
        {
            return Some(v.into_owned());
        }

        let mut segments = url.path_segments()?;
        if segments.next() == Some("shorts")
            && let Some(id) = segments.next()
            && !id.is_empty()
        {
            return Some(id.to_string());
        }
    }

    None
}

/// Split a newline separated submission into trimmed, non-empty lines
pub fn submission_lines(video_urls: &str) -> impl Iterator<Item = &str> {
    video_urls
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
}
