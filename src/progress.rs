//! Progress aggregation
//!
//! Maps raw retriever events onto the normalized [`ProgressSnapshot`] clients see.

use crate::types::{ProgressEvent, ProgressSnapshot, ProgressStatus};

/// Normalize a raw progress event
///
/// Returns `None` for statuses other than `downloading` and `finished`.
pub fn aggregate(event: &ProgressEvent) -> Option<ProgressSnapshot> {
    match event.status {
        ProgressStatus::Downloading => {
            let downloaded = event.downloaded_bytes.unwrap_or(0);
            let total = event
                .total_bytes
                .filter(|t| *t > 0)
                .or(event.total_bytes_estimate)
                .unwrap_or(0);

            Some(ProgressSnapshot {
                percent: percent_of(downloaded, total),
                downloaded,
                total,
                speed: event.speed,
                eta: event.eta,
            })
        }
        ProgressStatus::Finished => Some(ProgressSnapshot {
            percent: 100.0,
            downloaded: event.downloaded_bytes.unwrap_or(0),
            total: event.total_bytes.unwrap_or(0),
            speed: event.speed,
            eta: Some(0),
        }),
        ProgressStatus::Other(_) => None,
    }
}

fn percent_of(downloaded: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let percent = downloaded as f64 / total as f64 * 100.0;
    (percent * 10.0).round() / 10.0
}
