//! Waiting helpers for integration tests

use futures::StreamExt;
use std::time::Duration;
use tube_dl::{Delivery, JobId, JobSnapshot, TubeDownloader};

/// Follow the job's progress stream to its end, panicking after `timeout`
pub async fn follow_to_end(
    downloader: &TubeDownloader,
    id: JobId,
    timeout: Duration,
) -> Vec<JobSnapshot> {
    tokio::time::timeout(timeout, downloader.progress_stream(id).collect())
        .await
        .expect("progress stream did not end in time")
}

/// Follow the job's progress stream and return its final snapshot
pub async fn final_snapshot(downloader: &TubeDownloader, id: JobId) -> JobSnapshot {
    follow_to_end(downloader, id, Duration::from_secs(10))
        .await
        .pop()
        .expect("stream yielded no snapshot")
}

/// Drain a delivery into memory
pub async fn read_delivery(delivery: Delivery) -> Vec<u8> {
    let mut body = delivery.body;
    let mut bytes = Vec::new();
    while let Some(chunk) = body.next().await {
        bytes.extend_from_slice(&chunk.expect("delivery chunk"));
    }
    bytes
}

/// Poll until `condition` holds, panicking after five seconds
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
