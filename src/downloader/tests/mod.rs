use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::Notify;

use super::test_helpers::*;
use super::*;
use crate::error::ValidationError;
use crate::types::{ARCHIVE_FILE_NAME, JobState, VideoItem};


const FIRST: &str = "aaaaaaaaaaa";
const SECOND: &str = "bbbbbbbbbbb";

fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

/// Drain a delivery body into memory
async fn read_body(delivery: Delivery) -> Vec<u8> {
    let mut body = delivery.body;
    let mut bytes = Vec::new();
    while let Some(chunk) = body.next().await {
        bytes.extend_from_slice(&chunk.unwrap());
    }
    bytes
}

/// Submit and wait for the job to finish
async fn run_to_terminal(downloader: &TubeDownloader, urls: &str) -> (JobId, JobSnapshot) {
    let id = downloader.submit(urls).await.unwrap();
    let snapshot = wait_for_terminal(downloader, id).await;
    (id, snapshot)
}
