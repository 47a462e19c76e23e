//! End-to-end job lifecycle through the public API
//!
//! Submission, progress streaming, one-shot delivery and cleanup, driven with a fake
//! retriever so no network or yt-dlp installation is needed.

mod common;

use common::*;
use std::io::Read;
use std::time::Duration;
use tube_dl::{Error, JobState, ToHttpStatus, ValidationError};

#[tokio::test]
async fn single_video_is_delivered_once() {
    let (downloader, temp_dir) = create_downloader(FakeRetriever::new(), FixedMetadata::none()).await;

    let id = downloader
        .submit(&format!("https://www.youtube.com/watch?v={VIDEO_A}"))
        .await
        .unwrap();
    let snapshot = final_snapshot(&downloader, id).await;

    assert_eq!(snapshot.state, JobState::Completed);
    let expected_url = format!("/download_file/{id}/{VIDEO_A}.mp4");
    assert_eq!(snapshot.download_url.as_deref(), Some(expected_url.as_str()));
    assert!(!staging_dir(&temp_dir, id).exists());

    let delivery = downloader
        .open_delivery(id, &format!("{VIDEO_A}.mp4"))
        .await
        .unwrap();
    assert_eq!(read_delivery(delivery).await, VIDEO_A.as_bytes());

    eventually(|| !result_dir(&temp_dir, id).exists()).await;
    assert!(downloader.job(id).is_none());

    let again = downloader
        .open_delivery(id, &format!("{VIDEO_A}.mp4"))
        .await
        .unwrap_err();
    assert_eq!(again.status_code(), 404);
}

#[tokio::test]
async fn two_videos_are_bundled_into_archive() {
    let (downloader, _temp_dir) =
        create_downloader(FakeRetriever::new(), FixedMetadata::none()).await;

    let id = downloader
        .submit(&format!(
            "https://youtu.be/{VIDEO_A}\n\nhttps://m.youtube.com/watch?v={VIDEO_B}&t=42"
        ))
        .await
        .unwrap();
    let snapshot = final_snapshot(&downloader, id).await;
    assert_eq!(snapshot.state, JobState::Completed);
    assert!(snapshot.download_url.unwrap().ends_with("/videos.zip"));

    let delivery = downloader.open_delivery(id, "videos.zip").await.unwrap();
    let bytes = read_delivery(delivery).await;
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();

    assert_eq!(archive.len(), 2);
    for video_id in [VIDEO_A, VIDEO_B] {
        let mut content = String::new();
        archive
            .by_name(&format!("{video_id}.mp4"))
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, video_id);
    }
}

#[tokio::test]
async fn malformed_identifier_fails_whole_job() {
    let (downloader, temp_dir) = create_downloader(FakeRetriever::new(), FixedMetadata::none()).await;

    let id = downloader
        .submit(&format!(
            "https://youtu.be/{VIDEO_A}\nhttps://www.youtube.com/watch?v=tooshort"
        ))
        .await
        .unwrap();
    let snapshot = final_snapshot(&downloader, id).await;

    assert_eq!(snapshot.state, JobState::Failed);
    assert_eq!(snapshot.error.as_deref(), Some("Invalid video ID: tooshort"));
    assert!(snapshot.download_url.is_none());
    assert!(!snapshot.completed);
    assert!(!staging_dir(&temp_dir, id).exists());
    assert!(!result_dir(&temp_dir, id).exists());
}

#[tokio::test]
async fn submission_without_any_video_url_is_rejected() {
    let retriever = FakeRetriever::new();
    let (downloader, _temp_dir) = create_downloader(retriever.clone(), FixedMetadata::none()).await;

    let err = downloader
        .submit("https://example.com/watch?v=dQw4w9WgXcQ\nhello")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation(ValidationError::NoValidUrls)));
    assert_eq!(err.status_code(), 400);
    assert_eq!(err.to_string(), "No valid YouTube URLs found.");
    assert!(downloader.registry().is_empty());
    assert!(retriever.calls().is_empty());
}

#[tokio::test]
async fn retriever_failure_is_reported_verbatim() {
    let retriever = FakeRetriever::failing_on(VIDEO_B, "ERROR: [youtube] 9bZkp7q19f0: Private video");
    let (downloader, _temp_dir) = create_downloader(retriever.clone(), FixedMetadata::none()).await;

    let id = downloader
        .submit(&format!("https://youtu.be/{VIDEO_A}\nhttps://youtu.be/{VIDEO_B}"))
        .await
        .unwrap();
    let snapshot = final_snapshot(&downloader, id).await;

    assert_eq!(
        snapshot.error.as_deref(),
        Some("ERROR: [youtube] 9bZkp7q19f0: Private video")
    );
    assert_eq!(retriever.calls().len(), 2);
}

#[tokio::test]
async fn metadata_is_attached_to_every_video() {
    let (downloader, _temp_dir) =
        create_downloader(FakeRetriever::new(), FixedMetadata::titled("Some Title")).await;

    let id = downloader
        .submit(&format!("https://youtu.be/{VIDEO_A}\nhttps://youtu.be/{VIDEO_B}"))
        .await
        .unwrap();

    let snapshot = downloader.job(id).unwrap();
    assert_eq!(snapshot.videos.len(), 2);
    for video in &snapshot.videos {
        assert_eq!(video.title, "Some Title");
        assert_eq!(video.uploader, "Test Channel");
    }
}

#[tokio::test]
async fn progress_stream_reports_each_state_once_terminal() {
    let (downloader, _temp_dir) =
        create_downloader(FakeRetriever::new(), FixedMetadata::none()).await;

    let id = downloader
        .submit(&format!("https://youtu.be/{VIDEO_A}"))
        .await
        .unwrap();
    let frames = follow_to_end(&downloader, id, Duration::from_secs(10)).await;

    let (last, earlier) = frames.split_last().unwrap();
    assert!(last.completed);
    assert!(earlier.iter().all(|frame| !frame.completed && frame.error.is_none()));
    assert!(frames.iter().all(|frame| frame.job_id == id));

    let progress = last.progress.as_ref().unwrap();
    assert_eq!(progress.percent, 100.0);
    assert_eq!(progress.eta, Some(0));
}

#[tokio::test]
async fn shutdown_stops_new_submissions() {
    let (downloader, _temp_dir) =
        create_downloader(FakeRetriever::new(), FixedMetadata::none()).await;
    let id = downloader
        .submit(&format!("https://youtu.be/{VIDEO_A}"))
        .await
        .unwrap();

    downloader.shutdown().await.unwrap();

    // Jobs already submitted run to completion
    assert_eq!(final_snapshot(&downloader, id).await.state, JobState::Completed);
    let err = downloader
        .submit(&format!("https://youtu.be/{VIDEO_B}"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ShuttingDown));
    assert_eq!(err.status_code(), 503);
}
