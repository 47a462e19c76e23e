//! Shared test helpers: scripted collaborators and TubeDownloader construction.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::tempdir;
use tokio::sync::Notify;

use crate::config::Config;
use crate::downloader::TubeDownloader;
use crate::error::RetrievalError;
use crate::format_selection::FormatPolicy;
use crate::retrieval::{FetchRequest, MediaRetriever, MetadataLookup, ProgressCallback, VideoMetadata};
use crate::types::{JobId, JobSnapshot, ProgressEvent, ProgressStatus};

/// What the scripted retriever does for one identifier
#[derive(Clone)]
pub(crate) enum Step {
    /// Emit progress and write `<file_name>` into the staging directory
    Produce { file_name: String, content: Vec<u8> },
    /// Fail with a tool error carrying this message
    Fail(String),
    /// Succeed without writing anything
    Nothing,
    /// Wait for the notification, then write `<file_name>`
    Gated { gate: Arc<Notify>, file_name: String },
    /// Never return
    Hang,
}

/// Retriever that follows a per-identifier script
///
/// Identifiers without a script produce `<id>.mp4`.
#[derive(Default)]
pub(crate) struct ScriptedRetriever {
    steps: Mutex<HashMap<String, Step>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRetriever {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn script(&self, video_id: &str, step: Step) {
        self.steps.lock().unwrap().insert(video_id.to_string(), step);
    }

    /// Source URLs fetched so far, in call order
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

fn video_id_of(source_url: &str) -> String {
    source_url.rsplit('=').next().unwrap_or(source_url).to_string()
}

fn emit_progress(on_progress: &ProgressCallback, size: u64) {
    on_progress(ProgressEvent {
        status: ProgressStatus::Downloading,
        downloaded_bytes: Some(size / 2),
        total_bytes: Some(size),
        total_bytes_estimate: None,
        speed: Some(1000.0),
        eta: Some(1),
    });
    on_progress(ProgressEvent {
        status: ProgressStatus::Finished,
        downloaded_bytes: Some(size),
        total_bytes: Some(size),
        total_bytes_estimate: None,
        speed: None,
        eta: None,
    });
}

#[async_trait]
impl MediaRetriever for ScriptedRetriever {
    async fn fetch(
        &self,
        request: &FetchRequest,
        policy: &dyn FormatPolicy,
        on_progress: ProgressCallback,
    ) -> crate::Result<()> {
        self.calls.lock().unwrap().push(request.source_url.clone());
        let video_id = video_id_of(&request.source_url);
        let step = self
            .steps
            .lock()
            .unwrap()
            .get(&video_id)
            .cloned()
            .unwrap_or_else(|| Step::Produce {
                file_name: format!("{video_id}.{}", policy.output_container()),
                content: video_id.clone().into_bytes(),
            });

        match step {
            Step::Produce { file_name, content } => {
                emit_progress(&on_progress, content.len() as u64);
                tokio::fs::write(request.staging_dir.join(file_name), content).await?;
                Ok(())
            }
            Step::Fail(message) => Err(RetrievalError::ToolFailed {
                message,
                exit_code: Some(1),
            }
            .into()),
            Step::Nothing => Ok(()),
            Step::Gated { gate, file_name } => {
                gate.notified().await;
                emit_progress(&on_progress, 4);
                tokio::fs::write(request.staging_dir.join(file_name), b"gate").await?;
                Ok(())
            }
            Step::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Metadata lookup answering from a fixed table; unknown URLs yield `None`
#[derive(Default)]
pub(crate) struct StaticMetadata {
    entries: HashMap<String, VideoMetadata>,
    fail: bool,
}

impl StaticMetadata {
    pub(crate) fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Default::default()
        })
    }

    pub(crate) fn with(entries: &[(&str, &str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            entries: entries
                .iter()
                .map(|(url, title, uploader)| {
                    (
                        url.to_string(),
                        VideoMetadata {
                            title: Some(title.to_string()),
                            uploader: Some(uploader.to_string()),
                        },
                    )
                })
                .collect(),
            fail: false,
        })
    }
}

#[async_trait]
impl MetadataLookup for StaticMetadata {
    async fn lookup(&self, url: &str) -> crate::Result<Option<VideoMetadata>> {
        if self.fail {
            return Err(RetrievalError::Metadata {
                url: url.to_string(),
                reason: "lookup unavailable".into(),
            }
            .into());
        }
        Ok(self.entries.get(url).cloned())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Test configuration rooted in `root`, with fast polling
pub(crate) fn test_config(root: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.storage.staging_root = root.join("staging");
    config.storage.result_root = root.join("results");
    config.jobs.poll_interval = Duration::from_millis(20);
    config.jobs.max_concurrent_jobs = 2;
    config
}

/// Helper to create a test TubeDownloader with scripted collaborators.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) async fn create_test_downloader(
    retriever: Arc<ScriptedRetriever>,
    metadata: Arc<StaticMetadata>,
) -> (TubeDownloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path());
    let downloader = TubeDownloader::with_collaborators(config, retriever, metadata)
        .await
        .unwrap();
    (downloader, temp_dir)
}

/// Poll until the job is terminal (or gone), panicking after five seconds
pub(crate) async fn wait_for_terminal(downloader: &TubeDownloader, id: JobId) -> JobSnapshot {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let snapshot = downloader.job(id).expect("job disappeared");
        if snapshot.is_final() {
            return snapshot;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {id} did not finish: {snapshot:?}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Poll until `condition` holds, panicking after five seconds
pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "condition not met in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
