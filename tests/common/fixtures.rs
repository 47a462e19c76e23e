//! Fake collaborators and configuration for integration tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tube_dl::retrieval::{FetchRequest, ProgressCallback, VideoMetadata};
use tube_dl::types::{ProgressEvent, ProgressStatus};
use tube_dl::{
    Config, FormatPolicy, MediaRetriever, MetadataLookup, RetrievalError, TubeDownloader,
};

/// A well-formed video identifier
pub const VIDEO_A: &str = "dQw4w9WgXcQ";
/// Another well-formed video identifier
pub const VIDEO_B: &str = "9bZkp7q19f0";

/// Retriever writing `<id>.<container>` with the id as content
///
/// Identifiers listed in `failures` fail with the given message instead.
#[derive(Default)]
pub struct FakeRetriever {
    failures: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl FakeRetriever {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on(video_id: &str, message: &str) -> Arc<Self> {
        Arc::new(Self {
            failures: HashMap::from([(video_id.to_string(), message.to_string())]),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaRetriever for FakeRetriever {
    async fn fetch(
        &self,
        request: &FetchRequest,
        policy: &dyn FormatPolicy,
        on_progress: ProgressCallback,
    ) -> tube_dl::Result<()> {
        self.calls.lock().unwrap().push(request.source_url.clone());
        let video_id = request
            .source_url
            .rsplit('=')
            .next()
            .unwrap_or_default()
            .to_string();

        if let Some(message) = self.failures.get(&video_id) {
            return Err(RetrievalError::ToolFailed {
                message: message.clone(),
                exit_code: Some(1),
            }
            .into());
        }

        let size = video_id.len() as u64;
        on_progress(ProgressEvent {
            status: ProgressStatus::Downloading,
            downloaded_bytes: Some(size / 2),
            total_bytes: None,
            total_bytes_estimate: Some(size),
            speed: Some(100.0),
            eta: Some(1),
        });
        let path = request
            .staging_dir
            .join(format!("{video_id}.{}", policy.output_container()));
        tokio::fs::write(&path, video_id.as_bytes()).await?;
        on_progress(ProgressEvent {
            status: ProgressStatus::Finished,
            downloaded_bytes: Some(size),
            total_bytes: Some(size),
            total_bytes_estimate: None,
            speed: None,
            eta: None,
        });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Metadata lookup answering every URL with a fixed title
pub struct FixedMetadata {
    pub title: Option<String>,
}

impl FixedMetadata {
    pub fn none() -> Arc<Self> {
        Arc::new(Self { title: None })
    }

    pub fn titled(title: &str) -> Arc<Self> {
        Arc::new(Self {
            title: Some(title.to_string()),
        })
    }
}

#[async_trait]
impl MetadataLookup for FixedMetadata {
    async fn lookup(&self, _url: &str) -> tube_dl::Result<Option<VideoMetadata>> {
        Ok(self.title.as_ref().map(|title| VideoMetadata {
            title: Some(title.clone()),
            uploader: Some("Test Channel".to_string()),
        }))
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Configuration with every directory inside `root` and fast polling
pub fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.storage.staging_root = root.join("staging");
    config.storage.result_root = root.join("results");
    config.jobs.poll_interval = Duration::from_millis(20);
    config
}

/// Build a downloader around the given collaborators in a fresh temp dir
pub async fn create_downloader(
    retriever: Arc<dyn MediaRetriever>,
    metadata: Arc<dyn MetadataLookup>,
) -> (TubeDownloader, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = test_config(temp_dir.path());
    let downloader = TubeDownloader::with_collaborators(config, retriever, metadata)
        .await
        .unwrap();
    (downloader, temp_dir)
}

/// Result directory of a job under the test root
pub fn result_dir(temp_dir: &TempDir, job_id: tube_dl::JobId) -> PathBuf {
    temp_dir.path().join("results").join(job_id.result_dir_name())
}

/// Staging directory of a job under the test root
pub fn staging_dir(temp_dir: &TempDir, job_id: tube_dl::JobId) -> PathBuf {
    temp_dir.path().join("staging").join(job_id.staging_dir_name())
}

/// Shell script standing in for yt-dlp
///
/// `-J` prints a format list with one mp4 video-only and one m4a audio-only entry.
/// A download writes `Video <id>.mp4` for the `-o` template after printing two
/// progress lines. URLs containing `unavailable` fail the way yt-dlp does.
#[cfg(unix)]
pub const FAKE_YTDLP: &str = r#"#!/bin/sh
for arg in "$@"; do
  if [ "$arg" = "-J" ]; then
    cat <<'JSON'
{"id":"x","formats":[
 {"format_id":"18","ext":"mp4","vcodec":"avc1","acodec":"mp4a","protocol":"https"},
 {"format_id":"140","ext":"m4a","vcodec":"none","acodec":"mp4a.40.2","protocol":"https"},
 {"format_id":"137","ext":"mp4","vcodec":"avc1.640028","acodec":"none","protocol":"https"}
]}
JSON
    exit 0
  fi
done

out=""
prev=""
url=""
for arg in "$@"; do
  if [ "$prev" = "-o" ]; then out="$arg"; fi
  prev="$arg"
  url="$arg"
done

case "$url" in
  *unavailable*)
    echo "WARNING: [youtube] retrying" >&2
    echo "ERROR: [youtube] unavailable: Video unavailable" >&2
    exit 1
    ;;
esac

id="${url##*=}"
file=$(printf '%s' "$out" | sed "s/%(title)s/Video $id/; s/%(ext)s/mp4/")
echo "[youtube] $id: Downloading webpage"
echo "tubedl-progress downloading 512 1024 NA 2048.0 1"
echo "tubedl-progress finished 1024 1024 NA NA NA"
printf 'merged %s' "$id" > "$file"
"#;

/// Write [`FAKE_YTDLP`] into `dir` and make it executable
#[cfg(unix)]
pub fn install_fake_ytdlp(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("yt-dlp");
    std::fs::write(&path, FAKE_YTDLP).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
