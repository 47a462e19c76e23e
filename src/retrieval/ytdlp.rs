//! yt-dlp based media retriever
//!
//! Each fetch is two invocations of the binary:
//! 1. `yt-dlp -J <url>` lists the available formats, which the [`FormatPolicy`] reduces
//!    to one video+audio pair.
//! 2. `yt-dlp -f <video>+<audio> ...` downloads and merges that pair. A custom progress
//!    template makes yt-dlp print one machine-readable line per progress tick on stdout.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, trace, warn};

use super::network;
use super::traits::{FetchRequest, MediaRetriever, ProgressCallback};
use crate::config::{NetworkConfig, RetrievalConfig};
use crate::error::{Error, RetrievalError};
use crate::format_selection::{Format, FormatPolicy, FormatSelection};
use crate::types::{ProgressEvent, ProgressStatus};

const TOOL: &str = "yt-dlp";

/// Marker in front of every progress line printed by the progress template
const PROGRESS_PREFIX: &str = "tubedl-progress";

/// Progress template: status, downloaded, total, estimated total, speed, eta
const PROGRESS_TEMPLATE: &str = "download:tubedl-progress %(progress.status)s \
    %(progress.downloaded_bytes)s %(progress.total_bytes)s \
    %(progress.total_bytes_estimate)s %(progress.speed)s %(progress.eta)s";

/// Retriever driving the external `yt-dlp` binary
///
/// # Examples
///
/// ```no_run
/// use std::path::PathBuf;
/// use tube_dl::config::NetworkConfig;
/// use tube_dl::retrieval::YtDlpRetriever;
///
/// // Explicit binary
/// let retriever = YtDlpRetriever::new(PathBuf::from("/usr/local/bin/yt-dlp"), &NetworkConfig::default());
///
/// // Or discover it on PATH
/// let retriever = YtDlpRetriever::from_path(&NetworkConfig::default());
/// ```
#[derive(Debug, Clone)]
pub struct YtDlpRetriever {
    binary_path: Option<PathBuf>,
    network_args: Vec<String>,
}

impl YtDlpRetriever {
    /// Create a retriever with an explicit binary path
    pub fn new(binary_path: PathBuf, network: &NetworkConfig) -> Self {
        Self {
            binary_path: Some(binary_path),
            network_args: network::ytdlp_args(network),
        }
    }

    /// Search PATH for `yt-dlp`
    ///
    /// A missing binary is not an error here. Fetches fail with
    /// [`RetrievalError::ToolNotFound`] instead, so the service can start without it.
    pub fn from_path(network: &NetworkConfig) -> Self {
        Self {
            binary_path: which::which(TOOL).ok(),
            network_args: network::ytdlp_args(network),
        }
    }

    /// Use the configured binary path, falling back to a PATH search
    pub fn from_config(retrieval: &RetrievalConfig, network: &NetworkConfig) -> Self {
        if !network.dns_overrides.is_empty() {
            warn!(
                hosts = network.dns_overrides.len(),
                "dns_overrides do not apply to yt-dlp; media downloads use the system resolver"
            );
        }
        match &retrieval.ytdlp_path {
            Some(path) => Self::new(path.clone(), network),
            None => Self::from_path(network),
        }
    }

    /// Resolved binary path, if any
    pub fn binary_path(&self) -> Option<&Path> {
        self.binary_path.as_deref()
    }

    fn binary(&self) -> Result<&Path, RetrievalError> {
        self.binary_path
            .as_deref()
            .ok_or(RetrievalError::ToolNotFound { tool: TOOL })
    }

    async fn probe_formats(&self, binary: &Path, url: &str) -> crate::Result<Vec<Format>> {
        let output = Command::new(binary)
            .args(["-J", "--no-playlist", "--no-warnings"])
            .args(&self.network_args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(spawn_error)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(url, stderr = %stderr, "yt-dlp format probe failed");
            return Err(tool_failed(stderr.lines(), output.status).into());
        }

        let probe: ProbeOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| RetrievalError::ProbeFailed(e.to_string()))?;
        Ok(probe.formats)
    }

    fn download_args(
        &self,
        request: &FetchRequest,
        selection: &FormatSelection,
    ) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            selection.format_id.clone(),
            "--merge-output-format".to_string(),
            selection.merge_output_format.clone(),
            "-o".to_string(),
            request.output_path().to_string_lossy().into_owned(),
            "--no-playlist".to_string(),
            "--newline".to_string(),
            "--progress-template".to_string(),
            PROGRESS_TEMPLATE.to_string(),
        ];
        args.extend(self.network_args.iter().cloned());
        args.push(request.source_url.clone());
        args
    }
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    formats: Vec<Format>,
}

#[async_trait]
impl MediaRetriever for YtDlpRetriever {
    async fn fetch(
        &self,
        request: &FetchRequest,
        policy: &dyn FormatPolicy,
        on_progress: ProgressCallback,
    ) -> crate::Result<()> {
        let binary = self.binary()?;

        let formats = self.probe_formats(binary, &request.source_url).await?;
        let selection = policy.select(&formats)?;
        debug!(
            url = %request.source_url,
            format_id = %selection.format_id,
            protocol = %selection.protocol,
            "selected formats"
        );

        let mut child = Command::new(binary)
            .args(self.download_args(request, &selection))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_error)?;

        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                let mut captured = Vec::new();
                while let Ok(Some(line)) = lines.next_line().await {
                    trace!(line = %line, "yt-dlp stderr");
                    captured.push(line);
                }
                captured
            })
        });

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                match parse_progress_line(&line) {
                    Some(event) => on_progress(event),
                    None => trace!(line = %line, "yt-dlp stdout"),
                }
            }
        }

        let status = child.wait().await?;
        let stderr_lines = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => Vec::new(),
        };

        if !status.success() {
            return Err(tool_failed(stderr_lines.iter().map(String::as_str), status).into());
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

fn spawn_error(e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        RetrievalError::ToolNotFound { tool: TOOL }.into()
    } else {
        RetrievalError::ToolFailed {
            message: format!("failed to execute yt-dlp: {e}"),
            exit_code: None,
        }
        .into()
    }
}

fn tool_failed<'a>(stderr: impl Iterator<Item = &'a str>, status: ExitStatus) -> RetrievalError {
    let message = last_error_line(stderr).unwrap_or_else(|| match status.code() {
        Some(code) => format!("yt-dlp exited with status {code}"),
        None => "yt-dlp was terminated by a signal".to_string(),
    });
    RetrievalError::ToolFailed {
        message,
        exit_code: status.code(),
    }
}

/// The last `ERROR:` line, else the last non-empty line
fn last_error_line<'a>(lines: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut last_error = None;
    let mut last_line = None;
    for line in lines.map(str::trim).filter(|l| !l.is_empty()) {
        if line.starts_with("ERROR:") {
            last_error = Some(line);
        }
        last_line = Some(line);
    }
    last_error.or(last_line).map(str::to_string)
}

/// Parse one line printed through [`PROGRESS_TEMPLATE`]
///
/// Fields yt-dlp does not know are printed as `NA`.
fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let rest = line.trim().strip_prefix(PROGRESS_PREFIX)?;
    let mut fields = rest.split_whitespace();
    let status = ProgressStatus::from(fields.next()?);
    let mut next = || fields.next().and_then(parse_number);

    let downloaded_bytes = next().map(|n| n as u64);
    let total_bytes = next().map(|n| n as u64);
    let total_bytes_estimate = next().map(|n| n as u64);
    let speed = next();
    let eta = next().map(|n| n.round() as u64);

    Some(ProgressEvent {
        status,
        downloaded_bytes,
        total_bytes,
        total_bytes_estimate,
        speed,
        eta,
    })
}

fn parse_number(field: &str) -> Option<f64> {
    field
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
}
