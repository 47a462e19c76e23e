//! Configuration types for tube-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    time::Duration,
};
use utoipa::ToSchema;

/// Main configuration for [`TubeDownloader`](crate::TubeDownloader)
///
/// Fields are organized into logical sub-configs:
/// - [`storage`](StorageConfig): staging and result directories
/// - [`jobs`](JobConfig): concurrency, polling, retention
/// - [`retrieval`](RetrievalConfig): yt-dlp and metadata lookup
/// - [`network`](NetworkConfig): resolver overrides and egress settings
///
/// Every field has a default, so an empty JSON object is a valid configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Where job files live on disk
    #[serde(default)]
    pub storage: StorageConfig,

    /// Job scheduling and retention
    #[serde(default)]
    pub jobs: JobConfig,

    /// External retrieval collaborators
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Network settings handed to the collaborators
    #[serde(default)]
    pub network: NetworkConfig,

    /// API and external server integration
    #[serde(flatten)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Check settings that would make the engine unusable
    pub fn validate(&self) -> Result<()> {
        if self.jobs.max_concurrent_jobs == 0 {
            return Err(Error::Config {
                message: "max_concurrent_jobs must be at least 1".into(),
                key: Some("max_concurrent_jobs".into()),
            });
        }

        if self.jobs.poll_interval.is_zero() {
            return Err(Error::Config {
                message: "poll_interval must be greater than zero".into(),
                key: Some("poll_interval".into()),
            });
        }

        if self.jobs.reap_interval.is_zero() {
            return Err(Error::Config {
                message: "reap_interval must be greater than zero".into(),
                key: Some("reap_interval".into()),
            });
        }

        if self.retrieval.merge_format.is_empty() {
            return Err(Error::Config {
                message: "merge_format must not be empty".into(),
                key: Some("merge_format".into()),
            });
        }

        Ok(())
    }
}

/// Directory layout for job files
///
/// Each job gets `staging_<id>` under [`staging_root`](Self::staging_root) while it runs
/// and `job_<id>` under [`result_root`](Self::result_root) once its deliverable is ready.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StorageConfig {
    /// Root for per-job working directories (default: "tmp/staging")
    #[serde(default = "default_staging_root")]
    pub staging_root: PathBuf,

    /// Root for per-job deliverables (default: "tmp")
    #[serde(default = "default_result_root")]
    pub result_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            staging_root: default_staging_root(),
            result_root: default_result_root(),
        }
    }
}

/// Job scheduling and retention settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct JobConfig {
    /// Maximum jobs retrieving at the same time (default: 4)
    ///
    /// Jobs above the limit stay `pending` until a slot frees up.
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Interval between progress stream frames (default: 1 second)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,

    /// How long a finished job is kept when nobody collects it (default: 1 hour)
    #[serde(default = "default_job_ttl", with = "duration_serde")]
    pub job_ttl: Duration,

    /// How often the reaper sweeps for expired jobs (default: 60 seconds)
    #[serde(default = "default_reap_interval", with = "duration_serde")]
    pub reap_interval: Duration,

    /// Upper bound for a single item's retrieval (None = unlimited)
    #[serde(default, with = "optional_duration_serde")]
    pub fetch_timeout: Option<Duration>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_concurrent_jobs(),
            poll_interval: default_poll_interval(),
            job_ttl: default_job_ttl(),
            reap_interval: default_reap_interval(),
            fetch_timeout: None,
        }
    }
}

/// Retrieval collaborator settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetrievalConfig {
    /// Path to the yt-dlp binary (None = search PATH)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Prefix an identifier is appended to when building the source URL
    #[serde(default = "default_source_base_url")]
    pub source_base_url: String,

    /// Container the selected video and audio are merged into (default: "mp4")
    #[serde(default = "default_merge_format")]
    pub merge_format: String,

    /// oEmbed endpoint used for title and uploader lookups
    #[serde(default = "default_oembed_endpoint")]
    pub oembed_endpoint: String,

    /// Timeout for a single metadata lookup (default: 10 seconds)
    #[serde(default = "default_metadata_timeout", with = "duration_serde")]
    pub metadata_timeout: Duration,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            source_base_url: default_source_base_url(),
            merge_format: default_merge_format(),
            oembed_endpoint: default_oembed_endpoint(),
            metadata_timeout: default_metadata_timeout(),
        }
    }
}

impl RetrievalConfig {
    /// Source URL for an identifier
    pub fn source_url(&self, video_id: &str) -> String {
        format!("{}{}", self.source_base_url, video_id)
    }
}

/// Network settings applied to collaborator construction
///
/// Nothing here touches process-wide state. The metadata client applies
/// [`dns_overrides`](Self::dns_overrides) through its own resolver, and the yt-dlp
/// retriever translates the egress fields into command-line flags.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct NetworkConfig {
    /// Hostname to address mapping that bypasses the system resolver
    #[serde(default)]
    pub dns_overrides: HashMap<String, Vec<IpAddr>>,

    /// Proxy URL for all outbound traffic (e.g., "http://127.0.0.1:8080")
    #[serde(default)]
    pub proxy: Option<String>,

    /// Local address outbound connections bind to
    #[serde(default)]
    pub source_address: Option<IpAddr>,

    /// Only connect over IPv4
    #[serde(default)]
    pub force_ipv4: bool,
}

/// Server integration configuration (API)
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:5000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

fn default_staging_root() -> PathBuf {
    PathBuf::from("tmp/staging")
}

fn default_result_root() -> PathBuf {
    PathBuf::from("tmp")
}

fn default_max_concurrent_jobs() -> usize {
    4
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_job_ttl() -> Duration {
    Duration::from_secs(3600)
}

fn default_reap_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_source_base_url() -> String {
    "https://www.youtube.com/watch?v=".into()
}

fn default_merge_format() -> String {
    "mp4".into()
}

fn default_oembed_endpoint() -> String {
    "https://www.youtube.com/oembed".into()
}

fn default_metadata_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

// Duration serialization helper (as seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
