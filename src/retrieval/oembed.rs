//! oEmbed metadata lookup
//!
//! Title and uploader come from the public oEmbed endpoint, which answers without
//! downloading any media. The endpoint replies 401 for private videos and 404 for
//! unknown ones; both mean "no metadata" rather than an error.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::network;
use super::traits::{MetadataLookup, VideoMetadata};
use crate::config::{NetworkConfig, RetrievalConfig};
use crate::error::{Error, RetrievalError};

/// Metadata lookup against an oEmbed endpoint
#[derive(Debug, Clone)]
pub struct OEmbedMetadata {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Deserialize)]
struct OEmbedResponse {
    title: Option<String>,
    author_name: Option<String>,
}

impl OEmbedMetadata {
    /// Build a client from the retrieval and network settings
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a malformed proxy, or [`Error::Network`] when the
    /// HTTP client cannot be constructed.
    pub fn from_config(retrieval: &RetrievalConfig, network: &NetworkConfig) -> crate::Result<Self> {
        let builder = reqwest::Client::builder()
            .timeout(retrieval.metadata_timeout)
            .user_agent(concat!("tube-dl/", env!("CARGO_PKG_VERSION")));
        let client = network::configure_client(builder, network)?.build()?;

        Ok(Self {
            client,
            endpoint: retrieval.oembed_endpoint.clone(),
        })
    }

    fn lookup_error(url: &str, reason: impl Into<String>) -> Error {
        RetrievalError::Metadata {
            url: url.to_string(),
            reason: reason.into(),
        }
        .into()
    }
}

#[async_trait]
impl MetadataLookup for OEmbedMetadata {
    async fn lookup(&self, url: &str) -> crate::Result<Option<VideoMetadata>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("url", url), ("format", "json")])
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.to_string()
                };
                Self::lookup_error(url, reason)
            })?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Ok(None);
            }
            status => return Err(Self::lookup_error(url, format!("HTTP {status}"))),
        }

        let body: OEmbedResponse = response
            .json()
            .await
            .map_err(|e| Self::lookup_error(url, format!("invalid response: {e}")))?;

        Ok(Some(VideoMetadata {
            title: body.title,
            uploader: body.author_name,
        }))
    }

    fn name(&self) -> &'static str {
        "oembed"
    }
}
