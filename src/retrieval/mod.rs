//! External retrieval collaborators
//!
//! The job orchestrator only depends on the [`MediaRetriever`] and [`MetadataLookup`]
//! traits. Production implementations:
//! - [`YtDlpRetriever`]: drives the `yt-dlp` binary as a subprocess
//! - [`OEmbedMetadata`]: queries an oEmbed endpoint over HTTP

pub mod network;
mod oembed;
mod traits;
mod ytdlp;

pub use oembed::OEmbedMetadata;
pub use traits::{
    FetchRequest, MediaRetriever, MetadataLookup, OUTPUT_TEMPLATE, ProgressCallback,
    VideoMetadata,
};
pub use ytdlp::YtDlpRetriever;
