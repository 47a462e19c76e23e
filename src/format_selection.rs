//! Format selection policy
//!
//! A retriever reports the encodings available for a video ordered worst to best. The
//! policy picks one video-only and one audio-only encoding to be merged into a single
//! output container.

use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;

/// An encoding reported by the retriever
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Format {
    /// Retriever-specific format identifier
    pub format_id: String,
    /// Container extension (e.g., "mp4", "webm", "m4a")
    pub ext: String,
    /// Video codec, "none" when the encoding has no video track
    #[serde(default)]
    pub vcodec: Option<String>,
    /// Audio codec, "none" when the encoding has no audio track
    #[serde(default)]
    pub acodec: Option<String>,
    /// Transfer protocol (e.g., "https", "m3u8_native")
    #[serde(default)]
    pub protocol: Option<String>,
}

impl Format {
    /// Whether the encoding carries a video track
    pub fn has_video(&self) -> bool {
        has_track(self.vcodec.as_deref())
    }

    /// Whether the encoding carries an audio track
    pub fn has_audio(&self) -> bool {
        has_track(self.acodec.as_deref())
    }

    fn protocol_or_default(&self) -> &str {
        self.protocol.as_deref().unwrap_or("https")
    }
}

fn has_track(codec: Option<&str>) -> bool {
    matches!(codec, Some(c) if c != "none")
}

/// A combined video+audio selection
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatSelection {
    /// Combined identifier, `"<video>+<audio>"`
    pub format_id: String,
    /// Extension of the video encoding
    pub ext: String,
    /// The chosen encodings, video first
    pub requested: Vec<Format>,
    /// Combined protocol, `"<video>+<audio>"`
    pub protocol: String,
    /// Container the two streams are merged into
    pub merge_output_format: String,
}

/// Chooses which encodings to retrieve
pub trait FormatPolicy: Send + Sync {
    /// Pick a selection from encodings ordered worst to best
    fn select(&self, formats: &[Format]) -> Result<FormatSelection, RetrievalError>;

    /// Extension of the merged deliverable
    fn output_container(&self) -> &str;
}

/// Best video-only encoding paired with a matching audio-only encoding
///
/// The preferred container wins when any video-only encoding uses it; the audio is then
/// taken from `m4a`. A video in any other container is paired with `webm` audio.
#[derive(Clone, Debug)]
pub struct BestVideoAudioPolicy {
    preferred_container: String,
}

impl BestVideoAudioPolicy {
    /// Policy preferring `container` for both the video pick and the merged output
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            preferred_container: container.into(),
        }
    }

    fn audio_container_for(&self, video_ext: &str) -> &'static str {
        if video_ext == self.preferred_container {
            "m4a"
        } else {
            "webm"
        }
    }
}

impl Default for BestVideoAudioPolicy {
    fn default() -> Self {
        Self::new("mp4")
    }
}

impl FormatPolicy for BestVideoAudioPolicy {
    fn select(&self, formats: &[Format]) -> Result<FormatSelection, RetrievalError> {
        let best_first = || formats.iter().rev();

        let video = best_first()
            .find(|f| f.has_video() && !f.has_audio() && f.ext == self.preferred_container)
            .or_else(|| best_first().find(|f| f.has_video() && !f.has_audio()))
            .ok_or_else(|| {
                RetrievalError::NoSuitableFormat("no suitable video-only format".into())
            })?;

        let audio_ext = self.audio_container_for(&video.ext);
        let audio = best_first()
            .find(|f| f.has_audio() && !f.has_video() && f.ext == audio_ext)
            .ok_or_else(|| {
                RetrievalError::NoSuitableFormat(format!(
                    "no suitable {audio_ext} audio-only format"
                ))
            })?;

        Ok(FormatSelection {
            format_id: format!("{}+{}", video.format_id, audio.format_id),
            ext: video.ext.clone(),
            protocol: format!(
                "{}+{}",
                video.protocol_or_default(),
                audio.protocol_or_default()
            ),
            requested: vec![video.clone(), audio.clone()],
            merge_output_format: self.preferred_container.clone(),
        })
    }

    fn output_container(&self) -> &str {
        &self.preferred_container
    }
}
