//! Catalog models for album cards
//!
//! The CMS stores an album's tracks as a list of tagged entries. Field names
//! follow the CMS documents (camelCase); the `kind` tag selects the source.

use crate::error::{LibraryError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

// =============================================================================
// Source shapes
// =============================================================================

/// Asset reference resolved by the CMS (`{ "asset": { "url": ... } }`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub asset: Option<AssetRef>,
}

/// Resolved asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    pub url: Option<String>,
}

/// Track uploaded to the CMS asset store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomTrack {
    pub title: String,
    /// Uploaded file; preferred when present.
    #[serde(default)]
    pub audio_file: Option<FileRef>,
    /// Externally hosted fallback locator.
    #[serde(default)]
    pub audio_url: Option<String>,
    /// Duration in seconds, when entered by the editor.
    #[serde(default)]
    pub duration: Option<f64>,
}

/// Track embedded from a third-party streaming provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedTrack {
    pub title: String,
    /// Full stream locator.
    #[serde(default)]
    pub stream_url: Option<String>,
    /// Short preview clip, used when the full stream is not licensed.
    #[serde(default)]
    pub preview_url: Option<String>,
    /// Duration in milliseconds, as reported by the provider.
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

/// One entry of an album's track list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AlbumTrack {
    Custom(CustomTrack),
    Embedded(EmbeddedTrack),
}

// =============================================================================
// Canonical shape
// =============================================================================

/// Canonical track consumed by the playback core.
///
/// `url` is empty when the CMS entry has no usable locator; the playback core
/// rejects such tracks when asked to play them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayableTrack {
    pub url: String,
    pub title: String,
    pub duration_seconds: Option<f64>,
}

impl PlayableTrack {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            duration_seconds: None,
        }
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    /// Whether the track has a locator at all.
    pub fn is_playable(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
}

fn valid_duration(seconds: f64) -> Option<f64> {
    (seconds.is_finite() && seconds > 0.0).then_some(seconds)
}

impl AlbumTrack {
    /// Display title regardless of source.
    pub fn title(&self) -> &str {
        match self {
            AlbumTrack::Custom(track) => &track.title,
            AlbumTrack::Embedded(track) => &track.title,
        }
    }

    /// Map either source shape to the canonical [`PlayableTrack`].
    ///
    /// Custom tracks prefer the uploaded asset over `audioUrl`; embedded
    /// tracks prefer the full stream over the preview clip.
    pub fn normalize(&self) -> PlayableTrack {
        match self {
            AlbumTrack::Custom(track) => {
                let asset_url = track
                    .audio_file
                    .as_ref()
                    .and_then(|file| file.asset.as_ref())
                    .and_then(|asset| non_empty(&asset.url));
                let url = asset_url.or_else(|| non_empty(&track.audio_url));

                PlayableTrack {
                    url: url.unwrap_or_default().to_string(),
                    title: track.title.clone(),
                    duration_seconds: track.duration.and_then(valid_duration),
                }
            }
            AlbumTrack::Embedded(track) => {
                let url = non_empty(&track.stream_url).or_else(|| non_empty(&track.preview_url));

                PlayableTrack {
                    url: url.unwrap_or_default().to_string(),
                    title: track.title.clone(),
                    duration_seconds: track
                        .duration_ms
                        .and_then(|ms| valid_duration(ms as f64 / 1000.0)),
                }
            }
        }
    }
}

// =============================================================================
// Album
// =============================================================================

/// Album as rendered by one card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub tracks: Vec<AlbumTrack>,
}

impl Album {
    /// Parse an album document returned by the CMS.
    pub fn from_json(document: &str) -> Result<Self> {
        let album: Album = serde_json::from_str(document)?;
        album.validate()?;
        debug!(album_id = %album.id, tracks = album.tracks.len(), "Parsed album document");
        Ok(album)
    }

    /// Validate album data
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(LibraryError::InvalidInput {
                field: "id".to_string(),
                message: "Album id cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Normalised track list; indices match `tracks`.
    pub fn playable_tracks(&self) -> Vec<PlayableTrack> {
        self.tracks.iter().map(AlbumTrack::normalize).collect()
    }

    /// Normalised track at `index`.
    pub fn track(&self, index: usize) -> Option<PlayableTrack> {
        self.tracks.get(index).map(AlbumTrack::normalize)
    }
}
