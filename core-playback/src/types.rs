//! # Playback Types
//!
//! Requests flowing into the session and the snapshot flowing out of it.

use crate::error::{PlaybackError, Result};
use bridge_traits::HandleId;
use core_library::PlayableTrack;
use serde::{Deserialize, Serialize};

// ============================================================================
// Track Identity
// ============================================================================

/// Logical identity of a track: which album, which position in its list.
///
/// Used only for comparison (resume vs replace, card derivation); the
/// transport never sees it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackIdentity {
    pub album_id: String,
    pub track_index: usize,
}

impl TrackIdentity {
    pub fn new(album_id: impl Into<String>, track_index: usize) -> Self {
        Self {
            album_id: album_id.into(),
            track_index,
        }
    }

    /// Whether this identity names `(album_id, track_index)`.
    pub fn is(&self, album_id: &str, track_index: usize) -> bool {
        self.album_id == album_id && self.track_index == track_index
    }
}

// ============================================================================
// Track Request
// ============================================================================

/// One `play` invocation. Consumed immediately by the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRequest {
    /// Stream locator handed to the transport.
    pub url: String,
    pub album_id: String,
    pub track_index: usize,
    /// Duration known from the catalog, used until the transport reports one.
    #[serde(default)]
    pub duration_hint: Option<f64>,
    #[serde(default)]
    pub title: Option<String>,
}

impl TrackRequest {
    pub fn new(url: impl Into<String>, album_id: impl Into<String>, track_index: usize) -> Self {
        Self {
            url: url.into(),
            album_id: album_id.into(),
            track_index,
            duration_hint: None,
            title: None,
        }
    }

    /// Build a request for a normalised catalog track.
    pub fn from_track(album_id: impl Into<String>, track_index: usize, track: &PlayableTrack) -> Self {
        Self {
            url: track.url.clone(),
            album_id: album_id.into(),
            track_index,
            duration_hint: track.duration_seconds,
            title: (!track.title.is_empty()).then(|| track.title.clone()),
        }
    }

    pub fn with_duration_hint(mut self, seconds: f64) -> Self {
        self.duration_hint = Some(seconds);
        self
    }

    pub fn identity(&self) -> TrackIdentity {
        TrackIdentity::new(self.album_id.clone(), self.track_index)
    }

    /// Reject requests that cannot produce a handle.
    ///
    /// Only the locator is checked; album id and index are opaque.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(PlaybackError::InvalidRequest(format!(
                "empty stream url for album '{}' track {}",
                self.album_id, self.track_index
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Read-only reference to the live handle, safe to hand to any observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleRef {
    pub id: HandleId,
    /// Locator the transport actually has loaded.
    pub url: String,
}

/// State broadcast to every mounted card and mini-player.
///
/// `active_album_id`, `active_track_index` and `active_handle` are either all
/// `Some` or all `None`. `is_playing` implies an active handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub active_album_id: Option<String>,
    pub active_track_index: Option<usize>,
    pub is_playing: bool,
    /// Playhead in seconds; `0.0` whenever nothing is active.
    pub position_seconds: f64,
    pub duration_seconds: Option<f64>,
    pub active_handle: Option<HandleRef>,
    /// Track whose handle is opened but has not started yet.
    pub loading: Option<TrackIdentity>,
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self {
            active_album_id: None,
            active_track_index: None,
            is_playing: false,
            position_seconds: 0.0,
            duration_seconds: None,
            active_handle: None,
            loading: None,
        }
    }
}

impl PlaybackSnapshot {
    /// Whether `(album_id, track_index)` is the loaded track, playing or not.
    pub fn is_active(&self, album_id: &str, track_index: usize) -> bool {
        self.active_album_id.as_deref() == Some(album_id)
            && self.active_track_index == Some(track_index)
    }

    /// Whether any track of `album_id` is loaded.
    pub fn is_album_active(&self, album_id: &str) -> bool {
        self.active_album_id.as_deref() == Some(album_id)
    }

    /// Whether `(album_id, track_index)` is waiting for the transport.
    pub fn is_loading(&self, album_id: &str, track_index: usize) -> bool {
        self.loading
            .as_ref()
            .map_or(false, |identity| identity.is(album_id, track_index))
    }

    /// Locator the transport reports loaded, if any.
    pub fn active_url(&self) -> Option<&str> {
        self.active_handle.as_ref().map(|handle| handle.url.as_str())
    }

    /// `true` when nothing is loaded or loading.
    pub fn is_idle(&self) -> bool {
        self.active_handle.is_none() && self.loading.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_validation() {
        assert!(TrackRequest::new("https://cdn/a.mp3", "alb-1", 0).validate().is_ok());

        let err = TrackRequest::new("   ", "alb-1", 3).validate().unwrap_err();
        assert!(matches!(err, PlaybackError::InvalidRequest(_)));
        assert!(err.to_string().contains("alb-1"));
    }

    #[test]
    fn test_request_from_catalog_track() {
        let track = PlayableTrack::new("https://cdn/b.mp3", "Second").with_duration(180.0);
        let request = TrackRequest::from_track("alb-2", 1, &track);

        assert_eq!(request.identity(), TrackIdentity::new("alb-2", 1));
        assert_eq!(request.duration_hint, Some(180.0));
        assert_eq!(request.title.as_deref(), Some("Second"));
    }

    #[test]
    fn test_default_snapshot_is_idle() {
        let snapshot = PlaybackSnapshot::default();
        assert!(snapshot.is_idle());
        assert!(!snapshot.is_active("alb-1", 0));
        assert_eq!(snapshot.active_url(), None);
        assert_eq!(snapshot.position_seconds, 0.0);
    }
}
