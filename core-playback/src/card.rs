//! # Card Playback Adapter
//!
//! The logic every album card runs against the shared session.
//!
//! A card owns nothing but its album id, its normalised track list and which
//! track the user last picked. Everything it renders (play/pause affordance,
//! progress bar) is derived from the broadcast [`PlaybackSnapshot`], so cards
//! can be mounted, unmounted and re-mounted without coordinating with each
//! other.

use crate::error::{PlaybackError, Result};
use crate::service::PlaybackControl;
use crate::types::{PlaybackSnapshot, TrackRequest};
use core_library::{Album, PlayableTrack};
use tracing::debug;

/// Per-card playback state and derivations.
#[derive(Debug, Clone, PartialEq)]
pub struct CardPlayback {
    album_id: String,
    tracks: Vec<PlayableTrack>,
    selected: Option<usize>,
}

impl CardPlayback {
    pub fn new(album_id: impl Into<String>, tracks: Vec<PlayableTrack>) -> Self {
        Self {
            album_id: album_id.into(),
            tracks,
            selected: None,
        }
    }

    /// Card for a catalog album.
    pub fn for_album(album: &Album) -> Self {
        Self::new(album.id.clone(), album.playable_tracks())
    }

    pub fn album_id(&self) -> &str {
        &self.album_id
    }

    pub fn tracks(&self) -> &[PlayableTrack] {
        &self.tracks
    }

    /// Track the card acts on: the user's pick, or the first track.
    pub fn current_index(&self) -> usize {
        self.selected.unwrap_or(0)
    }

    pub fn current_track(&self) -> Option<&PlayableTrack> {
        self.tracks.get(self.current_index())
    }

    /// Pick a track locally. Does not start playback.
    pub fn select(&mut self, index: usize) -> Result<()> {
        if index >= self.tracks.len() {
            return Err(PlaybackError::InvalidRequest(format!(
                "track {} out of range for album '{}' ({} tracks)",
                index,
                self.album_id,
                self.tracks.len()
            )));
        }
        self.selected = Some(index);
        Ok(())
    }

    /// This card's current track is loaded and playing.
    pub fn is_this_track_playing(&self, snapshot: &PlaybackSnapshot) -> bool {
        snapshot.is_playing && snapshot.is_active(&self.album_id, self.current_index())
    }

    /// This card's current track is loaded but not playing.
    pub fn is_this_track_paused(&self, snapshot: &PlaybackSnapshot) -> bool {
        !snapshot.is_playing && snapshot.is_active(&self.album_id, self.current_index())
    }

    /// This card's current track is waiting for the transport.
    pub fn is_this_track_loading(&self, snapshot: &PlaybackSnapshot) -> bool {
        snapshot.is_loading(&self.album_id, self.current_index())
    }

    /// The single play/pause affordance.
    ///
    /// Pauses when this card's track is playing, resumes it when paused, and
    /// otherwise starts this card's track.
    pub fn toggle(&self, snapshot: &PlaybackSnapshot, control: &dyn PlaybackControl) -> Result<()> {
        if self.is_this_track_playing(snapshot) {
            return control.pause();
        }

        let index = self.current_index();
        let track = self.tracks.get(index).ok_or_else(|| {
            PlaybackError::InvalidRequest(format!("album '{}' has no tracks", self.album_id))
        })?;

        if self.is_this_track_paused(snapshot) {
            debug!(album_id = %self.album_id, track_index = index, "Resuming from card");
        }

        // Same identity resumes in place; a different one replaces the handle
        control.play(TrackRequest::from_track(self.album_id.clone(), index, track))
    }

    /// Adopt the track the transport actually has loaded.
    ///
    /// A card re-mounted after playback started elsewhere would otherwise
    /// show its default track. When the snapshot reports this album playing
    /// and the selected track's locator differs from the loaded one, the
    /// selection moves to the track whose locator matches. Returns `true` if
    /// the selection changed.
    pub fn reconcile(&mut self, snapshot: &PlaybackSnapshot) -> bool {
        if !snapshot.is_playing || !snapshot.is_album_active(&self.album_id) {
            return false;
        }

        let Some(loaded_url) = snapshot.active_url() else {
            return false;
        };

        if self
            .current_track()
            .map_or(false, |track| track.url == loaded_url)
        {
            return false;
        }

        match self.tracks.iter().position(|track| track.url == loaded_url) {
            Some(index) if Some(index) != self.selected => {
                debug!(album_id = %self.album_id, track_index = index, "Card adopted loaded track");
                self.selected = Some(index);
                true
            }
            _ => false,
        }
    }

    /// Forward a scrub when this card's track is the loaded one.
    ///
    /// Returns `Ok(false)` when the card is not active and nothing was sent.
    pub fn seek(
        &self,
        snapshot: &PlaybackSnapshot,
        seconds: f64,
        control: &dyn PlaybackControl,
    ) -> Result<bool> {
        if !snapshot.is_active(&self.album_id, self.current_index()) {
            return Ok(false);
        }
        control.seek(seconds)?;
        Ok(true)
    }

    /// Progress bar fill in `[0, 1]`, when this card's track is loaded and
    /// its duration is known.
    pub fn progress_fraction(&self, snapshot: &PlaybackSnapshot) -> Option<f64> {
        if !snapshot.is_active(&self.album_id, self.current_index()) {
            return None;
        }

        let duration = snapshot
            .duration_seconds
            .or_else(|| self.current_track().and_then(|track| track.duration_seconds))?;
        if duration <= 0.0 {
            return None;
        }

        Some((snapshot.position_seconds / duration).clamp(0.0, 1.0))
    }
}
