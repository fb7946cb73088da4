//! # Playback Error Types
//!
//! Errors surfaced by the shared playback session.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Request Errors
    // ========================================================================
    /// The request was rejected before any handle was created
    /// (empty locator, non-finite seek target, empty track list).
    #[error("Invalid playback request: {0}")]
    InvalidRequest(String),

    /// Attempted a handle operation while nothing is loaded.
    #[error("No track loaded")]
    NoTrackLoaded,

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// The resource could not be fetched or decoded, even after a retry.
    #[error("Failed to load audio resource: {0}")]
    LoadFailed(String),

    /// The transport refused to start playback, even after a retry.
    #[error("Transport refused to start playback: {0}")]
    PlayFailed(String),

    /// The handle stayed in the loading state longer than the configured
    /// load timeout.
    #[error("Audio resource did not become ready within {0:?}")]
    LoadTimeout(std::time::Duration),

    /// The host transport is missing or blocked.
    #[error("Audio transport unavailable: {0}")]
    TransportUnavailable(String),

    /// Error reported by a bridge operation on a live handle.
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// The session loop has shut down; commands can no longer be delivered.
    #[error("Playback session closed")]
    SessionClosed,

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if the UI may offer the user a retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::LoadFailed(_)
                | PlaybackError::PlayFailed(_)
                | PlaybackError::LoadTimeout(_)
                | PlaybackError::Bridge(BridgeError::PolicyBlocked(_))
        )
    }

    /// Returns `true` if the caller passed something unusable.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::InvalidRequest(_) | PlaybackError::NoTrackLoaded
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
