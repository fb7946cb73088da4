//! # Session Configuration
//!
//! Timing knobs for the shared playback session.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Playback session configuration.
///
/// Controls the seek coalescing window, how often the progress position is
/// refreshed while playing, and an optional bound on how long a handle may
/// stay in the loading state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Minimum interval between two transport seeks.
    ///
    /// Scrub requests arriving faster are coalesced: only the latest target
    /// inside the window reaches the transport.
    ///
    /// Default: 100 ms.
    #[serde(default = "default_seek_throttle_window")]
    pub seek_throttle_window: Duration,

    /// Interval at which the playing position is polled and republished.
    ///
    /// Default: 16 ms (one frame at 60 Hz).
    #[serde(default = "default_frame_interval")]
    pub frame_interval: Duration,

    /// Tear down a handle that has not started within this duration.
    ///
    /// Default: `None`. A stalled load stays in the loading state until the
    /// transport itself reports success or failure.
    #[serde(default)]
    pub load_timeout: Option<Duration>,

    /// Capacity of the command channel between controllers and the session.
    ///
    /// Default: 64.
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seek_throttle_window: default_seek_throttle_window(),
            frame_interval: default_frame_interval(),
            load_timeout: None,
            command_buffer: default_command_buffer(),
        }
    }
}

impl SessionConfig {
    /// Configuration for pages where the progress bar is the main UI.
    ///
    /// - Faster seek response (50 ms window)
    /// - Loads give up after 15 seconds
    pub fn responsive() -> Self {
        Self {
            seek_throttle_window: Duration::from_millis(50),
            load_timeout: Some(Duration::from_secs(15)),
            ..Default::default()
        }
    }

    /// Configuration for low-power devices.
    ///
    /// - Progress refreshed four times a second
    /// - Wider seek window (250 ms)
    pub fn battery_saver() -> Self {
        Self {
            seek_throttle_window: Duration::from_millis(250),
            frame_interval: Duration::from_millis(250),
            ..Default::default()
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.seek_throttle_window.is_zero() {
            return Err("seek_throttle_window must be > 0".to_string());
        }

        if self.frame_interval.is_zero() {
            return Err("frame_interval must be > 0".to_string());
        }

        if self.frame_interval > Duration::from_secs(1) {
            return Err("frame_interval cannot exceed 1 second".to_string());
        }

        if matches!(self.load_timeout, Some(timeout) if timeout.is_zero()) {
            return Err("load_timeout must be > 0 when set".to_string());
        }

        if self.command_buffer == 0 {
            return Err("command_buffer must be > 0".to_string());
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_seek_throttle_window() -> Duration {
    Duration::from_millis(100)
}

fn default_frame_interval() -> Duration {
    Duration::from_millis(16)
}

fn default_command_buffer() -> usize {
    64
}
