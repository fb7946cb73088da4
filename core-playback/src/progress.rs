//! # Progress Synchronizer
//!
//! Keeps the published playhead fresh while, and only while, audio plays.
//!
//! The synchronizer owns no timer. It tracks when its next tick is due and
//! the session loop sleeps until [`ProgressSynchronizer::deadline`]. Each tick
//! reads the transport once and reschedules itself only if playback is still
//! running, so pausing, stopping, ending or failing all quiesce it at once and
//! only the next transition back to playing re-arms it.

use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Where positions are read from and published to.
#[cfg_attr(test, mockall::automock)]
pub trait PositionSource {
    /// Raw playhead reported by the transport, in seconds.
    ///
    /// `None` when nothing is active or the reading should be skipped (for
    /// example while a coalesced seek is still pending).
    fn transport_position(&self) -> Option<f64>;

    /// Store a sanitised reading as the current position.
    fn publish_position(&mut self, seconds: f64);
}

/// Self-scheduling position poller.
#[derive(Debug, Clone)]
pub struct ProgressSynchronizer {
    interval: Duration,
    next_tick: Option<Instant>,
    last_good: Option<f64>,
}

impl ProgressSynchronizer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_tick: None,
            last_good: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Arm on a transition to playing; disarm as soon as playback stops.
    ///
    /// Calling this repeatedly while playing keeps the existing schedule.
    pub fn sync(&mut self, is_playing: bool, now: Instant) {
        if !is_playing {
            self.next_tick = None;
            return;
        }

        if self.next_tick.is_none() {
            self.next_tick = Some(now + self.interval);
        }
    }

    /// When the next tick is due; `None` while quiescent.
    pub fn deadline(&self) -> Option<Instant> {
        self.next_tick
    }

    pub fn is_armed(&self) -> bool {
        self.next_tick.is_some()
    }

    /// Last reading that passed sanitisation.
    pub fn last_good(&self) -> Option<f64> {
        self.last_good
    }

    /// Poll once and republish.
    ///
    /// Non-finite or negative readings are dropped, leaving the previously
    /// published value in place. Returns the value published, if any.
    pub fn tick<S>(&mut self, source: &mut S, is_playing: bool, now: Instant) -> Option<f64>
    where
        S: PositionSource + ?Sized,
    {
        if !is_playing {
            self.next_tick = None;
            return None;
        }

        let published = match source.transport_position() {
            Some(seconds) if seconds.is_finite() && seconds >= 0.0 => {
                source.publish_position(seconds);
                self.last_good = Some(seconds);
                Some(seconds)
            }
            reading => {
                trace!(?reading, last_good = ?self.last_good, "Holding last known position");
                None
            }
        };

        self.next_tick = Some(now + self.interval);
        published
    }
}

impl Default for ProgressSynchronizer {
    fn default() -> Self {
        Self::new(Duration::from_millis(16))
    }
}
