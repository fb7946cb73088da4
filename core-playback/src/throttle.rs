//! # Seek Coalescing
//!
//! Trailing-edge throttle for transport seeks.
//!
//! Dragging a progress bar produces a seek request per pointer move. Sending
//! each one to the decoder makes it thrash between buffer positions, so the
//! session routes every transport seek through a [`SeekThrottle`]:
//!
//! ```text
//! requests:  5   6   7                 9
//! time:      0   20  40  ...  100      230
//! transport: 5               7         9
//!            ^ idle window   ^ window  ^ idle again, fires at once
//!              fires at once   elapsed,
//!                              latest wins
//! ```
//!
//! The throttle never touches the transport itself. It answers "fire now" or
//! "hold", and exposes a deadline the session loop sleeps until.

use std::time::Duration;
use tokio::time::Instant;

/// Outcome of a seek request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekDecision {
    /// Apply this target to the transport now.
    Fire(f64),
    /// Held until the window elapses; a later request may replace it.
    Deferred,
}

/// Trailing-edge throttle parameterised by its window.
#[derive(Debug, Clone)]
pub struct SeekThrottle {
    window: Duration,
    window_end: Option<Instant>,
    pending: Option<f64>,
}

impl SeekThrottle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            window_end: None,
            pending: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Offer a new target.
    ///
    /// The first request in an idle window fires immediately and opens a
    /// window. Requests inside an open window replace the pending target.
    pub fn request(&mut self, target: f64, now: Instant) -> SeekDecision {
        match self.window_end {
            Some(end) if now < end => {
                self.pending = Some(target);
                SeekDecision::Deferred
            }
            _ => {
                self.pending = None;
                self.window_end = Some(now + self.window);
                SeekDecision::Fire(target)
            }
        }
    }

    /// When the pending target becomes due, if one is held.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.and(self.window_end)
    }

    /// Whether a target is waiting for the window to elapse.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Release the pending target once its window has elapsed.
    ///
    /// A released target counts as a firing and opens a new window, so a drag
    /// that keeps going is sampled at most once per window.
    pub fn take_due(&mut self, now: Instant) -> Option<f64> {
        let end = self.window_end?;
        if now < end {
            return None;
        }

        let target = self.pending.take()?;
        self.window_end = Some(now + self.window);
        Some(target)
    }

    /// Drop any pending target and close the window.
    pub fn reset(&mut self) {
        self.pending = None;
        self.window_end = None;
    }
}

impl Default for SeekThrottle {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}
