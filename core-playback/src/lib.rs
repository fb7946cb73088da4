//! # Playback Core
//!
//! One shared playback session driven by many independent album cards.
//!
//! ## Overview
//!
//! This crate handles:
//! - Ownership of the single live transport handle ([`PlaybackSession`])
//! - Resume-vs-replace decisions for play requests from any card
//! - Coalescing of scrub bursts into throttled transport seeks
//! - A self-scheduling position poller feeding progress bars
//! - The async single-writer loop and its cloneable [`PlaybackController`]
//! - The per-card derivation of "is my track playing / paused"
//!
//! The host media API is reached only through
//! [`bridge_traits::AudioTransport`]; catalog tracks arrive already
//! normalised as [`core_library::PlayableTrack`].

pub mod card;
pub mod config;
pub mod error;
pub mod progress;
pub mod service;
pub mod session;
pub mod throttle;
pub mod types;

pub use card::CardPlayback;
pub use config::SessionConfig;
pub use error::{PlaybackError, Result};
pub use progress::{PositionSource, ProgressSynchronizer};
pub use service::{PlaybackControl, PlaybackController, SessionCommand, SessionService};
pub use session::{PlaybackSession, SignalOutcome};
pub use throttle::{SeekDecision, SeekThrottle};
pub use types::{HandleRef, PlaybackSnapshot, TrackIdentity, TrackRequest};
