//! # Playback Session
//!
//! Single-writer owner of the one live transport handle.
//!
//! ## Overview
//!
//! [`PlaybackSession`] is a synchronous state machine. Every mutation goes
//! through `&mut self`: the four user operations (`play`, `pause`, `stop`,
//! `seek`) and [`PlaybackSession::handle_signal`] for asynchronous transport
//! callbacks. The async [`SessionService`](crate::service::SessionService)
//! drives it from one task; tests drive it directly with explicit instants.
//!
//! ## Handle lifecycle
//!
//! ```text
//!  uninitialized ──play──> loading ──Playing──> playing <──> paused
//!        ^                   │                     │           │
//!        │          failure (retry once            │           │
//!        │          after Unlocked)                │           │
//!        └──────── teardown <──── Ended | stop | second failure ┘
//! ```
//!
//! Every terminal transition goes through the same teardown, which releases
//! the handle, clears the active triad, resets the position to zero and drops
//! any pending seek.
//!
//! ## Stale callbacks
//!
//! Each handle gets a fresh [`HandleId`] and its [`SignalSender`] is bound to
//! it. A signal whose id is not the current handle's is dropped before it can
//! touch state, which is what makes `play(A); play(B)` end with only B
//! playing even when A's ready signal arrives late.

use crate::config::SessionConfig;
use crate::error::{PlaybackError, Result};
use crate::progress::PositionSource;
use crate::throttle::{SeekDecision, SeekThrottle};
use crate::types::{HandleRef, PlaybackSnapshot, TrackIdentity, TrackRequest};
use bridge_traits::{
    AudioTransport, HandleId, SignalSender, StreamRequest, TransportEvent, TransportHandle,
    TransportSignal,
};
use core_runtime::events::PlaybackEvent;
use core_runtime::logging::redact_url;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

/// What a transport signal did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// State changed.
    Applied,
    /// Signal was for the current handle but meaningless in its state.
    Ignored,
    /// Signal came from a superseded handle and was discarded.
    Stale,
}

/// Per-handle recovery budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryState {
    /// No failure seen yet.
    Fresh,
    /// One failure seen; waiting for an unlock gesture to retry.
    AwaitingUnlock,
    /// The retry was issued; the next failure gives up.
    Retried,
}

/// The one live handle and what it was opened for.
struct Live {
    id: HandleId,
    handle: Box<dyn TransportHandle>,
    identity: TrackIdentity,
    retry: RetryState,
}

enum Slot {
    Idle,
    Loading {
        live: Live,
        since: Instant,
        duration_hint: Option<f64>,
    },
    Active {
        live: Live,
        playing: bool,
        position: f64,
        duration: Option<f64>,
    },
}

impl Slot {
    fn live(&self) -> Option<&Live> {
        match self {
            Slot::Idle => None,
            Slot::Loading { live, .. } | Slot::Active { live, .. } => Some(live),
        }
    }

    fn live_mut(&mut self) -> Option<&mut Live> {
        match self {
            Slot::Idle => None,
            Slot::Loading { live, .. } | Slot::Active { live, .. } => Some(live),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum FailureKind {
    Load,
    Play,
}

impl FailureKind {
    fn into_error(self, message: String) -> PlaybackError {
        match self {
            FailureKind::Load => PlaybackError::LoadFailed(message),
            FailureKind::Play => PlaybackError::PlayFailed(message),
        }
    }
}

fn to_ms(seconds: f64) -> u64 {
    (seconds.max(0.0) * 1000.0).round() as u64
}

fn valid_duration(seconds: Option<f64>) -> Option<f64> {
    seconds.filter(|s| s.is_finite() && *s > 0.0)
}

/// The process-wide playback session.
pub struct PlaybackSession {
    transport: Arc<dyn AudioTransport>,
    signals: mpsc::UnboundedSender<TransportEvent>,
    slot: Slot,
    next_id: HandleId,
    throttle: SeekThrottle,
    events: Vec<PlaybackEvent>,
}

impl PlaybackSession {
    /// Create an empty session.
    ///
    /// Signals raised by handles this session opens are delivered to
    /// `signals`; whoever holds the receiving end feeds them back through
    /// [`handle_signal`](Self::handle_signal).
    pub fn new(
        transport: Arc<dyn AudioTransport>,
        signals: mpsc::UnboundedSender<TransportEvent>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            transport,
            signals,
            slot: Slot::Idle,
            next_id: HandleId::new(1),
            throttle: SeekThrottle::new(config.seek_throttle_window),
            events: Vec::new(),
        }
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Play `request`, resuming in place when it names the loaded track.
    ///
    /// Returns once the handle is opened and asked to start. The transport's
    /// `Playing` signal is what makes the track active.
    pub fn play(&mut self, request: TrackRequest, now: Instant) -> Result<()> {
        if let Err(err) = request.validate() {
            warn!(album_id = %request.album_id, track_index = request.track_index, "Rejected play request: {}", err);
            return Err(err);
        }

        let identity = request.identity();
        match &mut self.slot {
            Slot::Active {
                live, playing: true, ..
            } if live.identity == identity => {
                debug!(handle = %live.id, "Track already playing");
                return Ok(());
            }
            Slot::Active {
                live,
                playing: playing @ false,
                position,
                ..
            } if live.identity == identity => {
                let id = live.id;
                if let Err(err) = live.handle.play() {
                    self.fail(id, FailureKind::Play, err.to_string());
                    return Ok(());
                }
                // A user gesture resuming counts as the retry
                if live.retry == RetryState::AwaitingUnlock {
                    live.retry = RetryState::Retried;
                }
                *playing = true;
                debug!(handle = %id, position = *position, "Resumed in place");
                let position_ms = to_ms(*position);
                self.events.push(PlaybackEvent::Resumed {
                    album_id: identity.album_id,
                    track_index: identity.track_index,
                    position_ms,
                });
                return Ok(());
            }
            Slot::Loading { live, .. } if live.identity == identity => {
                debug!(handle = %live.id, "Track already loading");
                return Ok(());
            }
            _ => {}
        }

        if let Some(previous) = self.teardown() {
            debug!(album_id = %previous.album_id, track_index = previous.track_index, "Superseding current track");
            self.events.push(PlaybackEvent::Stopped {
                album_id: previous.album_id,
                track_index: previous.track_index,
            });
        }

        self.open(request, now)
    }

    /// Pause the playing handle, keeping it and its position.
    ///
    /// No-op unless a handle is active and playing.
    pub fn pause(&mut self) -> Result<()> {
        match &mut self.slot {
            Slot::Active {
                live,
                playing: playing @ true,
                position,
                ..
            } => {
                live.handle.pause()?;
                *playing = false;
                debug!(handle = %live.id, position = *position, "Paused");
                self.events.push(PlaybackEvent::Paused {
                    album_id: live.identity.album_id.clone(),
                    track_index: live.identity.track_index,
                    position_ms: to_ms(*position),
                });
            }
            _ => trace!("Pause ignored: nothing playing"),
        }
        Ok(())
    }

    /// Release the handle and return to idle. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(identity) = self.teardown() {
            info!(album_id = %identity.album_id, track_index = identity.track_index, "Playback stopped");
            self.events.push(PlaybackEvent::Stopped {
                album_id: identity.album_id,
                track_index: identity.track_index,
            });
        }
    }

    /// Move the playhead of the active track.
    ///
    /// The published position follows immediately. The transport seek is
    /// coalesced: inside the throttle window only the latest target is kept
    /// and applied by [`flush_seek`](Self::flush_seek) once the window ends.
    pub fn seek(&mut self, target_seconds: f64, now: Instant) -> Result<()> {
        if !target_seconds.is_finite() {
            return Err(PlaybackError::InvalidRequest(format!(
                "seek target must be finite, got {}",
                target_seconds
            )));
        }

        let Slot::Active {
            live,
            position,
            duration,
            ..
        } = &mut self.slot
        else {
            return Err(PlaybackError::NoTrackLoaded);
        };

        let mut target = target_seconds.max(0.0);
        if let Some(duration) = *duration {
            target = target.min(duration);
        }

        match self.throttle.request(target, now) {
            SeekDecision::Fire(target) => {
                live.handle.seek(target)?;
                trace!(handle = %live.id, target, "Seek applied");
                self.events.push(PlaybackEvent::Seeked {
                    album_id: live.identity.album_id.clone(),
                    track_index: live.identity.track_index,
                    position_ms: to_ms(target),
                });
            }
            SeekDecision::Deferred => trace!(handle = %live.id, target, "Seek coalesced"),
        }

        *position = target;
        Ok(())
    }

    /// Apply a coalesced seek whose window has elapsed.
    ///
    /// Returns `true` if a seek reached the transport.
    pub fn flush_seek(&mut self, now: Instant) -> bool {
        let Some(target) = self.throttle.take_due(now) else {
            return false;
        };

        let Slot::Active { live, .. } = &mut self.slot else {
            return false;
        };

        match live.handle.seek(target) {
            Ok(()) => {
                trace!(handle = %live.id, target, "Coalesced seek applied");
                self.events.push(PlaybackEvent::Seeked {
                    album_id: live.identity.album_id.clone(),
                    track_index: live.identity.track_index,
                    position_ms: to_ms(target),
                });
                true
            }
            Err(err) => {
                warn!(handle = %live.id, target, "Coalesced seek failed: {}", err);
                false
            }
        }
    }

    /// Apply a transport signal.
    ///
    /// Signals from any handle other than the current one are discarded.
    pub fn handle_signal(&mut self, event: TransportEvent, now: Instant) -> SignalOutcome {
        let current = self.slot.live().map(|live| live.id);
        if current != Some(event.handle) {
            debug!(handle = %event.handle, signal = event.signal.name(), "Discarding stale transport signal");
            return SignalOutcome::Stale;
        }

        let id = event.handle;
        match event.signal {
            TransportSignal::Playing => self.on_playing(),
            TransportSignal::Paused => self.on_paused(),
            TransportSignal::Ended => {
                if let Some(identity) = self.teardown() {
                    info!(handle = %id, album_id = %identity.album_id, track_index = identity.track_index, "Track completed");
                    self.events.push(PlaybackEvent::Completed {
                        album_id: identity.album_id,
                        track_index: identity.track_index,
                    });
                }
                SignalOutcome::Applied
            }
            TransportSignal::LoadError(message) => self.fail(id, FailureKind::Load, message),
            TransportSignal::PlayError(message) => self.fail(id, FailureKind::Play, message),
            TransportSignal::Unlocked => self.on_unlocked(now),
        }
    }

    /// Tear down a handle stuck in loading for longer than `timeout`.
    ///
    /// Returns `true` if a handle was torn down.
    pub fn expire_loading(&mut self, now: Instant, timeout: Duration) -> bool {
        match self.loading_deadline(timeout) {
            Some(deadline) if now >= deadline => {}
            _ => return false,
        }

        let err = PlaybackError::LoadTimeout(timeout);
        if let Some(identity) = self.teardown() {
            warn!(album_id = %identity.album_id, track_index = identity.track_index, "{}", err);
            self.events.push(PlaybackEvent::Error {
                album_id: Some(identity.album_id),
                track_index: Some(identity.track_index),
                message: err.to_string(),
                recoverable: true,
            });
        }
        true
    }

    // ========================================================================
    // Read side
    // ========================================================================

    /// Current state as broadcast to observers.
    pub fn snapshot(&self) -> PlaybackSnapshot {
        match &self.slot {
            Slot::Idle => PlaybackSnapshot::default(),
            Slot::Loading { live, .. } => PlaybackSnapshot {
                loading: Some(live.identity.clone()),
                ..PlaybackSnapshot::default()
            },
            Slot::Active {
                live,
                playing,
                position,
                duration,
            } => PlaybackSnapshot {
                active_album_id: Some(live.identity.album_id.clone()),
                active_track_index: Some(live.identity.track_index),
                is_playing: *playing,
                position_seconds: *position,
                duration_seconds: *duration,
                active_handle: Some(HandleRef {
                    id: live.id,
                    url: live.handle.url().to_string(),
                }),
                loading: None,
            },
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.slot, Slot::Active { playing: true, .. })
    }

    /// Id of the live handle, loading or active.
    pub fn current_handle(&self) -> Option<HandleId> {
        self.slot.live().map(|live| live.id)
    }

    /// When a coalesced seek becomes due.
    pub fn seek_deadline(&self) -> Option<Instant> {
        self.throttle.deadline()
    }

    /// When the loading handle exceeds `timeout`.
    pub fn loading_deadline(&self, timeout: Duration) -> Option<Instant> {
        match &self.slot {
            Slot::Loading { since, .. } => Some(*since + timeout),
            _ => None,
        }
    }

    /// Domain events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.events)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn open(&mut self, request: TrackRequest, now: Instant) -> Result<()> {
        let id = self.next_id;
        self.next_id = id.next();

        let mut stream = StreamRequest::streaming(request.url.clone());
        if let Some(title) = &request.title {
            stream = stream.with_title(title.clone());
        }

        let signals = SignalSender::new(id, self.signals.clone());
        let handle = match self.transport.open(stream, signals) {
            Ok(handle) => handle,
            Err(err) => {
                let err = PlaybackError::TransportUnavailable(err.to_string());
                error!(transport = self.transport.name(), album_id = %request.album_id, "{}", err);
                self.events.push(PlaybackEvent::Error {
                    album_id: Some(request.album_id),
                    track_index: Some(request.track_index),
                    message: err.to_string(),
                    recoverable: false,
                });
                return Err(err);
            }
        };

        let url = redact_url(&request.url);
        info!(handle = %id, album_id = %request.album_id, track_index = request.track_index, url = %url, "Opening stream");
        self.events.push(PlaybackEvent::Loading {
            album_id: request.album_id.clone(),
            track_index: request.track_index,
            url,
        });

        let identity = request.identity();
        self.slot = Slot::Loading {
            live: Live {
                id,
                handle,
                identity,
                retry: RetryState::Fresh,
            },
            since: now,
            duration_hint: valid_duration(request.duration_hint),
        };

        let started = match self.slot.live_mut() {
            Some(live) => live.handle.play(),
            None => Ok(()),
        };
        if let Err(err) = started {
            self.fail(id, FailureKind::Play, err.to_string());
        }
        Ok(())
    }

    fn on_playing(&mut self) -> SignalOutcome {
        match std::mem::replace(&mut self.slot, Slot::Idle) {
            Slot::Loading {
                live,
                duration_hint,
                ..
            } => {
                let duration = valid_duration(live.handle.duration()).or(duration_hint);
                info!(handle = %live.id, album_id = %live.identity.album_id, track_index = live.identity.track_index, "Playback started");
                self.events.push(PlaybackEvent::Started {
                    album_id: live.identity.album_id.clone(),
                    track_index: live.identity.track_index,
                });
                self.slot = Slot::Active {
                    live,
                    playing: true,
                    position: 0.0,
                    duration,
                };
                SignalOutcome::Applied
            }
            Slot::Active {
                mut live,
                playing: false,
                position,
                duration,
            } => {
                // Resumed by the host (native controls) or by the retry
                if live.retry == RetryState::AwaitingUnlock {
                    live.retry = RetryState::Retried;
                }
                let duration = duration.or_else(|| valid_duration(live.handle.duration()));
                debug!(handle = %live.id, "Transport resumed playback");
                self.events.push(PlaybackEvent::Resumed {
                    album_id: live.identity.album_id.clone(),
                    track_index: live.identity.track_index,
                    position_ms: to_ms(position),
                });
                self.slot = Slot::Active {
                    live,
                    playing: true,
                    position,
                    duration,
                };
                SignalOutcome::Applied
            }
            other => {
                self.slot = other;
                SignalOutcome::Ignored
            }
        }
    }

    fn on_paused(&mut self) -> SignalOutcome {
        match &mut self.slot {
            Slot::Active {
                live,
                playing: playing @ true,
                position,
                ..
            } => {
                *playing = false;
                debug!(handle = %live.id, "Transport paused playback");
                self.events.push(PlaybackEvent::Paused {
                    album_id: live.identity.album_id.clone(),
                    track_index: live.identity.track_index,
                    position_ms: to_ms(*position),
                });
                SignalOutcome::Applied
            }
            _ => SignalOutcome::Ignored,
        }
    }

    fn on_unlocked(&mut self, now: Instant) -> SignalOutcome {
        let Some(live) = self.slot.live_mut() else {
            return SignalOutcome::Ignored;
        };
        if live.retry != RetryState::AwaitingUnlock {
            return SignalOutcome::Ignored;
        }

        live.retry = RetryState::Retried;
        let id = live.id;
        info!(handle = %id, "Audio unlocked, retrying playback");
        let retried = live.handle.play();

        if let Slot::Loading { since, .. } = &mut self.slot {
            *since = now;
        }

        match retried {
            Ok(()) => SignalOutcome::Applied,
            Err(err) => self.fail(id, FailureKind::Play, err.to_string()),
        }
    }

    /// First failure arms a retry on the next unlock; the second gives up.
    fn fail(&mut self, id: HandleId, kind: FailureKind, message: String) -> SignalOutcome {
        let Some(live) = self.slot.live_mut() else {
            return SignalOutcome::Ignored;
        };

        if live.retry == RetryState::Fresh {
            live.retry = RetryState::AwaitingUnlock;
            warn!(handle = %id, "{}; retrying after unlock", kind.into_error(message));
            if let Slot::Active { playing, .. } = &mut self.slot {
                *playing = false;
            }
            return SignalOutcome::Applied;
        }

        let err = kind.into_error(message);
        if let Some(identity) = self.teardown() {
            error!(handle = %id, album_id = %identity.album_id, track_index = identity.track_index, "Giving up on track: {}", err);
            self.events.push(PlaybackEvent::Error {
                album_id: Some(identity.album_id),
                track_index: Some(identity.track_index),
                message: err.to_string(),
                recoverable: true,
            });
        }
        SignalOutcome::Applied
    }

    /// The single teardown path. Returns the identity that was loaded.
    fn teardown(&mut self) -> Option<TrackIdentity> {
        self.throttle.reset();
        match std::mem::replace(&mut self.slot, Slot::Idle) {
            Slot::Idle => None,
            Slot::Loading { mut live, .. } | Slot::Active { mut live, .. } => {
                live.handle.release();
                debug!(handle = %live.id, "Released transport handle");
                Some(live.identity)
            }
        }
    }
}

impl PositionSource for PlaybackSession {
    fn transport_position(&self) -> Option<f64> {
        // The transport still reports the old playhead until the coalesced
        // seek is applied.
        if self.throttle.is_pending() {
            return None;
        }
        match &self.slot {
            Slot::Active { live, .. } => live.handle.position(),
            _ => None,
        }
    }

    fn publish_position(&mut self, seconds: f64) {
        if let Slot::Active {
            live,
            position,
            duration,
            ..
        } = &mut self.slot
        {
            if duration.is_none() {
                *duration = valid_duration(live.handle.duration());
            }
            *position = match *duration {
                Some(total) => seconds.min(total),
                None => seconds,
            };
        }
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        if let Some(live) = self.slot.live_mut() {
            live.handle.release();
        }
    }
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("transport", &self.transport.name())
            .field("handle", &self.current_handle())
            .field("snapshot", &self.snapshot())
            .finish()
    }
}
