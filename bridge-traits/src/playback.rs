//! Media transport bridge traits and supporting signal types.
//!
//! A transport is whatever the host uses to decode and play a streamed audio
//! resource: an `<audio>` element in the browser, a native player on mobile.
//! The playback core opens at most one [`TransportHandle`] at a time and
//! learns about asynchronous progress (ready, paused by the OS, ended,
//! failures) through [`TransportSignal`]s tagged with the handle's
//! [`HandleId`].

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

/// Identity of one transport handle.
///
/// Allocated by the session that opens the handle. Signals carry the id so a
/// late callback from a superseded handle can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandleId(u64);

impl HandleId {
    /// Construct an identifier from its raw value.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value.
    pub fn get(&self) -> u64 {
        self.0
    }

    /// The identifier allocated after this one.
    pub fn next(&self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle-{}", self.0)
    }
}

/// Request describing the stream a transport should open.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    /// Resource locator of the audio stream.
    pub url: String,
    /// Stream progressively instead of pre-buffering the whole resource.
    pub streaming: bool,
    /// Display title, for hosts that surface a media session.
    pub title: Option<String>,
}

impl StreamRequest {
    /// Create a streaming request for `url`.
    pub fn streaming(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            streaming: true,
            title: None,
        }
    }

    /// Attach a display title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Named signals a transport raises for one handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSignal {
    /// Playback started: the resource is ready and audio is flowing. Also
    /// raised when the host resumes playback on its own (native controls).
    Playing,
    /// Playback paused outside the core's control (native media controls).
    Paused,
    /// Natural end of the track.
    Ended,
    /// The resource could not be fetched or decoded.
    LoadError(String),
    /// The transport refused to start playback (e.g. autoplay policy).
    PlayError(String),
    /// A user gesture unlocked audio output; a blocked start may be retried.
    Unlocked,
}

impl TransportSignal {
    /// Returns `true` for the two failure signals.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            TransportSignal::LoadError(_) | TransportSignal::PlayError(_)
        )
    }

    /// Short name used in log fields.
    pub fn name(&self) -> &'static str {
        match self {
            TransportSignal::Playing => "playing",
            TransportSignal::Paused => "paused",
            TransportSignal::Ended => "ended",
            TransportSignal::LoadError(_) => "load_error",
            TransportSignal::PlayError(_) => "play_error",
            TransportSignal::Unlocked => "unlocked",
        }
    }
}

/// A signal tagged with the handle that raised it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    /// Originating handle.
    pub handle: HandleId,
    /// What happened.
    pub signal: TransportSignal,
}

/// Channel end a transport uses to report signals for one handle.
///
/// The sender is handed to [`AudioTransport::open`], before playback is
/// started, so no signal raised by the handle can be missed. It may be cloned
/// and moved into host callbacks running on any thread.
#[derive(Debug, Clone)]
pub struct SignalSender {
    handle: HandleId,
    tx: mpsc::UnboundedSender<TransportEvent>,
}

impl SignalSender {
    /// Bind a sender to `handle`.
    pub fn new(handle: HandleId, tx: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self { handle, tx }
    }

    /// Handle this sender reports for.
    pub fn handle(&self) -> HandleId {
        self.handle
    }

    /// Report a signal. Returns `false` once the receiving session is gone.
    pub fn emit(&self, signal: TransportSignal) -> bool {
        self.tx
            .send(TransportEvent {
                handle: self.handle,
                signal,
            })
            .is_ok()
    }
}

/// Host media transport capable of opening streaming handles.
pub trait AudioTransport: Send + Sync {
    /// Create a handle bound to `request.url`, wiring its lifecycle callbacks
    /// to `signals`. Must not start playback; the caller invokes
    /// [`TransportHandle::play`] once the handle is stored.
    ///
    /// An error means the transport itself is unavailable or blocked.
    fn open(&self, request: StreamRequest, signals: SignalSender)
        -> Result<Box<dyn TransportHandle>>;

    /// Name used in diagnostics.
    fn name(&self) -> &str {
        "transport"
    }
}

/// Transport control for one live handle.
///
/// Start and resume are both [`play`](TransportHandle::play); completion is
/// reported through signals rather than return values, mirroring how host
/// media APIs behave.
pub trait TransportHandle: Send {
    /// Resource locator this handle is bound to.
    fn url(&self) -> &str;

    /// Start or resume playback.
    fn play(&mut self) -> Result<()>;

    /// Pause playback, keeping the decoder and position.
    fn pause(&mut self) -> Result<()>;

    /// Move the playhead to `seconds`.
    fn seek(&mut self, seconds: f64) -> Result<()>;

    /// Current playhead in seconds. May be `None` or non-finite while the
    /// transport is seeking or buffering.
    fn position(&self) -> Option<f64>;

    /// Total duration in seconds, once known.
    fn duration(&self) -> Option<f64> {
        None
    }

    /// Stop playback and free decode and network resources. The handle is
    /// unusable afterwards.
    fn release(&mut self);
}
