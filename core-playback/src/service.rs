//! # Session Service
//!
//! Runs the [`PlaybackSession`] on a single task and hands out cheap
//! controllers to every card.
//!
//! ## Architecture
//!
//! ```text
//!  PlaybackController ──commands (mpsc)──┐
//!  PlaybackController ───────────────────┤
//!                                        ▼
//!  transport callbacks ──signals──> SessionService loop ──snapshot (watch)──> cards
//!                                        │
//!             seek window / load timeout │ progress tick
//!                                        ▼
//!                                   EventBus (broadcast) ──> observers
//! ```
//!
//! The loop is the only writer. Commands, transport signals and timer
//! deadlines are applied in the order the loop observes them; after each step
//! the snapshot is republished (only when it changed) and queued domain events
//! are emitted on the bus.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let bus = EventBus::default();
//! let controller = SessionService::spawn(transport, SessionConfig::default(), bus);
//!
//! controller.play(TrackRequest::new(url, "alb-1", 0))?;
//! let mut state = controller.subscribe();
//! state.changed().await?;
//! ```

use crate::config::SessionConfig;
use crate::error::{PlaybackError, Result};
use crate::progress::ProgressSynchronizer;
use crate::session::PlaybackSession;
use crate::types::{PlaybackSnapshot, TrackRequest};
use bridge_traits::{AudioTransport, TransportEvent};
use core_runtime::events::{CoreEvent, EventBus, Receiver};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// Requests sent from controllers to the session loop.
#[derive(Debug)]
pub enum SessionCommand {
    Play(TrackRequest),
    Pause,
    Stop,
    Seek(f64),
    /// Release the handle and end the loop; acknowledged once torn down.
    Shutdown(oneshot::Sender<()>),
}

/// The operations a card needs from the session.
pub trait PlaybackControl {
    fn play(&self, request: TrackRequest) -> Result<()>;
    fn pause(&self) -> Result<()>;
    fn seek(&self, seconds: f64) -> Result<()>;
}

// ============================================================================
// Controller
// ============================================================================

/// Handle to the shared session. Clone one into every card.
///
/// Commands are fire-and-forget: a successful return means the command was
/// queued, and its effect arrives later through the snapshot.
#[derive(Clone)]
pub struct PlaybackController {
    commands: mpsc::Sender<SessionCommand>,
    snapshot: watch::Receiver<PlaybackSnapshot>,
    events: EventBus,
}

impl PlaybackController {
    /// Queue a play request. Requests without a locator are rejected here,
    /// before they reach the session.
    pub fn play(&self, request: TrackRequest) -> Result<()> {
        if let Err(err) = request.validate() {
            warn!(
                album_id = %request.album_id,
                track_index = request.track_index,
                "Rejected play request: {}",
                err
            );
            return Err(err);
        }
        self.send(SessionCommand::Play(request))
    }

    pub fn pause(&self) -> Result<()> {
        self.send(SessionCommand::Pause)
    }

    pub fn stop(&self) -> Result<()> {
        self.send(SessionCommand::Stop)
    }

    pub fn seek(&self, seconds: f64) -> Result<()> {
        self.send(SessionCommand::Seek(seconds))
    }

    /// Latest published state.
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshot.clone()
    }

    /// Subscribe to domain events (started, paused, errors, ...).
    pub fn events(&self) -> Receiver<CoreEvent> {
        self.events.subscribe()
    }

    /// Whether the session loop has exited.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Release the handle and stop the session loop.
    ///
    /// Resolves once the handle has been released.
    pub async fn shutdown(&self) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.commands
            .send(SessionCommand::Shutdown(ack))
            .await
            .map_err(|_| PlaybackError::SessionClosed)?;
        done.await.map_err(|_| PlaybackError::SessionClosed)
    }

    fn send(&self, command: SessionCommand) -> Result<()> {
        self.commands.try_send(command).map_err(|err| match err {
            TrySendError::Closed(_) => PlaybackError::SessionClosed,
            TrySendError::Full(command) => {
                warn!(?command, "Playback command buffer full, dropping command");
                PlaybackError::Internal("playback command buffer full".to_string())
            }
        })
    }
}

impl PlaybackControl for PlaybackController {
    fn play(&self, request: TrackRequest) -> Result<()> {
        PlaybackController::play(self, request)
    }

    fn pause(&self) -> Result<()> {
        PlaybackController::pause(self)
    }

    fn seek(&self, seconds: f64) -> Result<()> {
        PlaybackController::seek(self, seconds)
    }
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ============================================================================
// Service loop
// ============================================================================

/// Single-writer loop owning the session and the progress synchronizer.
pub struct SessionService {
    session: PlaybackSession,
    progress: ProgressSynchronizer,
    config: SessionConfig,
    commands: mpsc::Receiver<SessionCommand>,
    signals: mpsc::UnboundedReceiver<TransportEvent>,
    snapshot: watch::Sender<PlaybackSnapshot>,
    events: EventBus,
}

impl SessionService {
    /// Build the loop and its first controller without starting it.
    pub fn new(
        transport: Arc<dyn AudioTransport>,
        config: SessionConfig,
        events: EventBus,
    ) -> (Self, PlaybackController) {
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer.max(1));
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(PlaybackSnapshot::default());

        let service = Self {
            session: PlaybackSession::new(transport, signal_tx, &config),
            progress: ProgressSynchronizer::new(config.frame_interval),
            config,
            commands: command_rx,
            signals: signal_rx,
            snapshot: snapshot_tx,
            events: events.clone(),
        };

        let controller = PlaybackController {
            commands: command_tx,
            snapshot: snapshot_rx,
            events,
        };

        (service, controller)
    }

    /// Start the loop on the current tokio runtime.
    pub fn spawn(
        transport: Arc<dyn AudioTransport>,
        config: SessionConfig,
        events: EventBus,
    ) -> PlaybackController {
        let (service, controller) = Self::new(transport, config, events);
        service.start();
        controller
    }

    /// Spawn an already built loop.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run until shutdown or until every controller is dropped.
    pub async fn run(mut self) {
        debug!("Playback session loop started");

        loop {
            let seek_at = self.session.seek_deadline();
            let load_at = self
                .config
                .load_timeout
                .and_then(|timeout| self.session.loading_deadline(timeout));
            let tick_at = self.progress.deadline();

            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(SessionCommand::Shutdown(ack)) => {
                        self.close();
                        let _ = ack.send(());
                        break;
                    }
                    Some(command) => self.apply(command),
                    None => {
                        self.close();
                        break;
                    }
                },
                Some(event) = self.signals.recv() => {
                    self.session.handle_signal(event, Instant::now());
                }
                _ = wait_until(seek_at) => {
                    self.session.flush_seek(Instant::now());
                }
                _ = wait_until(load_at) => {
                    if let Some(timeout) = self.config.load_timeout {
                        self.session.expire_loading(Instant::now(), timeout);
                    }
                }
                _ = wait_until(tick_at) => {
                    let playing = self.session.is_playing();
                    self.progress.tick(&mut self.session, playing, Instant::now());
                }
            }

            self.publish();
        }

        info!("Playback session loop stopped");
    }

    fn apply(&mut self, command: SessionCommand) {
        let now = Instant::now();
        let result = match command {
            SessionCommand::Play(request) => self.session.play(request, now),
            SessionCommand::Pause => self.session.pause(),
            SessionCommand::Stop => {
                self.session.stop();
                Ok(())
            }
            SessionCommand::Seek(seconds) => self.session.seek(seconds, now),
            SessionCommand::Shutdown(_) => Ok(()),
        };

        if let Err(err) = result {
            if err.is_user_error() {
                debug!("Playback command rejected: {}", err);
            } else {
                warn!("Playback command failed: {}", err);
            }
        }
    }

    fn close(&mut self) {
        self.session.stop();
        self.publish();
    }

    fn publish(&mut self) {
        self.progress.sync(self.session.is_playing(), Instant::now());

        let snapshot = self.session.snapshot();
        self.snapshot.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });

        for event in self.session.drain_events() {
            // No subscribers is not an error
            let _ = self.events.emit(CoreEvent::Playback(event));
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
