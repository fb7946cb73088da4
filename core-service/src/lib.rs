//! Composition root for the shared playback session.
//!
//! A host application creates exactly one [`PlaybackProvider`] when it
//! starts, hands [`PlaybackController`]s to every album card it mounts, and
//! shuts the provider down when it unmounts. There is no module-level global:
//! tests build a fresh provider each.
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use core_service::PlaybackProvider;
//! use core_playback::SessionConfig;
//!
//! let config = CoreConfig::builder()
//!     .transport(Arc::new(HostTransport::new()))
//!     .build()?;
//! core_runtime::logging::init_logging(PlaybackProvider::logging_config(&config))?;
//!
//! let provider = PlaybackProvider::start(config, SessionConfig::default())?;
//! let card = provider.card(&album);
//! card.toggle(&provider.snapshot(), &provider.controller())?;
//! // ...
//! provider.shutdown().await?;
//! ```

pub mod error;

pub use error::{CoreError, Result};

use core_library::Album;
use core_playback::{
    CardPlayback, PlaybackController, PlaybackError, PlaybackSnapshot, SessionConfig,
    SessionService,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, LifecycleEvent};
use core_runtime::logging::LoggingConfig;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

/// Owner of the one playback session per application.
///
/// Dropping the provider without calling [`shutdown`](Self::shutdown) aborts
/// the session task, which still releases the transport handle.
pub struct PlaybackProvider {
    session_id: String,
    controller: PlaybackController,
    events: EventBus,
    task: Option<JoinHandle<()>>,
}

impl PlaybackProvider {
    /// Create the session. Must be called inside a tokio runtime.
    pub fn start(config: CoreConfig, session: SessionConfig) -> Result<Self> {
        let events = EventBus::new(config.event_buffer_size);
        Self::start_with_events(config, session, events)
    }

    /// Create the session publishing on an existing bus, so observers can
    /// subscribe before the session-started event is emitted.
    pub fn start_with_events(
        config: CoreConfig,
        session: SessionConfig,
        events: EventBus,
    ) -> Result<Self> {
        config.validate()?;
        session.validate().map_err(|reason| {
            CoreError::InitializationFailed(format!("invalid session config: {}", reason))
        })?;

        let session_id = Uuid::new_v4().to_string();
        let transport = config.transport.name().to_string();

        let (service, controller) =
            SessionService::new(Arc::clone(&config.transport), session, events.clone());
        let task = service.start();

        info!(session_id = %session_id, transport = %transport, "Playback session started");
        let _ = events.emit(CoreEvent::Lifecycle(LifecycleEvent::SessionStarted {
            session_id: session_id.clone(),
            transport,
        }));

        Ok(Self {
            session_id,
            controller,
            events,
            task: Some(task),
        })
    }

    /// Logging setup mirroring logs into the host sink configured on
    /// `config`, if any.
    pub fn logging_config(config: &CoreConfig) -> LoggingConfig {
        match &config.logger_sink {
            Some(sink) => LoggingConfig::default().with_logger_sink(Arc::clone(sink)),
            None => LoggingConfig::default(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// A controller for one more card or mini-player.
    pub fn controller(&self) -> PlaybackController {
        self.controller.clone()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.controller.snapshot()
    }

    /// Card adapter for a catalog album.
    pub fn card(&self, album: &Album) -> CardPlayback {
        CardPlayback::for_album(album)
    }

    /// Release the handle, stop the session task and announce it.
    pub async fn shutdown(mut self) -> Result<()> {
        match self.controller.shutdown().await {
            Ok(()) | Err(PlaybackError::SessionClosed) => {}
            Err(err) => return Err(err.into()),
        }

        if let Some(task) = self.task.take() {
            task.await
                .map_err(|err| CoreError::SessionTask(err.to_string()))?;
        }

        info!(session_id = %self.session_id, "Playback session closed");
        let _ = self
            .events
            .emit(CoreEvent::Lifecycle(LifecycleEvent::SessionClosed {
                session_id: self.session_id.clone(),
            }));
        Ok(())
    }
}

impl Drop for PlaybackProvider {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            warn!(session_id = %self.session_id, "Playback provider dropped without shutdown");
            task.abort();
        }
    }
}

impl std::fmt::Debug for PlaybackProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackProvider")
            .field("session_id", &self.session_id)
            .field("running", &self.task.is_some())
            .finish()
    }
}
