//! Playback session walkthrough
//!
//! Drives the shared session from two album cards against a simulated
//! transport and prints the domain events as they are published.
//!
//! Run with:
//! ```bash
//! # Pretty format (default in debug)
//! cargo run -p core-service --example session_demo
//!
//! # JSON format with session internals
//! cargo run -p core-service --example session_demo -- json "core_playback=trace"
//! ```

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    AudioTransport, LogLevel, SignalSender, StreamRequest, TransportHandle, TransportSignal,
};
use core_library::Album;
use core_playback::SessionConfig;
use core_runtime::config::CoreConfig;
use core_runtime::logging::{init_logging, LogFormat};
use core_service::PlaybackProvider;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::info;

/// Transport whose handles start instantly and advance in real time.
struct SimulatedTransport;

impl AudioTransport for SimulatedTransport {
    fn open(
        &self,
        request: StreamRequest,
        signals: SignalSender,
    ) -> BridgeResult<Box<dyn TransportHandle>> {
        Ok(Box::new(SimulatedHandle {
            url: request.url,
            signals,
            offset: 0.0,
            started: None,
        }))
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

struct SimulatedHandle {
    url: String,
    signals: SignalSender,
    offset: f64,
    started: Option<Instant>,
}

impl TransportHandle for SimulatedHandle {
    fn url(&self) -> &str {
        &self.url
    }

    fn play(&mut self) -> BridgeResult<()> {
        self.started = Some(Instant::now());
        self.signals.emit(TransportSignal::Playing);
        Ok(())
    }

    fn pause(&mut self) -> BridgeResult<()> {
        self.offset = self.position().unwrap_or(self.offset);
        self.started = None;
        Ok(())
    }

    fn seek(&mut self, seconds: f64) -> BridgeResult<()> {
        self.offset = seconds;
        if self.started.is_some() {
            self.started = Some(Instant::now());
        }
        Ok(())
    }

    fn position(&self) -> Option<f64> {
        Some(match self.started {
            Some(started) => self.offset + started.elapsed().as_secs_f64(),
            None => self.offset,
        })
    }

    fn duration(&self) -> Option<f64> {
        Some(240.0)
    }

    fn release(&mut self) {
        self.started = None;
    }
}

const ALBUMS: &str = r#"[
    { "id": "alb-night", "title": "Night Drive", "tracks": [
        { "kind": "custom", "title": "Headlights",
          "audioFile": { "asset": { "url": "https://cdn.example.com/night/01.mp3" } } },
        { "kind": "custom", "title": "Tunnel", "audioUrl": "https://cdn.example.com/night/02.mp3" }
    ] },
    { "id": "alb-live", "title": "Live Sessions", "tracks": [
        { "kind": "embedded", "title": "Encore",
          "streamUrl": "https://stream.example.com/encore", "durationMs": 312000 }
    ] }
]"#;

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::default(),
    };

    let config = CoreConfig::builder()
        .transport(Arc::new(SimulatedTransport))
        .build()
        .expect("Failed to build config");

    let mut logging = PlaybackProvider::logging_config(&config)
        .with_format(format)
        .with_level(LogLevel::Debug);
    if let Some(filter) = args.get(2) {
        logging = logging.with_filter(filter.clone());
    }
    init_logging(logging).expect("Failed to initialize logging");

    let albums: Vec<Album> = serde_json_albums();
    let provider =
        PlaybackProvider::start(config, SessionConfig::default()).expect("Failed to start");

    let mut events = provider.controller().events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!(severity = ?event.severity(), "{}", event.description());
        }
    });

    let controller = provider.controller();
    let mut night = provider.card(&albums[0]);
    let live = provider.card(&albums[1]);

    info!("=== Card 'Night Drive' plays its second track ===");
    night.select(1).expect("track exists");
    night
        .toggle(&provider.snapshot(), &controller)
        .expect("play");
    sleep(Duration::from_millis(500)).await;
    info!(fraction = ?night.progress_fraction(&provider.snapshot()), "Progress");

    info!("=== Scrubbing ===");
    for target in [30.0, 31.0, 32.5, 34.0] {
        night
            .seek(&provider.snapshot(), target, &controller)
            .expect("seek");
        sleep(Duration::from_millis(20)).await;
    }
    sleep(Duration::from_millis(200)).await;

    info!("=== Pause and resume from the same card ===");
    night.toggle(&provider.snapshot(), &controller).expect("pause");
    sleep(Duration::from_millis(100)).await;
    night
        .toggle(&provider.snapshot(), &controller)
        .expect("resume");
    sleep(Duration::from_millis(100)).await;

    info!("=== Card 'Live Sessions' takes over ===");
    live.toggle(&provider.snapshot(), &controller).expect("play");
    sleep(Duration::from_millis(200)).await;

    let snapshot = provider.snapshot();
    info!(
        night_playing = night.is_this_track_playing(&snapshot),
        live_playing = live.is_this_track_playing(&snapshot),
        "Card state"
    );

    provider.shutdown().await.expect("shutdown");
    sleep(Duration::from_millis(50)).await;
}

fn serde_json_albums() -> Vec<Album> {
    let documents: Vec<serde_json::Value> =
        serde_json::from_str(ALBUMS).expect("valid album fixtures");
    documents
        .iter()
        .map(|document| Album::from_json(&document.to_string()).expect("valid album"))
        .collect()
}
