//! Session state machine tests
//!
//! This suite drives [`PlaybackSession`] directly with explicit instants and
//! verifies:
//! - At most one live handle, and late signals from superseded handles
//! - Resume in place vs replace
//! - Position reset on track switch
//! - Seek coalescing and optimistic position
//! - Teardown idempotence and the retry-once failure policy

mod common;

use bridge_traits::{TransportEvent, TransportSignal};
use common::FakeTransport;
use core_playback::{
    PlaybackError, PlaybackSession, PlaybackSnapshot, PositionSource, ProgressSynchronizer,
    SessionConfig, SignalOutcome, TrackIdentity, TrackRequest,
};
use core_runtime::events::PlaybackEvent;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

// ============================================================================
// Helpers
// ============================================================================

const URL_A: &str = "https://cdn.example.com/alb1/01.mp3";
const URL_B: &str = "https://cdn.example.com/alb1/02.mp3";

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

struct Harness {
    fake: FakeTransport,
    session: PlaybackSession,
    signals: mpsc::UnboundedReceiver<TransportEvent>,
    start: Instant,
}

impl Harness {
    fn new() -> Self {
        Self::with_transport(FakeTransport::new())
    }

    fn with_transport(fake: FakeTransport) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = PlaybackSession::new(fake.shared(), tx, &SessionConfig::default());
        Self {
            fake,
            session,
            signals: rx,
            start: Instant::now(),
        }
    }

    fn at(&self, offset: u64) -> Instant {
        self.start + ms(offset)
    }

    /// Feed every queued transport signal to the session.
    fn pump(&mut self) -> Vec<SignalOutcome> {
        let now = Instant::now();
        let mut outcomes = Vec::new();
        while let Ok(event) = self.signals.try_recv() {
            outcomes.push(self.session.handle_signal(event, now));
        }
        outcomes
    }

    fn emit(&mut self, index: usize, signal: TransportSignal) -> Vec<SignalOutcome> {
        assert!(self.fake.emit(index, signal));
        self.pump()
    }

    /// Play and deliver the ready signal for the newly opened handle.
    fn play_ready(&mut self, url: &str, album: &str, index: usize) {
        self.session
            .play(TrackRequest::new(url, album, index), self.start)
            .unwrap();
        let handle = self.fake.opened() - 1;
        assert_eq!(
            self.emit(handle, TransportSignal::Playing),
            vec![SignalOutcome::Applied]
        );
    }
}

fn idle() -> PlaybackSnapshot {
    PlaybackSnapshot::default()
}

// ============================================================================
// Single-handle invariant
// ============================================================================

#[test]
fn test_second_play_supersedes_pending_first() {
    let mut h = Harness::new();

    h.session
        .play(TrackRequest::new(URL_A, "alb-a", 0), h.start)
        .unwrap();
    h.session
        .play(TrackRequest::new(URL_B, "alb-b", 0), h.at(5))
        .unwrap();

    // A was released before B was opened
    assert_eq!(h.fake.opened(), 2);
    assert!(h.fake.record(0).released);
    assert_eq!(h.fake.max_live(), 1);

    // A's ready callback arrives late and must not touch state
    assert_eq!(
        h.emit(0, TransportSignal::Playing),
        vec![SignalOutcome::Stale]
    );
    let snapshot = h.session.snapshot();
    assert_eq!(snapshot.loading, Some(TrackIdentity::new("alb-b", 0)));
    assert_eq!(snapshot.active_album_id, None);
    assert!(!snapshot.is_playing);

    assert_eq!(
        h.emit(1, TransportSignal::Playing),
        vec![SignalOutcome::Applied]
    );
    let snapshot = h.session.snapshot();
    assert_eq!(snapshot.active_album_id.as_deref(), Some("alb-b"));
    assert_eq!(snapshot.active_track_index, Some(0));
    assert_eq!(snapshot.active_url(), Some(URL_B));
    assert!(snapshot.is_playing);
    assert_eq!(h.fake.live(), 1);
}

#[test]
fn test_stale_failure_and_end_signals_are_discarded() {
    let mut h = Harness::new();
    h.play_ready(URL_A, "alb-a", 0);
    h.play_ready(URL_B, "alb-b", 1);

    for signal in [
        TransportSignal::Ended,
        TransportSignal::LoadError("late".into()),
        TransportSignal::Paused,
    ] {
        assert_eq!(h.emit(0, signal), vec![SignalOutcome::Stale]);
    }

    assert!(h.session.is_playing());
    assert_eq!(h.session.snapshot().active_album_id.as_deref(), Some("alb-b"));
}

#[test]
fn test_play_streams_without_prebuffer() {
    let mut h = Harness::new();
    h.session
        .play(TrackRequest::new(URL_A, "alb-a", 0), h.start)
        .unwrap();

    let record = h.fake.record(0);
    assert!(record.streaming);
    assert_eq!(record.url, URL_A);
    assert_eq!(record.plays, 1);
}

// ============================================================================
// Resume vs replace
// ============================================================================

#[test]
fn test_resume_same_track_keeps_handle_and_position() {
    let mut h = Harness::new();
    h.play_ready(URL_A, "alb1", 0);
    h.session.publish_position(12.5);

    h.session.pause().unwrap();
    let paused = h.session.snapshot();
    assert!(!paused.is_playing);
    assert_eq!(paused.position_seconds, 12.5);
    assert_eq!(h.fake.record(0).pauses, 1);

    h.session
        .play(TrackRequest::new(URL_A, "alb1", 0), h.at(1_000))
        .unwrap();

    assert_eq!(h.fake.opened(), 1, "resume must not load a new handle");
    assert_eq!(h.fake.record(0).plays, 2);
    let resumed = h.session.snapshot();
    assert!(resumed.is_playing);
    assert_eq!(resumed.position_seconds, 12.5);
}

#[test]
fn test_play_same_track_while_playing_is_noop() {
    let mut h = Harness::new();
    h.play_ready(URL_A, "alb1", 0);
    h.session.drain_events();

    h.session
        .play(TrackRequest::new(URL_A, "alb1", 0), h.at(10))
        .unwrap();

    assert_eq!(h.fake.opened(), 1);
    assert_eq!(h.fake.record(0).plays, 1);
    assert!(h.session.drain_events().is_empty());
}

#[test]
fn test_play_same_track_while_loading_is_noop() {
    let mut h = Harness::new();
    h.session
        .play(TrackRequest::new(URL_A, "alb1", 0), h.start)
        .unwrap();
    h.session
        .play(TrackRequest::new(URL_A, "alb1", 0), h.at(10))
        .unwrap();

    assert_eq!(h.fake.opened(), 1);
    assert!(!h.fake.record(0).released);
}

#[test]
fn test_switching_track_resets_position() {
    let mut h = Harness::new();
    h.play_ready(URL_A, "alb1", 0);
    h.session.publish_position(42.0);
    assert_eq!(h.session.snapshot().position_seconds, 42.0);

    h.session
        .play(TrackRequest::new(URL_B, "alb1", 1), h.at(100))
        .unwrap();
    assert_eq!(h.session.snapshot().position_seconds, 0.0);
    assert!(h.fake.record(0).released);

    h.emit(1, TransportSignal::Playing);
    let snapshot = h.session.snapshot();
    assert_eq!(snapshot.active_track_index, Some(1));
    assert_eq!(snapshot.position_seconds, 0.0);
}

// ============================================================================
// Pause / stop
// ============================================================================

#[test]
fn test_pause_without_playing_handle_is_noop() {
    let mut h = Harness::new();
    h.session.pause().unwrap();
    assert_eq!(h.session.snapshot(), idle());

    h.session
        .play(TrackRequest::new(URL_A, "alb1", 0), h.start)
        .unwrap();
    h.session.pause().unwrap();
    assert_eq!(h.fake.record(0).pauses, 0);
}

#[test]
fn test_stop_twice_is_idempotent() {
    let mut h = Harness::new();
    h.play_ready(URL_A, "alb1", 0);
    h.session.publish_position(30.0);

    h.session.stop();
    assert_eq!(h.session.snapshot(), idle());
    assert!(h.fake.record(0).released);

    h.session.stop();
    assert_eq!(h.session.snapshot(), idle());

    let stops = h
        .session
        .drain_events()
        .into_iter()
        .filter(|event| matches!(event, PlaybackEvent::Stopped { .. }))
        .count();
    assert_eq!(stops, 1);
}

#[test]
fn test_native_pause_and_resume_signals() {
    let mut h = Harness::new();
    h.play_ready(URL_A, "alb1", 0);

    assert_eq!(
        h.emit(0, TransportSignal::Paused),
        vec![SignalOutcome::Applied]
    );
    assert!(!h.session.is_playing());
    assert!(h.session.snapshot().active_handle.is_some());

    assert_eq!(
        h.emit(0, TransportSignal::Playing),
        vec![SignalOutcome::Applied]
    );
    assert!(h.session.is_playing());

    // Already playing
    assert_eq!(
        h.emit(0, TransportSignal::Playing),
        vec![SignalOutcome::Ignored]
    );
}

#[test]
fn test_track_end_tears_down() {
    let mut h = Harness::new();
    h.play_ready(URL_A, "alb1", 0);
    h.session.publish_position(180.0);

    h.emit(0, TransportSignal::Ended);

    assert_eq!(h.session.snapshot(), idle());
    assert!(h.fake.record(0).released);
    assert!(h
        .session
        .drain_events()
        .iter()
        .any(|event| matches!(event, PlaybackEvent::Completed { track_index: 0, .. })));
}

#[test]
fn test_snapshot_reports_url_loaded_by_transport() {
    let resolved = "https://edge.example.com/alb1/01.mp3";
    let mut h = Harness::with_transport(FakeTransport::new().resolve_to(resolved));
    h.play_ready(URL_A, "alb1", 0);

    assert_eq!(h.fake.record(0).url, URL_A);
    assert_eq!(h.session.snapshot().active_url(), Some(resolved));
}

// ============================================================================
// Seek
// ============================================================================

#[test]
fn test_seek_burst_fires_leading_then_one_trailing_with_latest() {
    let mut h = Harness::new();
    h.play_ready(URL_A, "alb1", 0);

    h.session.seek(5.0, h.at(0)).unwrap();
    h.session.seek(6.0, h.at(20)).unwrap();
    h.session.seek(7.0, h.at(45)).unwrap();

    // Leading edge only so far; position follows optimistically
    assert_eq!(h.fake.seeks(0), vec![5.0]);
    assert_eq!(h.session.snapshot().position_seconds, 7.0);
    assert_eq!(h.session.seek_deadline(), Some(h.at(100)));

    assert!(!h.session.flush_seek(h.at(99)));
    assert!(h.session.flush_seek(h.at(100)));

    let seeks = h.fake.seeks(0);
    assert_eq!(seeks, vec![5.0, 7.0]);
    assert_eq!(seeks.iter().filter(|s| **s == 7.0).count(), 1);
    assert!(!seeks.contains(&6.0));
    assert_eq!(h.session.seek_deadline(), None);
}

#[test]
fn test_pending_seek_suppresses_polling() {
    let mut h = Harness::new();
    h.play_ready(URL_A, "alb1", 0);

    h.session.seek(10.0, h.at(0)).unwrap();
    h.session.seek(20.0, h.at(10)).unwrap();
    h.fake.set_position(0, Some(10.0));

    assert_eq!(h.session.transport_position(), None);

    let mut sync = ProgressSynchronizer::default();
    let at = h.at(16);
    assert_eq!(sync.tick(&mut h.session, true, at), None);
    assert_eq!(h.session.snapshot().position_seconds, 20.0);

    h.session.flush_seek(h.at(100));
    assert_eq!(h.session.transport_position(), Some(20.0));
}

#[test]
fn test_seek_is_clamped_to_known_duration() {
    let mut h = Harness::with_transport(FakeTransport::new().with_duration(200.0));
    h.play_ready(URL_A, "alb1", 0);

    h.session.seek(500.0, h.at(0)).unwrap();
    assert_eq!(h.fake.seeks(0), vec![200.0]);

    h.session.seek(-3.0, h.at(500)).unwrap();
    assert_eq!(h.session.snapshot().position_seconds, 0.0);
}

#[test]
fn test_seek_rejections() {
    let mut h = Harness::new();
    assert!(matches!(
        h.session.seek(5.0, h.start),
        Err(PlaybackError::NoTrackLoaded)
    ));

    h.play_ready(URL_A, "alb1", 0);
    assert!(matches!(
        h.session.seek(f64::NAN, h.start),
        Err(PlaybackError::InvalidRequest(_))
    ));
    assert!(h.fake.seeks(0).is_empty());
}

#[test]
fn test_stop_drops_pending_seek() {
    let mut h = Harness::new();
    h.play_ready(URL_A, "alb1", 0);
    h.session.seek(5.0, h.at(0)).unwrap();
    h.session.seek(9.0, h.at(10)).unwrap();

    h.session.stop();
    assert_eq!(h.session.seek_deadline(), None);
    assert!(!h.session.flush_seek(h.at(200)));
    assert_eq!(h.fake.seeks(0), vec![5.0]);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_empty_url_rejected_before_any_handle() {
    let mut h = Harness::new();
    let err = h
        .session
        .play(TrackRequest::new("", "alb1", 0), h.start)
        .unwrap_err();

    assert!(matches!(err, PlaybackError::InvalidRequest(_)));
    assert_eq!(h.fake.opened(), 0);
    assert_eq!(h.session.snapshot(), idle());
}

#[test]
fn test_invalid_request_keeps_current_track() {
    let mut h = Harness::new();
    h.play_ready(URL_A, "alb1", 0);

    assert!(h
        .session
        .play(TrackRequest::new("  ", "alb2", 0), h.start)
        .is_err());
    assert!(h.session.is_playing());
    assert!(!h.fake.record(0).released);
}

#[test]
fn test_load_error_retries_once_after_unlock() {
    let mut h = Harness::new();
    h.session
        .play(TrackRequest::new(URL_A, "alb1", 0), h.start)
        .unwrap();

    h.emit(0, TransportSignal::LoadError("network".into()));
    // Still loading, handle kept for the retry
    assert_eq!(h.session.snapshot().loading, Some(TrackIdentity::new("alb1", 0)));
    assert!(!h.fake.record(0).released);

    h.emit(0, TransportSignal::Unlocked);
    assert_eq!(h.fake.record(0).plays, 2);

    h.emit(0, TransportSignal::Playing);
    assert!(h.session.is_playing());
    assert_eq!(h.fake.opened(), 1);
}

#[test]
fn test_second_failure_resets_to_idle() {
    let mut h = Harness::new();
    h.session
        .play(TrackRequest::new(URL_A, "alb1", 0), h.start)
        .unwrap();

    h.emit(0, TransportSignal::PlayError("autoplay blocked".into()));
    h.emit(0, TransportSignal::Unlocked);
    h.emit(0, TransportSignal::PlayError("still blocked".into()));

    assert_eq!(h.session.snapshot(), idle());
    assert!(h.fake.record(0).released);

    let error = h
        .session
        .drain_events()
        .into_iter()
        .find(|event| matches!(event, PlaybackEvent::Error { .. }));
    match error {
        Some(PlaybackEvent::Error {
            album_id,
            track_index,
            recoverable,
            message,
        }) => {
            assert_eq!(album_id.as_deref(), Some("alb1"));
            assert_eq!(track_index, Some(0));
            assert!(recoverable);
            assert!(message.contains("still blocked"));
        }
        other => panic!("expected error event, got {:?}", other),
    }
}

#[test]
fn test_unlock_without_failure_is_ignored() {
    let mut h = Harness::new();
    h.play_ready(URL_A, "alb1", 0);

    assert_eq!(
        h.emit(0, TransportSignal::Unlocked),
        vec![SignalOutcome::Ignored]
    );
    assert_eq!(h.fake.record(0).plays, 1);
}

#[test]
fn test_failure_while_active_stops_playing_until_unlock() {
    let mut h = Harness::new();
    h.play_ready(URL_A, "alb1", 0);
    h.session.publish_position(8.0);

    h.emit(0, TransportSignal::PlayError("interrupted".into()));
    let snapshot = h.session.snapshot();
    assert!(!snapshot.is_playing);
    assert_eq!(snapshot.active_track_index, Some(0));
    assert_eq!(snapshot.position_seconds, 8.0);

    h.emit(0, TransportSignal::Unlocked);
    h.emit(0, TransportSignal::Playing);
    assert!(h.session.is_playing());
}

#[test]
fn test_synchronous_play_failure_uses_retry_path() {
    let fake = FakeTransport::new();
    fake.fail_play(true);
    let mut h = Harness::with_transport(fake);

    h.session
        .play(TrackRequest::new(URL_A, "alb1", 0), h.start)
        .unwrap();
    assert!(h.session.snapshot().loading.is_some());

    // Retry also fails synchronously: give up
    h.emit(0, TransportSignal::Unlocked);
    assert_eq!(h.session.snapshot(), idle());
    assert!(h.fake.record(0).released);
}

#[test]
fn test_transport_unavailable() {
    let fake = FakeTransport::new();
    fake.fail_open(true);
    let mut h = Harness::with_transport(fake);

    let err = h
        .session
        .play(TrackRequest::new(URL_A, "alb1", 0), h.start)
        .unwrap_err();

    assert!(matches!(err, PlaybackError::TransportUnavailable(_)));
    assert_eq!(h.session.snapshot(), idle());
    assert!(h.session.drain_events().iter().any(|event| matches!(
        event,
        PlaybackEvent::Error {
            recoverable: false,
            ..
        }
    )));
}

#[test]
fn test_load_timeout_tears_down_stalled_handle() {
    let mut h = Harness::new();
    let timeout = Duration::from_secs(10);
    h.session
        .play(TrackRequest::new(URL_A, "alb1", 0), h.start)
        .unwrap();

    assert_eq!(
        h.session.loading_deadline(timeout),
        Some(h.start + timeout)
    );
    assert!(!h.session.expire_loading(h.at(9_999), timeout));
    assert!(h.session.expire_loading(h.at(10_000), timeout));

    assert_eq!(h.session.snapshot(), idle());
    assert!(h.fake.record(0).released);
}

#[test]
fn test_load_timeout_ignores_active_track() {
    let mut h = Harness::new();
    h.play_ready(URL_A, "alb1", 0);

    assert_eq!(h.session.loading_deadline(Duration::from_secs(1)), None);
    assert!(!h
        .session
        .expire_loading(h.at(60_000), Duration::from_secs(1)));
    assert!(h.session.is_playing());
}

// ============================================================================
// Events
// ============================================================================

#[test]
fn test_event_sequence_for_play_pause_resume() {
    let mut h = Harness::new();
    h.play_ready(URL_A, "alb1", 0);
    h.session.pause().unwrap();
    h.session
        .play(TrackRequest::new(URL_A, "alb1", 0), h.start)
        .unwrap();

    let names: Vec<&str> = h
        .session
        .drain_events()
        .iter()
        .map(|event| match event {
            PlaybackEvent::Loading { .. } => "loading",
            PlaybackEvent::Started { .. } => "started",
            PlaybackEvent::Paused { .. } => "paused",
            PlaybackEvent::Resumed { .. } => "resumed",
            _ => "other",
        })
        .collect();

    assert_eq!(names, vec!["loading", "started", "paused", "resumed"]);
}

#[test]
fn test_loading_event_redacts_signed_url() {
    let mut h = Harness::new();
    h.session
        .play(
            TrackRequest::new("https://cdn.example.com/a.mp3?Signature=secret", "alb1", 0),
            h.start,
        )
        .unwrap();

    match h.session.drain_events().first() {
        Some(PlaybackEvent::Loading { url, .. }) => {
            assert!(!url.contains("secret"));
        }
        other => panic!("expected loading event, got {:?}", other),
    }
}
