//! Recording fake transport shared by the integration suites.

#![allow(dead_code)]

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    AudioTransport, BridgeError, HandleId, SignalSender, StreamRequest, TransportHandle,
    TransportSignal,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Everything the fake knows about one opened handle.
#[derive(Debug, Clone)]
pub struct HandleRecord {
    pub id: HandleId,
    pub url: String,
    pub streaming: bool,
    pub signals: SignalSender,
    pub plays: usize,
    pub pauses: usize,
    pub seeks: Vec<f64>,
    pub released: bool,
    pub position: Option<f64>,
    pub duration: Option<f64>,
}

#[derive(Default)]
struct FakeState {
    handles: Vec<HandleRecord>,
    max_live: usize,
    fail_open: bool,
    fail_play: bool,
    default_duration: Option<f64>,
    resolved_url: Option<String>,
}

/// Transport that records every call and lets tests raise signals.
#[derive(Clone, Default)]
pub struct FakeTransport {
    state: Arc<Mutex<FakeState>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(&self) -> Arc<dyn AudioTransport> {
        Arc::new(self.clone())
    }

    /// Make `open` fail as if the host had no media API.
    pub fn fail_open(&self, fail: bool) {
        self.state.lock().fail_open = fail;
    }

    /// Make `play` fail synchronously.
    pub fn fail_play(&self, fail: bool) {
        self.state.lock().fail_play = fail;
    }

    /// Duration reported by handles opened from now on.
    pub fn with_duration(self, seconds: f64) -> Self {
        self.state.lock().default_duration = Some(seconds);
        self
    }

    /// Handles opened from now on report `url` as their loaded source,
    /// like a host following a redirect.
    pub fn resolve_to(self, url: &str) -> Self {
        self.state.lock().resolved_url = Some(url.to_string());
        self
    }

    /// Number of handles ever opened.
    pub fn opened(&self) -> usize {
        self.state.lock().handles.len()
    }

    /// Handles opened and not yet released.
    pub fn live(&self) -> usize {
        self.state.lock().handles.iter().filter(|h| !h.released).count()
    }

    /// Highest number of simultaneously live handles ever observed.
    pub fn max_live(&self) -> usize {
        self.state.lock().max_live
    }

    pub fn record(&self, index: usize) -> HandleRecord {
        self.state.lock().handles[index].clone()
    }

    pub fn last(&self) -> HandleRecord {
        let state = self.state.lock();
        state.handles[state.handles.len() - 1].clone()
    }

    pub fn seeks(&self, index: usize) -> Vec<f64> {
        self.record(index).seeks
    }

    /// Raise a signal from handle `index`, as the host would.
    pub fn emit(&self, index: usize, signal: TransportSignal) -> bool {
        let sender = self.record(index).signals;
        sender.emit(signal)
    }

    pub fn set_position(&self, index: usize, position: Option<f64>) {
        self.state.lock().handles[index].position = position;
    }
}

impl AudioTransport for FakeTransport {
    fn open(
        &self,
        request: StreamRequest,
        signals: SignalSender,
    ) -> BridgeResult<Box<dyn TransportHandle>> {
        let mut state = self.state.lock();
        if state.fail_open {
            return Err(BridgeError::NotAvailable("no media element".to_string()));
        }

        let index = state.handles.len();
        let duration = state.default_duration;
        state.handles.push(HandleRecord {
            id: signals.handle(),
            url: request.url.clone(),
            streaming: request.streaming,
            signals,
            plays: 0,
            pauses: 0,
            seeks: Vec::new(),
            released: false,
            position: Some(0.0),
            duration,
        });

        let live = state.handles.iter().filter(|h| !h.released).count();
        state.max_live = state.max_live.max(live);

        let loaded = state.resolved_url.clone().unwrap_or(request.url);
        Ok(Box::new(FakeHandle {
            index,
            url: loaded,
            state: Arc::clone(&self.state),
        }))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

struct FakeHandle {
    index: usize,
    url: String,
    state: Arc<Mutex<FakeState>>,
}

impl TransportHandle for FakeHandle {
    fn url(&self) -> &str {
        &self.url
    }

    fn play(&mut self) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.handles[self.index].plays += 1;
        if state.fail_play {
            return Err(BridgeError::PolicyBlocked("autoplay".to_string()));
        }
        Ok(())
    }

    fn pause(&mut self) -> BridgeResult<()> {
        self.state.lock().handles[self.index].pauses += 1;
        Ok(())
    }

    fn seek(&mut self, seconds: f64) -> BridgeResult<()> {
        let mut state = self.state.lock();
        let record = &mut state.handles[self.index];
        record.seeks.push(seconds);
        record.position = Some(seconds);
        Ok(())
    }

    fn position(&self) -> Option<f64> {
        self.state.lock().handles[self.index].position
    }

    fn duration(&self) -> Option<f64> {
        self.state.lock().handles[self.index].duration
    }

    fn release(&mut self) {
        self.state.lock().handles[self.index].released = true;
    }
}
