//! Shared test infrastructure: a scripted decoder backend

#![allow(dead_code)]

use aria_core::preferences::MemoryPreferences;
use aria_core::{AudioLocator, Track};
use aria_effects::{EffectsFactory, NoopEffects, SessionId};
use aria_playback::{
    Decoder, DecoderBackend, DecoderEvents, EngineConfig, EngineState, PlaybackError,
    PlaybackHandle, PlaybackEngine, PlaybackSnapshot, Result,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub const TRACK_DURATION_MS: u64 = 180_000;

// ============================================================================
// Mock decoder
// ============================================================================

/// Everything a mock decoder was asked to do
#[derive(Debug)]
pub struct DecoderState {
    pub locator: String,
    pub events: DecoderEvents,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub volume: f32,
    pub prepared: bool,
    pub playing: bool,
    pub stopped: bool,
    pub released: bool,
    pub starts: usize,
    pub seeks: Vec<u64>,
}

/// Test-side view of one opened decoder
#[derive(Debug, Clone)]
pub struct DecoderProbe(Arc<Mutex<DecoderState>>);

impl DecoderProbe {
    pub fn state(&self) -> MutexGuard<'_, DecoderState> {
        self.0.lock().unwrap()
    }

    pub fn session(&self) -> SessionId {
        self.state().events.session()
    }

    pub fn locator(&self) -> String {
        self.state().locator.clone()
    }

    pub fn set_position(&self, position_ms: u64) {
        self.state().position_ms = position_ms;
    }

    /// Report preparation done, as the platform would
    pub fn finish_preparing(&self) {
        let (events, duration_ms) = {
            let state = self.state();
            (state.events.clone(), state.duration_ms)
        };
        events.prepared(duration_ms);
    }

    /// Report reaching the end of the track
    pub fn complete(&self) {
        let events = self.state().events.clone();
        events.completed();
    }

    /// Report an asynchronous failure
    pub fn fail(&self, message: &str) {
        let events = self.state().events.clone();
        events.error(message);
    }

    pub fn is_released(&self) -> bool {
        self.state().released
    }

    pub fn is_playing(&self) -> bool {
        self.state().playing
    }
}

struct MockDecoder {
    state: Arc<Mutex<DecoderState>>,
    auto_prepare: bool,
}

impl MockDecoder {
    fn state(&self) -> MutexGuard<'_, DecoderState> {
        self.state.lock().unwrap()
    }
}

impl Decoder for MockDecoder {
    fn prepare(&mut self) -> Result<()> {
        let (events, duration_ms) = {
            let mut state = self.state();
            state.prepared = true;
            (state.events.clone(), state.duration_ms)
        };
        if self.auto_prepare {
            events.prepared(duration_ms);
        }
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        let mut state = self.state();
        if state.released {
            return Err(PlaybackError::Decoder("start after release".to_string()));
        }
        state.playing = true;
        state.starts += 1;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.state().playing = false;
        Ok(())
    }

    fn seek_to(&mut self, position_ms: u64) -> Result<()> {
        let mut state = self.state();
        state.position_ms = position_ms;
        state.seeks.push(position_ms);
        Ok(())
    }

    fn position_ms(&self) -> u64 {
        self.state().position_ms
    }

    fn duration_ms(&self) -> u64 {
        self.state().duration_ms
    }

    fn set_volume(&mut self, volume: f32) {
        self.state().volume = volume;
    }

    fn stop(&mut self) {
        let mut state = self.state();
        state.playing = false;
        state.stopped = true;
    }

    fn release(&mut self) {
        let mut state = self.state();
        state.playing = false;
        state.released = true;
    }
}

// ============================================================================
// Mock backend
// ============================================================================

#[derive(Default)]
struct BackendState {
    manual_prepare: bool,
    failing: HashSet<String>,
    opened: Vec<DecoderProbe>,
}

/// Backend that records every decoder it opens
#[derive(Clone, Default)]
pub struct MockBackend {
    inner: Arc<Mutex<BackendState>>,
}

impl MockBackend {
    /// Decoders report ready as soon as `prepare` is called
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoders wait for [`DecoderProbe::finish_preparing`]
    pub fn manual() -> Self {
        let backend = Self::default();
        backend.inner.lock().unwrap().manual_prepare = true;
        backend
    }

    /// Refuse to open this locator
    pub fn fail_on(&self, locator: &str) {
        self.inner.lock().unwrap().failing.insert(locator.to_string());
    }

    pub fn opened(&self) -> usize {
        self.inner.lock().unwrap().opened.len()
    }

    pub fn decoder(&self, index: usize) -> DecoderProbe {
        self.inner.lock().unwrap().opened[index].clone()
    }

    pub fn last(&self) -> DecoderProbe {
        self.inner.lock().unwrap().opened.last().unwrap().clone()
    }
}

impl DecoderBackend for MockBackend {
    fn open(&self, locator: &AudioLocator, events: DecoderEvents) -> Result<Box<dyn Decoder>> {
        let mut inner = self.inner.lock().unwrap();
        let locator = locator.to_string();
        if inner.failing.contains(&locator) {
            return Err(PlaybackError::Preparation(format!("cannot open {locator}")));
        }

        let state = Arc::new(Mutex::new(DecoderState {
            locator,
            events,
            position_ms: 0,
            duration_ms: TRACK_DURATION_MS,
            volume: 1.0,
            prepared: false,
            playing: false,
            stopped: false,
            released: false,
            starts: 0,
            seeks: Vec::new(),
        }));
        inner.opened.push(DecoderProbe(Arc::clone(&state)));

        Ok(Box::new(MockDecoder {
            state,
            auto_prepare: !inner.manual_prepare,
        }))
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn create_test_track(id: &str) -> Arc<Track> {
    Arc::new(Track::new(
        id,
        format!("Track {id}"),
        "Test Artist",
        AudioLocator::path(format!("/music/{id}.mp3")),
    ))
}

pub fn create_test_tracks(ids: &[&str]) -> Vec<Arc<Track>> {
    ids.iter().map(|id| create_test_track(id)).collect()
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        shuffle_seed: Some(7),
        ..Default::default()
    }
}

pub fn start_engine(backend: &MockBackend) -> PlaybackHandle {
    start_engine_with(backend, Arc::new(NoopEffects), Arc::new(MemoryPreferences::new()))
}

pub fn start_engine_with(
    backend: &MockBackend,
    effects: Arc<dyn EffectsFactory>,
    prefs: Arc<MemoryPreferences>,
) -> PlaybackHandle {
    PlaybackEngine::start(test_config(), Arc::new(backend.clone()), effects, prefs)
}

/// Let the engine drain everything queued so far
///
/// Queries travel through the same inbox as decoder callbacks, so once one
/// is answered every earlier message has been handled.
pub async fn settle(handle: &PlaybackHandle) {
    handle.number_of_bands().await;
}

/// Wait until the published snapshot satisfies `predicate`
pub async fn wait_for(
    handle: &PlaybackHandle,
    predicate: impl FnMut(&PlaybackSnapshot) -> bool,
) -> PlaybackSnapshot {
    let mut snapshots = handle.subscribe();
    let snapshot = tokio::time::timeout(Duration::from_secs(5), snapshots.wait_for(predicate))
        .await
        .expect("timed out waiting for snapshot")
        .expect("engine stopped")
        .clone();
    snapshot
}

pub async fn wait_for_state(handle: &PlaybackHandle, state: EngineState) -> PlaybackSnapshot {
    wait_for(handle, |snapshot| snapshot.state == state).await
}

pub fn current_id(snapshot: &PlaybackSnapshot) -> Option<String> {
    snapshot
        .current_track
        .as_ref()
        .map(|track| track.id.as_str().to_string())
}
