//! Playback engine
//!
//! The engine is an actor: one task owns the decoder, the queue, the effects
//! chain and the snapshot, and consumes a single inbox. Caller commands,
//! decoder callbacks, progress ticks and the sleep timer all arrive through
//! that inbox, so state is only ever touched from one place.
//!
//! ```text
//! PlaybackHandle ──command──┐
//! DecoderEvents ──session───┤
//! ProgressReporter ──tick───┼──► inbox ──► PlaybackEngine ──► watch<PlaybackSnapshot>
//! sleep timer ──expired─────┘                            └──► broadcast<PlaybackEvent>
//! ```
//!
//! Decoder callbacks carry the session they were created for. Each
//! `play_song` tears the old decoder down before opening the next one and
//! allocates a fresh session, so callbacks from a superseded decoder are
//! recognised and dropped.

use crate::decoder::{Decoder, DecoderBackend, DecoderEvent, DecoderEvents};
use crate::error::PlaybackError;
use crate::events::PlaybackEvent;
use crate::handle::PlaybackHandle;
use crate::progress::ProgressReporter;
use crate::queue::{Advance, QueueManager};
use crate::types::{EngineConfig, EngineState, PlaybackSnapshot};
use aria_core::preferences::{keys, Preferences, PreferencesExt};
use aria_core::{PlaybackSettings, RepeatMode, Track};
use aria_effects::{EffectsChain, EffectsFactory, EqualizerPreset, SessionId};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Buffered events per subscriber before the slowest one starts lagging
const EVENT_CAPACITY: usize = 64;

// ===== Inbox =====

/// Everything the engine task reacts to
pub(crate) enum Inbound {
    Command {
        command: Command,
        ack: oneshot::Sender<()>,
    },
    Query(Query),
    Decoder {
        session: SessionId,
        event: DecoderEvent,
    },
    ProgressTick {
        session: SessionId,
    },
    SleepTimerExpired {
        generation: u64,
    },
}

/// Caller commands; each is acknowledged once applied
#[derive(Debug)]
pub(crate) enum Command {
    PlaySong(Arc<Track>),
    PlayPause,
    Pause,
    Resume,
    SeekTo(u64),
    SkipToNext,
    SkipToPrevious,
    SetPlaylist {
        tracks: Vec<Arc<Track>>,
        start_index: usize,
    },
    ToggleRepeatMode,
    SetRepeatMode(RepeatMode),
    ToggleShuffle,
    SetShuffle(bool),
    SetVolume(f32),
    SetSleepTimer(u32),
    SetPlaybackSettings(PlaybackSettings),
    Effects(EffectsCommand),
    Release,
    Shutdown,
}

/// Effects chain setters
#[derive(Debug)]
pub(crate) enum EffectsCommand {
    BassLevel(f32),
    TrebleLevel(f32),
    EqualizerBand(u16, f32),
    EqualizerPreset(EqualizerPreset),
    ReverbEnabled(bool),
    ReverbLevel(u8),
}

/// Read-only requests answered from the engine task
pub(crate) enum Query {
    BandCount(oneshot::Sender<u16>),
    BandFrequency(u16, oneshot::Sender<Option<u32>>),
}

// ===== Engine =====

struct ActiveDecoder {
    decoder: Box<dyn Decoder>,
    session: SessionId,
}

struct SleepTimer {
    deadline: Instant,
    generation: u64,
    task: JoinHandle<()>,
}

/// Single-session playback state machine
///
/// Construct with [`PlaybackEngine::start`], which spawns the engine task and
/// returns the handle used to drive it.
pub struct PlaybackEngine {
    config: EngineConfig,
    backend: Arc<dyn DecoderBackend>,
    prefs: Arc<dyn Preferences>,
    effects: EffectsChain,
    queue: QueueManager,
    active: Option<ActiveDecoder>,
    snapshot: PlaybackSnapshot,
    progress: ProgressReporter,
    sleep_timer: Option<SleepTimer>,
    sleep_generation: u64,
    inbox: mpsc::WeakUnboundedSender<Inbound>,
    state_tx: watch::Sender<PlaybackSnapshot>,
    events: broadcast::Sender<PlaybackEvent>,
}

impl PlaybackEngine {
    /// Spawn the engine task on the current tokio runtime
    ///
    /// Volume, repeat mode, shuffle, effect levels and playback settings are
    /// read from `prefs`. The engine stops when every handle is dropped or
    /// after [`PlaybackHandle::shutdown`].
    pub fn start(
        config: EngineConfig,
        backend: Arc<dyn DecoderBackend>,
        effects: Arc<dyn EffectsFactory>,
        prefs: Arc<dyn Preferences>,
    ) -> PlaybackHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let effects = EffectsChain::new(effects, Arc::clone(&prefs));
        let snapshot = PlaybackSnapshot {
            repeat_mode: prefs.fetch(keys::PLAYBACK_REPEAT_MODE).unwrap_or_default(),
            shuffle_enabled: prefs.fetch(keys::PLAYBACK_SHUFFLE_ENABLED).unwrap_or(false),
            volume: prefs
                .fetch::<f32>(keys::PLAYBACK_VOLUME)
                .map_or(config.initial_volume, |v| v.clamp(0.0, 1.0)),
            effects: effects.state().clone(),
            settings: PlaybackSettings::load(prefs.as_ref()),
            ..Default::default()
        };
        let (state_tx, state_rx) = watch::channel(snapshot.clone());

        let engine = Self {
            queue: QueueManager::new(&config),
            progress: ProgressReporter::new(config.progress_interval()),
            config,
            backend,
            prefs,
            effects,
            active: None,
            snapshot,
            sleep_timer: None,
            sleep_generation: 0,
            inbox: tx.downgrade(),
            state_tx,
            events: events.clone(),
        };

        tokio::spawn(engine.run(rx));
        PlaybackHandle::new(tx, state_rx, events)
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Inbound>) {
        info!("Playback engine started");

        while let Some(message) = rx.recv().await {
            match message {
                Inbound::Command { command, ack } => {
                    let shutdown = matches!(command, Command::Shutdown);
                    self.handle_command(command);
                    self.publish();
                    let _ = ack.send(());
                    if shutdown {
                        break;
                    }
                }
                Inbound::Query(query) => self.handle_query(query),
                Inbound::Decoder { session, event } => {
                    self.handle_decoder_event(session, event);
                    self.publish();
                }
                Inbound::ProgressTick { session } => {
                    self.handle_progress_tick(session);
                    self.publish();
                }
                Inbound::SleepTimerExpired { generation } => {
                    self.handle_sleep_timer(generation);
                    self.publish();
                }
            }
        }

        self.release();
        self.publish();
        info!("Playback engine stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::PlaySong(track) => {
                self.queue.select(&track);
                self.load(track);
            }
            Command::PlayPause => match self.snapshot.state {
                EngineState::Playing => self.pause(),
                EngineState::Paused => self.resume(),
                EngineState::Idle | EngineState::Preparing => {}
            },
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::SeekTo(position_ms) => {
                if let Err(e) = self.seek_to(position_ms) {
                    debug!("Ignoring seek to {} ms: {}", position_ms, e);
                }
            }
            Command::SkipToNext => {
                self.skip_to_next(Advance::Manual);
            }
            Command::SkipToPrevious => self.skip_to_previous(),
            Command::SetPlaylist {
                tracks,
                start_index,
            } => self.set_playlist(tracks, start_index),
            Command::ToggleRepeatMode => self.set_repeat_mode(self.snapshot.repeat_mode.cycled()),
            Command::SetRepeatMode(mode) => self.set_repeat_mode(mode),
            Command::ToggleShuffle => self.set_shuffle(!self.snapshot.shuffle_enabled),
            Command::SetShuffle(enabled) => self.set_shuffle(enabled),
            Command::SetVolume(volume) => self.set_volume(volume),
            Command::SetSleepTimer(minutes) => self.set_sleep_timer(minutes),
            Command::SetPlaybackSettings(settings) => self.set_playback_settings(settings),
            Command::Effects(command) => self.apply_effects(command),
            Command::Release | Command::Shutdown => self.release(),
        }
    }

    fn handle_query(&mut self, query: Query) {
        match query {
            Query::BandCount(reply) => {
                let _ = reply.send(self.effects.number_of_bands());
            }
            Query::BandFrequency(band, reply) => {
                let _ = reply.send(self.effects.band_frequency(band));
            }
        }
    }

    // ===== Transport =====

    /// Tear down the current decoder and start preparing `track`
    fn load(&mut self, track: Arc<Track>) {
        self.teardown();

        let session = SessionId::next();
        let events = DecoderEvents::new(session, self.inbox.clone());

        self.snapshot.current_track = Some(Arc::clone(&track));
        self.snapshot.state = EngineState::Preparing;
        self.snapshot.is_playing = false;
        self.snapshot.position_ms = 0;
        self.snapshot.duration_ms = track
            .duration_hint
            .map_or(0, |hint| u64::try_from(hint.as_millis()).unwrap_or(u64::MAX));

        info!(
            "Preparing \"{}\" by {} (session {})",
            track.title, track.artist, session
        );

        let mut decoder = match self.backend.open(&track.audio_locator, events) {
            Ok(decoder) => decoder,
            Err(e) => return self.fail(into_preparation(e)),
        };
        decoder.set_volume(self.snapshot.volume);
        if let Err(e) = decoder.prepare() {
            decoder.release();
            return self.fail(into_preparation(e));
        }

        self.active = Some(ActiveDecoder { decoder, session });
    }

    fn on_prepared(&mut self, duration_ms: u64) {
        if self.snapshot.state != EngineState::Preparing {
            debug!("Ignoring duplicate prepared callback");
            return;
        }
        let Some(active) = self.active.as_mut() else {
            return;
        };

        if let Err(e) = active.decoder.start() {
            return self.fail(e);
        }

        let session = active.session;
        let duration_ms = if duration_ms > 0 {
            duration_ms
        } else {
            active.decoder.duration_ms()
        };
        if duration_ms > 0 {
            self.snapshot.duration_ms = duration_ms;
        }

        self.snapshot.state = EngineState::Playing;
        self.snapshot.is_playing = true;

        self.effects.bind(session);
        self.snapshot.effects = self.effects.state().clone();
        self.start_progress(session);

        if let Some(track) = &self.snapshot.current_track {
            info!("Playing \"{}\" ({} ms)", track.title, self.snapshot.duration_ms);
        }
    }

    fn on_completed(&mut self) {
        let Some(track) = self.snapshot.current_track.clone() else {
            return;
        };
        debug!("Finished \"{}\"", track.title);
        self.emit(PlaybackEvent::TrackCompleted {
            track_id: track.id.clone(),
        });

        let advanced = match self.snapshot.repeat_mode {
            RepeatMode::One => {
                self.restart_current();
                true
            }
            RepeatMode::All | RepeatMode::Off => self.skip_to_next(Advance::Completion),
        };
        if !advanced {
            self.stop_at_end();
        }
    }

    fn restart_current(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let result = active
            .decoder
            .seek_to(0)
            .and_then(|()| active.decoder.start());
        if let Err(e) = result {
            return self.fail(e);
        }

        self.snapshot.position_ms = 0;
        self.snapshot.state = EngineState::Playing;
        self.snapshot.is_playing = true;
    }

    /// Off at the last track: rewind and park in `Paused`
    fn stop_at_end(&mut self) {
        self.progress.stop();
        if let Some(active) = self.active.as_mut() {
            if let Err(e) = active.decoder.pause() {
                debug!("Pause at end of queue failed: {}", e);
            }
            if let Err(e) = active.decoder.seek_to(0) {
                debug!("Rewind at end of queue failed: {}", e);
            }
        }

        self.snapshot.state = EngineState::Paused;
        self.snapshot.is_playing = false;
        self.snapshot.position_ms = 0;
        info!("Reached end of queue");
    }

    fn pause(&mut self) {
        if self.snapshot.state != EngineState::Playing {
            return;
        }
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if let Err(e) = active.decoder.pause() {
            warn!("Pause failed: {}", e);
            return;
        }

        self.snapshot.position_ms = active.decoder.position_ms();
        self.snapshot.state = EngineState::Paused;
        self.snapshot.is_playing = false;
        self.progress.stop();
        debug!("Paused at {} ms", self.snapshot.position_ms);
    }

    fn resume(&mut self) {
        if self.snapshot.state != EngineState::Paused {
            return;
        }
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if let Err(e) = active.decoder.start() {
            return self.fail(e);
        }

        let session = active.session;
        self.snapshot.state = EngineState::Playing;
        self.snapshot.is_playing = true;
        self.start_progress(session);
        debug!("Resumed at {} ms", self.snapshot.position_ms);
    }

    fn seek_to(&mut self, position_ms: u64) -> crate::Result<()> {
        let active = self.active.as_mut().ok_or(PlaybackError::NoDecoder)?;
        active.decoder.seek_to(position_ms)?;

        self.snapshot.position_ms = position_ms;
        self.emit(PlaybackEvent::PositionUpdate {
            position_ms,
            duration_ms: self.snapshot.duration_ms,
        });
        Ok(())
    }

    /// Load the next track; `false` when the queue has none
    fn skip_to_next(&mut self, advance: Advance) -> bool {
        let next = self.queue.next(
            self.snapshot.repeat_mode,
            self.snapshot.shuffle_enabled,
            advance,
        );
        match next {
            Some(track) => {
                self.load(track);
                true
            }
            None => {
                debug!("No next track");
                false
            }
        }
    }

    fn skip_to_previous(&mut self) {
        // The published position already reflects seeks the decoder may not have reached
        if self.active.is_some() && self.snapshot.position_ms > self.config.restart_threshold_ms {
            if let Err(e) = self.seek_to(0) {
                debug!("Restart failed: {}", e);
            }
            return;
        }

        match self
            .queue
            .previous(self.snapshot.repeat_mode, self.snapshot.shuffle_enabled)
        {
            Some(track) => self.load(track),
            None => debug!("No previous track"),
        }
    }

    fn set_playlist(&mut self, tracks: Vec<Arc<Track>>, start_index: usize) {
        let start = self.queue.set_playlist(tracks, start_index);
        info!("Queue replaced ({} tracks)", self.queue.len());
        self.emit(PlaybackEvent::QueueChanged {
            length: self.queue.len(),
            current_index: self.queue.current_index(),
        });

        if let Some(track) = start {
            self.load(track);
        }
    }

    // ===== Settings =====

    fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.snapshot.repeat_mode = mode;
        self.persist(keys::PLAYBACK_REPEAT_MODE, &mode);
        debug!("Repeat mode: {}", mode);
    }

    fn set_shuffle(&mut self, enabled: bool) {
        if enabled && !self.snapshot.shuffle_enabled {
            self.queue.shuffle_enabled();
        }
        self.snapshot.shuffle_enabled = enabled;
        self.persist(keys::PLAYBACK_SHUFFLE_ENABLED, &enabled);
        debug!("Shuffle: {}", enabled);
    }

    fn set_volume(&mut self, volume: f32) {
        self.snapshot.volume = volume;
        if let Some(active) = self.active.as_mut() {
            active.decoder.set_volume(volume);
        }
        self.persist(keys::PLAYBACK_VOLUME, &volume);
    }

    fn set_playback_settings(&mut self, settings: PlaybackSettings) {
        if let Err(e) = settings.save(self.prefs.as_ref()) {
            warn!("Failed to persist playback settings: {}", e);
        }
        self.snapshot.settings = settings;
    }

    fn apply_effects(&mut self, command: EffectsCommand) {
        match command {
            EffectsCommand::BassLevel(level) => self.effects.set_bass_level(level),
            EffectsCommand::TrebleLevel(level) => self.effects.set_treble_level(level),
            EffectsCommand::EqualizerBand(band, level) => {
                self.effects.set_equalizer_band(band, level);
            }
            EffectsCommand::EqualizerPreset(preset) => self.effects.apply_equalizer_preset(preset),
            EffectsCommand::ReverbEnabled(enabled) => self.effects.set_reverb_enabled(enabled),
            EffectsCommand::ReverbLevel(level) => self.effects.set_reverb_level(level),
        }
        self.snapshot.effects = self.effects.state().clone();
    }

    // ===== Sleep timer =====

    fn set_sleep_timer(&mut self, minutes: u32) {
        self.cancel_sleep_timer();
        self.snapshot.settings.sleep_timer_minutes = minutes;
        self.persist(keys::PLAYBACK_SLEEP_TIMER_MINUTES, &minutes);

        if minutes == 0 {
            info!("Sleep timer cancelled");
            return;
        }

        self.sleep_generation += 1;
        let generation = self.sleep_generation;
        let deadline = Instant::now() + Duration::from_secs(u64::from(minutes) * 60);
        let inbox = self.inbox.clone();

        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(tx) = inbox.upgrade() {
                let _ = tx.send(Inbound::SleepTimerExpired { generation });
            }
        });

        self.sleep_timer = Some(SleepTimer {
            deadline,
            generation,
            task,
        });
        info!("Sleep timer set for {} min", minutes);
    }

    fn cancel_sleep_timer(&mut self) {
        if let Some(timer) = self.sleep_timer.take() {
            timer.task.abort();
        }
    }

    fn handle_sleep_timer(&mut self, generation: u64) {
        let current = self.sleep_timer.as_ref().map(|timer| timer.generation);
        if current != Some(generation) {
            debug!("Ignoring cancelled sleep timer");
            return;
        }
        self.sleep_timer = None;
        info!("Sleep timer expired, pausing");
        self.pause();
    }

    // ===== Decoder callbacks =====

    fn current_session(&self) -> Option<SessionId> {
        self.active.as_ref().map(|active| active.session)
    }

    fn handle_decoder_event(&mut self, session: SessionId, event: DecoderEvent) {
        if self.current_session() != Some(session) {
            debug!("Dropping {:?} from stale session {}", event, session);
            return;
        }

        match event {
            DecoderEvent::Prepared { duration_ms } => self.on_prepared(duration_ms),
            DecoderEvent::Completed => self.on_completed(),
            DecoderEvent::Error { message } => {
                let error = if self.snapshot.state == EngineState::Preparing {
                    PlaybackError::Preparation(message)
                } else {
                    PlaybackError::Decoder(message)
                };
                self.fail(error);
            }
        }
    }

    fn handle_progress_tick(&mut self, session: SessionId) {
        if self.current_session() != Some(session) || self.snapshot.state != EngineState::Playing {
            return;
        }
        let Some(active) = self.active.as_ref() else {
            return;
        };

        self.snapshot.position_ms = active.decoder.position_ms();
        let duration_ms = active.decoder.duration_ms();
        if duration_ms > 0 {
            self.snapshot.duration_ms = duration_ms;
        }

        self.emit(PlaybackEvent::PositionUpdate {
            position_ms: self.snapshot.position_ms,
            duration_ms: self.snapshot.duration_ms,
        });
    }

    fn start_progress(&mut self, session: SessionId) {
        let inbox = self.inbox.clone();
        self.progress.start(self.state_tx.subscribe(), move || {
            inbox
                .upgrade()
                .is_some_and(|tx| tx.send(Inbound::ProgressTick { session }).is_ok())
        });
    }

    // ===== Lifecycle =====

    /// Drop to `Idle` after a failure; the current track stays visible
    fn fail(&mut self, error: PlaybackError) {
        warn!("{}", error);
        self.teardown();

        self.snapshot.state = EngineState::Idle;
        self.snapshot.is_playing = false;
        self.snapshot.position_ms = 0;
        self.emit(PlaybackEvent::Error {
            message: error.to_string(),
        });
    }

    /// Stop and release the decoder, effects first
    fn teardown(&mut self) {
        self.progress.stop();
        self.effects.release();
        if let Some(mut active) = self.active.take() {
            active.decoder.stop();
            active.decoder.release();
            debug!("Released decoder for session {}", active.session);
        }
    }

    /// Back to the construction-time transport state
    ///
    /// User settings (repeat, shuffle, volume, effects, playback settings)
    /// are persisted and survive; the queue is kept.
    fn release(&mut self) {
        self.teardown();
        self.cancel_sleep_timer();

        self.snapshot = PlaybackSnapshot {
            repeat_mode: self.snapshot.repeat_mode,
            shuffle_enabled: self.snapshot.shuffle_enabled,
            volume: self.snapshot.volume,
            effects: self.effects.state().clone(),
            settings: self.snapshot.settings.clone(),
            ..Default::default()
        };
        debug!("Playback released");
    }

    // ===== Publishing =====

    /// Broadcast the snapshot if it changed, with edge events
    fn publish(&mut self) {
        self.snapshot.sleep_timer_remaining_ms = self.sleep_timer.as_ref().map(|timer| {
            let remaining = timer.deadline.saturating_duration_since(Instant::now());
            u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX)
        });
        self.snapshot.queue_length = self.queue.len();
        self.snapshot.queue_index = self.queue.current_index();

        let next = self.snapshot.clone();
        let mut edges = Vec::new();
        self.state_tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            if current.state != next.state {
                edges.push(PlaybackEvent::StateChanged { state: next.state });
            }
            let previous_id = current.current_track.as_ref().map(|t| t.id.clone());
            let next_id = next.current_track.as_ref().map(|t| t.id.clone());
            if let Some(track_id) = next_id.filter(|id| Some(id) != previous_id.as_ref()) {
                edges.push(PlaybackEvent::TrackChanged {
                    track_id,
                    previous_track_id: previous_id,
                });
            }
            *current = next;
            true
        });

        for event in edges {
            self.emit(event);
        }
    }

    fn emit(&self, event: PlaybackEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn persist<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        if let Err(e) = self.prefs.put(key, value) {
            warn!("Failed to persist {}: {}", key, e);
        }
    }
}

fn into_preparation(error: PlaybackError) -> PlaybackError {
    match error {
        PlaybackError::Preparation(_) => error,
        other => PlaybackError::Preparation(other.to_string()),
    }
}
