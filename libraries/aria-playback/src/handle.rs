//! Caller-facing handle to a running engine

use crate::engine::{Command, EffectsCommand, Inbound, Query};
use crate::error::{PlaybackError, Result};
use crate::events::PlaybackEvent;
use crate::types::PlaybackSnapshot;
use aria_core::{PlaybackSettings, RepeatMode, Track};
use aria_effects::{EqualizerPreset, FALLBACK_BAND_COUNT, FALLBACK_BAND_FREQUENCIES};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::debug;

/// Handle for driving a [`PlaybackEngine`](crate::PlaybackEngine)
///
/// Cheap to clone. Every command resolves once the engine has applied it,
/// so a snapshot read right after an `await` already reflects the command.
/// Commands sent after the engine stopped are dropped.
#[derive(Clone)]
pub struct PlaybackHandle {
    tx: mpsc::UnboundedSender<Inbound>,
    snapshots: watch::Receiver<PlaybackSnapshot>,
    events: broadcast::Sender<PlaybackEvent>,
}

impl PlaybackHandle {
    pub(crate) fn new(
        tx: mpsc::UnboundedSender<Inbound>,
        snapshots: watch::Receiver<PlaybackSnapshot>,
        events: broadcast::Sender<PlaybackEvent>,
    ) -> Self {
        Self {
            tx,
            snapshots,
            events,
        }
    }

    // ===== Transport =====

    /// Start preparing `track`, replacing whatever is loaded
    ///
    /// If the track is in the playlist the queue cursor moves to it.
    pub async fn play_song(&self, track: impl Into<Arc<Track>>) {
        self.send(Command::PlaySong(track.into())).await;
    }

    /// Pause when playing, resume when paused
    pub async fn play_pause(&self) {
        self.send(Command::PlayPause).await;
    }

    /// Pause; ignored unless playing
    pub async fn pause(&self) {
        self.send(Command::Pause).await;
    }

    /// Resume; ignored unless paused
    pub async fn resume(&self) {
        self.send(Command::Resume).await;
    }

    /// Jump within the current track; ignored without a decoder
    pub async fn seek_to(&self, position_ms: u64) {
        self.send(Command::SeekTo(position_ms)).await;
    }

    /// Skip to the next track per repeat and shuffle
    pub async fn skip_to_next(&self) {
        self.send(Command::SkipToNext).await;
    }

    /// Restart the current track, or go back one when near its start
    pub async fn skip_to_previous(&self) {
        self.send(Command::SkipToPrevious).await;
    }

    /// Replace the queue and start playing at `start_index`
    ///
    /// An out-of-range index starts at the first track; an empty list only
    /// clears the queue.
    pub async fn set_playlist(&self, tracks: Vec<Arc<Track>>, start_index: usize) {
        self.send(Command::SetPlaylist {
            tracks,
            start_index,
        })
        .await;
    }

    /// Stop playback and free the decoder and effects
    pub async fn release(&self) {
        self.send(Command::Release).await;
    }

    // ===== Settings =====

    /// Cycle Off → All → One → Off
    pub async fn toggle_repeat_mode(&self) {
        self.send(Command::ToggleRepeatMode).await;
    }

    /// Set the repeat mode
    pub async fn set_repeat_mode(&self, mode: RepeatMode) {
        self.send(Command::SetRepeatMode(mode)).await;
    }

    /// Flip shuffle
    pub async fn toggle_shuffle(&self) {
        self.send(Command::ToggleShuffle).await;
    }

    /// Turn shuffle on or off
    pub async fn set_shuffle(&self, enabled: bool) {
        self.send(Command::SetShuffle(enabled)).await;
    }

    /// Set output volume, clamped to 0.0 - 1.0
    pub async fn set_volume(&self, volume: f32) {
        let volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
        self.send(Command::SetVolume(volume)).await;
    }

    /// Pause after `minutes`; 0 cancels
    pub async fn set_sleep_timer(&self, minutes: u32) {
        self.send(Command::SetSleepTimer(minutes)).await;
    }

    /// Store quality, crossfade and gapless settings
    pub async fn set_playback_settings(&self, settings: PlaybackSettings) {
        self.send(Command::SetPlaybackSettings(settings)).await;
    }

    // ===== Effects =====

    /// Bass shelf level, -10.0 to 10.0
    pub async fn set_bass_level(&self, level: f32) {
        self.effect(EffectsCommand::BassLevel(level)).await;
    }

    /// Treble level, -10.0 to 10.0; clears the equalizer preset
    pub async fn set_treble_level(&self, level: f32) {
        self.effect(EffectsCommand::TrebleLevel(level)).await;
    }

    /// One equalizer band, -10.0 to 10.0; clears the equalizer preset
    pub async fn set_equalizer_band(&self, band: u16, level: f32) {
        self.effect(EffectsCommand::EqualizerBand(band, level)).await;
    }

    /// Load a named equalizer curve
    pub async fn apply_equalizer_preset(&self, preset: EqualizerPreset) {
        self.effect(EffectsCommand::EqualizerPreset(preset)).await;
    }

    /// Turn the reverb on or off
    pub async fn set_reverb_enabled(&self, enabled: bool) {
        self.effect(EffectsCommand::ReverbEnabled(enabled)).await;
    }

    /// Reverb amount, 0 to 100
    pub async fn set_reverb_level(&self, level: u8) {
        self.effect(EffectsCommand::ReverbLevel(level)).await;
    }

    /// Bands the active equalizer exposes
    pub async fn number_of_bands(&self) -> u16 {
        let (reply, answer) = oneshot::channel();
        if self.tx.send(Inbound::Query(Query::BandCount(reply))).is_err() {
            return FALLBACK_BAND_COUNT;
        }
        answer.await.unwrap_or(FALLBACK_BAND_COUNT)
    }

    /// Center frequency of `band` in Hz
    pub async fn band_frequency(&self, band: u16) -> Option<u32> {
        let fallback = || FALLBACK_BAND_FREQUENCIES.get(usize::from(band)).copied();
        let (reply, answer) = oneshot::channel();
        if self
            .tx
            .send(Inbound::Query(Query::BandFrequency(band, reply)))
            .is_err()
        {
            return fallback();
        }
        answer.await.unwrap_or_else(|_| fallback())
    }

    // ===== Observation =====

    /// Latest published snapshot
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Watch every snapshot change
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshots.clone()
    }

    /// Receive discrete events from now on
    pub fn subscribe_events(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    /// Check if the engine task has stopped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Release playback and stop the engine task
    pub async fn shutdown(&self) {
        self.send(Command::Shutdown).await;
    }

    // ===== Plumbing =====

    async fn effect(&self, command: EffectsCommand) {
        self.send(Command::Effects(command)).await;
    }

    async fn send(&self, command: Command) {
        if let Err(e) = self.request(command).await {
            debug!("Command dropped: {}", e);
        }
    }

    async fn request(&self, command: Command) -> Result<()> {
        let (ack, applied) = oneshot::channel();
        self.tx
            .send(Inbound::Command { command, ack })
            .map_err(|_| PlaybackError::EngineClosed)?;
        applied.await.map_err(|_| PlaybackError::EngineClosed)
    }
}

impl std::fmt::Debug for PlaybackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackHandle")
            .field("closed", &self.tx.is_closed())
            .finish_non_exhaustive()
    }
}
