//! Engine integration tests
//!
//! Drive a real engine task against the scripted decoder backend:
//! - Transport (play, pause, seek, previous)
//! - Session isolation between overlapping requests
//! - Preparation failures
//! - Completion under each repeat mode
//! - Queue, shuffle and persisted settings
//! - Sleep timer and progress sampling
//! - Effects session binding

mod common;

use aria_core::preferences::{keys, MemoryPreferences, PreferencesExt};
use aria_core::RepeatMode;
use aria_effects::{EqualizerPreset, SoftwareEffects};
use aria_playback::{EngineState, PlaybackEvent, PlaybackSnapshot};
use common::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

fn drain(events: &mut broadcast::Receiver<PlaybackEvent>) -> Vec<PlaybackEvent> {
    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    received
}

fn playing(id: &'static str) -> impl FnMut(&PlaybackSnapshot) -> bool {
    move |snapshot: &PlaybackSnapshot| {
        snapshot.state == EngineState::Playing && current_id(snapshot).as_deref() == Some(id)
    }
}

// ============================================================================
// Transport
// ============================================================================

#[tokio::test(start_paused = true)]
async fn play_song_prepares_then_plays() {
    let backend = MockBackend::new();
    let handle = start_engine(&backend);
    let mut events = handle.subscribe_events();

    handle.play_song(create_test_track("a")).await;
    let snapshot = wait_for_state(&handle, EngineState::Playing).await;

    assert_eq!(current_id(&snapshot).as_deref(), Some("a"));
    assert!(snapshot.is_playing);
    assert_eq!(snapshot.duration_ms, TRACK_DURATION_MS);
    assert!(backend.last().is_playing());

    let received = drain(&mut events);
    assert_eq!(
        received[..3],
        [
            PlaybackEvent::StateChanged {
                state: EngineState::Preparing
            },
            PlaybackEvent::TrackChanged {
                track_id: "a".into(),
                previous_track_id: None,
            },
            PlaybackEvent::StateChanged {
                state: EngineState::Playing
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn pause_and_resume() {
    let backend = MockBackend::new();
    let handle = start_engine(&backend);

    handle.play_song(create_test_track("a")).await;
    wait_for_state(&handle, EngineState::Playing).await;
    backend.last().set_position(2_500);

    handle.pause().await;
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.state, EngineState::Paused);
    assert!(!snapshot.is_playing);
    assert_eq!(snapshot.position_ms, 2_500);
    assert!(!backend.last().is_playing());

    handle.play_pause().await;
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.state, EngineState::Playing);
    assert!(backend.last().is_playing());
}

#[tokio::test(start_paused = true)]
async fn pause_while_preparing_is_ignored() {
    let backend = MockBackend::manual();
    let handle = start_engine(&backend);

    handle.play_song(create_test_track("a")).await;
    handle.pause().await;
    assert_eq!(handle.snapshot().state, EngineState::Preparing);

    backend.last().finish_preparing();
    wait_for_state(&handle, EngineState::Playing).await;
}

#[tokio::test(start_paused = true)]
async fn seek_updates_position_immediately() {
    let backend = MockBackend::new();
    let handle = start_engine(&backend);

    handle.play_song(create_test_track("a")).await;
    wait_for_state(&handle, EngineState::Playing).await;

    handle.seek_to(42_000).await;
    assert_eq!(handle.snapshot().position_ms, 42_000);
    assert_eq!(backend.last().state().seeks, vec![42_000]);
}

#[tokio::test(start_paused = true)]
async fn seek_without_decoder_is_ignored() {
    let backend = MockBackend::new();
    let handle = start_engine(&backend);

    handle.seek_to(1_000).await;
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.state, EngineState::Idle);
    assert_eq!(snapshot.position_ms, 0);
}

#[tokio::test(start_paused = true)]
async fn previous_restarts_track_past_threshold() {
    let backend = MockBackend::new();
    let handle = start_engine(&backend);

    handle.set_playlist(create_test_tracks(&["a", "b", "c"]), 1).await;
    wait_for(&handle, playing("b")).await;
    backend.last().set_position(5_000);
    wait_for(&handle, |s: &PlaybackSnapshot| s.position_ms == 5_000).await;

    handle.skip_to_previous().await;
    let snapshot = handle.snapshot();
    assert_eq!(current_id(&snapshot).as_deref(), Some("b"));
    assert_eq!(snapshot.position_ms, 0);
    assert_eq!(backend.opened(), 1);
    assert_eq!(backend.last().state().seeks, vec![0]);
}

#[tokio::test(start_paused = true)]
async fn previous_after_seek_restarts_before_decoder_catches_up() {
    let backend = MockBackend::new();
    let handle = start_engine(&backend);

    handle.set_playlist(create_test_tracks(&["a", "b", "c"]), 1).await;
    wait_for(&handle, playing("b")).await;

    handle.seek_to(5_000).await;
    // Decoder still reports where it was before the seek landed
    backend.last().set_position(1_000);

    handle.skip_to_previous().await;
    let snapshot = handle.snapshot();
    assert_eq!(current_id(&snapshot).as_deref(), Some("b"));
    assert_eq!(snapshot.position_ms, 0);
    assert_eq!(backend.opened(), 1);
    assert_eq!(backend.last().state().seeks, vec![5_000, 0]);
}

#[tokio::test(start_paused = true)]
async fn previous_goes_back_near_track_start() {
    let backend = MockBackend::new();
    let handle = start_engine(&backend);

    handle.set_playlist(create_test_tracks(&["a", "b", "c"]), 1).await;
    wait_for(&handle, playing("b")).await;
    backend.last().set_position(1_000);

    handle.skip_to_previous().await;
    wait_for(&handle, playing("a")).await;
    assert_eq!(backend.opened(), 2);
    assert!(backend.decoder(0).is_released());
}

#[tokio::test(start_paused = true)]
async fn skip_to_next_at_end_without_repeat_stays() {
    let backend = MockBackend::new();
    let handle = start_engine(&backend);

    handle.set_playlist(create_test_tracks(&["a", "b"]), 1).await;
    wait_for(&handle, playing("b")).await;

    handle.skip_to_next().await;
    settle(&handle).await;
    assert_eq!(current_id(&handle.snapshot()).as_deref(), Some("b"));
    assert_eq!(backend.opened(), 1);
}

#[tokio::test(start_paused = true)]
async fn manual_skip_with_repeat_one_wraps() {
    let backend = MockBackend::new();
    let handle = start_engine(&backend);
    handle.set_repeat_mode(RepeatMode::One).await;

    handle.set_playlist(create_test_tracks(&["a", "b"]), 1).await;
    wait_for(&handle, playing("b")).await;

    handle.skip_to_next().await;
    wait_for(&handle, playing("a")).await;
}

// ============================================================================
// Sessions
// ============================================================================

#[tokio::test(start_paused = true)]
async fn latest_play_song_wins() {
    let backend = MockBackend::manual();
    let handle = start_engine(&backend);

    handle.play_song(create_test_track("x")).await;
    handle.play_song(create_test_track("y")).await;

    let stale = backend.decoder(0);
    assert!(stale.is_released());

    // The superseded decoder reports ready after the fact
    stale.finish_preparing();
    settle(&handle).await;

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.state, EngineState::Preparing);
    assert_eq!(current_id(&snapshot).as_deref(), Some("y"));
    assert_eq!(stale.state().starts, 0);

    backend.decoder(1).finish_preparing();
    wait_for(&handle, playing("y")).await;
}

#[tokio::test(start_paused = true)]
async fn stale_completion_is_ignored() {
    let backend = MockBackend::new();
    let handle = start_engine(&backend);

    handle.set_playlist(create_test_tracks(&["a", "b", "c"]), 0).await;
    wait_for(&handle, playing("a")).await;
    handle.play_song(create_test_track("c")).await;
    wait_for(&handle, playing("c")).await;

    backend.decoder(0).complete();
    settle(&handle).await;

    assert_eq!(current_id(&handle.snapshot()).as_deref(), Some("c"));
    assert_eq!(backend.opened(), 2);
}

#[tokio::test(start_paused = true)]
async fn track_changed_reports_previous_track() {
    let backend = MockBackend::new();
    let handle = start_engine(&backend);

    handle.play_song(create_test_track("a")).await;
    wait_for(&handle, playing("a")).await;

    let mut events = handle.subscribe_events();
    handle.play_song(create_test_track("b")).await;
    wait_for(&handle, playing("b")).await;

    assert!(drain(&mut events).contains(&PlaybackEvent::TrackChanged {
        track_id: "b".into(),
        previous_track_id: Some("a".into()),
    }));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test(start_paused = true)]
async fn open_failure_goes_idle_and_keeps_track() {
    let backend = MockBackend::new();
    backend.fail_on("/music/bad.mp3");
    let handle = start_engine(&backend);
    let mut events = handle.subscribe_events();

    handle.play_song(create_test_track("bad")).await;

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.state, EngineState::Idle);
    assert!(!snapshot.is_playing);
    assert_eq!(current_id(&snapshot).as_deref(), Some("bad"));

    let errors: Vec<_> = drain(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            PlaybackEvent::Error { message } => Some(message),
            _ => None,
        })
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("bad.mp3"));
}

#[tokio::test(start_paused = true)]
async fn async_preparation_failure_goes_idle() {
    let backend = MockBackend::manual();
    let handle = start_engine(&backend);
    let mut events = handle.subscribe_events();

    handle.play_song(create_test_track("a")).await;
    backend.last().fail("corrupt header");
    settle(&handle).await;

    assert_eq!(handle.snapshot().state, EngineState::Idle);
    assert!(backend.last().is_released());
    assert!(drain(&mut events).iter().any(|event| matches!(
        event,
        PlaybackEvent::Error { message } if message.contains("corrupt header")
    )));

    // The engine stays usable
    handle.play_song(create_test_track("b")).await;
    backend.last().finish_preparing();
    wait_for(&handle, playing("b")).await;
}

// ============================================================================
// Completion
// ============================================================================

#[tokio::test(start_paused = true)]
async fn completion_advances_in_order() {
    let backend = MockBackend::new();
    let handle = start_engine(&backend);
    let mut events = handle.subscribe_events();

    handle.set_playlist(create_test_tracks(&["a", "b"]), 0).await;
    wait_for(&handle, playing("a")).await;

    backend.last().complete();
    wait_for(&handle, playing("b")).await;

    assert!(drain(&mut events).contains(&PlaybackEvent::TrackCompleted {
        track_id: "a".into()
    }));
}

#[tokio::test(start_paused = true)]
async fn completion_with_repeat_one_restarts() {
    let backend = MockBackend::new();
    let handle = start_engine(&backend);
    handle.set_repeat_mode(RepeatMode::One).await;

    handle.set_playlist(create_test_tracks(&["a", "b"]), 0).await;
    wait_for(&handle, playing("a")).await;
    backend.last().set_position(TRACK_DURATION_MS);

    backend.last().complete();
    settle(&handle).await;

    let snapshot = handle.snapshot();
    assert_eq!(current_id(&snapshot).as_deref(), Some("a"));
    assert_eq!(snapshot.state, EngineState::Playing);
    assert_eq!(snapshot.position_ms, 0);
    assert_eq!(backend.opened(), 1);
    assert_eq!(backend.last().state().starts, 2);
}

#[tokio::test(start_paused = true)]
async fn completion_with_repeat_all_wraps() {
    let backend = MockBackend::new();
    let handle = start_engine(&backend);
    handle.set_repeat_mode(RepeatMode::All).await;

    handle.set_playlist(create_test_tracks(&["a", "b"]), 1).await;
    wait_for(&handle, playing("b")).await;

    backend.last().complete();
    wait_for(&handle, playing("a")).await;
    assert_eq!(backend.opened(), 2);
}

#[tokio::test(start_paused = true)]
async fn completion_at_end_without_repeat_parks() {
    let backend = MockBackend::new();
    let handle = start_engine(&backend);

    handle.set_playlist(create_test_tracks(&["a", "b"]), 1).await;
    wait_for(&handle, playing("b")).await;
    backend.last().set_position(TRACK_DURATION_MS);

    backend.last().complete();
    settle(&handle).await;

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.state, EngineState::Paused);
    assert!(!snapshot.is_playing);
    assert_eq!(snapshot.position_ms, 0);
    assert_eq!(current_id(&snapshot).as_deref(), Some("b"));
    assert_eq!(backend.last().state().seeks, vec![0]);

    // Play from the start again
    handle.resume().await;
    assert_eq!(handle.snapshot().state, EngineState::Playing);
}

// ============================================================================
// Queue and settings
// ============================================================================

#[tokio::test(start_paused = true)]
async fn out_of_range_start_plays_first_track() {
    let backend = MockBackend::new();
    let handle = start_engine(&backend);
    let mut events = handle.subscribe_events();

    handle.set_playlist(create_test_tracks(&["a", "b", "c"]), 10).await;
    let snapshot = wait_for(&handle, playing("a")).await;

    assert_eq!(snapshot.queue_length, 3);
    assert_eq!(snapshot.queue_index, Some(0));
    assert!(drain(&mut events).contains(&PlaybackEvent::QueueChanged {
        length: 3,
        current_index: Some(0),
    }));
}

#[tokio::test(start_paused = true)]
async fn empty_playlist_leaves_playback_alone() {
    let backend = MockBackend::new();
    let handle = start_engine(&backend);

    handle.play_song(create_test_track("a")).await;
    wait_for(&handle, playing("a")).await;

    handle.set_playlist(Vec::new(), 0).await;
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.state, EngineState::Playing);
    assert_eq!(snapshot.queue_length, 0);
    assert_eq!(snapshot.queue_index, None);
}

#[tokio::test(start_paused = true)]
async fn repeat_mode_cycles_and_persists() {
    let backend = MockBackend::new();
    let prefs = Arc::new(MemoryPreferences::new());
    let handle = start_engine_with(&backend, Arc::new(SoftwareEffects::new()), Arc::clone(&prefs));

    for expected in [RepeatMode::All, RepeatMode::One, RepeatMode::Off] {
        handle.toggle_repeat_mode().await;
        assert_eq!(handle.snapshot().repeat_mode, expected);
        assert_eq!(prefs.fetch::<RepeatMode>(keys::PLAYBACK_REPEAT_MODE), Some(expected));
    }
}

#[tokio::test(start_paused = true)]
async fn stored_settings_are_restored() {
    let backend = MockBackend::new();
    let prefs = Arc::new(MemoryPreferences::new());
    prefs.put(keys::PLAYBACK_VOLUME, &0.4_f32).unwrap();
    prefs.put(keys::PLAYBACK_REPEAT_MODE, &RepeatMode::All).unwrap();
    prefs.put(keys::PLAYBACK_SHUFFLE_ENABLED, &true).unwrap();
    prefs.put(keys::EFFECTS_BASS_LEVEL, &3.0_f32).unwrap();

    let handle = start_engine_with(&backend, Arc::new(SoftwareEffects::new()), prefs);
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.volume, 0.4);
    assert_eq!(snapshot.repeat_mode, RepeatMode::All);
    assert!(snapshot.shuffle_enabled);
    assert_eq!(snapshot.effects.bass_level, 3.0);

    handle.play_song(create_test_track("a")).await;
    wait_for_state(&handle, EngineState::Playing).await;
    assert_eq!(backend.last().state().volume, 0.4);
}

#[tokio::test(start_paused = true)]
async fn volume_is_clamped_and_forwarded() {
    let backend = MockBackend::new();
    let handle = start_engine(&backend);

    handle.play_song(create_test_track("a")).await;
    wait_for_state(&handle, EngineState::Playing).await;

    handle.set_volume(0.3).await;
    assert_eq!(backend.last().state().volume, 0.3);

    handle.set_volume(1.7).await;
    assert_eq!(handle.snapshot().volume, 1.0);
    assert_eq!(backend.last().state().volume, 1.0);
}

#[tokio::test(start_paused = true)]
async fn shuffle_serves_every_track_before_repeating() {
    let backend = MockBackend::new();
    let handle = start_engine(&backend);
    handle.set_shuffle(true).await;

    let ids = ["a", "b", "c", "d", "e"];
    handle.set_playlist(create_test_tracks(&ids), 0).await;
    wait_for(&handle, playing("a")).await;

    let mut heard = HashSet::from(["a".to_string()]);
    for _ in 1..ids.len() {
        handle.skip_to_next().await;
        let snapshot = wait_for_state(&handle, EngineState::Playing).await;
        heard.insert(current_id(&snapshot).unwrap());
    }
    assert_eq!(heard.len(), ids.len());
}

#[tokio::test(start_paused = true)]
async fn shuffle_previous_returns_to_last_heard() {
    let backend = MockBackend::new();
    let handle = start_engine(&backend);
    handle.set_shuffle(true).await;

    handle.set_playlist(create_test_tracks(&["a", "b", "c", "d"]), 0).await;
    wait_for(&handle, playing("a")).await;

    handle.skip_to_next().await;
    wait_for_state(&handle, EngineState::Playing).await;

    handle.skip_to_previous().await;
    wait_for(&handle, playing("a")).await;
}

#[tokio::test(start_paused = true)]
async fn release_resets_transport_only() {
    let backend = MockBackend::new();
    let handle = start_engine(&backend);
    handle.set_repeat_mode(RepeatMode::All).await;
    handle.set_volume(0.5).await;

    handle.play_song(create_test_track("a")).await;
    wait_for_state(&handle, EngineState::Playing).await;

    handle.release().await;
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.state, EngineState::Idle);
    assert!(snapshot.current_track.is_none());
    assert_eq!(snapshot.position_ms, 0);
    assert_eq!(snapshot.repeat_mode, RepeatMode::All);
    assert_eq!(snapshot.volume, 0.5);
    assert!(backend.last().is_released());

    handle.play_song(create_test_track("b")).await;
    wait_for(&handle, playing("b")).await;
}

#[tokio::test(start_paused = true)]
async fn release_twice_is_harmless() {
    let backend = MockBackend::new();
    let handle = start_engine(&backend);

    handle.play_song(create_test_track("a")).await;
    wait_for_state(&handle, EngineState::Playing).await;

    handle.release().await;
    handle.release().await;
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.state, EngineState::Idle);
    assert!(snapshot.current_track.is_none());
    assert!(!snapshot.is_playing);
    assert_eq!(backend.opened(), 1);
    assert!(backend.last().is_released());
    assert!(!handle.is_closed());

    handle.play_song(create_test_track("b")).await;
    wait_for(&handle, playing("b")).await;
}

#[tokio::test(start_paused = true)]
async fn toggle_shuffle_flips_and_persists() {
    let backend = MockBackend::new();
    let prefs = Arc::new(MemoryPreferences::new());
    let handle = start_engine_with(
        &backend,
        Arc::new(aria_effects::NoopEffects),
        Arc::clone(&prefs),
    );
    assert!(!handle.snapshot().shuffle_enabled);

    handle.toggle_shuffle().await;
    assert!(handle.snapshot().shuffle_enabled);
    assert_eq!(prefs.fetch::<bool>(keys::PLAYBACK_SHUFFLE_ENABLED), Some(true));

    handle.toggle_shuffle().await;
    assert!(!handle.snapshot().shuffle_enabled);
    assert_eq!(prefs.fetch::<bool>(keys::PLAYBACK_SHUFFLE_ENABLED), Some(false));
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_the_engine() {
    let backend = MockBackend::new();
    let handle = start_engine(&backend);

    handle.play_song(create_test_track("a")).await;
    wait_for_state(&handle, EngineState::Playing).await;

    handle.shutdown().await;
    tokio::time::timeout(Duration::from_secs(1), async {
        while !handle.is_closed() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    assert!(backend.last().is_released());

    // Dropped without effect
    handle.play_song(create_test_track("b")).await;
    assert_eq!(backend.opened(), 1);
    assert_eq!(handle.number_of_bands().await, 5);
}

// ============================================================================
// Timers
// ============================================================================

#[tokio::test(start_paused = true)]
async fn progress_ticks_sample_the_decoder() {
    let backend = MockBackend::new();
    let handle = start_engine(&backend);

    handle.play_song(create_test_track("a")).await;
    wait_for_state(&handle, EngineState::Playing).await;
    let mut events = handle.subscribe_events();

    backend.last().set_position(1_234);
    tokio::time::sleep(Duration::from_millis(150)).await;
    settle(&handle).await;

    assert_eq!(handle.snapshot().position_ms, 1_234);
    assert!(drain(&mut events).contains(&PlaybackEvent::PositionUpdate {
        position_ms: 1_234,
        duration_ms: TRACK_DURATION_MS,
    }));
}

#[tokio::test(start_paused = true)]
async fn no_ticks_while_paused() {
    let backend = MockBackend::new();
    let handle = start_engine(&backend);

    handle.play_song(create_test_track("a")).await;
    wait_for_state(&handle, EngineState::Playing).await;
    handle.pause().await;

    backend.last().set_position(9_999);
    tokio::time::sleep(Duration::from_millis(500)).await;
    settle(&handle).await;

    assert_eq!(handle.snapshot().position_ms, 0);
}

#[tokio::test(start_paused = true)]
async fn sleep_timer_pauses_playback() {
    let backend = MockBackend::new();
    let prefs = Arc::new(MemoryPreferences::new());
    let handle = start_engine_with(&backend, Arc::new(SoftwareEffects::new()), Arc::clone(&prefs));

    handle.play_song(create_test_track("a")).await;
    wait_for_state(&handle, EngineState::Playing).await;

    handle.set_sleep_timer(1).await;
    assert_eq!(handle.snapshot().sleep_timer_remaining_ms, Some(60_000));
    assert_eq!(prefs.fetch::<u32>(keys::PLAYBACK_SLEEP_TIMER_MINUTES), Some(1));

    tokio::time::sleep(Duration::from_secs(61)).await;
    settle(&handle).await;

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.state, EngineState::Paused);
    assert_eq!(snapshot.sleep_timer_remaining_ms, None);
}

#[tokio::test(start_paused = true)]
async fn cancelled_sleep_timer_never_fires() {
    let backend = MockBackend::new();
    let handle = start_engine(&backend);

    handle.play_song(create_test_track("a")).await;
    wait_for_state(&handle, EngineState::Playing).await;

    handle.set_sleep_timer(1).await;
    handle.set_sleep_timer(0).await;
    assert_eq!(handle.snapshot().sleep_timer_remaining_ms, None);

    tokio::time::sleep(Duration::from_secs(61)).await;
    settle(&handle).await;
    assert_eq!(handle.snapshot().state, EngineState::Playing);
}

// ============================================================================
// Effects
// ============================================================================

#[tokio::test(start_paused = true)]
async fn effects_follow_the_decoder_session() {
    let backend = MockBackend::new();
    let rack = SoftwareEffects::new();
    let prefs = Arc::new(MemoryPreferences::new());
    let handle = start_engine_with(&backend, Arc::new(rack.clone()), prefs);

    handle.set_bass_level(5.0).await;
    assert_eq!(handle.snapshot().effects.bass_level, 5.0);
    assert_eq!(rack.session(), None);

    handle.play_song(create_test_track("a")).await;
    wait_for(&handle, playing("a")).await;
    let first = backend.last().session();
    assert_eq!(rack.session(), Some(first));

    handle.play_song(create_test_track("b")).await;
    wait_for(&handle, playing("b")).await;
    let second = backend.last().session();
    assert_ne!(first, second);
    assert_eq!(rack.session(), Some(second));

    assert_eq!(handle.number_of_bands().await, 5);
    assert_eq!(handle.band_frequency(1).await, Some(230));
}

#[tokio::test(start_paused = true)]
async fn effect_settings_are_persisted() {
    let backend = MockBackend::new();
    let prefs = Arc::new(MemoryPreferences::new());
    let handle = start_engine_with(&backend, Arc::new(SoftwareEffects::new()), Arc::clone(&prefs));

    handle.apply_equalizer_preset(EqualizerPreset::Rock).await;
    handle.set_reverb_enabled(true).await;
    handle.set_reverb_level(70).await;

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.effects.equalizer_preset, Some(EqualizerPreset::Rock));
    assert_eq!(snapshot.effects.reverb_level, 70);
    assert_eq!(
        prefs.fetch::<Option<String>>(keys::EFFECTS_EQUALIZER_PRESET),
        Some(Some("ROCK".to_string()))
    );
    assert_eq!(prefs.fetch::<bool>(keys::EFFECTS_REVERB_ENABLED), Some(true));

    handle.set_equalizer_band(0, 2.0).await;
    assert_eq!(handle.snapshot().effects.equalizer_preset, None);
}
