//! Interactive command parsing and status formatting

use crate::error::{CliError, Result};
use aria_core::RepeatMode;
use aria_effects::EqualizerPreset;
use aria_playback::{PlaybackHandle, PlaybackSnapshot};

pub const HELP: &str = "\
Commands:
  p, pause              play/pause
  n, next               next track
  b, prev               previous track (restarts past 3 s)
  seek <seconds>        jump within the track
  vol <0-100>           volume
  repeat [off|all|one]  cycle or set repeat mode
  shuffle [on|off]      toggle or set shuffle
  bass <-10..10>        bass level
  treble <-10..10>      treble level
  band <n> <-10..10>    one equalizer band
  preset <name>         flat, bass_boost, treble_boost, rock, pop, jazz, classical, vocal
  reverb <on|off|0-100> reverb switch or amount
  sleep <minutes>       sleep timer, 0 cancels
  s, status             show status
  h, help               this text
  q, quit               stop and exit";

/// One line of user input
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    PlayPause,
    Next,
    Previous,
    Seek(u64),
    Volume(f32),
    Repeat(Option<RepeatMode>),
    Shuffle(Option<bool>),
    Bass(f32),
    Treble(f32),
    Band(u16, f32),
    Preset(EqualizerPreset),
    ReverbEnabled(bool),
    ReverbLevel(u8),
    Sleep(u32),
    Status,
    Help,
    Quit,
}

/// Parse a line; blank lines read as `None`
pub fn parse(line: &str) -> Result<Option<Input>> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    let input = match command.to_lowercase().as_str() {
        "p" | "pause" | "play" => Input::PlayPause,
        "n" | "next" => Input::Next,
        "b" | "prev" | "previous" => Input::Previous,
        "seek" => Input::Seek(number::<u64>(arg, "seconds")? * 1000),
        "vol" | "volume" => {
            let percent = number::<f32>(arg, "volume")?;
            Input::Volume((percent / 100.0).clamp(0.0, 1.0))
        }
        "repeat" => Input::Repeat(match arg {
            None => None,
            Some(mode) => Some(
                RepeatMode::from_str(&mode.to_lowercase())
                    .ok_or_else(|| CliError::Input(format!("unknown repeat mode: {mode}")))?,
            ),
        }),
        "shuffle" => Input::Shuffle(arg.map(switch).transpose()?),
        "bass" => Input::Bass(number(arg, "level")?),
        "treble" => Input::Treble(number(arg, "level")?),
        "band" => {
            let band = number(arg, "band")?;
            Input::Band(band, number(words.next(), "level")?)
        }
        "preset" => {
            let name = arg.ok_or_else(|| CliError::Input("missing preset name".to_string()))?;
            Input::Preset(
                name.parse()
                    .map_err(|e: aria_effects::UnknownPreset| CliError::Input(e.to_string()))?,
            )
        }
        "reverb" => match arg {
            Some(value) if value.parse::<u8>().is_ok() => Input::ReverbLevel(number(arg, "level")?),
            Some(value) => Input::ReverbEnabled(switch(value)?),
            None => return Err(CliError::Input("reverb needs on, off or a level".to_string())),
        },
        "sleep" => Input::Sleep(number(arg, "minutes")?),
        "s" | "status" => Input::Status,
        "h" | "help" | "?" => Input::Help,
        "q" | "quit" | "exit" => Input::Quit,
        other => return Err(CliError::Input(format!("unknown command: {other}"))),
    };

    Ok(Some(input))
}

fn number<T: std::str::FromStr>(arg: Option<&str>, what: &str) -> Result<T> {
    let raw = arg.ok_or_else(|| CliError::Input(format!("missing {what}")))?;
    raw.parse()
        .map_err(|_| CliError::Input(format!("invalid {what}: {raw}")))
}

fn switch(raw: &str) -> Result<bool> {
    match raw.to_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(CliError::Input(format!("expected on or off, got {raw}"))),
    }
}

/// Apply an input to the engine
///
/// Returns `false` when the user asked to quit.
pub async fn execute(handle: &PlaybackHandle, input: Input) -> bool {
    match input {
        Input::PlayPause => handle.play_pause().await,
        Input::Next => handle.skip_to_next().await,
        Input::Previous => handle.skip_to_previous().await,
        Input::Seek(position_ms) => handle.seek_to(position_ms).await,
        Input::Volume(volume) => handle.set_volume(volume).await,
        Input::Repeat(None) => handle.toggle_repeat_mode().await,
        Input::Repeat(Some(mode)) => handle.set_repeat_mode(mode).await,
        Input::Shuffle(None) => handle.toggle_shuffle().await,
        Input::Shuffle(Some(enabled)) => handle.set_shuffle(enabled).await,
        Input::Bass(level) => handle.set_bass_level(level).await,
        Input::Treble(level) => handle.set_treble_level(level).await,
        Input::Band(band, level) => handle.set_equalizer_band(band, level).await,
        Input::Preset(preset) => handle.apply_equalizer_preset(preset).await,
        Input::ReverbEnabled(enabled) => handle.set_reverb_enabled(enabled).await,
        Input::ReverbLevel(level) => handle.set_reverb_level(level).await,
        Input::Sleep(minutes) => handle.set_sleep_timer(minutes).await,
        Input::Status => println!("{}", format_status(&handle.snapshot())),
        Input::Help => println!("{HELP}"),
        Input::Quit => return false,
    }
    true
}

/// `mm:ss`
pub fn format_time(ms: u64) -> String {
    let seconds = ms / 1000;
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// One-line summary of a snapshot
pub fn format_status(snapshot: &PlaybackSnapshot) -> String {
    let track = snapshot.current_track.as_ref().map_or_else(
        || "nothing loaded".to_string(),
        |track| format!("{} - {}", track.artist, track.title),
    );

    let mut status = format!(
        "[{}] {}  {} / {}  vol {:.0}%  repeat {}  shuffle {}",
        snapshot.state,
        track,
        format_time(snapshot.position_ms),
        format_time(snapshot.duration_ms),
        snapshot.volume * 100.0,
        snapshot.repeat_mode,
        if snapshot.shuffle_enabled { "on" } else { "off" },
    );

    if let (Some(index), len) = (snapshot.queue_index, snapshot.queue_length) {
        status.push_str(&format!("  #{}/{}", index + 1, len));
    }
    if let Some(remaining) = snapshot.sleep_timer_remaining_ms {
        status.push_str(&format!("  sleep {}", format_time(remaining)));
    }
    if let Some(preset) = snapshot.effects.equalizer_preset {
        status.push_str(&format!("  eq {preset}"));
    }

    status
}
