//! Aria - headless decode-and-meter harness for the playback engine
//!
//! Tracks are decoded in real time and measured; no audio device is opened.
use aria_cli::{
    backend::{SymphoniaBackend, Stream},
    commands::{self, HELP},
    config::AppConfig,
    library,
};
use aria_core::preferences::JsonFilePreferences;
use aria_core::{PlaybackSettings, RepeatMode};
use aria_effects::{EffectsFactory, EffectsState, NoopEffects, SoftwareEffects};
use aria_playback::{PlaybackEngine, PlaybackEvent, PlaybackHandle};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "aria")]
#[command(
    about = "Aria playback harness: decodes in real time and meters levels, without audio output",
    long_about = None,
    version
)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "ARIA_CONFIG")]
    config: Option<PathBuf>,

    /// Preferences file (overrides the configuration)
    #[arg(long)]
    preferences: Option<PathBuf>,

    /// Bypass the software effects rack
    #[arg(long)]
    no_effects: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play files, directories or URLs and read commands from stdin
    Play {
        /// Tracks to queue
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Start with shuffle on
        #[arg(long)]
        shuffle: bool,

        /// Repeat mode: off, all or one
        #[arg(long, value_parser = parse_repeat)]
        repeat: Option<RepeatMode>,

        /// Queue position to start at
        #[arg(long, default_value_t = 0)]
        start: usize,
    },
    /// Print the duration of audio files
    Probe {
        /// Files to probe
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Show stored effect and playback settings
    Settings,
}

fn parse_repeat(raw: &str) -> Result<RepeatMode, String> {
    RepeatMode::from_str(&raw.to_lowercase()).ok_or_else(|| format!("unknown repeat mode: {raw}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(preferences) = cli.preferences {
        config.preferences_path = preferences;
    }
    if cli.no_effects {
        config.software_effects = false;
    }
    config.validate()?;

    // Logs go to stderr so the status line on stdout stays readable
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Play {
            inputs,
            shuffle,
            repeat,
            start,
        } => play(config, &inputs, shuffle, repeat, start).await?,
        Commands::Probe { paths } => probe(&paths),
        Commands::Settings => settings(&config)?,
    }

    Ok(())
}

async fn play(
    config: AppConfig,
    inputs: &[String],
    shuffle: bool,
    repeat: Option<RepeatMode>,
    start: usize,
) -> anyhow::Result<()> {
    let tracks = library::collect_tracks(inputs)?;
    let prefs = Arc::new(JsonFilePreferences::open(&config.preferences_path)?);

    let (backend, effects): (SymphoniaBackend, Arc<dyn EffectsFactory>) = if config.software_effects {
        let rack = SoftwareEffects::new();
        (SymphoniaBackend::new(Some(rack.clone())), Arc::new(rack))
    } else {
        (SymphoniaBackend::new(None), Arc::new(NoopEffects))
    };
    let meter = backend.meter();

    tracing::info!("Starting Aria with {} tracks", tracks.len());
    tracing::info!("Preferences: {}", config.preferences_path.display());

    let handle = PlaybackEngine::start(config.engine, Arc::new(backend), effects, prefs);
    if shuffle {
        handle.set_shuffle(true).await;
    }
    if let Some(mode) = repeat {
        handle.set_repeat_mode(mode).await;
    }

    tokio::spawn(report_events(handle.clone()));
    handle.set_playlist(tracks, start).await;

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = match commands::parse(&line) {
            Ok(Some(input)) => input,
            Ok(None) => {
                println!(
                    "{}  level {:.0}%",
                    commands::format_status(&handle.snapshot()),
                    meter.peak() * 100.0
                );
                continue;
            }
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        if !commands::execute(&handle, input).await {
            break;
        }
    }

    handle.shutdown().await;
    tracing::info!("Goodbye");
    Ok(())
}

/// Print track changes and errors as they happen
async fn report_events(handle: PlaybackHandle) {
    let mut events = handle.subscribe_events();
    loop {
        match events.recv().await {
            Ok(PlaybackEvent::TrackChanged { .. }) => {
                if let Some(track) = handle.snapshot().current_track {
                    println!("> {} - {}", track.artist, track.title);
                }
            }
            Ok(PlaybackEvent::Error { message }) => println!("! {message}"),
            Ok(PlaybackEvent::StateChanged { state }) => tracing::debug!("State: {}", state),
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => tracing::debug!("Skipped {} events", skipped),
            Err(RecvError::Closed) => break,
        }
    }
}

fn probe(paths: &[PathBuf]) {
    for path in paths {
        match Stream::open(path) {
            Ok(stream) => println!(
                "{}  {}",
                commands::format_time(stream.duration_ms()),
                path.display()
            ),
            Err(e) => println!("error  {e}"),
        }
    }
}

fn settings(config: &AppConfig) -> anyhow::Result<()> {
    let prefs = JsonFilePreferences::open(&config.preferences_path)?;
    let output = serde_json::json!({
        "preferences_path": config.preferences_path,
        "playback": PlaybackSettings::load(&prefs),
        "effects": EffectsState::load(&prefs),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
