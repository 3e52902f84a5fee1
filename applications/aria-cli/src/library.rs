//! Turn command-line paths into tracks

use crate::backend::AUDIO_EXTENSIONS;
use crate::error::{CliError, Result};
use aria_core::{AudioLocator, Track};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Expand files and directories into a playlist
///
/// Directories are scanned one level deep for audio files, sorted by name.
/// URLs are passed through as streaming locators.
pub fn collect_tracks(inputs: &[String]) -> Result<Vec<Arc<Track>>> {
    let mut tracks = Vec::new();

    for input in inputs {
        let locator = AudioLocator::parse(input);
        let Some(path) = locator.as_path() else {
            tracks.push(Arc::new(track_for(input, locator.clone())));
            continue;
        };

        if path.is_dir() {
            for file in audio_files_in(path)? {
                let id = file.display().to_string();
                tracks.push(Arc::new(track_for(&id, AudioLocator::path(file))));
            }
        } else if path.is_file() {
            tracks.push(Arc::new(track_for(input, locator.clone())));
        } else {
            tracing::warn!("Skipping {}: not found", path.display());
        }
    }

    if tracks.is_empty() {
        return Err(CliError::NothingToPlay);
    }
    Ok(tracks)
}

fn audio_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file() && is_audio_file(path))
        .collect();
    files.sort();
    Ok(files)
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

fn track_for(id: &str, locator: AudioLocator) -> Track {
    let title = match &locator {
        AudioLocator::Path(path) => path
            .file_stem()
            .map_or_else(|| id.to_string(), |stem| stem.to_string_lossy().into_owned()),
        AudioLocator::Url(url) => url.rsplit('/').next().unwrap_or(url).to_string(),
    };
    Track::new(id, title, "Unknown Artist", locator)
}
