//! Catalog track types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Track identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    /// Create a new track ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Where the audio for a track can be read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum AudioLocator {
    /// Streamable URL
    Url(String),

    /// Local file path
    Path(PathBuf),
}

impl AudioLocator {
    /// Locator for a streamable URL
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }

    /// Locator for a local file
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// Local path, if this locator points at the filesystem
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Path(path) => Some(path),
            Self::Url(_) => None,
        }
    }

    /// Parse a user-supplied string: anything with a scheme is a URL
    pub fn parse(raw: &str) -> Self {
        if raw.contains("://") {
            Self::Url(raw.to_string())
        } else {
            Self::Path(PathBuf::from(raw))
        }
    }
}

impl fmt::Display for AudioLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Track metadata supplied by the catalog
///
/// The engine only reads tracks; it shares them as `Arc<Track>` and never
/// mutates catalog data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique track identifier from the catalog
    pub id: TrackId,

    /// Track title
    pub title: String,

    /// Artist name
    pub artist: String,

    /// Where the decoder reads audio from
    pub audio_locator: AudioLocator,

    /// Cover art reference (optional)
    pub cover_locator: Option<String>,

    /// Duration reported by the catalog (the decoder is authoritative)
    pub duration_hint: Option<Duration>,

    /// Whether the user marked this track as a favorite
    pub favorite: bool,
}

impl Track {
    /// Create a track with the required fields
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        audio_locator: AudioLocator,
    ) -> Self {
        Self {
            id: TrackId::new(id),
            title: title.into(),
            artist: artist.into(),
            audio_locator,
            cover_locator: None,
            duration_hint: None,
            favorite: false,
        }
    }

    /// Set the catalog duration hint
    #[must_use]
    pub fn with_duration_hint(mut self, duration: Duration) -> Self {
        self.duration_hint = Some(duration);
        self
    }

    /// Set the cover art reference
    #[must_use]
    pub fn with_cover(mut self, cover: impl Into<String>) -> Self {
        self.cover_locator = Some(cover.into());
        self
    }
}
