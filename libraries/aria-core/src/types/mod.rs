mod playback;
mod settings;
mod track;

pub use playback::RepeatMode;
pub use settings::{AudioQuality, PlaybackSettings};
pub use track::{AudioLocator, Track, TrackId};
