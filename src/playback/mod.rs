//! Playback services: resolving catalog entries to files, remembering where
//! the viewer stopped, probing durations and opening external players.

pub mod duration;
pub mod external;
pub mod progress;
pub mod resolver;

pub use duration::DurationProber;
pub use external::open_external;
pub use progress::{progress_key, ProgressEntry, ProgressStore, ProgressUpdate};
pub use resolver::{PlaybackResolver, PlaybackTarget};
