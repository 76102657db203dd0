//! Path utilities for classifying media files by extension.
//!
//! Two allow-lists exist per medium: the *indexable* set used while scanning
//! (anything worth recording as present on disk) and the stricter *playable*
//! set that the playback resolver is allowed to hand to the streamer. Every
//! playable extension is also indexable.

use std::path::Path;

use crate::types::{LibraryKind, MediaKind};

/// Video extensions recorded during scanning.
const VIDEO_INDEXABLE: &[&str] = &[
    "mkv", "mp4", "m4v", "webm", "mov", "avi", "wmv", "flv", "ts", "m2ts", "mpg", "mpeg",
];

/// Video extensions the playback resolver may return.
const VIDEO_PLAYABLE: &[&str] = &["mp4", "m4v", "webm", "mov", "mkv"];

/// Audio extensions recorded during scanning.
const AUDIO_INDEXABLE: &[&str] = &[
    "mp3", "m4a", "aac", "flac", "ogg", "opus", "wav", "wma", "aiff", "ape",
];

/// Audio extensions the playback resolver may return.
const AUDIO_PLAYABLE: &[&str] = &["mp3", "m4a", "aac", "flac", "ogg", "opus", "wav"];

/// Containers that browsers cannot play and must go through the compatibility stream.
const COMPAT_CONTAINERS: &[&str] = &["mkv"];

/// Lowercased extension of a path, if it has one.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use reelhouse_common::paths::extension_of;
///
/// assert_eq!(extension_of(Path::new("Movie.MKV")).as_deref(), Some("mkv"));
/// assert_eq!(extension_of(Path::new("README")), None);
/// ```
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

fn has_extension_in(path: &Path, allowed: &[&str]) -> bool {
    extension_of(path)
        .map(|ext| allowed.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Extensions the scanner collects for a library kind.
#[must_use]
pub fn indexable_extensions(kind: LibraryKind) -> &'static [&'static str] {
    match kind {
        LibraryKind::Movies | LibraryKind::Tv => VIDEO_INDEXABLE,
        LibraryKind::Music => AUDIO_INDEXABLE,
    }
}

/// Extensions the resolver may return for a media kind.
#[must_use]
pub fn playable_extensions(kind: MediaKind) -> &'static [&'static str] {
    match kind {
        MediaKind::Movie | MediaKind::Episode => VIDEO_PLAYABLE,
        MediaKind::Track => AUDIO_PLAYABLE,
    }
}

/// Check if a path is worth indexing for a library kind.
pub fn is_indexable(kind: LibraryKind, path: &Path) -> bool {
    has_extension_in(path, indexable_extensions(kind))
}

/// Check if a path may be served for a media kind.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use reelhouse_common::MediaKind;
/// use reelhouse_common::paths::is_playable;
///
/// assert!(is_playable(MediaKind::Episode, Path::new("/tv/Show/S01E01.mkv")));
/// assert!(!is_playable(MediaKind::Track, Path::new("/music/cover.jpg")));
/// ```
pub fn is_playable(kind: MediaKind, path: &Path) -> bool {
    has_extension_in(path, playable_extensions(kind))
}

/// Check if a container must be remuxed or transcoded before a browser can play it.
pub fn needs_compat_stream(path: &Path) -> bool {
    has_extension_in(path, COMPAT_CONTAINERS)
}
