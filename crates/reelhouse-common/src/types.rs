//! Core type definitions for catalog availability, media kinds and scan records.
//!
//! All enums serialize in lowercase, matching the values stored in the catalog
//! and used in HTTP paths.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Availability status of a movie, series, artist or album.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Tracked in the catalog but no file found on disk.
    #[default]
    Wanted,
    /// A file was found on disk at the last reconciliation.
    Downloaded,
    /// Parked by the user; reconciliation leaves it alone.
    Archived,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wanted => write!(f, "wanted"),
            Self::Downloaded => write!(f, "downloaded"),
            Self::Archived => write!(f, "archived"),
        }
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wanted" => Ok(Self::Wanted),
            "downloaded" => Ok(Self::Downloaded),
            "archived" => Ok(Self::Archived),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }
}

/// A configured media root and the reconciliation routine that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryKind {
    /// Movie root; matched against movie titles.
    Movies,
    /// TV root; matched against series titles and episode markers.
    Tv,
    /// Music root; discovered bottom-up into artists, albums and tracks.
    Music,
}

impl LibraryKind {
    /// All library kinds, in reconciliation order.
    pub const ALL: [LibraryKind; 3] = [Self::Movies, Self::Tv, Self::Music];
}

impl fmt::Display for LibraryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movies => write!(f, "movies"),
            Self::Tv => write!(f, "tv"),
            Self::Music => write!(f, "music"),
        }
    }
}

impl std::str::FromStr for LibraryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "movies" | "movie" => Ok(Self::Movies),
            "tv" | "series" | "shows" => Ok(Self::Tv),
            "music" => Ok(Self::Music),
            _ => Err(format!("Invalid library kind: {}", s)),
        }
    }
}

/// A catalog entry that resolves to a single playable file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Episode,
    Track,
}

impl MediaKind {
    /// The media root this kind lives under.
    pub fn library(self) -> LibraryKind {
        match self {
            Self::Movie => LibraryKind::Movies,
            Self::Episode => LibraryKind::Tv,
            Self::Track => LibraryKind::Music,
        }
    }

    /// Whether this kind is served through the video endpoint.
    pub fn is_video(self) -> bool {
        matches!(self, Self::Movie | Self::Episode)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movie => write!(f, "movie"),
            Self::Episode => write!(f, "episode"),
            Self::Track => write!(f, "track"),
        }
    }
}

impl std::str::FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "movie" | "movies" => Ok(Self::Movie),
            "episode" | "episodes" => Ok(Self::Episode),
            "track" | "tracks" => Ok(Self::Track),
            _ => Err(format!("Invalid media kind: {}", s)),
        }
    }
}

/// A file discovered during one scan pass. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Absolute path to the file.
    pub full_path: PathBuf,
    /// Directory containing the file.
    pub directory: PathBuf,
    /// File name including extension.
    pub file_name: String,
    /// Normalized `directory + file name`, used for token containment.
    pub normalized: String,
}
