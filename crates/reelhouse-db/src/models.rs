//! Internal Rust models matching the catalog schema.
//!
//! Paths are stored as plain strings exactly as reconciliation wrote them.

use chrono::{DateTime, Utc};
use reelhouse_common::{AlbumId, ArtistId, EpisodeId, MovieId, SeriesId, Status, TrackId};
use serde::{Deserialize, Serialize};

/// Movie model. `path` is the directory holding the movie file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub year: Option<i32>,
    pub status: Status,
    pub path: Option<String>,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// TV series model. `path` is the directory holding most of its episodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Series {
    pub id: SeriesId,
    pub title: String,
    pub year: Option<i32>,
    pub status: Status,
    pub path: Option<String>,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Episode model, keyed by `(series_id, season, episode)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Episode {
    pub id: EpisodeId,
    pub series_id: SeriesId,
    pub season: u32,
    pub episode: u32,
    pub title: Option<String>,
    pub downloaded: bool,
    pub file_path: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Episode joined with its series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpisodeWithSeries {
    #[serde(flatten)]
    pub episode: Episode,
    pub series_title: String,
    pub series_status: Status,
}

/// Music artist model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artist {
    pub id: ArtistId,
    pub name: String,
    pub status: Status,
    pub path: Option<String>,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Album model. `path` is the album directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Album {
    pub id: AlbumId,
    pub artist_id: ArtistId,
    pub title: String,
    pub year: Option<i32>,
    pub status: Status,
    pub path: Option<String>,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Album joined with its artist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlbumWithArtist {
    #[serde(flatten)]
    pub album: Album,
    pub artist_name: String,
}

/// Track model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub album_id: AlbumId,
    pub track_number: Option<u32>,
    pub title: String,
    pub downloaded: bool,
    pub file_path: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Track joined with its album and artist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackWithAlbum {
    #[serde(flatten)]
    pub track: Track,
    pub album_title: String,
    pub album_path: Option<String>,
    pub artist_id: ArtistId,
    pub artist_name: String,
}
