//! # reelhouse-matcher
//!
//! Pure heuristics for associating files found on disk with catalog entries.
//! Nothing in this crate touches the filesystem; callers hand in names and
//! paths, and get back normalized strings, markers and scores.
//!
//! - [`normalize`] folds case, diacritics and punctuation
//! - [`contains_title`] is the token containment test used for movies, series and tracks
//! - [`extract_episode_markers`] finds `S01E02` / `1x02` style markers
//! - [`infer_album`], [`parse_track_number`] and [`score_artist`] drive music discovery
//! - [`preferred_directory`] picks the directory holding most matching files
//!
//! ## Example
//!
//! ```
//! use reelhouse_matcher::{contains_title, extract_episode_markers, normalize, EpisodeMarker};
//!
//! let candidate = normalize("/media/tv/Show.Name/Show.Name.S02E05.mkv");
//! assert!(contains_title(&candidate, &normalize("Show Name")));
//! assert_eq!(
//!     extract_episode_markers("Show.Name.S02E05.mkv"),
//!     vec![EpisodeMarker { season: 2, episode: 5 }]
//! );
//! ```

mod episode;
mod music;
mod normalize;
mod select;

pub use episode::{extract_episode_markers, EpisodeMarker};
pub use music::{
    best_artist, extract_year, infer_album, parse_track_number, score_artist, track_title,
    AlbumGuess, ARTIST_MATCH_THRESHOLD,
};
pub use normalize::{contains_title, normalize, title_score, tokens};
pub use select::{matching_files, prefer_year, preferred_directory};
