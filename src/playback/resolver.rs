//! Resolve a catalog entry to the file that should be played.
//!
//! Only files whose extension is in the kind's playable allow-list are ever
//! returned, whatever the catalog row says.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use reelhouse_common::paths::is_playable;
use reelhouse_common::{EpisodeId, Error, MediaKind, MovieId, Result, TrackId};
use reelhouse_db::pool::{get_conn, DbPool};
use reelhouse_db::queries::{movies, music, series};
use reelhouse_matcher::{
    contains_title, extract_episode_markers, normalize, parse_track_number, title_score,
    EpisodeMarker,
};
use tracing::debug;
use walkdir::WalkDir;

use crate::config::LibraryConfig;
use crate::scanner::{self, ScanLimits};

/// How deep to look inside a stored directory.
const DIRECTORY_SEARCH_DEPTH: usize = 2;

/// What the catalog says about the item being played.
#[derive(Debug, Clone)]
pub struct PlaybackTarget {
    pub kind: MediaKind,
    /// Normalized title the file name is expected to contain.
    pub title: String,
    /// Display title, for logging and external players.
    pub display_title: String,
    /// Stored paths to try, most specific first.
    pub stored: Vec<PathBuf>,
    pub episode: Option<EpisodeMarker>,
    pub track_number: Option<u32>,
}

impl PlaybackTarget {
    /// Whether a playable file plausibly is this item. Episodes need their
    /// marker; tracks need their number or title.
    fn accepts(&self, file_name: &str, normalized: &str) -> bool {
        match self.kind {
            MediaKind::Movie => contains_title(normalized, &self.title),
            MediaKind::Episode => self
                .episode
                .map_or(false, |m| extract_episode_markers(file_name).contains(&m)),
            MediaKind::Track => {
                let stem = Path::new(file_name)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let by_number =
                    self.track_number.is_some() && parse_track_number(&stem) == self.track_number;
                by_number || contains_title(&normalize(&stem), &self.title)
            }
        }
    }

    fn score(&self, normalized: &str) -> usize {
        title_score(normalized, &self.title)
    }
}

pub struct PlaybackResolver {
    pool: DbPool,
    library: LibraryConfig,
    limits: ScanLimits,
}

impl PlaybackResolver {
    pub fn new(pool: DbPool, library: LibraryConfig, limits: ScanLimits) -> Self {
        Self {
            pool,
            library,
            limits,
        }
    }

    /// Load what the catalog knows about `(kind, id)`.
    pub fn target(&self, kind: MediaKind, id: &str) -> Result<PlaybackTarget> {
        let conn = get_conn(&self.pool)?;
        let invalid = |_| Error::invalid_input(format!("invalid {kind} id: {id}"));

        match kind {
            MediaKind::Movie => {
                let movie = movies::get_movie(&conn, MovieId::from_str(id).map_err(invalid)?)?
                    .ok_or_else(|| Error::not_found(format!("movie {id}")))?;
                Ok(PlaybackTarget {
                    kind,
                    title: normalize(&movie.title),
                    display_title: movie.title,
                    stored: movie.path.into_iter().map(PathBuf::from).collect(),
                    episode: None,
                    track_number: None,
                })
            }
            MediaKind::Episode => {
                let row = series::get_episode(&conn, EpisodeId::from_str(id).map_err(invalid)?)?
                    .ok_or_else(|| Error::not_found(format!("episode {id}")))?;
                let marker = EpisodeMarker {
                    season: row.episode.season,
                    episode: row.episode.episode,
                };
                Ok(PlaybackTarget {
                    kind,
                    title: normalize(&row.series_title),
                    display_title: format!(
                        "{} S{:02}E{:02}",
                        row.series_title, marker.season, marker.episode
                    ),
                    stored: row.episode.file_path.into_iter().map(PathBuf::from).collect(),
                    episode: Some(marker),
                    track_number: None,
                })
            }
            MediaKind::Track => {
                let row = music::get_track(&conn, TrackId::from_str(id).map_err(invalid)?)?
                    .ok_or_else(|| Error::not_found(format!("track {id}")))?;
                let stored = row
                    .track
                    .file_path
                    .into_iter()
                    .chain(row.album_path)
                    .map(PathBuf::from)
                    .collect();
                Ok(PlaybackTarget {
                    kind,
                    title: normalize(&row.track.title),
                    display_title: row.track.title,
                    stored,
                    episode: None,
                    track_number: row.track.track_number,
                })
            }
        }
    }

    /// Resolve `(kind, id)` to a playable file.
    pub fn resolve(&self, kind: MediaKind, id: &str) -> Result<PathBuf> {
        let target = self.target(kind, id)?;
        self.resolve_target(&target).ok_or_else(|| {
            Error::not_found(format!(
                "no playable file found for {kind} \"{}\"",
                target.display_title
            ))
        })
    }

    /// Stored file, then stored directory, then a fresh scan of the root.
    pub fn resolve_target(&self, target: &PlaybackTarget) -> Option<PathBuf> {
        for stored in &target.stored {
            if stored.is_file() && is_playable(target.kind, stored) {
                debug!(path = ?stored, "Resolved stored file");
                return Some(stored.clone());
            }
            if stored.is_dir() {
                if let Some(found) = search_directory(stored, target) {
                    debug!(path = ?found, "Resolved file inside stored directory");
                    return Some(found);
                }
            }
        }

        let found = self.scan_root(target);
        if let Some(ref path) = found {
            debug!(path = ?path, "Resolved file by scanning library root");
        }
        found
    }

    fn scan_root(&self, target: &PlaybackTarget) -> Option<PathBuf> {
        let library = target.kind.library();
        let root = self.library.resolved_root(library)?;
        if !root.is_dir() {
            return None;
        }

        let outcome = scanner::scan(&root, library, self.limits);
        let mut best: Option<(usize, PathBuf)> = None;
        for file in outcome.files {
            if !is_playable(target.kind, &file.full_path) {
                continue;
            }
            // the root walk must also match the owning title
            if target.kind == MediaKind::Episode && !contains_title(&file.normalized, &target.title)
            {
                continue;
            }
            if !target.accepts(&file.file_name, &file.normalized) {
                continue;
            }
            let score = target.score(&file.normalized);
            if best.as_ref().map_or(true, |(s, _)| score > *s) {
                best = Some((score, file.full_path));
            }
        }
        best.map(|(_, path)| path)
    }
}

/// Best playable file inside `dir`. Movies fall back to any playable file
/// when none mentions the title.
fn search_directory(dir: &Path, target: &PlaybackTarget) -> Option<PathBuf> {
    let mut best: Option<(usize, PathBuf)> = None;
    let mut first_playable: Option<PathBuf> = None;

    let files = WalkDir::new(dir)
        .max_depth(DIRECTORY_SEARCH_DEPTH)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file());

    for entry in files {
        let path = entry.path();
        if !is_playable(target.kind, path) {
            continue;
        }
        if first_playable.is_none() {
            first_playable = Some(path.to_path_buf());
        }

        let file_name = entry.file_name().to_string_lossy();
        let normalized = normalize(&file_name);
        if !target.accepts(&file_name, &normalized) {
            continue;
        }
        let score = target.score(&normalized);
        if best.as_ref().map_or(true, |(s, _)| score > *s) {
            best = Some((score, path.to_path_buf()));
        }
    }

    match (best, target.kind) {
        (Some((_, path)), _) => Some(path),
        (None, MediaKind::Movie) => first_playable,
        (None, _) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelhouse_common::Status;
    use reelhouse_db::pool::init_memory_pool;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    fn resolver(pool: DbPool, movies_dir: &Path) -> PlaybackResolver {
        let library = LibraryConfig {
            movies_dir: Some(movies_dir.to_path_buf()),
            ..Default::default()
        };
        PlaybackResolver::new(pool, library, ScanLimits::default())
    }

    #[test]
    fn test_stored_directory_prefers_title() {
        let dir = tempfile::tempdir().unwrap();
        let movie_dir = dir.path().join("Heat (1995)");
        touch(&movie_dir.join("behind the scenes.mp4"));
        touch(&movie_dir.join("Heat.1995.mkv"));
        touch(&movie_dir.join("Heat.1995.nfo"));

        let pool = init_memory_pool().unwrap();
        let id = {
            let conn = pool.get().unwrap();
            let movie = movies::create_movie(&conn, "Heat", Some(1995)).unwrap();
            movies::set_movie_availability(
                &conn,
                movie.id,
                Status::Downloaded,
                Some(movie_dir.to_str().unwrap()),
            )
            .unwrap();
            movie.id
        };

        let resolved = resolver(pool, dir.path())
            .resolve(MediaKind::Movie, &id.to_string())
            .unwrap();
        assert_eq!(resolved, movie_dir.join("Heat.1995.mkv"));
    }

    #[test]
    fn test_falls_back_to_root_scan() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Ronin (1998)/Ronin.1998.mp4"));

        let pool = init_memory_pool().unwrap();
        let id = {
            let conn = pool.get().unwrap();
            movies::create_movie(&conn, "Ronin", None).unwrap().id
        };

        let resolved = resolver(pool, dir.path())
            .resolve(MediaKind::Movie, &id.to_string())
            .unwrap();
        assert_eq!(resolved, dir.path().join("Ronin (1998)/Ronin.1998.mp4"));
    }

    #[test]
    fn test_never_returns_non_playable_stored_path() {
        let dir = tempfile::tempdir().unwrap();
        let secret = dir.path().join("Heat/passwords.txt");
        touch(&secret);

        let pool = init_memory_pool().unwrap();
        let id = {
            let conn = pool.get().unwrap();
            let movie = movies::create_movie(&conn, "Heat", None).unwrap();
            movies::set_movie_availability(
                &conn,
                movie.id,
                Status::Downloaded,
                Some(secret.to_str().unwrap()),
            )
            .unwrap();
            movie.id
        };

        let result = resolver(pool, dir.path()).resolve(MediaKind::Movie, &id.to_string());
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_unknown_and_malformed_ids() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver(init_memory_pool().unwrap(), dir.path());

        let missing = resolver.resolve(MediaKind::Movie, &MovieId::new().to_string());
        assert!(matches!(missing, Err(Error::NotFound(_))));

        let malformed = resolver.resolve(MediaKind::Track, "not-a-uuid");
        assert!(matches!(malformed, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_episode_target_needs_marker() {
        let target = PlaybackTarget {
            kind: MediaKind::Episode,
            title: normalize("Show Name"),
            display_title: "Show Name S01E02".into(),
            stored: Vec::new(),
            episode: Some(EpisodeMarker {
                season: 1,
                episode: 2,
            }),
            track_number: None,
        };
        assert!(target.accepts("Show.Name.S01E02.mkv", "show name s01e02 mkv"));
        assert!(!target.accepts("Show.Name.S01E03.mkv", "show name s01e03 mkv"));
    }

    #[test]
    fn test_track_target_matches_number_or_title() {
        let target = PlaybackTarget {
            kind: MediaKind::Track,
            title: normalize("Airbag"),
            display_title: "Airbag".into(),
            stored: Vec::new(),
            episode: None,
            track_number: Some(1),
        };
        assert!(target.accepts("01 Untitled.flac", "01 untitled flac"));
        assert!(target.accepts("Airbag.flac", "airbag flac"));
        assert!(!target.accepts("02 Paranoid Android.flac", "02 paranoid android flac"));
    }
}
