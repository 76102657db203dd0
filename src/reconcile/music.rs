//! Music reconciliation.
//!
//! Music is discovered bottom-up: every directory of audio files is read as
//! one album. Directories that match a known album attach their files to it;
//! anything else creates the artist, album and track rows on the spot.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use reelhouse_common::{
    AlbumId, ArtistId, Error, LibraryKind, Result, ScannedFile, Status, TrackId,
};
use reelhouse_db::models::{Album, Artist, Track};
use reelhouse_db::pool::get_conn;
use reelhouse_db::queries::music as queries;
use reelhouse_matcher::{
    best_artist, contains_title, infer_album, normalize, parse_track_number, preferred_directory,
    track_title, AlbumGuess,
};
use rusqlite::Connection;
use tracing::debug;

use super::{path_string, ReconcileReport, Reconciler};

const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Directory standing for an artist: the album's parent when that is still
/// below the root, otherwise the album directory itself.
pub(crate) fn artist_dir_of(album_dir: &Path, root: &Path) -> PathBuf {
    match album_dir.parent() {
        Some(parent) if parent != root && parent.starts_with(root) => parent.to_path_buf(),
        _ => album_dir.to_path_buf(),
    }
}

fn file_stem(file: &ScannedFile) -> String {
    file.full_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.file_name.clone())
}

/// Pick the unclaimed track a file belongs to.
///
/// A track already holding this exact file wins, then a track with the same
/// number, then an exact title and finally title containment. Tracks whose
/// number disagrees with the file's are never matched by title.
fn match_track(
    tracks: &[Track],
    claimed: &HashSet<TrackId>,
    path: &str,
    stem: &str,
) -> Option<usize> {
    let open = |t: &Track| !claimed.contains(&t.id);
    if let Some(i) = tracks
        .iter()
        .position(|t| open(t) && t.file_path.as_deref() == Some(path))
    {
        return Some(i);
    }

    let number = parse_track_number(stem);
    if let Some(n) = number {
        if let Some(i) = tracks
            .iter()
            .position(|t| open(t) && t.track_number == Some(n))
        {
            return Some(i);
        }
    }

    let title_candidate = |t: &Track| {
        open(t)
            && match (number, t.track_number) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
    };
    let title = normalize(&track_title(stem));
    if !title.is_empty() {
        if let Some(i) = tracks
            .iter()
            .position(|t| title_candidate(t) && normalize(&t.title) == title)
        {
            return Some(i);
        }
    }

    let candidate = normalize(stem);
    tracks
        .iter()
        .position(|t| title_candidate(t) && contains_title(&candidate, &normalize(&t.title)))
}

/// Catalog rows loaded once per pass and kept current as the pass writes.
struct Library<'c> {
    conn: &'c Connection,
    root: PathBuf,
    artists: Vec<Artist>,
    albums: Vec<Album>,
    tracks: HashMap<AlbumId, Vec<Track>>,
    claimed: HashSet<TrackId>,
    created: usize,
    updated: usize,
}

impl<'c> Library<'c> {
    fn load(conn: &'c Connection, root: PathBuf) -> Result<Self> {
        let artists = queries::list_artists(conn)?;
        let albums = queries::list_albums_with_artist(conn)?
            .into_iter()
            .map(|a| a.album)
            .collect();

        let mut tracks: HashMap<AlbumId, Vec<Track>> = HashMap::new();
        for row in queries::list_tracks_with_album(conn)? {
            tracks.entry(row.track.album_id).or_default().push(row.track);
        }

        Ok(Self {
            conn,
            root,
            artists,
            albums,
            tracks,
            claimed: HashSet::new(),
            created: 0,
            updated: 0,
        })
    }

    fn artist_for(&mut self, guess: &AlbumGuess, album_dir: &Path) -> Result<ArtistId> {
        let candidates = if guess.artist_candidates.is_empty() {
            vec![UNKNOWN_ARTIST.to_string()]
        } else {
            guess.artist_candidates.clone()
        };

        let known = self.artists.iter().map(|a| (a.id, a.name.as_str()));
        if let Some((id, score)) = best_artist(&candidates, known) {
            debug!(candidates = ?candidates, score, "Matched known artist");
            return Ok(id);
        }

        let artist_dir = path_string(&artist_dir_of(album_dir, &self.root));
        let artist = queries::create_artist(
            self.conn,
            &candidates[0],
            Status::Downloaded,
            Some(&artist_dir),
        )?;
        debug!(artist = %artist.name, path = %artist_dir, "Created artist");
        let id = artist.id;
        self.artists.push(artist);
        self.created += 1;
        Ok(id)
    }

    fn album_for(&mut self, artist_id: ArtistId, guess: &AlbumGuess, dir: &Path) -> Result<usize> {
        if let Some(found) = queries::find_album_by_title(self.conn, artist_id, &guess.title)? {
            if let Some(index) = self.albums.iter().position(|a| a.id == found.id) {
                return Ok(index);
            }
        }

        let wanted = normalize(&guess.title);
        if !wanted.is_empty() {
            if let Some(index) = self
                .albums
                .iter()
                .position(|a| a.artist_id == artist_id && normalize(&a.title) == wanted)
            {
                return Ok(index);
            }
        }

        let dir = path_string(dir);
        let album = queries::create_album(
            self.conn,
            artist_id,
            &guess.title,
            guess.year,
            Status::Downloaded,
            Some(&dir),
        )?;
        debug!(album = %album.title, path = %dir, "Created album");
        self.albums.push(album);
        self.created += 1;
        Ok(self.albums.len() - 1)
    }

    /// Attach one directory's files to an album, creating rows as needed.
    fn attach_directory(&mut self, dir: &Path, files: &[&ScannedFile]) -> Result<()> {
        let Some(guess) = infer_album(dir, &self.root) else {
            return Ok(());
        };

        let artist_id = self.artist_for(&guess, dir)?;
        let index = self.album_for(artist_id, &guess, dir)?;
        if self.albums[index].status == Status::Archived {
            return Ok(());
        }
        let album_id = self.albums[index].id;

        // files already recorded on a track keep it before any loose matching
        let mut pending = Vec::new();
        for file in files {
            if !self.claim_by_path(album_id, file)? {
                pending.push(*file);
            }
        }
        for file in pending {
            self.attach_file(album_id, file)?;
        }
        Ok(())
    }

    fn claim_by_path(&mut self, album_id: AlbumId, file: &ScannedFile) -> Result<bool> {
        let path = path_string(&file.full_path);
        let Some(tracks) = self.tracks.get_mut(&album_id) else {
            return Ok(false);
        };
        let Some(track) = tracks
            .iter_mut()
            .find(|t| !self.claimed.contains(&t.id) && t.file_path.as_deref() == Some(path.as_str()))
        else {
            return Ok(false);
        };

        self.claimed.insert(track.id);
        if !track.downloaded {
            queries::set_track_availability(self.conn, track.id, true, Some(&path))?;
            track.downloaded = true;
            self.updated += 1;
        }
        Ok(true)
    }

    fn attach_file(&mut self, album_id: AlbumId, file: &ScannedFile) -> Result<()> {
        let stem = file_stem(file);
        let number = parse_track_number(&stem);
        let path = path_string(&file.full_path);
        let tracks = self.tracks.entry(album_id).or_default();
        let matched = match_track(tracks, &self.claimed, &path, &stem);

        match matched {
            Some(i) => {
                let track = &mut tracks[i];
                self.claimed.insert(track.id);
                if track.downloaded && track.file_path.as_deref() == Some(path.as_str()) {
                    return Ok(());
                }
                queries::set_track_availability(self.conn, track.id, true, Some(&path))?;
                track.downloaded = true;
                track.file_path = Some(path);
                self.updated += 1;
            }
            None => {
                let track =
                    queries::create_track(self.conn, album_id, number, &track_title(&stem), Some(&path))?;
                self.claimed.insert(track.id);
                tracks.push(track);
                self.created += 1;
            }
        }
        Ok(())
    }

    /// Clear tracks that no scanned file claimed.
    fn demote_unclaimed(&mut self) -> Result<()> {
        let archived: HashSet<AlbumId> = self
            .albums
            .iter()
            .filter(|a| a.status == Status::Archived)
            .map(|a| a.id)
            .collect();

        for (album_id, tracks) in self.tracks.iter_mut() {
            if archived.contains(album_id) {
                continue;
            }
            for track in tracks.iter_mut() {
                if self.claimed.contains(&track.id) || (!track.downloaded && track.file_path.is_none())
                {
                    continue;
                }
                queries::set_track_availability(self.conn, track.id, false, None)?;
                track.downloaded = false;
                track.file_path = None;
                self.updated += 1;
            }
        }
        Ok(())
    }

    /// Albums follow their tracks, artists follow their albums.
    fn roll_up(&mut self, truncated: bool) -> Result<()> {
        for album in self.albums.iter_mut() {
            if album.status == Status::Archived {
                continue;
            }
            let dirs = self
                .tracks
                .get(&album.id)
                .into_iter()
                .flatten()
                .filter(|t| t.downloaded)
                .filter_map(|t| t.file_path.as_deref())
                .filter_map(|p| Path::new(p).parent());
            let (status, path) = match preferred_directory(dirs).map(path_string) {
                Some(dir) => (Status::Downloaded, Some(dir)),
                None if truncated => continue,
                None => (Status::Wanted, None),
            };
            if album.status == status && album.path == path {
                continue;
            }
            queries::set_album_availability(self.conn, album.id, status, path.as_deref())?;
            album.status = status;
            album.path = path;
            self.updated += 1;
        }

        for artist in self.artists.iter_mut() {
            if artist.status == Status::Archived {
                continue;
            }
            let artist_dirs: Vec<PathBuf> = self
                .albums
                .iter()
                .filter(|a| a.artist_id == artist.id && a.status == Status::Downloaded)
                .filter_map(|a| a.path.as_deref())
                .map(|p| artist_dir_of(Path::new(p), &self.root))
                .collect();
            let (status, path) =
                match preferred_directory(artist_dirs.iter().map(PathBuf::as_path)).map(path_string)
                {
                    Some(dir) => (Status::Downloaded, Some(dir)),
                    None if truncated => continue,
                    None => (Status::Wanted, None),
                };
            if artist.status == status && artist.path == path {
                continue;
            }
            queries::set_artist_availability(self.conn, artist.id, status, path.as_deref())?;
            artist.status = status;
            artist.path = path;
            self.updated += 1;
        }
        Ok(())
    }
}

impl Reconciler {
    pub(super) fn sync_music(&self) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::new(LibraryKind::Music);
        let Some((root, outcome)) = self.walk(LibraryKind::Music) else {
            return Ok(report);
        };
        report.absorb(&outcome);

        let mut by_dir: BTreeMap<&Path, Vec<&ScannedFile>> = BTreeMap::new();
        for file in &outcome.files {
            by_dir.entry(file.directory.as_path()).or_default().push(file);
        }

        let conn = get_conn(&self.pool)?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;

        let mut library = Library::load(&tx, root)?;
        for (dir, files) in &by_dir {
            library.attach_directory(dir, files)?;
        }
        if !outcome.truncated {
            library.demote_unclaimed()?;
        }
        library.roll_up(outcome.truncated)?;

        report.created = library.created;
        report.updated = library.updated;
        drop(library);

        tx.commit().map_err(|e| Error::database(e.to_string()))?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artist_dir_of() {
        let root = Path::new("/music");
        assert_eq!(
            artist_dir_of(Path::new("/music/Radiohead/OK Computer"), root),
            PathBuf::from("/music/Radiohead")
        );
        assert_eq!(
            artist_dir_of(Path::new("/music/Radiohead - OK Computer"), root),
            PathBuf::from("/music/Radiohead - OK Computer")
        );
    }

    #[test]
    fn test_file_stem() {
        let file = crate::scanner::scanned_file(
            Path::new("/music"),
            Path::new("/music/A/B/01 - Airbag.flac"),
        )
        .unwrap();
        assert_eq!(file_stem(&file), "01 - Airbag");
    }

    fn track(number: Option<u32>, title: &str, file_path: Option<&str>) -> Track {
        Track {
            id: TrackId::new(),
            album_id: AlbumId::new(),
            track_number: number,
            title: title.to_string(),
            downloaded: file_path.is_some(),
            file_path: file_path.map(str::to_string),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_match_track_prefers_recorded_file() {
        let tracks = vec![
            track(None, "Intro", Some("/m/A/B/Intro (Reprise).mp3")),
            track(None, "Intro (Reprise)", Some("/m/A/B/Intro.mp3")),
        ];
        let claimed = HashSet::new();
        assert_eq!(
            match_track(&tracks, &claimed, "/m/A/B/Intro.mp3", "Intro"),
            Some(1)
        );
    }

    #[test]
    fn test_match_track_exact_title_before_containment() {
        let tracks = vec![track(None, "Intro", None), track(None, "Intro (Reprise)", None)];
        let claimed = HashSet::new();
        assert_eq!(
            match_track(&tracks, &claimed, "/m/Intro (Reprise).mp3", "Intro (Reprise)"),
            Some(1)
        );
        assert_eq!(match_track(&tracks, &claimed, "/m/Intro.mp3", "Intro"), Some(0));
    }

    #[test]
    fn test_match_track_short_title() {
        let tracks = vec![track(None, "X", None)];
        let mut claimed = HashSet::new();
        assert_eq!(match_track(&tracks, &claimed, "/m/X.mp3", "X"), Some(0));

        claimed.insert(tracks[0].id);
        assert_eq!(match_track(&tracks, &claimed, "/m/X.mp3", "X"), None);
    }

    #[test]
    fn test_match_track_number_mismatch_skips_title() {
        let tracks = vec![track(Some(3), "Angel", None)];
        let claimed = HashSet::new();
        assert_eq!(match_track(&tracks, &claimed, "/m/05 - Angel.mp3", "05 - Angel"), None);
        assert_eq!(match_track(&tracks, &claimed, "/m/Angel.mp3", "Angel"), Some(0));
    }
}
