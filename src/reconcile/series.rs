//! Series reconciliation: episodes get an exact file path, the series gets
//! the directory holding most of its downloaded episodes.

use std::collections::HashMap;
use std::path::Path;

use reelhouse_common::paths::is_playable;
use reelhouse_common::{Error, LibraryKind, MediaKind, Result, ScannedFile, SeriesId, Status};
use reelhouse_db::models::{Episode, Series};
use reelhouse_db::pool::get_conn;
use reelhouse_db::queries::series as queries;
use reelhouse_matcher::{
    extract_episode_markers, matching_files, normalize, preferred_directory, EpisodeMarker,
};
use rusqlite::Connection;
use tracing::debug;

use super::{path_string, ReconcileReport, Reconciler};

/// Index the files matching a series title by the markers in their names.
pub(crate) fn index_by_marker<'a>(
    files: &'a [ScannedFile],
    title: &str,
) -> HashMap<EpisodeMarker, Vec<&'a ScannedFile>> {
    let mut index: HashMap<EpisodeMarker, Vec<&ScannedFile>> = HashMap::new();
    for file in matching_files(files, &normalize(title)) {
        for marker in extract_episode_markers(&file.file_name) {
            index.entry(marker).or_default().push(file);
        }
    }
    index
}

/// Pick one file for an episode: playable containers first, then the
/// directory holding most candidates.
pub(crate) fn pick_episode_file<'a>(candidates: &[&'a ScannedFile]) -> Option<&'a ScannedFile> {
    let playable: Vec<&ScannedFile> = candidates
        .iter()
        .copied()
        .filter(|f| is_playable(MediaKind::Episode, &f.full_path))
        .collect();
    let pool = if playable.is_empty() {
        candidates.to_vec()
    } else {
        playable
    };

    let dir = preferred_directory(pool.iter().copied().map(|f| f.directory.as_path()))?;
    pool.into_iter().find(|f| f.directory == dir)
}

impl Reconciler {
    pub(super) fn sync_series(&self, only: Option<SeriesId>) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::new(LibraryKind::Tv);

        let conn = get_conn(&self.pool)?;
        let targets = match only {
            Some(id) => vec![queries::get_series(&conn, id)?
                .ok_or_else(|| Error::not_found(format!("series {id}")))?],
            None => queries::list_series(&conn)?,
        };

        let Some((_root, outcome)) = self.walk(LibraryKind::Tv) else {
            return Ok(report);
        };
        report.absorb(&outcome);

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;

        for series in targets {
            if series.status == Status::Archived {
                continue;
            }
            report.updated += sync_one_series(&tx, &series, &outcome.files, outcome.truncated)?;
        }

        tx.commit().map_err(|e| Error::database(e.to_string()))?;
        Ok(report)
    }
}

/// Sync the episodes of one series, then the series row. Returns the number
/// of rows written.
fn sync_one_series(
    conn: &Connection,
    series: &Series,
    files: &[ScannedFile],
    truncated: bool,
) -> Result<usize> {
    let index = index_by_marker(files, &series.title);
    let mut updated = 0;
    let mut episodes = queries::list_episodes(conn, series.id)?;

    for episode in &mut episodes {
        let marker = EpisodeMarker {
            season: episode.season,
            episode: episode.episode,
        };
        let found = index
            .get(&marker)
            .and_then(|candidates| pick_episode_file(candidates))
            .map(|f| path_string(&f.full_path));

        let (downloaded, file_path) = match found {
            Some(path) => (true, Some(path)),
            None if truncated => continue,
            None => (false, None),
        };

        if episode.downloaded == downloaded && episode.file_path == file_path {
            continue;
        }

        debug!(
            series = %series.title,
            season = episode.season,
            episode = episode.episode,
            path = ?file_path,
            "Updating episode"
        );
        queries::set_episode_availability(conn, episode.id, downloaded, file_path.as_deref())?;
        episode.downloaded = downloaded;
        episode.file_path = file_path;
        updated += 1;
    }

    let (status, path) = match series_directory(&episodes) {
        Some(dir) => (Status::Downloaded, Some(dir)),
        None if truncated => return Ok(updated),
        None => (Status::Wanted, None),
    };

    if series.status != status || series.path != path {
        debug!(series = %series.title, status = %status, path = ?path, "Updating series");
        queries::set_series_availability(conn, series.id, status, path.as_deref())?;
        updated += 1;
    }

    Ok(updated)
}

fn series_directory(episodes: &[Episode]) -> Option<String> {
    let dirs = episodes
        .iter()
        .filter(|e| e.downloaded)
        .filter_map(|e| e.file_path.as_deref())
        .filter_map(|p| Path::new(p).parent());
    preferred_directory(dirs).map(path_string)
}
