//! Movie reconciliation: two-way sync of status and directory path.

use reelhouse_common::{Error, LibraryKind, Result, ScannedFile, Status};
use reelhouse_db::models::Movie;
use reelhouse_db::pool::get_conn;
use reelhouse_db::queries::movies;
use reelhouse_matcher::{matching_files, normalize, prefer_year, preferred_directory};
use tracing::debug;

use super::{path_string, ReconcileReport, Reconciler};

/// Directory a movie should point at, if any scanned file matches it.
pub(crate) fn movie_directory(movie: &Movie, files: &[ScannedFile]) -> Option<String> {
    let title = normalize(&movie.title);
    let hits = prefer_year(matching_files(files, &title), movie.year);
    preferred_directory(hits.iter().map(|f| f.directory.as_path())).map(path_string)
}

impl Reconciler {
    pub(super) fn sync_movies(&self) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::new(LibraryKind::Movies);
        let Some((_root, outcome)) = self.walk(LibraryKind::Movies) else {
            return Ok(report);
        };
        report.absorb(&outcome);

        let conn = get_conn(&self.pool)?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;

        for movie in movies::list_movies(&tx)? {
            if movie.status == Status::Archived {
                continue;
            }

            let (status, path) = match movie_directory(&movie, &outcome.files) {
                Some(dir) => (Status::Downloaded, Some(dir)),
                None if outcome.truncated => continue,
                None => (Status::Wanted, None),
            };

            if movie.status == status && movie.path == path {
                continue;
            }

            debug!(movie = %movie.title, status = %status, path = ?path, "Updating movie");
            movies::set_movie_availability(&tx, movie.id, status, path.as_deref())?;
            report.updated += 1;
        }

        tx.commit().map_err(|e| Error::database(e.to_string()))?;
        Ok(report)
    }
}
