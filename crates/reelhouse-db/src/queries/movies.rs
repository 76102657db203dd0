//! Movie database queries.

use chrono::Utc;
use reelhouse_common::{Error, MovieId, Result, Status};
use rusqlite::{Connection, OptionalExtension, Row};

use super::{id_at, status_at, timestamp_at};
use crate::models::Movie;

const MOVIE_COLUMNS: &str = "id, title, year, status, path, added_at, updated_at";

fn row_to_movie(row: &Row<'_>) -> rusqlite::Result<Movie> {
    Ok(Movie {
        id: id_at(row, 0)?,
        title: row.get(1)?,
        year: row.get(2)?,
        status: status_at(row, 3)?,
        path: row.get(4)?,
        added_at: timestamp_at(row, 5)?,
        updated_at: timestamp_at(row, 6)?,
    })
}

/// Create a new movie in the `wanted` state.
///
/// Movies normally enter the catalog through search; reconciliation never
/// calls this.
pub fn create_movie(conn: &Connection, title: &str, year: Option<i32>) -> Result<Movie> {
    let id = MovieId::new();
    let now = Utc::now();

    conn.execute(
        "INSERT INTO movies (id, title, year, status, added_at, updated_at)
         VALUES (:id, :title, :year, :status, :now, :now)",
        rusqlite::named_params! {
            ":id": id.to_string(),
            ":title": title,
            ":year": year,
            ":status": Status::Wanted.to_string(),
            ":now": now.to_rfc3339(),
        },
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Movie {
        id,
        title: title.to_string(),
        year,
        status: Status::Wanted,
        path: None,
        added_at: now,
        updated_at: now,
    })
}

/// Get a movie by ID.
pub fn get_movie(conn: &Connection, id: MovieId) -> Result<Option<Movie>> {
    conn.query_row(
        &format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE id = :id"),
        rusqlite::named_params! { ":id": id.to_string() },
        row_to_movie,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// List all movies ordered by title.
pub fn list_movies(conn: &Connection) -> Result<Vec<Movie>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies ORDER BY title COLLATE NOCASE"
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let movies = stmt
        .query_map([], row_to_movie)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(movies)
}

/// Set a movie's status and directory path.
///
/// # Returns
///
/// * `Ok(())` - If the update succeeded
/// * `Err(Error)` - If the movie does not exist or a database error occurs
pub fn set_movie_availability(
    conn: &Connection,
    id: MovieId,
    status: Status,
    path: Option<&str>,
) -> Result<()> {
    let rows_affected = conn
        .execute(
            "UPDATE movies SET status = :status, path = :path, updated_at = :now WHERE id = :id",
            rusqlite::named_params! {
                ":id": id.to_string(),
                ":status": status.to_string(),
                ":path": path,
                ":now": Utc::now().to_rfc3339(),
            },
        )
        .map_err(|e| Error::database(e.to_string()))?;

    if rows_affected == 0 {
        return Err(Error::not_found("movie"));
    }

    Ok(())
}

/// Delete a movie.
///
/// # Returns
///
/// * `Ok(true)` - If the movie was deleted
/// * `Ok(false)` - If the movie did not exist
pub fn delete_movie(conn: &Connection, id: MovieId) -> Result<bool> {
    let rows_affected = conn
        .execute(
            "DELETE FROM movies WHERE id = :id",
            rusqlite::named_params! { ":id": id.to_string() },
        )
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(rows_affected > 0)
}
