//! Artist, album and track database queries.
//!
//! Unlike movies and series, music rows are created by reconciliation when
//! an album directory on disk matches nothing in the catalog.

use chrono::Utc;
use reelhouse_common::{AlbumId, ArtistId, Error, Result, Status, TrackId};
use rusqlite::{Connection, OptionalExtension, Row};

use super::{id_at, status_at, timestamp_at};
use crate::models::{Album, AlbumWithArtist, Artist, Track, TrackWithAlbum};

const ARTIST_COLUMNS: &str = "id, name, status, path, added_at, updated_at";
const ALBUM_COLUMNS: &str =
    "al.id, al.artist_id, al.title, al.year, al.status, al.path, al.added_at, al.updated_at";
const TRACK_COLUMNS: &str =
    "t.id, t.album_id, t.track_number, t.title, t.downloaded, t.file_path, t.updated_at";

fn row_to_artist(row: &Row<'_>) -> rusqlite::Result<Artist> {
    Ok(Artist {
        id: id_at(row, 0)?,
        name: row.get(1)?,
        status: status_at(row, 2)?,
        path: row.get(3)?,
        added_at: timestamp_at(row, 4)?,
        updated_at: timestamp_at(row, 5)?,
    })
}

fn row_to_album(row: &Row<'_>) -> rusqlite::Result<Album> {
    Ok(Album {
        id: id_at(row, 0)?,
        artist_id: id_at(row, 1)?,
        title: row.get(2)?,
        year: row.get(3)?,
        status: status_at(row, 4)?,
        path: row.get(5)?,
        added_at: timestamp_at(row, 6)?,
        updated_at: timestamp_at(row, 7)?,
    })
}

fn row_to_track(row: &Row<'_>) -> rusqlite::Result<Track> {
    Ok(Track {
        id: id_at(row, 0)?,
        album_id: id_at(row, 1)?,
        track_number: row.get(2)?,
        title: row.get(3)?,
        downloaded: row.get(4)?,
        file_path: row.get(5)?,
        updated_at: timestamp_at(row, 6)?,
    })
}

fn row_to_track_with_album(row: &Row<'_>) -> rusqlite::Result<TrackWithAlbum> {
    Ok(TrackWithAlbum {
        track: row_to_track(row)?,
        album_title: row.get(7)?,
        album_path: row.get(8)?,
        artist_id: id_at(row, 9)?,
        artist_name: row.get(10)?,
    })
}

// ---------------------------------------------------------------------------
// Artists
// ---------------------------------------------------------------------------

/// Create an artist.
pub fn create_artist(
    conn: &Connection,
    name: &str,
    status: Status,
    path: Option<&str>,
) -> Result<Artist> {
    let id = ArtistId::new();
    let now = Utc::now();

    conn.execute(
        "INSERT INTO artists (id, name, status, path, added_at, updated_at)
         VALUES (:id, :name, :status, :path, :now, :now)",
        rusqlite::named_params! {
            ":id": id.to_string(),
            ":name": name,
            ":status": status.to_string(),
            ":path": path,
            ":now": now.to_rfc3339(),
        },
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Artist {
        id,
        name: name.to_string(),
        status,
        path: path.map(str::to_string),
        added_at: now,
        updated_at: now,
    })
}

/// Get an artist by ID.
pub fn get_artist(conn: &Connection, id: ArtistId) -> Result<Option<Artist>> {
    conn.query_row(
        &format!("SELECT {ARTIST_COLUMNS} FROM artists WHERE id = :id"),
        rusqlite::named_params! { ":id": id.to_string() },
        row_to_artist,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// List all artists ordered by name.
pub fn list_artists(conn: &Connection) -> Result<Vec<Artist>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {ARTIST_COLUMNS} FROM artists ORDER BY name COLLATE NOCASE"
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let artists = stmt
        .query_map([], row_to_artist)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(artists)
}

/// Set an artist's status and directory path.
pub fn set_artist_availability(
    conn: &Connection,
    id: ArtistId,
    status: Status,
    path: Option<&str>,
) -> Result<()> {
    let rows_affected = conn
        .execute(
            "UPDATE artists SET status = :status, path = :path, updated_at = :now WHERE id = :id",
            rusqlite::named_params! {
                ":id": id.to_string(),
                ":status": status.to_string(),
                ":path": path,
                ":now": Utc::now().to_rfc3339(),
            },
        )
        .map_err(|e| Error::database(e.to_string()))?;

    if rows_affected == 0 {
        return Err(Error::not_found("artist"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Albums
// ---------------------------------------------------------------------------

/// Create an album under an artist.
pub fn create_album(
    conn: &Connection,
    artist_id: ArtistId,
    title: &str,
    year: Option<i32>,
    status: Status,
    path: Option<&str>,
) -> Result<Album> {
    let id = AlbumId::new();
    let now = Utc::now();

    conn.execute(
        "INSERT INTO albums (id, artist_id, title, year, status, path, added_at, updated_at)
         VALUES (:id, :artist_id, :title, :year, :status, :path, :now, :now)",
        rusqlite::named_params! {
            ":id": id.to_string(),
            ":artist_id": artist_id.to_string(),
            ":title": title,
            ":year": year,
            ":status": status.to_string(),
            ":path": path,
            ":now": now.to_rfc3339(),
        },
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Album {
        id,
        artist_id,
        title: title.to_string(),
        year,
        status,
        path: path.map(str::to_string),
        added_at: now,
        updated_at: now,
    })
}

/// Get an album by ID.
pub fn get_album(conn: &Connection, id: AlbumId) -> Result<Option<Album>> {
    conn.query_row(
        &format!("SELECT {ALBUM_COLUMNS} FROM albums al WHERE al.id = :id"),
        rusqlite::named_params! { ":id": id.to_string() },
        row_to_album,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// List albums joined with their artist, ordered by artist then title.
pub fn list_albums_with_artist(conn: &Connection) -> Result<Vec<AlbumWithArtist>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {ALBUM_COLUMNS}, ar.name
             FROM albums al JOIN artists ar ON ar.id = al.artist_id
             ORDER BY ar.name COLLATE NOCASE, al.title COLLATE NOCASE"
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let albums = stmt
        .query_map([], |row| {
            Ok(AlbumWithArtist {
                album: row_to_album(row)?,
                artist_name: row.get(8)?,
            })
        })
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(albums)
}

/// Find an artist's album by title, ignoring ASCII case.
pub fn find_album_by_title(
    conn: &Connection,
    artist_id: ArtistId,
    title: &str,
) -> Result<Option<Album>> {
    conn.query_row(
        &format!(
            "SELECT {ALBUM_COLUMNS} FROM albums al
             WHERE al.artist_id = :artist_id AND al.title = :title COLLATE NOCASE
             LIMIT 1"
        ),
        rusqlite::named_params! {
            ":artist_id": artist_id.to_string(),
            ":title": title,
        },
        row_to_album,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// Set an album's status and directory path.
pub fn set_album_availability(
    conn: &Connection,
    id: AlbumId,
    status: Status,
    path: Option<&str>,
) -> Result<()> {
    let rows_affected = conn
        .execute(
            "UPDATE albums SET status = :status, path = :path, updated_at = :now WHERE id = :id",
            rusqlite::named_params! {
                ":id": id.to_string(),
                ":status": status.to_string(),
                ":path": path,
                ":now": Utc::now().to_rfc3339(),
            },
        )
        .map_err(|e| Error::database(e.to_string()))?;

    if rows_affected == 0 {
        return Err(Error::not_found("album"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tracks
// ---------------------------------------------------------------------------

/// Create a track. It is marked downloaded exactly when a file path is given.
pub fn create_track(
    conn: &Connection,
    album_id: AlbumId,
    track_number: Option<u32>,
    title: &str,
    file_path: Option<&str>,
) -> Result<Track> {
    let id = TrackId::new();
    let now = Utc::now();
    let downloaded = file_path.is_some();

    conn.execute(
        "INSERT INTO tracks (id, album_id, track_number, title, downloaded, file_path, updated_at)
         VALUES (:id, :album_id, :track_number, :title, :downloaded, :file_path, :now)",
        rusqlite::named_params! {
            ":id": id.to_string(),
            ":album_id": album_id.to_string(),
            ":track_number": track_number,
            ":title": title,
            ":downloaded": downloaded,
            ":file_path": file_path,
            ":now": now.to_rfc3339(),
        },
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Track {
        id,
        album_id,
        track_number,
        title: title.to_string(),
        downloaded,
        file_path: file_path.map(str::to_string),
        updated_at: now,
    })
}

/// Get a track joined with its album and artist.
pub fn get_track(conn: &Connection, id: TrackId) -> Result<Option<TrackWithAlbum>> {
    conn.query_row(
        &format!(
            "SELECT {TRACK_COLUMNS}, al.title, al.path, ar.id, ar.name
             FROM tracks t
             JOIN albums al ON al.id = t.album_id
             JOIN artists ar ON ar.id = al.artist_id
             WHERE t.id = :id"
        ),
        rusqlite::named_params! { ":id": id.to_string() },
        row_to_track_with_album,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// List tracks joined with album and artist, in album then track order.
pub fn list_tracks_with_album(conn: &Connection) -> Result<Vec<TrackWithAlbum>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {TRACK_COLUMNS}, al.title, al.path, ar.id, ar.name
             FROM tracks t
             JOIN albums al ON al.id = t.album_id
             JOIN artists ar ON ar.id = al.artist_id
             ORDER BY ar.name COLLATE NOCASE, al.title COLLATE NOCASE,
                      t.track_number IS NULL, t.track_number, t.title"
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let tracks = stmt
        .query_map([], row_to_track_with_album)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(tracks)
}

/// Set a track's downloaded flag and exact file path.
pub fn set_track_availability(
    conn: &Connection,
    id: TrackId,
    downloaded: bool,
    file_path: Option<&str>,
) -> Result<()> {
    let rows_affected = conn
        .execute(
            "UPDATE tracks SET downloaded = :downloaded, file_path = :file_path, updated_at = :now
             WHERE id = :id",
            rusqlite::named_params! {
                ":id": id.to_string(),
                ":downloaded": downloaded,
                ":file_path": file_path,
                ":now": Utc::now().to_rfc3339(),
            },
        )
        .map_err(|e| Error::database(e.to_string()))?;

    if rows_affected == 0 {
        return Err(Error::not_found("track"));
    }

    Ok(())
}
