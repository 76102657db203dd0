//! Series and episode database queries.

use chrono::Utc;
use reelhouse_common::{EpisodeId, Error, Result, SeriesId, Status};
use rusqlite::{Connection, OptionalExtension, Row};

use super::{id_at, status_at, timestamp_at};
use crate::models::{Episode, EpisodeWithSeries, Series};

const SERIES_COLUMNS: &str = "id, title, year, status, path, added_at, updated_at";
const EPISODE_COLUMNS: &str =
    "e.id, e.series_id, e.season, e.episode, e.title, e.downloaded, e.file_path, e.updated_at";

fn row_to_series(row: &Row<'_>) -> rusqlite::Result<Series> {
    Ok(Series {
        id: id_at(row, 0)?,
        title: row.get(1)?,
        year: row.get(2)?,
        status: status_at(row, 3)?,
        path: row.get(4)?,
        added_at: timestamp_at(row, 5)?,
        updated_at: timestamp_at(row, 6)?,
    })
}

fn row_to_episode(row: &Row<'_>) -> rusqlite::Result<Episode> {
    Ok(Episode {
        id: id_at(row, 0)?,
        series_id: id_at(row, 1)?,
        season: row.get(2)?,
        episode: row.get(3)?,
        title: row.get(4)?,
        downloaded: row.get(5)?,
        file_path: row.get(6)?,
        updated_at: timestamp_at(row, 7)?,
    })
}

/// Create a new series in the `wanted` state.
pub fn create_series(conn: &Connection, title: &str, year: Option<i32>) -> Result<Series> {
    let id = SeriesId::new();
    let now = Utc::now();

    conn.execute(
        "INSERT INTO series (id, title, year, status, added_at, updated_at)
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

    Ok(Series {
        id,
        title: title.to_string(),
        year,
        status: Status::Wanted,
        path: None,
        added_at: now,
        updated_at: now,
    })
}

/// Get a series by ID.
pub fn get_series(conn: &Connection, id: SeriesId) -> Result<Option<Series>> {
    conn.query_row(
        &format!("SELECT {SERIES_COLUMNS} FROM series WHERE id = :id"),
        rusqlite::named_params! { ":id": id.to_string() },
        row_to_series,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// List all series ordered by title.
pub fn list_series(conn: &Connection) -> Result<Vec<Series>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {SERIES_COLUMNS} FROM series ORDER BY title COLLATE NOCASE"
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let series = stmt
        .query_map([], row_to_series)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(series)
}

/// Set a series' status and directory path.
pub fn set_series_availability(
    conn: &Connection,
    id: SeriesId,
    status: Status,
    path: Option<&str>,
) -> Result<()> {
    let rows_affected = conn
        .execute(
            "UPDATE series SET status = :status, path = :path, updated_at = :now WHERE id = :id",
            rusqlite::named_params! {
                ":id": id.to_string(),
                ":status": status.to_string(),
                ":path": path,
                ":now": Utc::now().to_rfc3339(),
            },
        )
        .map_err(|e| Error::database(e.to_string()))?;

    if rows_affected == 0 {
        return Err(Error::not_found("series"));
    }

    Ok(())
}

/// Create an episode that is not yet downloaded.
///
/// Fails with a database error if `(series_id, season, episode)` already exists.
pub fn create_episode(
    conn: &Connection,
    series_id: SeriesId,
    season: u32,
    episode: u32,
    title: Option<&str>,
) -> Result<Episode> {
    let id = EpisodeId::new();
    let now = Utc::now();

    conn.execute(
        "INSERT INTO episodes (id, series_id, season, episode, title, downloaded, updated_at)
         VALUES (:id, :series_id, :season, :episode, :title, 0, :now)",
        rusqlite::named_params! {
            ":id": id.to_string(),
            ":series_id": series_id.to_string(),
            ":season": season,
            ":episode": episode,
            ":title": title,
            ":now": now.to_rfc3339(),
        },
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Episode {
        id,
        series_id,
        season,
        episode,
        title: title.map(str::to_string),
        downloaded: false,
        file_path: None,
        updated_at: now,
    })
}

/// Get an episode joined with its series.
pub fn get_episode(conn: &Connection, id: EpisodeId) -> Result<Option<EpisodeWithSeries>> {
    conn.query_row(
        &format!(
            "SELECT {EPISODE_COLUMNS}, s.title, s.status
             FROM episodes e JOIN series s ON s.id = e.series_id
             WHERE e.id = :id"
        ),
        rusqlite::named_params! { ":id": id.to_string() },
        row_to_episode_with_series,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

fn row_to_episode_with_series(row: &Row<'_>) -> rusqlite::Result<EpisodeWithSeries> {
    Ok(EpisodeWithSeries {
        episode: row_to_episode(row)?,
        series_title: row.get(8)?,
        series_status: status_at(row, 9)?,
    })
}

/// List the episodes of one series in season/episode order.
pub fn list_episodes(conn: &Connection, series_id: SeriesId) -> Result<Vec<Episode>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {EPISODE_COLUMNS} FROM episodes e
             WHERE e.series_id = :series_id
             ORDER BY e.season, e.episode"
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let episodes = stmt
        .query_map(
            rusqlite::named_params! { ":series_id": series_id.to_string() },
            row_to_episode,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(episodes)
}

/// List episodes joined with their series, optionally limited to one series.
pub fn list_episodes_with_series(
    conn: &Connection,
    series_id: Option<SeriesId>,
) -> Result<Vec<EpisodeWithSeries>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {EPISODE_COLUMNS}, s.title, s.status
             FROM episodes e JOIN series s ON s.id = e.series_id
             WHERE :series_id IS NULL OR e.series_id = :series_id
             ORDER BY s.title COLLATE NOCASE, e.season, e.episode"
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let episodes = stmt
        .query_map(
            rusqlite::named_params! { ":series_id": series_id.map(|id| id.to_string()) },
            row_to_episode_with_series,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(episodes)
}

/// Set an episode's downloaded flag and exact file path.
pub fn set_episode_availability(
    conn: &Connection,
    id: EpisodeId,
    downloaded: bool,
    file_path: Option<&str>,
) -> Result<()> {
    let rows_affected = conn
        .execute(
            "UPDATE episodes SET downloaded = :downloaded, file_path = :file_path, updated_at = :now
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
        return Err(Error::not_found("episode"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;

    #[test]
    fn test_create_and_get_series() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let series = create_series(&conn, "Show Name", Some(2010)).unwrap();
        let found = get_series(&conn, series.id).unwrap().unwrap();
        assert_eq!(found.title, "Show Name");
        assert_eq!(found.status, Status::Wanted);
        assert!(get_series(&conn, SeriesId::new()).unwrap().is_none());
    }

    #[test]
    fn test_episodes_ordered() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let series = create_series(&conn, "Show", None).unwrap();
        create_episode(&conn, series.id, 2, 1, None).unwrap();
        create_episode(&conn, series.id, 1, 2, Some("Second")).unwrap();
        create_episode(&conn, series.id, 1, 1, Some("Pilot")).unwrap();

        let keys: Vec<_> = list_episodes(&conn, series.id)
            .unwrap()
            .into_iter()
            .map(|e| (e.season, e.episode))
            .collect();
        assert_eq!(keys, vec![(1, 1), (1, 2), (2, 1)]);
    }

    #[test]
    fn test_duplicate_episode_rejected() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let series = create_series(&conn, "Show", None).unwrap();
        create_episode(&conn, series.id, 1, 1, None).unwrap();
        assert!(create_episode(&conn, series.id, 1, 1, None).is_err());
    }

    #[test]
    fn test_list_episodes_with_series_filter() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let a = create_series(&conn, "Alpha", None).unwrap();
        let b = create_series(&conn, "Beta", None).unwrap();
        create_episode(&conn, a.id, 1, 1, None).unwrap();
        create_episode(&conn, b.id, 1, 1, None).unwrap();
        create_episode(&conn, b.id, 1, 2, None).unwrap();

        let all = list_episodes_with_series(&conn, None).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].series_title, "Alpha");

        let only_b = list_episodes_with_series(&conn, Some(b.id)).unwrap();
        assert_eq!(only_b.len(), 2);
        assert!(only_b.iter().all(|e| e.episode.series_id == b.id));
    }

    #[test]
    fn test_set_episode_availability() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let series = create_series(&conn, "Show", None).unwrap();
        let episode = create_episode(&conn, series.id, 1, 1, None).unwrap();

        set_episode_availability(&conn, episode.id, true, Some("/tv/Show/S01E01.mkv")).unwrap();
        let found = get_episode(&conn, episode.id).unwrap().unwrap();
        assert!(found.episode.downloaded);
        assert_eq!(found.episode.file_path.as_deref(), Some("/tv/Show/S01E01.mkv"));
        assert_eq!(found.series_title, "Show");

        assert!(set_episode_availability(&conn, EpisodeId::new(), false, None).is_err());
    }

    #[test]
    fn test_set_series_availability() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let series = create_series(&conn, "Show", None).unwrap();
        set_series_availability(&conn, series.id, Status::Downloaded, Some("/tv/Show")).unwrap();
        let found = get_series(&conn, series.id).unwrap().unwrap();
        assert_eq!(found.status, Status::Downloaded);
        assert_eq!(found.path.as_deref(), Some("/tv/Show"));
    }
}
