//! Database query modules.
//!
//! - movies: movie CRUD and availability
//! - series: series and episode CRUD, availability, joins
//! - music: artist, album and track CRUD, availability, joins
//!
//! Availability setters are the only writers of status and path columns.

pub mod movies;
pub mod music;
pub mod series;

use chrono::{DateTime, Utc};
use reelhouse_common::Status;
use rusqlite::types::Type;
use rusqlite::Row;
use uuid::Uuid;

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

/// Read a UUID column into a typed ID.
pub(crate) fn id_at<T: From<Uuid>>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map(T::from)
        .map_err(|e| conversion_error(idx, e))
}

pub(crate) fn status_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Status> {
    let raw: String = row.get(idx)?;
    raw.parse::<Status>().map_err(|e| conversion_error(idx, e))
}

pub(crate) fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}
