//! Reelhouse-DB: Catalog schema, migrations, and query operations
//!
//! This crate stores the media catalog (movies, series and episodes, artists,
//! albums and tracks) in SQLite using rusqlite with r2d2 connection pooling.
//!
//! # Modules
//!
//! - `migrations` - Database schema migrations
//! - `pool` - Connection pool management
//! - `models` - Rust models matching database schema
//! - `queries` - Database query operations, one module per catalog family
//!
//! # Example
//!
//! ```no_run
//! use reelhouse_db::pool::{init_pool, get_conn};
//! use reelhouse_db::queries::movies;
//!
//! let pool = init_pool("/var/lib/reelhouse/reelhouse.db").unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! let movie = movies::create_movie(&conn, "Heat", Some(1995)).unwrap();
//! println!("Tracking: {} ({})", movie.title, movie.status);
//! ```

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
