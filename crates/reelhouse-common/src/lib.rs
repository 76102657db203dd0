//! Reelhouse-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across reelhouse:
//!
//! - **Typed IDs**: Type-safe UUID wrappers for movies, series, episodes, artists, albums and tracks
//! - **Core Types**: Availability status, media kinds and the scanned file record
//! - **Path Utilities**: Indexable and playable extension allow-lists
//! - **Clock**: Injectable time source for cooldowns and progress stamps
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use reelhouse_common::{MovieId, MediaKind, Error, Result};
//! use reelhouse_common::paths::is_playable;
//! use std::path::Path;
//!
//! let movie_id = MovieId::new();
//!
//! assert!(is_playable(MediaKind::Movie, Path::new("movie.mp4")));
//! assert!(!is_playable(MediaKind::Movie, Path::new("movie.avi")));
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found("movie"))
//! }
//! ```

pub mod clock;
pub mod error;
pub mod ids;
pub mod paths;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
