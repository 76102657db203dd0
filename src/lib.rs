//! Reelhouse - self-hosted media library and playback server
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod playback;
pub mod reconcile;
pub mod scanner;
pub mod server;
pub mod streaming;
pub mod tools;
