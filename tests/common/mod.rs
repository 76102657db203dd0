//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates a temporary SQLite catalog, three
//! temporary media roots, a manual clock and the full [`AppContext`]. The
//! [`TestHarness::with_server`] constructor starts Axum on a random port for
//! HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use reelhouse::config::Config;
use reelhouse::server::{create_router, AppContext};
use reelhouse::tools::ToolRegistry;
use reelhouse_common::{Clock, LibraryKind, ManualClock};
use reelhouse_db::pool::{get_conn, init_pool, DbPool, PooledConnection};
use tempfile::TempDir;

/// Test harness wrapping a fully-constructed [`AppContext`] over a catalog
/// file and media roots that live as long as the harness.
pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    pub clock: Arc<ManualClock>,
    pub config: Config,
    dir: TempDir,
}

impl TestHarness {
    /// Create a harness with default configuration and no encoder.
    pub fn new() -> Self {
        Self::build(|_| {}, ToolRegistry::default())
    }

    /// Create a harness with a tweaked configuration.
    pub fn with_config(tweak: impl FnOnce(&mut Config)) -> Self {
        Self::build(tweak, ToolRegistry::default())
    }

    /// Create a harness whose encoder is the given executable.
    pub fn with_encoder(ffmpeg: PathBuf, tweak: impl FnOnce(&mut Config)) -> Self {
        Self::build(
            tweak,
            ToolRegistry::with_paths([(reelhouse::tools::FFMPEG, ffmpeg)]),
        )
    }

    fn build(tweak: impl FnOnce(&mut Config), tools: ToolRegistry) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let data_dir = dir.path().join("data");
        std::fs::create_dir_all(&data_dir).expect("failed to create data dir");

        let mut config = Config::default();
        for (kind, name) in [
            (LibraryKind::Movies, "movies"),
            (LibraryKind::Tv, "tv"),
            (LibraryKind::Music, "music"),
        ] {
            let root = dir.path().join(name);
            std::fs::create_dir_all(&root).expect("failed to create media root");
            match kind {
                LibraryKind::Movies => config.library.movies_dir = Some(root),
                LibraryKind::Tv => config.library.tv_dir = Some(root),
                LibraryKind::Music => config.library.music_dir = Some(root),
            }
        }
        tweak(&mut config);

        let db_path = data_dir.join("reelhouse.db");
        let db = init_pool(&db_path.to_string_lossy()).expect("failed to open catalog");
        let clock = Arc::new(ManualClock::default());

        let ctx = AppContext::new(
            config.clone(),
            db.clone(),
            &data_dir,
            tools,
            clock.clone() as Arc<dyn Clock>,
        );

        Self {
            ctx,
            db,
            clock,
            config,
            dir,
        }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::serve(Self::new()).await
    }

    /// Start an Axum server for an already built harness.
    pub async fn serve(harness: Self) -> (Self, SocketAddr) {
        let app = harness.router();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    /// Router over this harness's context, for `oneshot` tests.
    pub fn router(&self) -> Router {
        create_router(self.ctx.clone())
    }

    /// Get a database connection from the pool.
    pub fn conn(&self) -> PooledConnection {
        get_conn(&self.db).expect("failed to get db connection")
    }

    /// Media root for a library kind.
    pub fn root(&self, kind: LibraryKind) -> PathBuf {
        self.config
            .library
            .root(kind)
            .expect("root configured")
            .to_path_buf()
    }

    /// Data directory holding the catalog and progress file.
    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    /// Write a file under a media root, creating parent directories.
    pub fn write_media(&self, kind: LibraryKind, relative: &str, contents: &[u8]) -> PathBuf {
        let path = self.root(kind).join(relative);
        write_file(&path, contents);
        path
    }

    /// Move the clock past the reconciliation cooldown.
    pub fn pass_cooldown(&self) {
        let secs = self.config.scan.cooldown_secs as i64 + 1;
        self.clock.advance(chrono::Duration::seconds(secs));
    }
}

pub fn write_file(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("failed to create parent dir");
    }
    std::fs::write(path, contents).expect("failed to write file");
}

/// Write an executable shell script named `name` into `dir`.
#[cfg(unix)]
pub fn shell_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("failed to write script");
    let mut perms = std::fs::metadata(&path).expect("script metadata").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("failed to chmod script");
    path
}

/// Shell script standing in for the encoder.
#[cfg(unix)]
pub fn fake_encoder(dir: &Path, body: &str) -> PathBuf {
    shell_script(dir, "fake-ffmpeg", body)
}
