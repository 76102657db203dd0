//! Library reconciliation.
//!
//! A [`Reconciler`] walks a media root, matches what it finds against the
//! catalog and writes availability and paths back. It is built once at
//! startup and shared by handle; all of its methods block and are meant to
//! be run from `spawn_blocking` inside async code.
//!
//! Each scope (movies, all series, one series, music) has a cooldown window
//! and a single-flight lock: a caller arriving while a pass for the same
//! scope is running waits for it, then sees the fresh cooldown and returns a
//! no-op report.

mod cooldown;
mod movies;
mod music;
mod series;

pub use cooldown::{Cooldown, ScanScope};

use dashmap::DashMap;
use parking_lot::Mutex;
use reelhouse_common::{Clock, LibraryKind, Result, SeriesId, SystemClock};
use reelhouse_db::pool::DbPool;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{Config, LibraryConfig};
use crate::scanner::{self, ScanLimits, ScanOutcome};

/// Counts from one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub kind: LibraryKind,
    /// Files collected by the walk
    pub scanned: usize,
    /// Catalog rows created (music only)
    pub created: usize,
    /// Catalog rows whose status or path changed
    pub updated: usize,
    /// Unreadable entries skipped during the walk
    pub skipped_entries: usize,
    /// The walk stopped at a cap; demotions were not applied
    pub truncated: bool,
    /// The scope was walked too recently and nothing was done
    pub skipped_by_cooldown: bool,
}

impl ReconcileReport {
    pub fn new(kind: LibraryKind) -> Self {
        Self {
            kind,
            scanned: 0,
            created: 0,
            updated: 0,
            skipped_entries: 0,
            truncated: false,
            skipped_by_cooldown: false,
        }
    }

    fn cooled(kind: LibraryKind) -> Self {
        Self {
            skipped_by_cooldown: true,
            ..Self::new(kind)
        }
    }

    fn absorb(&mut self, outcome: &ScanOutcome) {
        self.scanned = outcome.files.len();
        self.skipped_entries = outcome.skipped_entries;
        self.truncated = outcome.truncated;
    }

    /// Whether the pass wrote anything.
    pub fn changed(&self) -> bool {
        self.created > 0 || self.updated > 0
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.skipped_by_cooldown {
            return write!(f, "{}: skipped (cooldown)", self.kind);
        }
        write!(
            f,
            "{}: scanned {} files, created {}, updated {}",
            self.kind, self.scanned, self.created, self.updated
        )?;
        if self.skipped_entries > 0 {
            write!(f, ", {} unreadable entries skipped", self.skipped_entries)?;
        }
        if self.truncated {
            write!(f, " (scan truncated)")?;
        }
        Ok(())
    }
}

/// Reconciliation service.
pub struct Reconciler {
    pool: DbPool,
    library: LibraryConfig,
    limits: ScanLimits,
    cooldown: Cooldown,
    locks: DashMap<ScanScope, Arc<Mutex<()>>>,
}

impl Reconciler {
    pub fn new(pool: DbPool, config: &Config, clock: Arc<dyn Clock>) -> Self {
        let window = chrono::Duration::seconds(config.scan.cooldown_secs as i64);
        Self {
            pool,
            library: config.library.clone(),
            limits: ScanLimits::from(&config.scan),
            cooldown: Cooldown::new(window, clock),
            locks: DashMap::new(),
        }
    }

    /// Build with the wall clock.
    pub fn with_system_clock(pool: DbPool, config: &Config) -> Self {
        Self::new(pool, config, Arc::new(SystemClock))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn limits(&self) -> ScanLimits {
        self.limits
    }

    /// Absolute root for a library kind, if configured.
    pub fn root(&self, kind: LibraryKind) -> Option<PathBuf> {
        self.library.resolved_root(kind)
    }

    pub fn reconcile_movies(&self) -> Result<ReconcileReport> {
        self.run(ScanScope::Movies, LibraryKind::Movies, false, || {
            self.sync_movies()
        })
    }

    /// Reconcile one series, or every series when `series_id` is `None`.
    pub fn reconcile_series(&self, series_id: Option<SeriesId>) -> Result<ReconcileReport> {
        let scope = series_id.map_or(ScanScope::AllSeries, ScanScope::Series);
        self.run(scope, LibraryKind::Tv, false, || self.sync_series(series_id))
    }

    pub fn reconcile_music(&self) -> Result<ReconcileReport> {
        self.run(ScanScope::Music, LibraryKind::Music, false, || {
            self.sync_music()
        })
    }

    pub fn reconcile(&self, kind: LibraryKind) -> Result<ReconcileReport> {
        match kind {
            LibraryKind::Movies => self.reconcile_movies(),
            LibraryKind::Tv => self.reconcile_series(None),
            LibraryKind::Music => self.reconcile_music(),
        }
    }

    /// Reconcile every kind; one kind failing does not stop the others.
    pub fn reconcile_all(&self) -> Vec<Result<ReconcileReport>> {
        LibraryKind::ALL
            .iter()
            .map(|kind| self.reconcile(*kind))
            .collect()
    }

    pub fn force_reconcile_movies(&self) -> Result<ReconcileReport> {
        self.run(ScanScope::Movies, LibraryKind::Movies, true, || {
            self.sync_movies()
        })
    }

    pub fn force_reconcile_series(&self, series_id: Option<SeriesId>) -> Result<ReconcileReport> {
        let scope = series_id.map_or(ScanScope::AllSeries, ScanScope::Series);
        self.run(scope, LibraryKind::Tv, true, || self.sync_series(series_id))
    }

    pub fn force_reconcile_music(&self) -> Result<ReconcileReport> {
        self.run(ScanScope::Music, LibraryKind::Music, true, || {
            self.sync_music()
        })
    }

    /// Reconcile a kind, ignoring the cooldown.
    pub fn force_reconcile(&self, kind: LibraryKind) -> Result<ReconcileReport> {
        match kind {
            LibraryKind::Movies => self.force_reconcile_movies(),
            LibraryKind::Tv => self.force_reconcile_series(None),
            LibraryKind::Music => self.force_reconcile_music(),
        }
    }

    fn scope_lock(&self, scope: ScanScope) -> Arc<Mutex<()>> {
        self.locks
            .entry(scope)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn run<F>(
        &self,
        scope: ScanScope,
        kind: LibraryKind,
        force: bool,
        pass: F,
    ) -> Result<ReconcileReport>
    where
        F: FnOnce() -> Result<ReconcileReport>,
    {
        if !force && self.cooldown.is_cooling(scope) {
            return Ok(ReconcileReport::cooled(kind));
        }

        let lock = self.scope_lock(scope);
        let _guard = lock.lock();

        // a pass for this scope may have finished while we waited
        if !force && self.cooldown.is_cooling(scope) {
            return Ok(ReconcileReport::cooled(kind));
        }

        let report = pass()?;
        self.cooldown.mark(scope);

        info!(
            kind = %report.kind,
            scope = ?scope,
            scanned = report.scanned,
            created = report.created,
            updated = report.updated,
            skipped_entries = report.skipped_entries,
            truncated = report.truncated,
            "Reconciliation finished"
        );

        Ok(report)
    }

    /// Walk the root for `kind`. `None` when the root is unconfigured or
    /// missing; a missing root must not demote the whole catalog.
    fn walk(&self, kind: LibraryKind) -> Option<(PathBuf, ScanOutcome)> {
        let root = self.root(kind)?;
        if !root.is_dir() {
            warn!(kind = %kind, root = ?root, "Library root is not a readable directory");
            return None;
        }
        let outcome = scanner::scan(&root, kind, self.limits);
        Some((root, outcome))
    }
}

/// Lossy string form used for every stored path.
fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelhouse_common::ManualClock;
    use reelhouse_db::pool::{get_conn, init_memory_pool};
    use reelhouse_db::queries::movies;
    use std::fs;

    fn reconciler(movies_dir: &Path) -> (Arc<ManualClock>, Reconciler) {
        let mut config = Config::default();
        config.library.movies_dir = Some(movies_dir.to_path_buf());
        let clock = Arc::new(ManualClock::default());
        let pool = init_memory_pool().unwrap();
        let reconciler = Reconciler::new(pool, &config, clock.clone());
        (clock, reconciler)
    }

    #[test]
    fn test_unconfigured_root_is_noop() {
        let pool = init_memory_pool().unwrap();
        let reconciler = Reconciler::with_system_clock(pool, &Config::default());
        let report = reconciler.reconcile_music().unwrap();
        assert_eq!(report, ReconcileReport::new(LibraryKind::Music));
    }

    #[test]
    fn test_cooldown_skips_second_pass() {
        let dir = tempfile::tempdir().unwrap();
        let (clock, reconciler) = reconciler(dir.path());

        let first = reconciler.reconcile_movies().unwrap();
        assert!(!first.skipped_by_cooldown);

        let second = reconciler.reconcile_movies().unwrap();
        assert!(second.skipped_by_cooldown);

        clock.advance(chrono::Duration::seconds(15));
        let third = reconciler.reconcile_movies().unwrap();
        assert!(!third.skipped_by_cooldown);
    }

    #[test]
    fn test_force_ignores_cooldown() {
        let dir = tempfile::tempdir().unwrap();
        let (_clock, reconciler) = reconciler(dir.path());

        {
            let conn = get_conn(reconciler.pool()).unwrap();
            movies::create_movie(&conn, "Heat", None).unwrap();
        }
        reconciler.reconcile_movies().unwrap();

        fs::create_dir_all(dir.path().join("Heat")).unwrap();
        fs::write(dir.path().join("Heat/Heat.mkv"), b"x").unwrap();

        assert!(reconciler.reconcile_movies().unwrap().skipped_by_cooldown);
        let report = reconciler.force_reconcile_movies().unwrap();
        assert_eq!(report.updated, 1);
    }

    #[test]
    fn test_report_display() {
        let mut report = ReconcileReport::new(LibraryKind::Tv);
        report.scanned = 4;
        report.updated = 2;
        report.truncated = true;
        assert_eq!(
            report.to_string(),
            "tv: scanned 4 files, created 0, updated 2 (scan truncated)"
        );
        assert_eq!(
            ReconcileReport::cooled(LibraryKind::Music).to_string(),
            "music: skipped (cooldown)"
        );
    }
}
