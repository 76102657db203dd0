//! Per-scope scan cooldown.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use reelhouse_common::{Clock, SeriesId};
use std::sync::Arc;

/// What a single reconciliation pass covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanScope {
    Movies,
    AllSeries,
    Series(SeriesId),
    Music,
}

/// Remembers when each scope was last walked and refuses a new walk inside
/// the window.
pub struct Cooldown {
    window: Duration,
    clock: Arc<dyn Clock>,
    last_scan: DashMap<ScanScope, DateTime<Utc>>,
}

impl Cooldown {
    pub fn new(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            window,
            clock,
            last_scan: DashMap::new(),
        }
    }

    fn within_window(&self, scope: ScanScope, now: DateTime<Utc>) -> bool {
        self.last_scan
            .get(&scope)
            .map(|last| now < *last + self.window)
            .unwrap_or(false)
    }

    /// Whether `scope` was walked too recently. A walk of every series also
    /// covers each single series.
    pub fn is_cooling(&self, scope: ScanScope) -> bool {
        let now = self.clock.now();
        match scope {
            ScanScope::Series(_) => {
                self.within_window(scope, now) || self.within_window(ScanScope::AllSeries, now)
            }
            _ => self.within_window(scope, now),
        }
    }

    /// Record a completed walk of `scope`.
    pub fn mark(&self, scope: ScanScope) {
        self.last_scan.insert(scope, self.clock.now());
    }
}
