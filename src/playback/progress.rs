//! Playback progress store.
//!
//! Progress entries are keyed by `"{kind}:{id}"`, capped in number (oldest
//! update evicted first) and written to a JSON file after every change.
//! Persistence is best-effort: a failed write is logged and the in-memory
//! state stays authoritative.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use reelhouse_common::{Clock, MediaKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Last known position for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    pub media_kind: MediaKind,
    pub media_id: String,
    pub position_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

/// Heartbeat sent by the player.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub media_kind: MediaKind,
    pub media_id: String,
    pub position_seconds: f64,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub completed: bool,
}

pub fn progress_key(kind: MediaKind, id: &str) -> String {
    format!("{kind}:{id}")
}

pub struct ProgressStore {
    entries: RwLock<HashMap<String, ProgressEntry>>,
    max_entries: usize,
    completion_threshold: f64,
    clock: Arc<dyn Clock>,
    path: Option<PathBuf>,
}

impl ProgressStore {
    /// Create a store, loading any entries already saved at `path`.
    pub fn new(
        path: Option<PathBuf>,
        max_entries: usize,
        completion_threshold: f64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = Self {
            entries: RwLock::new(HashMap::new()),
            max_entries,
            completion_threshold,
            clock,
            path,
        };

        if let Some(ref path) = store.path {
            if let Err(e) = store.load_from_file(path) {
                warn!("Failed to load playback progress from {}: {:#}", path.display(), e);
            }
        }

        store
    }

    /// An unpersisted store.
    pub fn in_memory(max_entries: usize, completion_threshold: f64, clock: Arc<dyn Clock>) -> Self {
        Self::new(None, max_entries, completion_threshold, clock)
    }

    pub fn get(&self, kind: MediaKind, id: &str) -> Option<ProgressEntry> {
        self.entries.read().get(&progress_key(kind, id)).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Apply a heartbeat. Returns the stored entry, or `None` when the update
    /// finished the item and its entry was cleared.
    pub fn update(&self, update: ProgressUpdate) -> Option<ProgressEntry> {
        let key = progress_key(update.media_kind, &update.media_id);
        let mut entries = self.entries.write();

        let duration = update
            .duration_seconds
            .filter(|d| d.is_finite() && *d > 0.0)
            .or_else(|| entries.get(&key).and_then(|e| e.duration_seconds));
        let position = if update.position_seconds.is_finite() {
            update.position_seconds.max(0.0)
        } else {
            0.0
        };

        let finished = update.completed
            || duration.is_some_and(|d| position >= d - self.completion_threshold);

        let stored = if finished {
            debug!(key = %key, "Playback finished, clearing progress");
            entries.remove(&key);
            None
        } else {
            let entry = ProgressEntry {
                media_kind: update.media_kind,
                media_id: update.media_id,
                position_seconds: position,
                duration_seconds: duration,
                updated_at: self.clock.now(),
            };
            entries.insert(key.clone(), entry.clone());
            trim(&mut entries, self.max_entries, Some(&key));
            Some(entry)
        };

        self.persist(&entries);
        stored
    }

    /// Remove an entry. Returns whether one existed.
    pub fn remove(&self, kind: MediaKind, id: &str) -> bool {
        let mut entries = self.entries.write();
        let removed = entries.remove(&progress_key(kind, id)).is_some();
        if removed {
            self.persist(&entries);
        }
        removed
    }

    fn persist(&self, entries: &HashMap<String, ProgressEntry>) {
        let Some(ref path) = self.path else {
            return;
        };
        if let Err(e) = save_to_file(path, entries) {
            warn!("Failed to persist playback progress to {}: {:#}", path.display(), e);
        }
    }

    fn load_from_file(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut loaded: HashMap<String, ProgressEntry> =
            serde_json::from_str(&content).context("Failed to parse progress file")?;
        trim(&mut loaded, self.max_entries, None);

        debug!(entries = loaded.len(), "Loaded playback progress");
        *self.entries.write() = loaded;
        Ok(())
    }
}

/// Evict least recently updated entries until at most `max` remain. `keep`
/// is never evicted, whatever its timestamp.
fn trim(entries: &mut HashMap<String, ProgressEntry>, max: usize, keep: Option<&str>) {
    if entries.len() <= max {
        return;
    }

    let mut by_age: Vec<(DateTime<Utc>, String)> = entries
        .iter()
        .filter(|(key, _)| Some(key.as_str()) != keep)
        .map(|(key, entry)| (entry.updated_at, key.clone()))
        .collect();
    by_age.sort();

    let excess = entries.len() - max;
    for (_, key) in by_age.into_iter().take(excess) {
        entries.remove(&key);
    }
}

/// Write through a temp file in the same directory, then rename over the target.
fn save_to_file(path: &Path, entries: &HashMap<String, ProgressEntry>) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let json = serde_json::to_vec_pretty(entries)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&json)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use reelhouse_common::ManualClock;

    fn heartbeat(id: &str, position: f64, duration: Option<f64>) -> ProgressUpdate {
        ProgressUpdate {
            media_kind: MediaKind::Movie,
            media_id: id.to_string(),
            position_seconds: position,
            duration_seconds: duration,
            completed: false,
        }
    }

    #[test]
    fn test_upsert_and_get() {
        let store = ProgressStore::in_memory(10, 3.0, Arc::new(ManualClock::default()));
        store.update(heartbeat("a", 10.0, Some(100.0)));
        store.update(heartbeat("a", 20.0, None));

        let entry = store.get(MediaKind::Movie, "a").unwrap();
        assert_eq!(entry.position_seconds, 20.0);
        assert_eq!(entry.duration_seconds, Some(100.0));
        assert!(store.get(MediaKind::Episode, "a").is_none());
    }

    #[test]
    fn test_near_end_clears_entry() {
        let store = ProgressStore::in_memory(10, 3.0, Arc::new(ManualClock::default()));
        store.update(heartbeat("a", 10.0, Some(100.0)));
        assert!(store.update(heartbeat("a", 97.5, None)).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_completed_clears_entry() {
        let store = ProgressStore::in_memory(10, 3.0, Arc::new(ManualClock::default()));
        store.update(heartbeat("a", 10.0, None));
        let mut done = heartbeat("a", 11.0, None);
        done.completed = true;
        assert!(store.update(done).is_none());
        assert!(store.get(MediaKind::Movie, "a").is_none());
    }

    #[test]
    fn test_trim_evicts_oldest() {
        let clock = Arc::new(ManualClock::default());
        let store = ProgressStore::in_memory(3, 3.0, clock.clone());
        for id in ["a", "b", "c"] {
            store.update(heartbeat(id, 1.0, None));
            clock.advance(Duration::seconds(1));
        }
        // touching "a" makes "b" the oldest
        store.update(heartbeat("a", 2.0, None));
        clock.advance(Duration::seconds(1));
        store.update(heartbeat("d", 1.0, None));

        assert_eq!(store.len(), 3);
        assert!(store.get(MediaKind::Movie, "b").is_none());
        for id in ["a", "c", "d"] {
            assert!(store.get(MediaKind::Movie, id).is_some(), "{id} evicted");
        }
    }

    #[test]
    fn test_trim_keeps_newest_on_timestamp_tie() {
        // the clock never moves, so every entry shares one timestamp
        let store = ProgressStore::in_memory(2, 3.0, Arc::new(ManualClock::default()));
        for id in ["x", "y", "a"] {
            store.update(heartbeat(id, 1.0, None));
            assert!(store.get(MediaKind::Movie, id).is_some(), "{id} evicted on insert");
        }
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::default());

        let store = ProgressStore::new(Some(path.clone()), 10, 3.0, clock.clone());
        store.update(heartbeat("a", 42.0, Some(600.0)));

        let reloaded = ProgressStore::new(Some(path), 10, 3.0, clock);
        let entry = reloaded.get(MediaKind::Movie, "a").unwrap();
        assert_eq!(entry.position_seconds, 42.0);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(&path, b"not json").unwrap();

        let store = ProgressStore::new(Some(path), 10, 3.0, Arc::new(ManualClock::default()));
        assert!(store.is_empty());
    }

    #[test]
    fn test_key_format() {
        assert_eq!(progress_key(MediaKind::Track, "42"), "track:42");
    }
}
