//! Filesystem scanner.
//!
//! Walks a media root and collects files whose extension is indexable for
//! the library kind. Walks are bounded by directory and file caps; hitting a
//! cap ends the walk early with whatever was collected. Unreadable entries
//! are counted and skipped, never fatal.

use reelhouse_common::{paths::is_indexable, LibraryKind, ScannedFile};
use reelhouse_matcher::normalize;
use std::path::Path;
use tracing::{debug, trace};
use walkdir::{DirEntry, WalkDir};

use crate::config::ScanConfig;

/// Caps applied to a single walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    pub max_dirs: usize,
    pub max_files: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_dirs: 10_000,
            max_files: 10_000,
        }
    }
}

impl From<&ScanConfig> for ScanLimits {
    fn from(config: &ScanConfig) -> Self {
        Self {
            max_dirs: config.max_dirs,
            max_files: config.max_files,
        }
    }
}

/// Result of one walk. A truncated or partially unreadable walk is still a
/// successful outcome.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub files: Vec<ScannedFile>,
    pub dirs_visited: usize,
    /// Entries that could not be read and were skipped
    pub skipped_entries: usize,
    /// A cap was reached before the walk finished
    pub truncated: bool,
}

fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

/// Build the scan record for a file found under `root`.
///
/// The match string covers the directory relative to the root plus the file
/// name, so tokens of the root path itself never take part in matching.
pub fn scanned_file(root: &Path, path: &Path) -> Option<ScannedFile> {
    let file_name = path.file_name()?.to_string_lossy().into_owned();
    let directory = path.parent()?.to_path_buf();
    let relative_dir = directory.strip_prefix(root).unwrap_or(&directory);
    let normalized = normalize(&format!("{} {}", relative_dir.to_string_lossy(), file_name));

    Some(ScannedFile {
        full_path: path.to_path_buf(),
        directory,
        file_name,
        normalized,
    })
}

/// Walk `root` collecting indexable files for `kind`.
///
/// Dot-prefixed directories are not entered. Entries are visited in file
/// name order so repeated walks of an unchanged tree yield the same list.
pub fn scan(root: &Path, kind: LibraryKind, limits: ScanLimits) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();

    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden_dir(e));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                trace!("Skipping unreadable entry: {}", e);
                outcome.skipped_entries += 1;
                continue;
            }
        };

        if entry.file_type().is_dir() {
            if outcome.dirs_visited >= limits.max_dirs {
                outcome.truncated = true;
                break;
            }
            outcome.dirs_visited += 1;
            continue;
        }

        let path = entry.path();
        if !is_indexable(kind, path) {
            continue;
        }

        if let Some(file) = scanned_file(root, path) {
            outcome.files.push(file);
        }

        if outcome.files.len() >= limits.max_files {
            outcome.truncated = true;
            break;
        }
    }

    debug!(
        root = ?root,
        kind = %kind,
        files = outcome.files.len(),
        dirs = outcome.dirs_visited,
        skipped = outcome.skipped_entries,
        truncated = outcome.truncated,
        "Scan finished"
    );

    outcome
}
