//! Choosing among several matching files.

use std::collections::HashMap;
use std::path::Path;

use reelhouse_common::ScannedFile;

use crate::normalize::{contains_title, tokens};

/// Files whose normalized path contains every token of `title`.
///
/// `title` must already be normalized.
pub fn matching_files<'a>(files: &'a [ScannedFile], title: &str) -> Vec<&'a ScannedFile> {
    files
        .iter()
        .filter(|f| contains_title(&f.normalized, title))
        .collect()
}

/// Keep only the files mentioning `year`, unless none do.
pub fn prefer_year(files: Vec<&ScannedFile>, year: Option<i32>) -> Vec<&ScannedFile> {
    let Some(year) = year else {
        return files;
    };
    let year = year.to_string();
    let with_year: Vec<&ScannedFile> = files
        .iter()
        .copied()
        .filter(|f| tokens(&f.normalized).any(|t| t == year))
        .collect();
    if with_year.is_empty() {
        files
    } else {
        with_year
    }
}

/// The directory holding the most files, ties going to the first one seen.
///
/// ```
/// use std::path::Path;
/// use reelhouse_matcher::preferred_directory;
///
/// let dirs = [
///     Path::new("/movies/Heat/extras"),
///     Path::new("/movies/Heat"),
///     Path::new("/movies/Heat"),
/// ];
/// assert_eq!(preferred_directory(dirs), Some(Path::new("/movies/Heat")));
/// ```
pub fn preferred_directory<'a, I>(dirs: I) -> Option<&'a Path>
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut order: Vec<&Path> = Vec::new();
    let mut counts: HashMap<&Path, usize> = HashMap::new();

    for dir in dirs {
        let count = counts.entry(dir).or_insert(0);
        if *count == 0 {
            order.push(dir);
        }
        *count += 1;
    }

    let mut best: Option<(&Path, usize)> = None;
    for dir in order {
        let count = counts.get(dir).copied().unwrap_or(0);
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((dir, count));
        }
    }
    best.map(|(dir, _)| dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use std::path::PathBuf;

    fn scanned(path: &str) -> ScannedFile {
        let full_path = PathBuf::from(path);
        let directory = full_path.parent().unwrap().to_path_buf();
        let file_name = full_path.file_name().unwrap().to_string_lossy().into_owned();
        let normalized = normalize(path);
        ScannedFile {
            full_path,
            directory,
            file_name,
            normalized,
        }
    }

    #[test]
    fn test_matching_files() {
        let files = vec![
            scanned("/movies/Heat (1995)/Heat.1995.mkv"),
            scanned("/movies/Heat (1995)/sample.mkv"),
            scanned("/movies/Ronin (1998)/Ronin.mkv"),
        ];
        let hits = matching_files(&files, &normalize("Heat"));
        assert_eq!(hits.len(), 2);
        assert!(matching_files(&files, &normalize("Collateral")).is_empty());
    }

    #[test]
    fn test_prefer_year() {
        let files = vec![
            scanned("/movies/Dune (1984)/Dune.mkv"),
            scanned("/movies/Dune (2021)/Dune.mkv"),
        ];
        let hits = matching_files(&files, "dune");
        let narrowed = prefer_year(hits.clone(), Some(2021));
        assert_eq!(narrowed.len(), 1);
        assert_eq!(narrowed[0].directory, PathBuf::from("/movies/Dune (2021)"));

        assert_eq!(prefer_year(hits.clone(), Some(1999)).len(), 2);
        assert_eq!(prefer_year(hits, None).len(), 2);
    }

    #[test]
    fn test_preferred_directory_tie_goes_to_first() {
        let dirs = [Path::new("/a"), Path::new("/b")];
        assert_eq!(preferred_directory(dirs), Some(Path::new("/a")));
    }

    #[test]
    fn test_preferred_directory_empty() {
        assert_eq!(preferred_directory(std::iter::empty()), None);
    }
}
