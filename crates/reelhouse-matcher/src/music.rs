//! Album, artist and track inference from music paths.
//!
//! Music is discovered bottom-up: every directory holding audio files is
//! treated as an album, its name (and the names of its ancestors below the
//! music root) supply artist candidates, and each candidate is scored against
//! the artists already in the catalog.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::normalize::{normalize, tokens};

/// Minimum score for an existing artist to be reused instead of creating a new one.
pub const ARTIST_MATCH_THRESHOLD: u32 = 80;

const SCORE_EXACT: u32 = 100;
const SCORE_SUBSTRING: u32 = 90;
const SCORE_SAME_TOKENS: u32 = 80;
const SCORE_PER_SHARED_TOKEN: u32 = 20;
const SCORE_TOKEN_CAP: u32 = 60;

static TRACK_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d{1,2})(?:\D|$)").expect("track number regex should compile"));

static YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\D)(\d{4})(?:\D|$)").expect("year regex should compile"));

/// `(1999)` or `[1999]` anywhere in an album name.
static BRACKETED_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*[\(\[]\s*\d{4}\s*[\)\]]\s*").expect("bracketed year regex should compile")
});

/// `1999 - Album` style prefix.
static LEADING_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}\s*-\s*").expect("leading year regex should compile"));

/// What a directory name says about the album it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumGuess {
    /// Album title with any year decoration stripped.
    pub title: String,
    /// Artist names to try, most specific first.
    pub artist_candidates: Vec<String>,
    /// Release year, if one appears in the directory name.
    pub year: Option<i32>,
}

/// Parse a leading one- or two-digit track number from a file stem.
///
/// ```
/// use reelhouse_matcher::parse_track_number;
///
/// assert_eq!(parse_track_number("01 - Intro"), Some(1));
/// assert_eq!(parse_track_number("12. Outro"), Some(12));
/// assert_eq!(parse_track_number("Intro"), None);
/// ```
pub fn parse_track_number(stem: &str) -> Option<u32> {
    TRACK_NUMBER
        .captures(stem)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .filter(|n| *n > 0)
}

/// Track title from a file stem: the stem minus any leading track number
/// and the separators after it.
///
/// ```
/// use reelhouse_matcher::track_title;
///
/// assert_eq!(track_title("01 - Airbag"), "Airbag");
/// assert_eq!(track_title("7. Lucky"), "Lucky");
/// assert_eq!(track_title("1999 Remaster"), "1999 Remaster");
/// ```
pub fn track_title(stem: &str) -> String {
    let trimmed = stem.trim();
    if parse_track_number(trimmed).is_none() {
        return trimmed.to_string();
    }
    let rest = trimmed
        .trim_start_matches(|c: char| c.is_ascii_digit())
        .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '.' | '_' | ')'));
    if rest.is_empty() {
        trimmed.to_string()
    } else {
        rest.to_string()
    }
}

/// First four-digit token between 1900 and 2100.
pub fn extract_year(name: &str) -> Option<i32> {
    YEAR.captures_iter(name)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| m.as_str().parse::<i32>().ok())
        .find(|year| (1900..=2100).contains(year))
}

fn clean_album_title(raw: &str) -> String {
    let stripped = BRACKETED_YEAR.replace_all(raw, " ");
    let stripped = LEADING_YEAR.replace(stripped.trim(), "");
    stripped.trim().trim_matches('-').trim().to_string()
}

/// `1999 - Album` is a year prefix, not an artist.
fn is_artist_prefix(prefix: &str) -> bool {
    let prefix = prefix.trim();
    !prefix.is_empty() && !prefix.chars().all(|c| c.is_ascii_digit())
}

fn dir_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// Infer album title, artist candidates and year from an album directory.
///
/// `root` is the music root; ancestors at or above it never become artist
/// candidates. A leaf named `Artist - Album` contributes both halves, and the
/// parent and grandparent directories below the root are tried as artists
/// after that. Returns `None` when the directory has no usable name.
///
/// ```
/// use std::path::Path;
/// use reelhouse_matcher::infer_album;
///
/// let guess = infer_album(
///     Path::new("/music/Radiohead/OK Computer (1997)"),
///     Path::new("/music"),
/// ).unwrap();
/// assert_eq!(guess.title, "OK Computer");
/// assert_eq!(guess.artist_candidates, vec!["Radiohead".to_string()]);
/// assert_eq!(guess.year, Some(1997));
/// ```
pub fn infer_album(dir: &Path, root: &Path) -> Option<AlbumGuess> {
    let leaf = dir_name(dir)?;
    let year = extract_year(&leaf);

    let mut artist_candidates = Vec::new();
    let title = match leaf.split_once(" - ") {
        Some((artist, album)) if is_artist_prefix(artist) && !album.trim().is_empty() => {
            artist_candidates.push(artist.trim().to_string());
            clean_album_title(album)
        }
        _ => clean_album_title(&leaf),
    };
    let title = if title.is_empty() { leaf } else { title };

    let mut ancestor = dir.parent();
    for _ in 0..2 {
        let Some(current) = ancestor else {
            break;
        };
        if !current.starts_with(root) || current == root {
            break;
        }
        if let Some(name) = dir_name(current) {
            if !artist_candidates.contains(&name) {
                artist_candidates.push(name);
            }
        }
        ancestor = current.parent();
    }

    Some(AlbumGuess {
        title,
        artist_candidates,
        year,
    })
}

/// Score how well a candidate artist name matches a known artist name.
///
/// Exact normalized equality scores highest, then substring containment in
/// either direction, then token overlap. Only scores at or above
/// [`ARTIST_MATCH_THRESHOLD`] should be treated as a match.
///
/// ```
/// use reelhouse_matcher::{score_artist, ARTIST_MATCH_THRESHOLD};
///
/// assert_eq!(score_artist("Beyoncé", "beyonce"), 100);
/// assert!(score_artist("The Beatles", "Beatles") >= ARTIST_MATCH_THRESHOLD);
/// assert!(score_artist("Pink Floyd", "Pink") < ARTIST_MATCH_THRESHOLD);
/// ```
pub fn score_artist(candidate: &str, known: &str) -> u32 {
    let candidate = normalize(candidate);
    let known = normalize(known);
    if candidate.is_empty() || known.is_empty() {
        return 0;
    }
    if candidate == known {
        return SCORE_EXACT;
    }

    let (shorter, longer) = if candidate.len() <= known.len() {
        (&candidate, &known)
    } else {
        (&known, &candidate)
    };
    // the shorter name must cover more than half of the longer one
    if shorter.chars().count() >= 4
        && longer.contains(shorter.as_str())
        && shorter.len() * 2 > longer.len()
    {
        return SCORE_SUBSTRING;
    }

    let mut candidate_tokens: Vec<&str> = tokens(&candidate).collect();
    let mut known_tokens: Vec<&str> = tokens(&known).collect();
    candidate_tokens.sort_unstable();
    candidate_tokens.dedup();
    known_tokens.sort_unstable();
    known_tokens.dedup();
    if candidate_tokens == known_tokens {
        return SCORE_SAME_TOKENS;
    }

    let shared = candidate_tokens
        .iter()
        .filter(|t| t.chars().count() >= 2 && known_tokens.contains(t))
        .count() as u32;
    (shared * SCORE_PER_SHARED_TOKEN).min(SCORE_TOKEN_CAP)
}

/// Pick the best-scoring known artist for any of the candidates.
///
/// Returns the id and score of the winner, or `None` if nothing reaches
/// [`ARTIST_MATCH_THRESHOLD`]. Ties go to the earlier candidate, then the
/// earlier known artist.
pub fn best_artist<'a, T, I>(candidates: &[String], known: I) -> Option<(T, u32)>
where
    T: Copy,
    I: IntoIterator<Item = (T, &'a str)>,
    I::IntoIter: Clone,
{
    let known = known.into_iter();
    let mut best: Option<(T, u32)> = None;

    for candidate in candidates {
        for (id, name) in known.clone() {
            let score = score_artist(candidate, name);
            if score < ARTIST_MATCH_THRESHOLD {
                continue;
            }
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((id, score));
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_number() {
        assert_eq!(parse_track_number("01 Song"), Some(1));
        assert_eq!(parse_track_number("7-Song"), Some(7));
        assert_eq!(parse_track_number("99"), Some(99));
        assert_eq!(parse_track_number("00 Hidden"), None);
        assert_eq!(parse_track_number("Song 01"), None);
        assert_eq!(parse_track_number("1999 Remaster"), None);
    }

    #[test]
    fn test_track_title() {
        assert_eq!(track_title("03_Song Name"), "Song Name");
        assert_eq!(track_title("12) Closer"), "Closer");
        assert_eq!(track_title("05"), "05");
        assert_eq!(track_title("Untitled"), "Untitled");
    }

    #[test]
    fn test_extract_year() {
        assert_eq!(extract_year("Album (1997)"), Some(1997));
        assert_eq!(extract_year("2001 - Album"), Some(2001));
        assert_eq!(extract_year("Album 1080"), None);
        assert_eq!(extract_year("Album 12345"), None);
        assert_eq!(extract_year("No year"), None);
    }

    #[test]
    fn test_infer_album_artist_dash_album() {
        let guess = infer_album(
            Path::new("/music/Various/Daft Punk - Discovery [2001]"),
            Path::new("/music"),
        )
        .unwrap();
        assert_eq!(guess.title, "Discovery");
        assert_eq!(
            guess.artist_candidates,
            vec!["Daft Punk".to_string(), "Various".to_string()]
        );
        assert_eq!(guess.year, Some(2001));
    }

    #[test]
    fn test_infer_album_leading_year() {
        let guess = infer_album(
            Path::new("/music/Artist/1999 - Album Name"),
            Path::new("/music"),
        )
        .unwrap();
        assert_eq!(guess.title, "Album Name");
        assert_eq!(guess.artist_candidates, vec!["Artist".to_string()]);
        assert_eq!(guess.year, Some(1999));
    }

    #[test]
    fn test_infer_album_grandparent_candidate() {
        let guess = infer_album(
            Path::new("/music/Artist/Album/CD1"),
            Path::new("/music"),
        )
        .unwrap();
        assert_eq!(guess.title, "CD1");
        assert_eq!(
            guess.artist_candidates,
            vec!["Album".to_string(), "Artist".to_string()]
        );
    }

    #[test]
    fn test_infer_album_directly_under_root() {
        let guess = infer_album(Path::new("/music/Loose Album"), Path::new("/music")).unwrap();
        assert_eq!(guess.title, "Loose Album");
        assert!(guess.artist_candidates.is_empty());
    }

    #[test]
    fn test_score_artist_tiers() {
        assert_eq!(score_artist("Radiohead", "radiohead"), SCORE_EXACT);
        assert_eq!(score_artist("The Beatles", "Beatles"), SCORE_SUBSTRING);
        assert_eq!(score_artist("Beatles, The", "The Beatles"), SCORE_SAME_TOKENS);
        assert!(score_artist("Pink Floyd", "Pink Martini") < ARTIST_MATCH_THRESHOLD);
        assert_eq!(score_artist("", "Anything"), 0);
    }

    #[test]
    fn test_best_artist() {
        let known = vec![(1u32, "Pink Floyd"), (2u32, "The Beatles")];
        let candidates = vec!["Beatles".to_string()];
        assert_eq!(best_artist(&candidates, known.iter().copied()), Some((2, SCORE_SUBSTRING)));

        let candidates = vec!["Unknown Artist".to_string()];
        assert_eq!(best_artist(&candidates, known.iter().copied()), None);
    }

    #[test]
    fn test_best_artist_prefers_exact() {
        let known = vec![(1u32, "Beatles Tribute Band"), (2u32, "Beatles")];
        let candidates = vec!["Beatles".to_string()];
        assert_eq!(best_artist(&candidates, known.iter().copied()), Some((2, SCORE_EXACT)));
    }
}
