//! String normalization and token containment.

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Query tokens shorter than this are ignored entirely.
const MIN_TOKEN_CHARS: usize = 2;

/// Tokens at least this long may match by substring instead of exactly.
const MIN_FUZZY_TOKEN_CHARS: usize = 3;

/// Fold a string into its match form.
///
/// Decomposes with NFKD, drops combining marks, lowercases, turns every run of
/// non-alphanumeric characters into a single space and trims the ends.
///
/// ```
/// use reelhouse_matcher::normalize;
///
/// assert_eq!(normalize("  Amélie (2001) "), "amelie 2001");
/// assert_eq!(normalize("Spider-Man: No Way Home"), "spider man no way home");
/// assert_eq!(normalize("..."), "");
/// ```
pub fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_space = false;

    for c in input.nfkd().filter(|c| !is_combining_mark(*c)) {
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(c.to_lowercase());
        } else {
            pending_space = true;
        }
    }

    out
}

/// Split a normalized string into its tokens.
pub fn tokens(normalized: &str) -> impl Iterator<Item = &str> {
    normalized.split(' ').filter(|t| !t.is_empty())
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn token_matches(query: &str, candidate: &str) -> bool {
    if query == candidate {
        return true;
    }
    char_len(query) >= MIN_FUZZY_TOKEN_CHARS
        && char_len(candidate) >= MIN_FUZZY_TOKEN_CHARS
        && (candidate.contains(query) || query.contains(candidate))
}

/// Token containment test.
///
/// Both arguments must already be normalized. Every query token of at least
/// two characters has to match some candidate token, either exactly or, for
/// tokens of three or more characters, as a substring or superstring. A query
/// with no usable tokens matches nothing.
///
/// ```
/// use reelhouse_matcher::{contains_title, normalize};
///
/// let file = normalize("/movies/The Matrix (1999)/The.Matrix.1999.1080p.mkv");
/// assert!(contains_title(&file, &normalize("The Matrix")));
/// assert!(!contains_title(&file, &normalize("The Matrix Reloaded")));
/// assert!(!contains_title(&file, &normalize("?")));
/// ```
pub fn contains_title(candidate: &str, query: &str) -> bool {
    let query_tokens: Vec<&str> = tokens(query)
        .filter(|t| char_len(t) >= MIN_TOKEN_CHARS)
        .collect();
    if query_tokens.is_empty() {
        return false;
    }

    let candidate_tokens: Vec<&str> = tokens(candidate).collect();
    query_tokens
        .iter()
        .all(|q| candidate_tokens.iter().any(|c| token_matches(q, c)))
}

/// Number of query tokens that appear verbatim in the candidate.
///
/// Used to rank several files that all pass [`contains_title`].
pub fn title_score(candidate: &str, query: &str) -> usize {
    let candidate_tokens: Vec<&str> = tokens(candidate).collect();
    tokens(query)
        .filter(|q| candidate_tokens.contains(q))
        .count()
}
