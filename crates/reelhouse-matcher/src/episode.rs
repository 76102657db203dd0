//! Season/episode marker extraction from file names.

use once_cell::sync::Lazy;
use regex::Regex;

/// `S01E02`, `s1e2`, `S01E01E02`, `S01E01-E02`
static SEASON_EPISODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z0-9])s(\d{1,2})((?:[ ._-]?e\d{1,3})+)")
        .expect("season/episode regex should compile")
});

/// A single `E02` inside the episode run captured by [`SEASON_EPISODE`].
static EPISODE_IN_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)e(\d{1,3})").expect("episode regex should compile"));

/// `1x02`, `01x002`
static CROSS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z0-9])(\d{1,2})x(\d{1,3})(?:[^0-9]|$)")
        .expect("NxM regex should compile")
});

/// A `(season, episode)` pair parsed from a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EpisodeMarker {
    pub season: u32,
    pub episode: u32,
}

fn push_marker(out: &mut Vec<EpisodeMarker>, season: Option<u32>, episode: Option<u32>) {
    let (Some(season), Some(episode)) = (season, episode) else {
        return;
    };
    if season == 0 || episode == 0 {
        return;
    }
    let marker = EpisodeMarker { season, episode };
    if !out.contains(&marker) {
        out.push(marker);
    }
}

/// Extract every season/episode marker from a file name.
///
/// Both `S{season}E{episode}[E{episode}...]` and `{season}x{episode}` forms are
/// recognized, case-insensitively. Season is one or two digits, episode one to
/// three. Markers with a zero season or episode are dropped and duplicates are
/// removed while keeping first-seen order.
///
/// ```
/// use reelhouse_matcher::{extract_episode_markers, EpisodeMarker};
///
/// let markers = extract_episode_markers("Show.Name.S01E01E02.mkv");
/// assert_eq!(markers, vec![
///     EpisodeMarker { season: 1, episode: 1 },
///     EpisodeMarker { season: 1, episode: 2 },
/// ]);
/// assert!(extract_episode_markers("Show.Name.Pilot.mkv").is_empty());
/// ```
pub fn extract_episode_markers(file_name: &str) -> Vec<EpisodeMarker> {
    let mut markers = Vec::new();

    for caps in SEASON_EPISODE.captures_iter(file_name) {
        let season = caps.get(1).and_then(|m| m.as_str().parse().ok());
        let Some(run) = caps.get(2) else {
            continue;
        };
        for ep in EPISODE_IN_RUN.captures_iter(run.as_str()) {
            let episode = ep.get(1).and_then(|m| m.as_str().parse().ok());
            push_marker(&mut markers, season, episode);
        }
    }

    for caps in CROSS.captures_iter(file_name) {
        let season = caps.get(1).and_then(|m| m.as_str().parse().ok());
        let episode = caps.get(2).and_then(|m| m.as_str().parse().ok());
        push_marker(&mut markers, season, episode);
    }

    markers
}
