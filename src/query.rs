//! Search query construction for source tracks.
//!
//! The destination catalog is searched with a detailed query first (title
//! plus cleaned artist names) and falls back to the title alone.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{QueryKind, SourceRecord};

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Featured-artist suffix on source titles: "Song (feat. Someone)"
pub static FEATURING_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r" \(feat.*\..+\)").unwrap());

/// Parenthesized annotation on artist names: "Artist (CV: Someone)"
pub static ARTIST_PARENTHETICAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\(.*?\)").unwrap());

/// Anything that is neither a (Unicode) word character nor whitespace
pub static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());

// ============================================================================
// QUERY BUILDING
// ============================================================================

/// Strip a featured-artist suffix from a title.
/// e.g., "Song (feat. Someone)" → "Song"
pub fn strip_featuring(title: &str) -> String {
    FEATURING_SUFFIX.replace_all(title, "").to_string()
}

/// Clean an artist name for use in a search query: drop parenthesized
/// annotations and every punctuation/symbol character.
/// e.g., "Hatsune Miku (初音ミク)" → "Hatsune Miku", "AC/DC" → "ACDC"
pub fn clean_artist(artist: &str) -> String {
    let without_parens = ARTIST_PARENTHETICAL.replace_all(artist, "");
    NON_WORD
        .replace_all(without_parens.trim(), "")
        .to_string()
}

/// Build the search query of the given kind for a source record.
pub fn build_query(record: &SourceRecord, kind: QueryKind) -> String {
    let title = strip_featuring(&record.name);
    match kind {
        QueryKind::Simple => title,
        QueryKind::Detailed => {
            let artists: Vec<String> = record
                .artists
                .iter()
                .map(|a| clean_artist(a))
                .filter(|a| !a.is_empty())
                .collect();
            format!("{} {}", title, artists.join(" "))
        }
    }
}

/// Queries in the order they should be tried.
pub fn query_plan(record: &SourceRecord) -> [(QueryKind, String); 2] {
    [
        (QueryKind::Detailed, build_query(record, QueryKind::Detailed)),
        (QueryKind::Simple, build_query(record, QueryKind::Simple)),
    ]
}
