//! Title and string normalization for track matching.
//!
//! Titles are never rewritten in place: every function here returns a derived
//! value and the original title stays on the `Track` for display.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Parenthesized or bracketed segment; group 1 or 2 holds the inner text.
pub static BRACKETED_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^()]*)\)|\[([^\[\]]*)\]").unwrap());

/// Quoted phrase with straight double quotes or Japanese corner brackets.
pub static QUOTED_PHRASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([^"]*)"|「([^」]*)」"#).unwrap());

/// Separators between title fragments when nothing is quoted.
pub static TITLE_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\-()]+").unwrap());

/// Any run of whitespace
pub static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// NFKC-fold and lower-case. Full-width letters, brackets and the
/// ideographic space become their ASCII forms.
fn fold_lowercase(s: &str) -> String {
    s.nfkc().collect::<String>().to_lowercase()
}

/// Canonical comparison form: NFKC-folded, trimmed, lower-cased, with every
/// whitespace run collapsed to one space.
/// e.g., "  Ｌｅｍｏｎ   Tree " → "lemon tree"
pub fn normalize_string(s: &str) -> String {
    let folded = fold_lowercase(s);
    WHITESPACE_RUN.replace_all(folded.trim(), " ").into_owned()
}

/// Fold and lower-case a title, then drop bracketed annotations that carry no
/// special keyword. Segments mentioning a keyword stay, delimiters included.
/// e.g., "Lemon (Official Video)" → "lemon", "Lemon (Live) [MV]" → "lemon (live)"
pub fn clean_title(title: &str, keywords: &[String]) -> String {
    let lower = fold_lowercase(title);
    let cleaned = BRACKETED_SEGMENT.replace_all(&lower, |caps: &Captures| {
        let inner = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map_or("", |m| m.as_str());
        if keywords.iter().any(|k| inner.contains(k.as_str())) {
            caps[0].to_string()
        } else {
            String::new()
        }
    });
    cleaned.trim().to_string()
}

/// Split a title into normalized phrases for comparison.
///
/// Quoted phrases win when present: `Artist「Lemon」MV` compares as just
/// "lemon". Otherwise the cleaned title is split on whitespace, `-`, `(`
/// and `)`. An empty title yields no phrases.
pub fn split_title(title: &str, keywords: &[String]) -> Vec<String> {
    let cleaned = clean_title(title, keywords);

    let quoted: Vec<String> = QUOTED_PHRASE
        .captures_iter(&cleaned)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| normalize_string(m.as_str()))
        .filter(|p| !p.is_empty())
        .collect();
    if !quoted.is_empty() {
        return quoted;
    }

    TITLE_SEPARATORS
        .split(&cleaned)
        .map(normalize_string)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Case-insensitive substring test against every special keyword, on the
/// folded title.
pub fn contains_keyword(title: &str, keywords: &[String]) -> bool {
    let lower = fold_lowercase(title);
    keywords.iter().any(|k| lower.contains(k.as_str()))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords() -> Vec<String> {
        ["instrumental", "remix", "live", "cover"]
            .iter()
            .map(|k| k.to_string())
            .collect()
    }

    #[test]
    fn test_normalize_string() {
        assert_eq!(normalize_string("  Hello   WORLD \t"), "hello world");
        assert_eq!(normalize_string("a\n\nb"), "a b");
        assert_eq!(normalize_string(""), "");
        // Full-width forms and ideographic space fold to ASCII
        assert_eq!(normalize_string("Ｌｅｍｏｎ\u{3000}Tree"), "lemon tree");
    }

    #[test]
    fn test_clean_title_drops_noise() {
        let kw = keywords();
        assert_eq!(clean_title("Lemon (Official Video)", &kw), "lemon");
        assert_eq!(clean_title("Lemon [MV]", &kw), "lemon");
        assert_eq!(clean_title("Lemon", &kw), "lemon");
    }

    #[test]
    fn test_clean_title_keeps_keyword_segments() {
        let kw = keywords();
        assert_eq!(clean_title("Song (Remix) [MV]", &kw), "song (remix)");
        assert_eq!(clean_title("Song [Live at Budokan]", &kw), "song [live at budokan]");
        assert_eq!(clean_title("Song (Piano Cover)", &kw), "song (piano cover)");
    }

    #[test]
    fn test_full_width_brackets_are_cleaned() {
        let kw = keywords();
        assert_eq!(clean_title("Lemon （Official Video）", &kw), "lemon");
        assert_eq!(split_title("Lemon （Official Video）", &kw), vec!["lemon"]);
        let annotated = "Lemon ［ＭＶ］ （Ｌｉｖｅ）";
        assert_eq!(clean_title(annotated, &kw), "lemon  (live)");
        assert_eq!(split_title(annotated, &kw), vec!["lemon", "live"]);
    }

    #[test]
    fn test_clean_title_without_keywords_drops_everything() {
        assert_eq!(clean_title("Song (Remix)", &[]), "song");
    }

    #[test]
    fn test_split_title_fragments() {
        let kw = keywords();
        assert_eq!(
            split_title("Song - Artist (Live)", &kw),
            vec!["song", "artist", "live"]
        );
        assert_eq!(split_title("Lemon (Official Video)", &kw), vec!["lemon"]);
    }

    #[test]
    fn test_split_title_quoted_phrases() {
        let kw = keywords();
        assert_eq!(split_title("米津玄師 「Lemon」 MV", &kw), vec!["lemon"]);
        assert_eq!(
            split_title(r#"Artist "Hello  World" and "Bye""#, &kw),
            vec!["hello world", "bye"]
        );
    }

    #[test]
    fn test_split_title_empty_quotes_fall_back() {
        let kw = keywords();
        assert_eq!(split_title(r#"Song """#, &kw), vec!["song", r#""""#]);
    }

    #[test]
    fn test_split_title_empty() {
        assert!(split_title("", &keywords()).is_empty());
        assert!(split_title(" - ( ) ", &keywords()).is_empty());
    }

    #[test]
    fn test_contains_keyword() {
        let kw = keywords();
        assert!(contains_keyword("Lemon (LIVE)", &kw));
        assert!(contains_keyword("Lemon Remix", &kw));
        assert!(!contains_keyword("Lemon", &kw));
        assert!(!contains_keyword("Lemon (Live)", &[]));
        assert!(contains_keyword("Lemon （ＬＩＶＥ）", &kw));
    }
}
