//! Similarity functions for track matching.
//!
//! This module contains the bounded similarity signals the matcher combines:
//! - Character-matching ratio between two phrases
//! - Keyword-aware title/string similarity
//! - Duration similarity
//! - Artist list similarity

use crate::config::MatchConfig;
use crate::normalize::{contains_keyword, split_title};

// ============================================================================
// Similarity Result
// ============================================================================

/// Outcome of one string comparison.
///
/// `force_reject` is set when the candidate claims a variant (remix, live,
/// cover...) that the source does not; the caller must drop that candidate
/// whatever its other scores are.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Similarity {
    pub score: f64,
    pub force_reject: bool,
}

impl Similarity {
    pub fn new(score: f64) -> Self {
        Self {
            score,
            force_reject: false,
        }
    }

    pub fn exact() -> Self {
        Self::new(1.0)
    }

    pub fn rejected() -> Self {
        Self {
            score: 0.0,
            force_reject: true,
        }
    }
}

// ============================================================================
// Character Matching Ratio
// ============================================================================

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]`.
/// Returns `(i, j, len)`; ties resolve to the earliest block in `a`.
fn longest_match(
    a: &[char],
    b: &[char],
    (alo, ahi): (usize, usize),
    (blo, bhi): (usize, usize),
) -> (usize, usize, usize) {
    let mut best = (alo, blo, 0);
    // run[j - blo + 1] = length of the common run ending at a[i], b[j]
    let mut prev = vec![0usize; bhi - blo + 1];
    let mut cur = vec![0usize; bhi - blo + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            let k = if a[i] == b[j] { prev[j - blo] + 1 } else { 0 };
            cur[j - blo + 1] = k;
            if k > best.2 {
                best = (i + 1 - k, j + 1 - k, k);
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    best
}

/// Ratcliff/Obershelp similarity: `2·M / (|a| + |b|)`, where M counts the
/// characters in the longest common block plus, recursively, the matches on
/// either side of it. Two empty strings are identical (1.0).
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let mut matched = 0;
    let mut pending = vec![((0, a.len()), (0, b.len()))];
    while let Some(((alo, ahi), (blo, bhi))) = pending.pop() {
        let (i, j, k) = longest_match(&a, &b, (alo, ahi), (blo, bhi));
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            pending.push(((alo, i), (blo, j)));
        }
        if i + k < ahi && j + k < bhi {
            pending.push(((i + k, ahi), (j + k, bhi)));
        }
    }

    2.0 * matched as f64 / total as f64
}

// ============================================================================
// String Similarity
// ============================================================================

/// Keyword-aware similarity of a source string `a` and a candidate string `b`.
///
/// Verbatim equality scores 1.0. Otherwise both sides are split into phrases
/// and the best phrase pair wins. Base scores under the similarity floor
/// become exactly 0.0. A keyword only on the candidate side rejects the
/// comparison; keywords on both sides boost the score, which may then exceed
/// 1.0.
///
/// Not symmetric: `("song", "song (remix)")` rejects, the reverse does not.
pub fn string_similarity(a: &str, b: &str, config: &MatchConfig) -> Similarity {
    if a == b {
        return Similarity::exact();
    }

    let keywords = config.special_keywords();
    let weights = config.weights();
    let floor = |score: f64| {
        if score < weights.similarity_floor {
            0.0
        } else {
            score
        }
    };

    let phrases_a = split_title(a, keywords);
    let phrases_b = split_title(b, keywords);
    let mut best: f64 = 0.0;
    for pa in &phrases_a {
        for pb in &phrases_b {
            best = best.max(sequence_ratio(pa, pb));
        }
    }
    let base = floor(best);

    let keyword_a = contains_keyword(a, keywords);
    let keyword_b = contains_keyword(b, keywords);
    match (keyword_a, keyword_b) {
        (false, true) => Similarity::rejected(),
        (true, true) => Similarity::new(floor(base * weights.keyword_boost)),
        _ => Similarity::new(base),
    }
}

// ============================================================================
// Duration Similarity
// ============================================================================

/// Linear decay from 1.0 at equal durations to 0.0 at `threshold_secs`;
/// anything further apart is 0.0.
pub fn duration_similarity(a_secs: u32, b_secs: u32, threshold_secs: u32) -> f64 {
    let diff = a_secs.abs_diff(b_secs);
    if threshold_secs == 0 || diff > threshold_secs {
        return 0.0;
    }
    1.0 - diff as f64 / threshold_secs as f64
}

// ============================================================================
// Artist Similarity
// ============================================================================

/// Best `string_similarity` over every (source artist, candidate artist) pair.
/// One shared artist is enough to score well. Any rejected pair rejects the
/// whole comparison.
pub fn artist_list_similarity(
    source_artists: &[String],
    candidate_artists: &[String],
    config: &MatchConfig,
) -> Similarity {
    let mut result = Similarity::new(0.0);
    for a in source_artists {
        for b in candidate_artists {
            let sim = string_similarity(a, b, config);
            result.score = result.score.max(sim.score);
            result.force_reject |= sim.force_reject;
        }
    }
    result
}

// ============================================================================
// TESTS
// ============================================================================
