//! Decision layer: pair confirmation, best-of-many and many-to-many matching.
//!
//! Two decision rules live here:
//! - `match_pair` is a conjunctive gate, every field must clear the tolerance.
//! - `match_one_to_many` ranks candidates by a weighted average.

use rayon::prelude::*;

use crate::config::{MatchConfig, ScoringWeights};
use crate::models::{Assignment, Track, TrackMatch};
use crate::scoring::{artist_list_similarity, duration_similarity, string_similarity, Similarity};

// ============================================================================
// Field Scores
// ============================================================================

/// Per-field similarities of one source/candidate comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldScores {
    pub title: Similarity,
    pub artist: Similarity,
    pub album: Similarity,
    pub duration: f64,
}

impl FieldScores {
    /// True when any field raised a hard rejection.
    pub fn is_rejected(&self) -> bool {
        self.title.force_reject || self.artist.force_reject || self.album.force_reject
    }

    /// Weighted average of the four fields, before any top-result boost.
    pub fn weighted(&self, weights: &ScoringWeights) -> f64 {
        (weights.title * self.title.score
            + weights.artist * self.artist.score
            + weights.album * self.album.score
            + weights.duration * self.duration)
            / weights.divisor
    }

    /// Human-readable breakdown for logs
    pub fn summary(&self) -> String {
        format!(
            "title:{:.2} artist:{:.2} album:{:.2} duration:{:.2}{}",
            self.title.score,
            self.artist.score,
            self.album.score,
            self.duration,
            if self.is_rejected() { " [rejected]" } else { "" }
        )
    }
}

// ============================================================================
// Matcher
// ============================================================================

/// Stateless matcher over a shared, read-only configuration.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    config: MatchConfig,
}

impl Matcher {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Compare every field of `source` against `candidate`.
    /// Keyword rejections are one-directional: only the candidate can trigger them.
    pub fn compare(&self, source: &Track, candidate: &Track) -> FieldScores {
        FieldScores {
            title: string_similarity(&source.title, &candidate.title, &self.config),
            artist: artist_list_similarity(&source.artists, &candidate.artists, &self.config),
            album: string_similarity(&source.album, &candidate.album, &self.config),
            duration: duration_similarity(
                source.duration_secs,
                candidate.duration_secs,
                self.config.duration_threshold_secs(),
            ),
        }
    }

    /// Strict equality test: title, artist and album must each reach the
    /// tolerance and durations must be within the threshold.
    pub fn match_pair(&self, a: &Track, b: &Track) -> bool {
        let scores = self.compare(a, b);
        if scores.is_rejected() {
            return false;
        }
        let tolerance = self.config.tolerance();
        scores.title.score >= tolerance
            && scores.artist.score >= tolerance
            && scores.album.score >= tolerance
            && scores.duration > 0.0
    }

    /// Overall ranking score of a candidate, boosted when it is the search
    /// service's top result. `None` when the comparison was rejected.
    pub fn score_candidate(&self, source: &Track, candidate: &Track) -> Option<f64> {
        let scores = self.compare(source, candidate);
        if scores.is_rejected() {
            log::debug!(
                "Rejected '{}' for '{}': {}",
                candidate.title,
                source.title,
                scores.summary()
            );
            return None;
        }

        let mut score = scores.weighted(self.config.weights());
        if candidate.is_top_result {
            score *= self.config.top_result_boost();
        }
        Some(score)
    }

    /// Best candidate for `source`, or `None` if nothing reaches the tolerance.
    ///
    /// Rejected candidates are skipped outright. On equal scores the earlier
    /// candidate wins, so callers should pass candidates in relevance order.
    pub fn match_one_to_many<'c>(
        &self,
        source: &Track,
        candidates: &'c [Track],
    ) -> Option<TrackMatch<'c>> {
        let tolerance = self.config.tolerance();
        let mut best: Option<TrackMatch<'c>> = None;

        for candidate in candidates {
            let Some(score) = self.score_candidate(source, candidate) else {
                continue;
            };
            if score < tolerance {
                log::debug!(
                    "Candidate '{}' below tolerance for '{}' ({:.3} < {:.3})",
                    candidate.title,
                    source.title,
                    score,
                    tolerance
                );
                continue;
            }
            if best.map_or(true, |b| score > b.score) {
                best = Some(TrackMatch { candidate, score });
            }
        }

        best
    }

    /// Run `match_one_to_many` for every source track against the full
    /// candidate list.
    ///
    /// Assignment is not exclusive: one candidate may be the match of several
    /// sources. Unmatched sources are absent from the result, which keeps the
    /// order of `sources`.
    pub fn match_many_to_many<'s, 'c>(
        &self,
        sources: &'s [Track],
        candidates: &'c [Track],
    ) -> Vec<Assignment<'s, 'c>> {
        sources
            .par_iter()
            .filter_map(|source| {
                self.match_one_to_many(source, candidates)
                    .map(|matched| Assignment { source, matched })
            })
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceKind;

    fn lemon(duration_secs: u32) -> Track {
        Track::new("Lemon", vec!["Kenshi Yonezu".to_string()], "Lemon", duration_secs)
    }

    fn candidate(title: &str, album: &str, duration_secs: u32, id: &str) -> Track {
        Track::new(title, vec!["Kenshi Yonezu".to_string()], album, duration_secs)
            .with_kind(SourceKind::Song)
            .with_external_id(id)
    }

    #[test]
    fn test_match_pair_accepts_same_recording() {
        let matcher = Matcher::default();
        assert!(matcher.match_pair(&lemon(270), &candidate("Lemon", "Lemon", 271, "a")));
    }

    #[test]
    fn test_match_pair_requires_every_field() {
        let matcher = Matcher::default();
        // Duration at the threshold scores exactly 0
        assert!(!matcher.match_pair(&lemon(270), &candidate("Lemon", "Lemon", 273, "a")));
        // Album unrelated
        assert!(!matcher.match_pair(
            &lemon(270),
            &candidate("Lemon", "Stray Sheep", 270, "a")
        ));
        // Artist unrelated
        let other = Track::new("Lemon", vec!["Qqq Xxx".to_string()], "Lemon", 270);
        assert!(!matcher.match_pair(&lemon(270), &other));
    }

    #[test]
    fn test_match_pair_keyword_rejection() {
        let matcher = Matcher::default();
        assert!(!matcher.match_pair(&lemon(270), &candidate("Lemon (Live)", "Lemon", 270, "a")));
    }

    #[test]
    fn test_weighted_score() {
        let matcher = Matcher::default();
        let scores = matcher.compare(&lemon(270), &candidate("Lemon", "Lemon", 271, "a"));
        let expected = (1.1 + 1.0 + 1.5 + 0.8 * (2.0 / 3.0)) / 4.0;
        assert!((scores.weighted(matcher.config().weights()) - expected).abs() < 1e-9);
        assert!(scores.summary().starts_with("title:1.00 artist:1.00 album:1.00"));
    }

    #[test]
    fn test_top_result_boost_changes_winner() {
        let matcher = Matcher::default();
        // 0.9667 × 1.2 beats an unboosted 1.1
        let candidates = vec![
            candidate("Lemon", "Lemon", 270, "exact"),
            candidate("Lemon", "Lemon", 272, "top").with_top_result(true),
        ];
        let best = matcher.match_one_to_many(&lemon(270), &candidates).unwrap();
        assert_eq!(best.candidate.external_id.as_deref(), Some("top"));
        assert!((best.score - (3.6 + 0.8 / 3.0) / 4.0 * 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_ties_keep_first_candidate() {
        let matcher = Matcher::default();
        let candidates = vec![
            candidate("Lemon", "Lemon", 270, "first"),
            candidate("Lemon", "Lemon", 270, "second"),
        ];
        let best = matcher.match_one_to_many(&lemon(270), &candidates).unwrap();
        assert_eq!(best.candidate.external_id.as_deref(), Some("first"));
    }

    #[test]
    fn test_rejected_candidate_never_wins() {
        let matcher = Matcher::default();
        // The live cut is boosted as top result but still skipped
        let candidates = vec![
            candidate("Lemon (Live)", "Lemon", 270, "live").with_top_result(true),
            candidate("Lemon", "Lemon", 300, "studio"),
        ];
        let best = matcher.match_one_to_many(&lemon(270), &candidates).unwrap();
        assert_eq!(best.candidate.external_id.as_deref(), Some("studio"));
    }

    #[test]
    fn test_below_tolerance_is_no_match() {
        let matcher = Matcher::default();
        let candidates = vec![Track::new("Xyzzy", vec!["Qqq".to_string()], "Www", 100)];
        assert!(matcher.match_one_to_many(&lemon(270), &candidates).is_none());
    }

    #[test]
    fn test_zero_tolerance_accepts_zero_score() {
        let config = MatchConfig::new(0.0, 3, 1.2, ["live"]).unwrap();
        let matcher = Matcher::new(config);
        let candidates = vec![Track::new("xyz", vec!["q".to_string()], "w", 900)];
        let best = matcher.match_one_to_many(&lemon(270), &candidates).unwrap();
        assert_eq!(best.score, 0.0);
    }

    #[test]
    fn test_many_to_many_preserves_source_order() {
        let matcher = Matcher::default();
        let sources = vec![
            Track::new("Qqq", vec!["Www".to_string()], "Zzz", 10),
            lemon(270),
            Track::new("Flamingo", vec!["Kenshi Yonezu".to_string()], "Flamingo", 180),
        ];
        let candidates = vec![
            candidate("Flamingo", "Flamingo", 181, "flamingo"),
            candidate("Lemon", "Lemon", 270, "lemon"),
        ];
        let result = matcher.match_many_to_many(&sources, &candidates);
        let pairs: Vec<(&str, Option<&str>)> = result
            .iter()
            .map(|a| (a.source.title.as_str(), a.matched.candidate.external_id.as_deref()))
            .collect();
        assert_eq!(
            pairs,
            vec![("Lemon", Some("lemon")), ("Flamingo", Some("flamingo"))]
        );
    }
}
