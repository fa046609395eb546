// Property-based tests for similarity scoring and candidate selection.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use proptest::prelude::*;
use playlist_match::scoring::{duration_similarity, sequence_ratio, string_similarity};
use playlist_match::{MatchConfig, Matcher, SourceKind, Track};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Short text over an alphabet that cannot spell any default keyword.
fn arb_plain_text() -> impl Strategy<Value = String> {
    r"[a-h ]{0,12}"
}

/// Text that may carry a bracketed variant marker.
fn arb_title() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => arb_plain_text(),
        1 => (arb_plain_text(), prop::sample::select(vec!["(Live)", "(Remix)", "[Cover]"]))
            .prop_map(|(t, k)| format!("{} {}", t, k)),
    ]
}

fn arb_track() -> impl Strategy<Value = Track> {
    (
        arb_title(),
        prop::collection::vec(arb_plain_text(), 0..3),
        arb_title(),
        150u32..200,
        any::<bool>(),
    )
        .prop_map(|(title, artists, album, secs, top)| {
            Track::new(title, artists, album, secs)
                .with_kind(SourceKind::Song)
                .with_top_result(top)
        })
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn ratio_is_bounded_and_reflexive(a in ".{0,16}", b in ".{0,16}") {
        let r = sequence_ratio(&a, &b);
        prop_assert!((0.0..=1.0).contains(&r), "ratio {} out of range", r);
        prop_assert_eq!(sequence_ratio(&a, &a), 1.0);
    }

    #[test]
    fn identical_strings_score_one(a in ".{0,24}") {
        let sim = string_similarity(&a, &a, &MatchConfig::default());
        prop_assert_eq!(sim.score, 1.0);
        prop_assert!(!sim.force_reject);
    }

    #[test]
    fn plain_similarity_is_zero_or_above_floor(a in arb_plain_text(), b in arb_plain_text()) {
        let sim = string_similarity(&a, &b, &MatchConfig::default());
        prop_assert!(!sim.force_reject);
        prop_assert!(
            sim.score == 0.0 || (0.3..=1.0).contains(&sim.score),
            "score {} inside the dead zone", sim.score
        );
    }

    #[test]
    fn duration_similarity_decays_monotonically(
        d in 0u32..100_000,
        threshold in 1u32..30,
        gap in 0u32..40,
    ) {
        prop_assert_eq!(duration_similarity(d, d, threshold), 1.0);
        prop_assert_eq!(duration_similarity(d, d + threshold + 1, threshold), 0.0);

        let near = duration_similarity(d, d + gap, threshold);
        let far = duration_similarity(d, d + gap + 1, threshold);
        prop_assert!(far <= near);
        prop_assert_eq!(near, duration_similarity(d + gap, d, threshold));
    }

    #[test]
    fn best_match_is_accepted_and_maximal(
        source in arb_track(),
        candidates in prop::collection::vec(arb_track(), 0..8),
    ) {
        let matcher = Matcher::default();
        let tolerance = matcher.config().tolerance();
        let scores: Vec<Option<f64>> = candidates
            .iter()
            .map(|c| matcher.score_candidate(&source, c))
            .collect();

        match matcher.match_one_to_many(&source, &candidates) {
            None => {
                for score in scores.iter().flatten() {
                    prop_assert!(*score < tolerance);
                }
            }
            Some(best) => {
                prop_assert!(best.score >= tolerance);
                let index = candidates
                    .iter()
                    .position(|c| std::ptr::eq(c, best.candidate))
                    .unwrap();
                prop_assert_eq!(scores[index], Some(best.score));
                // Earlier candidates never tie or beat the winner
                for score in scores[..index].iter().flatten() {
                    prop_assert!(*score < best.score);
                }
                for score in scores[index..].iter().flatten() {
                    prop_assert!(*score <= best.score);
                }
            }
        }
    }

    #[test]
    fn many_to_many_keeps_source_order(
        sources in prop::collection::vec(arb_track(), 0..6),
        candidates in prop::collection::vec(arb_track(), 0..6),
    ) {
        let matcher = Matcher::default();
        let assignments = matcher.match_many_to_many(&sources, &candidates);

        let positions: Vec<usize> = assignments
            .iter()
            .map(|a| sources.iter().position(|s| std::ptr::eq(s, a.source)).unwrap())
            .collect();
        prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));

        for (assignment, &i) in assignments.iter().zip(&positions) {
            let expected = matcher.match_one_to_many(&sources[i], &candidates);
            prop_assert_eq!(expected.map(|m| m.score), Some(assignment.matched.score));
        }
    }
}
