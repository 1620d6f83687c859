//! Property-based tests for Levenshtein distance
//!
//! Tests invariants:
//! - Matches `strsim::levenshtein`
//! - d(a, a) = 0, d(a, b) = d(b, a), d(a, c) <= d(a, b) + d(b, c)
//! - |len(a) - len(b)| <= d(a, b) <= max(len(a), len(b))

use proptest::prelude::*;

use crate::core::codex::distance;

/// Short words over a small alphabet, Polish letters included, so that
/// random pairs are often close.
fn arb_word() -> impl Strategy<Value = String> {
    "[abkoóźł ]{0,10}"
}

proptest! {
    /// Property: distance agrees with an independent implementation
    #[test]
    fn prop_matches_strsim(a in arb_word(), b in arb_word()) {
        prop_assert_eq!(distance(&a, &b), strsim::levenshtein(&a, &b));
    }

    /// Property: distance is a metric
    #[test]
    fn prop_metric_laws(a in arb_word(), b in arb_word(), c in arb_word()) {
        prop_assert_eq!(distance(&a, &a), 0);
        prop_assert_eq!(distance(&a, &b), distance(&b, &a));
        prop_assert!(distance(&a, &c) <= distance(&a, &b) + distance(&b, &c));
    }

    /// Property: distance is bounded by the lengths
    #[test]
    fn prop_length_bounds(a in arb_word(), b in arb_word()) {
        let la = a.chars().count();
        let lb = b.chars().count();
        let d = distance(&a, &b);
        prop_assert!(d >= la.abs_diff(lb));
        prop_assert!(d <= la.max(lb));
    }
}
