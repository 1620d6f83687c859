//! Property-based tests for the BK-tree
//!
//! Tests invariants:
//! - Search returns exactly the keys a brute-force scan finds
//! - Every reported distance is the true distance
//! - Inserting a key twice stores it once

use std::collections::BTreeSet;

use proptest::prelude::*;

use crate::core::codex::{distance, BkTree};

fn arb_keys() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[abcdł]{0,6}", 0..40)
}

proptest! {
    /// Property: BK-tree search equals brute force for any threshold
    #[test]
    fn prop_search_matches_brute_force(
        keys in arb_keys(),
        query in "[abcdł]{0,6}",
        threshold in 0usize..5
    ) {
        let tree = BkTree::from_keys(&keys);

        let found: BTreeSet<String> = tree
            .search(&query, threshold)
            .iter()
            .map(|m| m.key.to_string())
            .collect();
        let expected: BTreeSet<String> = keys
            .iter()
            .filter(|k| distance(k, &query) <= threshold)
            .cloned()
            .collect();

        prop_assert_eq!(found, expected);
    }

    /// Property: reported distances are exact
    #[test]
    fn prop_reported_distance_is_exact(keys in arb_keys(), query in "[abcdł]{0,6}") {
        let tree = BkTree::from_keys(&keys);
        for m in tree.search(&query, 3) {
            prop_assert_eq!(m.distance, distance(m.key, &query));
        }
    }

    /// Property: duplicates are stored once
    #[test]
    fn prop_no_duplicate_keys(keys in arb_keys()) {
        let tree = BkTree::from_keys(keys.iter().chain(keys.iter()));
        let distinct: BTreeSet<&String> = keys.iter().collect();
        prop_assert_eq!(tree.len(), distinct.len());
    }
}
