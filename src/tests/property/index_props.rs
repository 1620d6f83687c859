//! Property-based tests for name index construction
//!
//! Tests invariants:
//! - Indexing the same identities twice gives the same index
//! - The index does not depend on input order
//! - A non-ambiguous full-name token resolves exactly to its owner

use proptest::prelude::*;

use crate::core::codex::{
    build_index, Identity, IdentityKind, MatchStage, NameResolver, ResolveMode,
};

fn arb_kind() -> impl Strategy<Value = IdentityKind> {
    prop::sample::select(IdentityKind::ALL.to_vec())
}

/// One or two capitalized words drawn from a small alphabet, so that word
/// tokens collide often.
fn arb_name() -> impl Strategy<Value = String> {
    "[A-D][a-d]{2,4}( [A-D][a-d]{2,4})?"
}

fn arb_identities() -> impl Strategy<Value = Vec<Identity>> {
    prop::collection::vec(
        (arb_kind(), arb_name()).prop_map(|(kind, name)| Identity::new(kind, name)),
        0..12,
    )
}

proptest! {
    /// Property: repeated identities do not change the index
    #[test]
    fn prop_reindexing_is_idempotent(identities in arb_identities()) {
        let once = build_index(&identities);

        let doubled: Vec<Identity> = identities.iter().chain(identities.iter()).cloned().collect();
        let twice = build_index(&doubled);

        prop_assert_eq!(once.entries(), twice.entries());
    }

    /// Property: input order does not change the index
    #[test]
    fn prop_order_independent(
        (identities, shuffled) in arb_identities()
            .prop_flat_map(|ids| (Just(ids.clone()), Just(ids).prop_shuffle()))
    ) {
        let a = build_index(&identities);
        let b = build_index(&shuffled);
        prop_assert_eq!(a.entries(), b.entries());
    }

    /// Property: an unambiguous full-name token resolves through the exact stage
    #[test]
    fn prop_unique_full_name_resolves_exactly(identities in arb_identities()) {
        let index = build_index(&identities);
        let resolver = NameResolver::new(&index);

        for identity in &identities {
            let Some(entry) = index.lookup(&identity.name) else {
                continue;
            };
            if entry.ambiguous {
                let resolution = resolver.resolve_detailed(&identity.name, None, ResolveMode::NoFuzzy);
                prop_assert!(resolution.map_or(true, |r| r.stage != MatchStage::Exact));
                continue;
            }

            let resolution = resolver
                .resolve_detailed(&identity.name, None, ResolveMode::Full)
                .expect("indexed token resolves");
            prop_assert_eq!(resolution.stage, MatchStage::Exact);
            prop_assert_eq!(&resolution.owner, &entry.owner);
        }
    }
}
