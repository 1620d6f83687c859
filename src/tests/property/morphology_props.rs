//! Property-based tests for normalization and stemming
//!
//! Tests invariants:
//! - normalize(normalize(x)) == normalize(x)
//! - stem(x) is a prefix of normalize(x)
//! - A stripped stem keeps at least three characters
//! - "Name" + case ending resolves to the same owner as "Name"

use proptest::prelude::*;

use crate::core::codex::morphology::MIN_STEM_LEN;
use crate::core::codex::{
    build_index, normalize, stem, Identity, IdentityKind, NameResolver, ResolveMode,
};

/// Consonant-only stems never end in a table suffix themselves.
fn arb_bare_stem() -> impl Strategy<Value = String> {
    "[bcdfgjklmnprstwz]{3,8}"
}

fn arb_case_ending() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("a"),
        Just("e"),
        Just("i"),
        Just("u"),
        Just("em"),
        Just("om"),
        Just("ach"),
        Just("ami"),
        Just("owi"),
        Just("ego"),
    ]
}

proptest! {
    /// Property: normalization is idempotent
    #[test]
    fn prop_normalize_idempotent(text in "(o\u{301}|[A-Za-złŁóÓ \t]){0,16}") {
        let once = normalize(&text);
        prop_assert_eq!(normalize(&once), once);
    }

    /// Property: stemming only ever removes a tail and keeps a usable stem
    #[test]
    fn prop_stem_is_prefix(word in "[a-zóąęł]{0,12}") {
        let normalized = normalize(&word);
        let stemmed = stem(&word);
        prop_assert!(normalized.starts_with(&stemmed));
        if stemmed != normalized {
            prop_assert!(stemmed.chars().count() >= MIN_STEM_LEN);
        }
    }

    /// Property: an inflected name and its bare stem resolve to the same owner
    #[test]
    fn prop_inflected_and_bare_resolve_alike(
        bare in arb_bare_stem(),
        ending in arb_case_ending()
    ) {
        let identities = vec![Identity::new(IdentityKind::Npc, bare.clone())];
        let index = build_index(&identities);
        let resolver = NameResolver::new(&index);

        let inflected = format!("{bare}{ending}");
        let from_bare = resolver.resolve_detailed(&bare, None, ResolveMode::NoFuzzy);
        let from_inflected = resolver.resolve_detailed(&inflected, None, ResolveMode::NoFuzzy);

        prop_assert!(from_bare.is_some());
        prop_assert_eq!(
            from_bare.map(|r| r.owner),
            from_inflected.map(|r| r.owner)
        );
    }
}
