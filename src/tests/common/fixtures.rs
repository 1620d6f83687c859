//! Test Fixtures
//!
//! Small campaign casts and date helpers.

use chrono::NaiveDate;

use crate::core::codex::{Identity, IdentityKind, ValidityRange};

// =============================================================================
// Dates
// =============================================================================

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid fixture date")
}

// =============================================================================
// Identities
// =============================================================================

/// A player, their character, two NPCs and a place.
pub fn campaign_cast() -> Vec<Identity> {
    let mut jan = Identity::new(IdentityKind::Person, "Jan Kowalski")
        .with_tag("alias", "Janek", ValidityRange::always());
    jan.characters.push("Zordon".to_string());

    let zordon = Identity::new(IdentityKind::Character, "Zordon").with_tag(
        "player",
        "Jan Kowalski",
        ValidityRange::always(),
    );

    vec![
        jan,
        zordon,
        Identity::new(IdentityKind::Npc, "Gandalf").with_tag(
            "alias",
            "Mithrandir",
            ValidityRange::always(),
        ),
        Identity::new(IdentityKind::Npc, "Wanda"),
        Identity::new(IdentityKind::Place, "Kraków"),
    ]
}
