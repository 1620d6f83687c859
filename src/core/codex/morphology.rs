//! Name normalization and Polish noun morphology.
//!
//! Session notes are written in Polish, so names show up declined: "w Krakowie",
//! "z Zordonem", "Piotrze!". Two narrow tools undo that well enough for lookup:
//!
//! - [`stem`] strips one case ending from a fixed table.
//! - [`alternation_candidates`] reverses the consonant softening that the
//!   locative and dative cases apply before `-e` (`Piotr → Piotrze`,
//!   `Wanda → Wandzie`, `Kraków → Krakowie`).
//!
//! Neither is a linguistic engine; both work on lowercased text only.

use unicode_normalization::UnicodeNormalization;

/// Minimum number of characters a stem must keep after suffix stripping.
pub const MIN_STEM_LEN: usize = 3;

/// Case endings, longest first. The first entry that matches and leaves
/// at least [`MIN_STEM_LEN`] characters is stripped.
const SUFFIXES: &[&str] = &[
    "owie", "ami", "ach", "owi", "iem", "iej", "ego", "emu", "om", "ów", "em", "ie", "ą", "ę", "y",
    "i", "a", "u", "e", "o",
];

/// Softened endings and the base-form endings they may come from.
const ALTERNATIONS: &[(&str, &[&str])] = &[
    ("owie", &["ów"]),
    ("ście", &["st", "sta"]),
    ("dzie", &["d", "da"]),
    ("rze", &["r", "ra"]),
    ("cie", &["t", "ta"]),
    ("dze", &["ga"]),
    ("sze", &["cha"]),
    ("nie", &["n", "na"]),
    ("mie", &["m", "ma"]),
    ("wie", &["w", "wa"]),
    ("ce", &["ka"]),
    ("le", &["ł", "ła"]),
];

/// Normalize a name for indexing: NFC, lowercase, single spaces.
pub fn normalize(text: &str) -> String {
    let composed: String = text.nfc().collect();
    composed
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Strip the longest case ending that leaves a usable stem.
///
/// Returns the normalized input unchanged when no ending applies.
pub fn stem(text: &str) -> String {
    let word = normalize(text);
    let word_len = word.chars().count();

    for suffix in SUFFIXES {
        if let Some(base) = word.strip_suffix(suffix) {
            if word_len - suffix.chars().count() >= MIN_STEM_LEN {
                return base.to_string();
            }
        }
    }

    word
}

/// Generate every base form the text could have been softened from.
///
/// Order is not meaningful. The input itself is never included.
pub fn alternation_candidates(text: &str) -> Vec<String> {
    let word = normalize(text);
    let mut candidates: Vec<String> = Vec::new();

    for (ending, replacements) in ALTERNATIONS {
        let Some(base) = word.strip_suffix(ending) else {
            continue;
        };
        if base.chars().count() < 2 {
            continue;
        }
        for replacement in *replacements {
            let candidate = format!("{base}{replacement}");
            if candidate != word && !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
    }

    candidates
}
