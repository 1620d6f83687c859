//! Property-based tests for attribute histories
//!
//! Tests invariants:
//! - Entries are sorted by start date, open starts first, whatever the push order
//! - `current_at` returns a covering entry with the latest start, or nothing
//!   when no entry covers the date

use chrono::{Days, NaiveDate};
use proptest::prelude::*;

use crate::core::codex::{History, HistoryEntry, ValidityRange};

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid base date")
}

fn day(offset: u64) -> NaiveDate {
    base_date() + Days::new(offset)
}

fn arb_range() -> impl Strategy<Value = ValidityRange> {
    (prop::option::of(0u64..400), prop::option::of(0u64..400)).prop_map(|(from, len)| {
        let valid_from = from.map(day);
        let valid_to = match (from, len) {
            (Some(f), Some(l)) => Some(day(f + l)),
            (None, Some(l)) => Some(day(l)),
            _ => None,
        };
        ValidityRange::new(valid_from, valid_to)
    })
}

fn arb_entries() -> impl Strategy<Value = Vec<HistoryEntry>> {
    prop::collection::vec(
        ("[A-F]", arb_range()).prop_map(|(value, range)| HistoryEntry::new(value, range)),
        0..16,
    )
}

proptest! {
    /// Property: push keeps entries sorted by start
    #[test]
    fn prop_push_keeps_sorted(entries in arb_entries()) {
        let mut history = History::new();
        for entry in entries {
            history.push(entry);
        }

        for pair in history.entries().windows(2) {
            prop_assert!(pair[0].range.cmp_start(&pair[1].range).is_le());
        }
    }

    /// Property: the current value covers the date and starts no earlier than
    /// any other covering entry
    #[test]
    fn prop_current_has_latest_start(entries in arb_entries(), offset in 0u64..800) {
        let date = day(offset);
        let mut history = History::new();
        for entry in entries {
            history.push(entry);
        }

        match history.current_at(date) {
            None => {
                prop_assert!(history.entries().iter().all(|e| !e.covers(date)));
            }
            Some(current) => {
                prop_assert!(current.covers(date));
                for other in history.entries().iter().filter(|e| e.covers(date)) {
                    prop_assert!(other.range.cmp_start(&current.range).is_le());
                }
            }
        }
    }
}
