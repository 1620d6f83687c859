//! Validity ranges and attribute histories.
//!
//! A history is a list of `{value, valid_from?, valid_to?}` entries kept sorted
//! by start date, with unscoped starts first. The "current" scalar at a date
//! is the covering entry with the latest start; list attributes take every
//! covering entry.

use std::cmp::Ordering;

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Trailing `(start:end)` suffix on a tag value.
/// Examples: `Kraków (2021-01:2024-06)`, `Active (2021:)`, `Lost (:2023-05-17)`
static VALIDITY_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<value>.*?)\s*\((?P<range>[^()]*:[^()]*)\)\s*$")
        .expect("Invalid validity suffix regex")
});

// ============================================================================
// ValidityRange
// ============================================================================

/// Inclusive window during which a value is current. Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidityRange {
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
}

impl ValidityRange {
    /// Unscoped: true since before memory, with no end.
    pub fn always() -> Self {
        Self::default()
    }

    /// Open-ended window starting on `date`.
    pub fn starting(date: NaiveDate) -> Self {
        Self {
            valid_from: Some(date),
            valid_to: None,
        }
    }

    pub fn new(valid_from: Option<NaiveDate>, valid_to: Option<NaiveDate>) -> Self {
        Self {
            valid_from,
            valid_to,
        }
    }

    pub fn is_unscoped(&self) -> bool {
        self.valid_from.is_none() && self.valid_to.is_none()
    }

    /// Whether `date` falls inside the window (both ends inclusive).
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.valid_from.map_or(true, |from| from <= date)
            && self.valid_to.map_or(true, |to| date <= to)
    }

    /// Ordering by start date where an absent start is negative infinity.
    ///
    /// Every history sort goes through this comparator.
    pub fn cmp_start(&self, other: &Self) -> Ordering {
        match (self.valid_from, other.valid_from) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a.cmp(&b),
        }
    }

    /// Parse the inside of a `(start:end)` suffix.
    ///
    /// Bounds may be `YYYY`, `YYYY-MM`, `YYYY-MM-DD` or empty. A partial start
    /// expands to the first day of its period and a partial end to the last.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let (start, end) = raw
            .split_once(':')
            .ok_or_else(|| "missing ':' separator".to_string())?;

        let valid_from = parse_bound(start.trim(), Bound::Start)?;
        let valid_to = parse_bound(end.trim(), Bound::End)?;

        if let (Some(from), Some(to)) = (valid_from, valid_to) {
            if from > to {
                return Err(format!("start {from} is after end {to}"));
            }
        }

        Ok(Self {
            valid_from,
            valid_to,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Start,
    End,
}

fn parse_bound(raw: &str, bound: Bound) -> Result<Option<NaiveDate>, String> {
    if raw.is_empty() {
        return Ok(None);
    }

    let parts: Vec<&str> = raw.split('-').collect();

    let date = match parts[..] {
        [year] => {
            let year = date_part(year, "year", raw)? as i32;
            match bound {
                Bound::Start => NaiveDate::from_ymd_opt(year, 1, 1),
                Bound::End => NaiveDate::from_ymd_opt(year, 12, 31),
            }
        }
        [year, month] => {
            let year = date_part(year, "year", raw)? as i32;
            let month = date_part(month, "month", raw)?;
            match bound {
                Bound::Start => NaiveDate::from_ymd_opt(year, month, 1),
                Bound::End => last_day_of_month(year, month),
            }
        }
        [year, month, day] => NaiveDate::from_ymd_opt(
            date_part(year, "year", raw)? as i32,
            date_part(month, "month", raw)?,
            date_part(day, "day", raw)?,
        ),
        _ => return Err(format!("unrecognized date '{raw}'")),
    };

    date.map(Some)
        .ok_or_else(|| format!("date out of range '{raw}'"))
}

fn date_part(part: &str, what: &str, raw: &str) -> Result<u32, String> {
    let width_ok = match what {
        "year" => part.len() == 4,
        _ => (1..=2).contains(&part.len()),
    };
    if !width_ok || !part.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("invalid {what} '{part}' in '{raw}'"));
    }
    part.parse::<u32>()
        .map_err(|_| format!("invalid {what} '{part}' in '{raw}'"))
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    next.pred_opt()
}

/// Outcome of splitting a tag value from its validity suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopedValue<'a> {
    /// No suffix: the value is always active.
    Unscoped(&'a str),
    /// A well-formed suffix.
    Scoped(&'a str, ValidityRange),
    /// A suffix was present but unreadable. `value` is the whole text,
    /// suffix included; `raw` is the text inside the parentheses.
    Malformed {
        value: &'a str,
        raw: &'a str,
        reason: String,
    },
}

impl<'a> ScopedValue<'a> {
    /// Split `"Kraków (2021-01:2024-06)"` into value and range.
    pub fn parse(text: &'a str) -> Self {
        let text = text.trim();
        let Some(caps) = VALIDITY_SUFFIX.captures(text) else {
            return Self::Unscoped(text);
        };

        let (Some(value), Some(raw)) = (caps.name("value"), caps.name("range")) else {
            return Self::Unscoped(text);
        };
        let value = value.as_str().trim();
        let raw = raw.as_str();

        match ValidityRange::parse(raw) {
            Ok(range) => Self::Scoped(value, range),
            Err(reason) => Self::Malformed {
                value: text,
                raw,
                reason,
            },
        }
    }

    pub fn value(&self) -> &'a str {
        match *self {
            Self::Unscoped(v) | Self::Scoped(v, _) => v,
            Self::Malformed { value, .. } => value,
        }
    }

    /// Explicit range, if one parsed. Malformed suffixes fail open to `None`.
    pub fn range(&self) -> Option<ValidityRange> {
        match self {
            Self::Scoped(_, range) => Some(*range),
            _ => None,
        }
    }
}

// ============================================================================
// History
// ============================================================================

/// One scoped value of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub value: String,
    #[serde(flatten)]
    pub range: ValidityRange,
}

impl HistoryEntry {
    pub fn new(value: impl Into<String>, range: ValidityRange) -> Self {
        Self {
            value: value.into(),
            range,
        }
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.range.covers(date)
    }
}

/// Attribute history, sorted by start date with unscoped starts first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry after every entry starting no later than it.
    ///
    /// Equal starts keep arrival order, so a later file or event wins ties.
    pub fn push(&mut self, entry: HistoryEntry) {
        let position = self
            .entries
            .partition_point(|e| e.range.cmp_start(&entry.range) != Ordering::Greater);
        self.entries.insert(position, entry);
    }

    /// Append every entry of `other`, keeping the sort.
    pub fn extend(&mut self, other: History) {
        for entry in other.entries {
            self.push(entry);
        }
    }

    /// Stable re-sort by start date.
    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| a.range.cmp_start(&b.range));
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Scalar value at `date`: the covering entry with the latest start.
    pub fn current_at(&self, date: NaiveDate) -> Option<&HistoryEntry> {
        self.entries.iter().filter(|e| e.covers(date)).last()
    }

    /// List value at `date`: every covering value, first occurrence wins.
    pub fn all_at(&self, date: NaiveDate) -> Vec<&str> {
        let mut values: Vec<&str> = Vec::new();
        for entry in self.entries.iter().filter(|e| e.covers(date)) {
            if !values.contains(&entry.value.as_str()) {
                values.push(&entry.value);
            }
        }
        values
    }

    /// Every value ever recorded, in history order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_year_month_range() {
        let range = ValidityRange::parse("2021-01:2024-06").unwrap();
        assert_eq!(range.valid_from, Some(ymd(2021, 1, 1)));
        assert_eq!(range.valid_to, Some(ymd(2024, 6, 30)));
    }

    #[test]
    fn test_parse_year_range_expands_to_period() {
        let range = ValidityRange::parse("2020:2020").unwrap();
        assert_eq!(range.valid_from, Some(ymd(2020, 1, 1)));
        assert_eq!(range.valid_to, Some(ymd(2020, 12, 31)));
    }

    #[test]
    fn test_parse_end_of_february() {
        let range = ValidityRange::parse(":2024-02").unwrap();
        assert_eq!(range.valid_from, None);
        assert_eq!(range.valid_to, Some(ymd(2024, 2, 29)));

        let range = ValidityRange::parse(":2023-12").unwrap();
        assert_eq!(range.valid_to, Some(ymd(2023, 12, 31)));
    }

    #[test]
    fn test_parse_open_bounds() {
        let range = ValidityRange::parse("2024-07-15:").unwrap();
        assert_eq!(range.valid_from, Some(ymd(2024, 7, 15)));
        assert_eq!(range.valid_to, None);

        assert!(ValidityRange::parse(":").unwrap().is_unscoped());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(ValidityRange::parse("20x1:2024").is_err());
        assert!(ValidityRange::parse("2021-13:").is_err());
        assert!(ValidityRange::parse("2021-02-30:").is_err());
        assert!(ValidityRange::parse("2025:2021").is_err());
        assert!(ValidityRange::parse("2021-01-01-01:").is_err());
        assert!(ValidityRange::parse("10:30").is_err());
    }

    #[test]
    fn test_scoped_value_split() {
        let scoped = ScopedValue::parse("Kraków (2021-01:2024-06)");
        assert_eq!(scoped.value(), "Kraków");
        assert_eq!(
            scoped.range(),
            Some(ValidityRange::new(Some(ymd(2021, 1, 1)), Some(ymd(2024, 6, 30))))
        );

        // Parentheses without ':' are part of the value.
        let plain = ScopedValue::parse("Pod Zielonym Smokiem (karczma)");
        assert_eq!(plain, ScopedValue::Unscoped("Pod Zielonym Smokiem (karczma)"));
    }

    #[test]
    fn test_scoped_value_malformed_fails_open() {
        let scoped = ScopedValue::parse("Moria (dawno:temu)");
        assert!(matches!(scoped, ScopedValue::Malformed { raw: "dawno:temu", .. }));
        assert_eq!(scoped.value(), "Moria (dawno:temu)");
        assert_eq!(scoped.range(), None);

        let meeting = ScopedValue::parse("Spotkanie (10:30)");
        assert!(matches!(meeting, ScopedValue::Malformed { .. }));
        assert_eq!(meeting.value(), "Spotkanie (10:30)");
    }

    #[test]
    fn test_unscoped_sorts_first() {
        let mut history = History::new();
        history.push(HistoryEntry::new("B", ValidityRange::starting(ymd(2024, 7, 1))));
        history.push(HistoryEntry::new("A", ValidityRange::starting(ymd(2021, 1, 1))));
        history.push(HistoryEntry::new("origin", ValidityRange::always()));

        let values: Vec<&str> = history.values().collect();
        assert_eq!(values, vec!["origin", "A", "B"]);
    }

    #[test]
    fn test_current_value_by_date() {
        let mut history = History::new();
        history.push(HistoryEntry::new(
            "A",
            ValidityRange::parse("2021-01:2024-06").unwrap(),
        ));
        history.push(HistoryEntry::new("B", ValidityRange::parse("2024-07:").unwrap()));

        assert_eq!(history.current_at(ymd(2023, 5, 1)).unwrap().value, "A");
        assert_eq!(history.current_at(ymd(2025, 1, 1)).unwrap().value, "B");
        assert!(history.current_at(ymd(2020, 1, 1)).is_none());
    }

    #[test]
    fn test_equal_start_later_arrival_wins() {
        let mut history = History::new();
        let start = ValidityRange::starting(ymd(2022, 3, 1));
        history.push(HistoryEntry::new("first", start));
        history.push(HistoryEntry::new("second", start));
        assert_eq!(history.current_at(ymd(2022, 3, 2)).unwrap().value, "second");
    }

    #[test]
    fn test_all_at_collects_covering_values() {
        let mut history = History::new();
        history.push(HistoryEntry::new("Drużyna", ValidityRange::always()));
        history.push(HistoryEntry::new(
            "Gildia Kupców",
            ValidityRange::parse("2022:2023").unwrap(),
        ));
        history.push(HistoryEntry::new("Zakon", ValidityRange::parse("2023-06:").unwrap()));

        assert_eq!(history.all_at(ymd(2023, 7, 1)), vec!["Drużyna", "Gildia Kupców", "Zakon"]);
        assert_eq!(history.all_at(ymd(2025, 1, 1)), vec!["Drużyna", "Zakon"]);
    }

    #[test]
    fn test_extend_concatenates_and_sorts() {
        let mut a = History::new();
        a.push(HistoryEntry::new("x", ValidityRange::starting(ymd(2023, 1, 1))));
        let mut b = History::new();
        b.push(HistoryEntry::new("y", ValidityRange::starting(ymd(2021, 1, 1))));
        b.push(HistoryEntry::new("z", ValidityRange::always()));

        a.extend(b);
        assert_eq!(a.values().collect::<Vec<_>>(), vec!["z", "y", "x"]);
    }
}
