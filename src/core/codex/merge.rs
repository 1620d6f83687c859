//! Temporal state merger.
//!
//! Folds dated change events, usually extracted from session notes, into the
//! histories of the identities they mention:
//!
//! 1. Events without tags or without a date are dropped. The rest are sorted
//!    by date; same-day events keep their input order.
//! 2. Each target is matched against primary names first, then resolved with
//!    the exact, stem and alternation stages. A person hit is narrowed to the
//!    one of their characters the target actually names.
//! 3. Every tag becomes one history entry. A tag without its own range starts
//!    on the event date and stays open.
//! 4. Touched identities get their histories re-sorted and their current
//!    state recomputed.
//!
//! Targets that resolve to nothing, or only to a token several identities
//! share, are reported and skipped. Other events are unaffected.

use std::collections::{BTreeSet, HashMap};

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::CodexConfig;

use super::error::{CodexError, Diagnostics};
use super::identity::{Identity, IdentityKind};
use super::index::IndexBuilder;
use super::morphology::{alternation_candidates, normalize, stem};
use super::resolver::{NameResolver, ResolutionCache, ResolveMode, ResolverSettings};
use super::temporal::{ScopedValue, ValidityRange};

// ============================================================================
// Events
// ============================================================================

/// One attribute change carried by an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagChange {
    pub tag: String,
    pub value: String,
    /// Explicit window. Unscoped means "from the event date on".
    #[serde(flatten, default)]
    pub range: ValidityRange,
}

impl TagChange {
    pub fn new(tag: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            value: value.into(),
            range: ValidityRange::always(),
        }
    }

    pub fn with_range(mut self, range: ValidityRange) -> Self {
        self.range = range;
        self
    }

    /// Build from free text that may end in a `(start:end)` suffix.
    ///
    /// An unreadable suffix stays part of the value, the change stays
    /// unscoped and a warning is logged.
    pub fn from_text(tag: impl Into<String>, text: &str) -> Self {
        let tag = tag.into();
        let scoped = ScopedValue::parse(text);
        if let ScopedValue::Malformed { raw, reason, .. } = &scoped {
            warn!(tag = %tag, raw = %raw, reason = %reason, "Unreadable validity range on change");
        }
        Self {
            tag,
            value: scoped.value().to_string(),
            range: scoped.range().unwrap_or_default(),
        }
    }
}

/// A dated set of changes to one named identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Free-text name of the identity, as written in the notes.
    pub target: String,
    pub date: Option<NaiveDate>,
    pub tags: Vec<TagChange>,
}

impl ChangeEvent {
    pub fn new(target: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            target: target.into(),
            date: Some(date),
            tags: Vec::new(),
        }
    }

    pub fn with_tag(mut self, change: TagChange) -> Self {
        self.tags.push(change);
        self
    }

    /// Add a change parsed from free text, recording an unreadable validity
    /// suffix against this event's target.
    pub fn with_text_tag(
        mut self,
        tag: impl Into<String>,
        text: &str,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let tag = tag.into();
        let scoped = ScopedValue::parse(text);
        if let ScopedValue::Malformed { raw, reason, .. } = &scoped {
            diagnostics.report(CodexError::malformed_range(
                self.target.as_str(),
                *raw,
                reason.as_str(),
            ));
        }
        self.tags.push(TagChange {
            tag,
            value: scoped.value().to_string(),
            range: scoped.range().unwrap_or_default(),
        });
        self
    }
}

/// Summary of one merge run.
#[derive(Debug, Default)]
pub struct MergeReport {
    pub events_applied: usize,
    /// Events dropped for lacking tags or a date.
    pub events_skipped: usize,
    /// Targets that resolved to nothing or to an ambiguous token, in event order.
    pub unresolved: Vec<String>,
    /// Primary names of identities that received entries, in identity order.
    pub touched: Vec<String>,
    pub diagnostics: Diagnostics,
}

// ============================================================================
// StateMerger
// ============================================================================

/// Merger configuration.
#[derive(Debug, Clone, Copy)]
pub struct StateMerger {
    builder: IndexBuilder,
    settings: ResolverSettings,
    use_cache: bool,
}

impl Default for StateMerger {
    fn default() -> Self {
        Self {
            builder: IndexBuilder::new(),
            settings: ResolverSettings::default(),
            use_cache: true,
        }
    }
}

impl StateMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &CodexConfig) -> Self {
        Self {
            builder: IndexBuilder::new().with_min_token_len(config.index.min_token_len),
            settings: ResolverSettings::from(&config.resolver),
            use_cache: config.resolver.use_cache,
        }
    }

    /// Merge `events` into `identities`.
    ///
    /// `reference_date` drives the recomputed current state and defaults to
    /// today.
    pub fn merge(
        &self,
        mut identities: Vec<Identity>,
        events: Vec<ChangeEvent>,
        reference_date: Option<NaiveDate>,
    ) -> (Vec<Identity>, MergeReport) {
        let reference_date = reference_date.unwrap_or_else(|| Local::now().date_naive());
        let mut report = MergeReport::default();

        let total = events.len();
        let mut events: Vec<(NaiveDate, ChangeEvent)> = events
            .into_iter()
            .filter(|e| !e.tags.is_empty())
            .filter_map(|e| e.date.map(|date| (date, e)))
            .collect();
        report.events_skipped = total - events.len();
        events.sort_by_key(|(date, _)| *date);

        let index = self.builder.build(&identities);
        let resolver = NameResolver::new(&index).with_settings(self.settings);
        let mut cache = self.use_cache.then(ResolutionCache::new);

        // Primary names first, in kind order, so a name shared across kinds
        // lands on the lowest-ranked kind.
        let mut by_primary: HashMap<String, usize> = HashMap::new();
        let mut by_owner: HashMap<(IdentityKind, String), usize> = HashMap::new();
        let mut order: Vec<usize> = (0..identities.len()).collect();
        order.sort_by_key(|&i| identities[i].kind);
        for i in order {
            let identity = &identities[i];
            by_primary.entry(normalize(&identity.name)).or_insert(i);
            by_owner
                .entry((identity.kind, identity.name.to_lowercase()))
                .or_insert(i);
        }

        let mut touched: BTreeSet<usize> = BTreeSet::new();

        for (date, event) in events {
            let position = match by_primary.get(&normalize(&event.target)) {
                Some(&position) => Some(position),
                None => resolver
                    .resolve_with(&event.target, None, ResolveMode::NoFuzzy, cache.as_mut())
                    .and_then(|owner| by_owner.get(&(owner.kind, owner.name.to_lowercase())))
                    .map(|&position| {
                        narrow_to_character(&identities, &by_owner, position, &event.target)
                    }),
            };

            let Some(position) = position else {
                let error = match resolver.ambiguous_match(&event.target, None) {
                    Some((token, entry)) => CodexError::AmbiguousReference {
                        token,
                        owners: entry.owners.iter().map(ToString::to_string).collect(),
                    },
                    None => CodexError::unresolved(
                        event.target.as_str(),
                        format!("change event on {date}"),
                    ),
                };
                report.diagnostics.report(error);
                report.unresolved.push(event.target);
                continue;
            };

            let identity = &mut identities[position];
            for change in event.tags {
                let range = if change.range.is_unscoped() {
                    ValidityRange::starting(date)
                } else {
                    change.range
                };
                identity.apply_tag(&change.tag, change.value, range);
            }
            debug!(
                event_target = %event.target,
                identity = %identity.name,
                %date,
                "Event applied"
            );
            touched.insert(position);
            report.events_applied += 1;
        }

        for &position in &touched {
            let identity = &mut identities[position];
            identity.histories.sort_all();
            identity.recompute_current(reference_date);
            report.touched.push(identity.name.clone());
        }

        if let Some(cache) = &cache {
            let stats = cache.stats();
            debug!(hits = stats.hits, computed = stats.computed, "Resolution cache");
        }
        info!(
            applied = report.events_applied,
            skipped = report.events_skipped,
            unresolved = report.unresolved.len(),
            touched = report.touched.len(),
            "State merge complete"
        );

        (identities, report)
    }
}

/// When `position` is a person, pick the character of theirs that `target`
/// names, matching case-insensitively, by stem or through alternation.
fn narrow_to_character(
    identities: &[Identity],
    by_owner: &HashMap<(IdentityKind, String), usize>,
    position: usize,
    target: &str,
) -> usize {
    let person = &identities[position];
    if person.kind != IdentityKind::Person {
        return position;
    }

    let target_norm = normalize(target);
    let target_stem = stem(target);
    let alternations = alternation_candidates(target);

    person
        .characters
        .iter()
        .find(|character| {
            let norm = normalize(character);
            norm == target_norm || stem(character) == target_stem || alternations.contains(&norm)
        })
        .and_then(|character| {
            by_owner
                .get(&(IdentityKind::Character, character.to_lowercase()))
                .copied()
        })
        .unwrap_or(position)
}

/// Merge with default settings.
pub fn merge_state(
    identities: Vec<Identity>,
    events: Vec<ChangeEvent>,
    reference_date: Option<NaiveDate>,
) -> (Vec<Identity>, MergeReport) {
    StateMerger::new().merge(identities, events, reference_date)
}

/// Merge with settings taken from configuration.
pub fn merge_state_with(
    config: &CodexConfig,
    identities: Vec<Identity>,
    events: Vec<ChangeEvent>,
    reference_date: Option<NaiveDate>,
) -> (Vec<Identity>, MergeReport) {
    StateMerger::from_config(config).merge(identities, events, reference_date)
}
