//! Four-stage name resolution against a [`NameIndex`].
//!
//! # Stages
//!
//! ```text
//! query ──► 1. exact ──► 2. stem ──► 3. alternation ──► 4. fuzzy ──► None
//!              │            │              │                 │
//!              └────────────┴──────┬───────┴─────────────────┘
//!                                  ▼
//!                           first hit wins
//! ```
//!
//! 1. **Exact**: normalized query is a token.
//! 2. **Stem**: a token with the same stem as the query ("Gandalfa" finds
//!    "gandalf").
//! 3. **Alternation**: a base form recovered by reversing consonant softening
//!    is a token ("Piotrze" finds "piotr").
//! 4. **Fuzzy**: closest token within an edit-distance threshold that grows
//!    with query length.
//!
//! Stages 1-3 never return ambiguous tokens. Stage 4 may, with a one-edit
//! penalty, and logs a warning when it does.
//!
//! Resolution never fails loudly: no match is `None`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ResolverConfig;

use super::distance::distance;
use super::identity::{IdentityKind, OwnerRef};
use super::index::{IndexEntry, NameIndex};
use super::morphology::{alternation_candidates, normalize, stem};

// ============================================================================
// Settings
// ============================================================================

/// Fuzzy threshold parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverSettings {
    /// Queries shorter than this use `short_query_threshold`.
    pub short_query_len: usize,
    pub short_query_threshold: usize,
    /// Longer queries allow `len / threshold_divisor` edits.
    pub threshold_divisor: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            short_query_len: 5,
            short_query_threshold: 1,
            threshold_divisor: 3,
        }
    }
}

impl ResolverSettings {
    /// Maximum edit distance for a query of `query_len` characters.
    pub fn fuzzy_threshold(&self, query_len: usize) -> usize {
        if query_len < self.short_query_len {
            self.short_query_threshold
        } else {
            query_len / self.threshold_divisor.max(1)
        }
    }
}

impl From<&ResolverConfig> for ResolverSettings {
    fn from(config: &ResolverConfig) -> Self {
        Self {
            short_query_len: config.short_query_len,
            short_query_threshold: config.short_query_threshold,
            threshold_divisor: config.threshold_divisor,
        }
    }
}

/// Which stages may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolveMode {
    /// All four stages.
    Full,
    /// Exact, stem and alternation only.
    NoFuzzy,
}

/// Stage that produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStage {
    Exact,
    Stem,
    Alternation,
    Fuzzy,
}

/// Detailed resolution result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub owner: OwnerRef,
    pub stage: MatchStage,
    /// Index token that matched.
    pub token: String,
    /// Edit distance to `token`, 0 outside the fuzzy stage.
    pub distance: usize,
}

// ============================================================================
// ResolutionCache
// ============================================================================

/// Cache lookup outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLookup<'a> {
    /// Never resolved.
    Unknown,
    /// Resolved before, with no match.
    Miss,
    /// Resolved before to this owner.
    Hit(&'a OwnerRef),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    query: String,
    kind: Option<IdentityKind>,
    mode: ResolveMode,
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups answered from the cache, misses included.
    pub hits: u64,
    /// Lookups that had to run the resolver.
    pub computed: u64,
    pub entries: usize,
}

impl CacheStats {
    /// Fraction of lookups answered from the cache. 0.0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.computed;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Memo of past resolutions, owned by one caller.
///
/// Keyed by normalized query, kind filter and mode. Remembers failures as
/// well as matches.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: HashMap<CacheKey, Option<OwnerRef>>,
    hits: u64,
    computed: u64,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(query: &str, kind: Option<IdentityKind>, mode: ResolveMode) -> CacheKey {
        CacheKey {
            query: normalize(query),
            kind,
            mode,
        }
    }

    /// Look up a past resolution, counting a hit when one is found.
    pub fn lookup(
        &mut self,
        query: &str,
        kind: Option<IdentityKind>,
        mode: ResolveMode,
    ) -> CacheLookup<'_> {
        match self.entries.get(&Self::key(query, kind, mode)) {
            None => CacheLookup::Unknown,
            Some(result) => {
                self.hits += 1;
                match result {
                    Some(owner) => CacheLookup::Hit(owner),
                    None => CacheLookup::Miss,
                }
            }
        }
    }

    /// Store a freshly computed resolution.
    pub fn store(
        &mut self,
        query: &str,
        kind: Option<IdentityKind>,
        mode: ResolveMode,
        result: Option<OwnerRef>,
    ) {
        self.computed += 1;
        self.entries.insert(Self::key(query, kind, mode), result);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            computed: self.computed,
            entries: self.entries.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry and reset statistics.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.computed = 0;
    }
}

// ============================================================================
// NameResolver
// ============================================================================

/// Resolver over a borrowed index.
#[derive(Debug, Clone, Copy)]
pub struct NameResolver<'a> {
    index: &'a NameIndex,
    settings: ResolverSettings,
}

impl<'a> NameResolver<'a> {
    pub fn new(index: &'a NameIndex) -> Self {
        Self {
            index,
            settings: ResolverSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ResolverSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn index(&self) -> &'a NameIndex {
        self.index
    }

    /// Resolve with every stage and no cache.
    pub fn resolve(&self, query: &str, kind: Option<IdentityKind>) -> Option<OwnerRef> {
        self.resolve_detailed(query, kind, ResolveMode::Full)
            .map(|r| r.owner)
    }

    /// Resolve through an optional cache.
    pub fn resolve_with(
        &self,
        query: &str,
        kind: Option<IdentityKind>,
        mode: ResolveMode,
        cache: Option<&mut ResolutionCache>,
    ) -> Option<OwnerRef> {
        let Some(cache) = cache else {
            return self.resolve_detailed(query, kind, mode).map(|r| r.owner);
        };

        match cache.lookup(query, kind, mode) {
            CacheLookup::Hit(owner) => return Some(owner.clone()),
            CacheLookup::Miss => return None,
            CacheLookup::Unknown => {}
        }

        let owner = self.resolve_detailed(query, kind, mode).map(|r| r.owner);
        cache.store(query, kind, mode, owner.clone());
        owner
    }

    /// Resolve and report which stage matched.
    pub fn resolve_detailed(
        &self,
        query: &str,
        kind: Option<IdentityKind>,
        mode: ResolveMode,
    ) -> Option<Resolution> {
        let normalized = normalize(query);
        if normalized.is_empty() {
            return None;
        }

        let resolution = self
            .exact(&normalized, kind)
            .or_else(|| self.by_stem(&normalized, kind))
            .or_else(|| self.by_alternation(&normalized, kind))
            .or_else(|| match mode {
                ResolveMode::Full => self.fuzzy(&normalized, kind),
                ResolveMode::NoFuzzy => None,
            });

        match &resolution {
            Some(r) => debug!(
                query = %query,
                owner = %r.owner,
                stage = ?r.stage,
                distance = r.distance,
                "Name resolved"
            ),
            None => debug!(query = %query, ?kind, ?mode, "Name not resolved"),
        }
        resolution
    }

    /// The ambiguous token that stages 1-3 stopped at for `query`, if any.
    ///
    /// Lets callers report an ambiguity instead of a plain miss.
    pub fn ambiguous_match(
        &self,
        query: &str,
        kind: Option<IdentityKind>,
    ) -> Option<(String, &'a IndexEntry)> {
        let normalized = normalize(query);
        if normalized.is_empty() {
            return None;
        }

        let index = self.index;
        let ambiguous = |token: &str| {
            index
                .get(token)
                .filter(|e| {
                    e.ambiguous && e.owners.iter().any(|o| kind.map_or(true, |k| o.kind == k))
                })
                .map(|e| (token.to_string(), e))
        };

        ambiguous(&normalized)
            .or_else(|| {
                index
                    .stem_candidates(&stem(&normalized))
                    .iter()
                    .find_map(|token| ambiguous(token.as_str()))
            })
            .or_else(|| {
                alternation_candidates(&normalized)
                    .iter()
                    .find_map(|token| ambiguous(token.as_str()))
            })
    }

    fn accept(&self, token: &str, kind: Option<IdentityKind>, stage: MatchStage) -> Option<Resolution> {
        let entry = self.index.get(token)?;
        entry.matches(kind).then(|| Resolution {
            owner: entry.owner.clone(),
            stage,
            token: token.to_string(),
            distance: 0,
        })
    }

    fn exact(&self, query: &str, kind: Option<IdentityKind>) -> Option<Resolution> {
        self.accept(query, kind, MatchStage::Exact)
    }

    fn by_stem(&self, query: &str, kind: Option<IdentityKind>) -> Option<Resolution> {
        self.index
            .stem_candidates(&stem(query))
            .iter()
            .find_map(|token| self.accept(token, kind, MatchStage::Stem))
    }

    fn by_alternation(&self, query: &str, kind: Option<IdentityKind>) -> Option<Resolution> {
        alternation_candidates(query)
            .iter()
            .find_map(|candidate| self.accept(candidate, kind, MatchStage::Alternation))
    }

    fn fuzzy(&self, query: &str, kind: Option<IdentityKind>) -> Option<Resolution> {
        let query_len = query.chars().count();
        let threshold = self.settings.fuzzy_threshold(query_len);

        let mut best: Option<(usize, &str, OwnerRef, usize)> = None;
        let mut consider = |token: &'a str, d: usize| -> bool {
            let Some(entry) = self.index.get(token) else {
                return false;
            };
            let Some(owner) = fuzzy_owner(entry, kind) else {
                return false;
            };
            let effective = d + usize::from(entry.ambiguous);
            let better = match &best {
                None => true,
                Some((best_eff, best_token, _, _)) => (effective, token) < (*best_eff, *best_token),
            };
            if better {
                best = Some((effective, token, owner.clone(), d));
            }
            effective <= 1
        };

        match self.index.bktree() {
            Some(tree) => {
                for m in tree.search(query, threshold) {
                    let Some((token, _)) = self.index.entries().get_key_value(m.key) else {
                        continue;
                    };
                    if consider(token.as_str(), m.distance) {
                        break;
                    }
                }
            }
            None => {
                for token in self.index.keys() {
                    if token.chars().count().abs_diff(query_len) > threshold {
                        continue;
                    }
                    let d = distance(query, token);
                    if d <= threshold && consider(token, d) {
                        break;
                    }
                }
            }
        }

        let (effective, token, owner, d) = best?;
        if effective > d {
            warn!(
                query = %query,
                token = %token,
                owner = %owner,
                "Fuzzy match landed on an ambiguous token"
            );
        }
        Some(Resolution {
            owner,
            stage: MatchStage::Fuzzy,
            token: token.to_string(),
            distance: d,
        })
    }
}

/// Owner a fuzzy hit on `entry` stands for under the kind filter.
fn fuzzy_owner(entry: &IndexEntry, kind: Option<IdentityKind>) -> Option<&OwnerRef> {
    let matches = |o: &&OwnerRef| kind.map_or(true, |k| o.kind == k);
    if entry.ambiguous {
        entry.owners.iter().find(matches)
    } else {
        Some(&entry.owner).filter(matches)
    }
}

/// Resolve `query` against `index` with default settings.
pub fn resolve(
    index: &NameIndex,
    query: &str,
    kind: Option<IdentityKind>,
    cache: Option<&mut ResolutionCache>,
) -> Option<OwnerRef> {
    NameResolver::new(index).resolve_with(query, kind, ResolveMode::Full, cache)
}
