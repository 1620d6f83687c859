//! Name index: token -> owning identity.
//!
//! Every name an identity answers to is indexed as a full-name token. Names
//! with several words also index each word as a weaker token, so "Kowalski"
//! finds "Jan Kowalski". Alongside the token map the index keeps a stem map for
//! declined lookups and a BK-tree for fuzzy search.
//!
//! # Collision policy
//!
//! When a token is claimed again:
//!
//! 1. Same owner: the better (lower) priority is kept.
//! 2. Different owner with a strictly better priority: the new claim replaces
//!    the entry.
//! 3. Different owner with a strictly worse priority: the entry is kept.
//! 4. Equal priority between a character and the person who plays it: the
//!    person keeps the token.
//! 5. Any other equal-priority clash marks the token ambiguous and records
//!    every distinct owner.
//!
//! Ambiguous tokens never resolve through exact, stem or alternation lookup.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::bktree::BkTree;
use super::identity::{IdentityKind, Named, OwnerRef};
use super::morphology::{normalize, stem};

/// Default minimum length (in characters) of an indexed word token.
pub const DEFAULT_MIN_TOKEN_LEN: usize = 3;

// ============================================================================
// Entries
// ============================================================================

/// Token strength. Lower is better.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Priority {
    /// Full name or alias
    FullName = 1,
    /// Single word of a multi-word name
    Word = 2,
}

impl Priority {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// One token claim, as offered to [`NameIndex::insert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaim {
    pub owner: OwnerRef,
    pub priority: Priority,
    /// Full name a word token was split from.
    pub source_name: Option<String>,
    /// For characters: the owning person's primary name.
    pub owning_person: Option<String>,
}

impl TokenClaim {
    pub fn full_name(owner: OwnerRef) -> Self {
        Self {
            owner,
            priority: Priority::FullName,
            source_name: None,
            owning_person: None,
        }
    }

    pub fn word(owner: OwnerRef, source_name: impl Into<String>) -> Self {
        Self {
            owner,
            priority: Priority::Word,
            source_name: Some(source_name.into()),
            owning_person: None,
        }
    }

    pub fn owned_by(mut self, person: Option<&str>) -> Self {
        self.owning_person = person.map(str::to_string);
        self
    }
}

/// What a token maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Owner of the token. For ambiguous entries, the first claimant.
    pub owner: OwnerRef,
    pub priority: Priority,
    pub ambiguous: bool,
    /// Every distinct owner, filled only when ambiguous.
    pub owners: Vec<OwnerRef>,
    /// Full name a word token was split from.
    pub source_name: Option<String>,
}

impl IndexEntry {
    fn from_claim(claim: TokenClaim) -> Self {
        Self {
            owner: claim.owner,
            priority: claim.priority,
            ambiguous: false,
            owners: Vec::new(),
            source_name: claim.source_name,
        }
    }

    /// Whether this entry may answer a lookup restricted to `kind`.
    pub fn matches(&self, kind: Option<IdentityKind>) -> bool {
        !self.ambiguous && kind.map_or(true, |k| self.owner.kind == k)
    }

    fn claimed_by(&self, owner: &OwnerRef) -> bool {
        if self.ambiguous {
            self.owners.contains(owner)
        } else {
            &self.owner == owner
        }
    }

    fn claimants(&self) -> &[OwnerRef] {
        if self.ambiguous {
            &self.owners
        } else {
            std::slice::from_ref(&self.owner)
        }
    }
}

/// Result of one [`NameIndex::insert`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// New token.
    Inserted,
    /// Same owner, better priority.
    Upgraded,
    /// Different owner with better priority took the token.
    Replaced,
    /// Different owner with worse priority; entry untouched.
    Kept,
    /// Character deferred to its owning person, or a person displaced its character.
    Deduplicated,
    /// Equal-priority clash between unrelated owners.
    MarkedAmbiguous,
    /// Nothing to do (repeat claim or empty token).
    Unchanged,
}

// ============================================================================
// NameIndex
// ============================================================================

/// Token map, stem map and BK-tree over every indexed name.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    entries: BTreeMap<String, IndexEntry>,
    /// Stem -> tokens sharing it, in first-insertion order.
    stems: HashMap<String, Vec<String>>,
    /// Character owner -> lowercase name of its person.
    owning_persons: HashMap<OwnerRef, String>,
    /// Any normalized person name or alias -> lowercase primary name.
    person_names: HashMap<String, String>,
    bktree: Option<BkTree>,
}

impl NameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a token. The token is normalized before use.
    pub fn insert(&mut self, token: &str, claim: TokenClaim) -> InsertOutcome {
        let token = normalize(token);
        if token.is_empty() {
            return InsertOutcome::Unchanged;
        }

        if let Some(person) = &claim.owning_person {
            let person = self
                .person_names
                .get(&normalize(person))
                .cloned()
                .unwrap_or_else(|| person.to_lowercase());
            self.owning_persons
                .entry(claim.owner.clone())
                .or_insert(person);
        }

        let Some(existing) = self.entries.get(&token) else {
            self.stems
                .entry(stem(&token))
                .or_default()
                .push(token.clone());
            self.entries.insert(token, IndexEntry::from_claim(claim));
            return InsertOutcome::Inserted;
        };

        // Rule 1: same owner.
        if existing.claimed_by(&claim.owner) {
            if claim.priority < existing.priority {
                self.entries.insert(token, IndexEntry::from_claim(claim));
                return InsertOutcome::Upgraded;
            }
            return InsertOutcome::Unchanged;
        }

        // Rules 2 and 3: different owner, different strength.
        if claim.priority < existing.priority {
            debug!(token = %token, owner = %claim.owner, "Token taken by stronger claim");
            self.entries.insert(token, IndexEntry::from_claim(claim));
            return InsertOutcome::Replaced;
        }
        if claim.priority > existing.priority {
            return InsertOutcome::Kept;
        }

        // Rule 4: a character defers to its person.
        if let Some(person) = self.owning_persons.get(&claim.owner) {
            let person_present = existing
                .claimants()
                .iter()
                .any(|o| o.kind == IdentityKind::Person && o.name.to_lowercase() == *person);
            if person_present {
                return InsertOutcome::Deduplicated;
            }
        }
        if claim.owner.kind == IdentityKind::Person {
            let person = claim.owner.name.to_lowercase();
            let displaced: Vec<OwnerRef> = existing
                .claimants()
                .iter()
                .filter(|o| self.owning_persons.get(*o) == Some(&person))
                .cloned()
                .collect();
            if !displaced.is_empty() {
                let mut remaining: Vec<OwnerRef> = existing
                    .claimants()
                    .iter()
                    .filter(|o| !displaced.contains(o))
                    .cloned()
                    .collect();
                remaining.push(claim.owner.clone());
                let entry = if remaining.len() == 1 {
                    IndexEntry::from_claim(claim)
                } else {
                    IndexEntry {
                        owner: remaining[0].clone(),
                        priority: claim.priority,
                        ambiguous: true,
                        owners: remaining,
                        source_name: existing.source_name.clone(),
                    }
                };
                self.entries.insert(token, entry);
                return InsertOutcome::Deduplicated;
            }
        }

        // Rule 5: unrelated owners at equal priority.
        let Some(entry) = self.entries.get_mut(&token) else {
            return InsertOutcome::Unchanged;
        };
        if !entry.ambiguous {
            entry.ambiguous = true;
            entry.owners = vec![entry.owner.clone()];
        }
        entry.owners.push(claim.owner);
        debug!(token = %token, owners = ?entry.owners, "Token marked ambiguous");
        InsertOutcome::MarkedAmbiguous
    }

    /// Index every name of one identity.
    pub fn insert_named<T: Named + ?Sized>(&mut self, item: &T, min_token_len: usize) {
        let owner = item.owner_ref();
        let person = item.owning_person();

        if owner.kind == IdentityKind::Person {
            let primary = owner.name.to_lowercase();
            for name in item.resolvable_names() {
                self.person_names
                    .entry(normalize(name))
                    .or_insert_with(|| primary.clone());
            }
        }

        for name in item.resolvable_names() {
            self.insert(name, TokenClaim::full_name(owner.clone()).owned_by(person));

            let normalized = normalize(name);
            if !normalized.contains(' ') {
                continue;
            }
            let words = normalized
                .split(' ')
                .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
                .filter(|w| w.chars().count() >= min_token_len);
            for word in words {
                self.insert(word, TokenClaim::word(owner.clone(), name).owned_by(person));
            }
        }
    }

    /// Rebuild the BK-tree from the current keys. No tree when there are no keys.
    pub fn rebuild_bktree(&mut self) {
        self.bktree = if self.entries.is_empty() {
            None
        } else {
            Some(BkTree::from_keys(self.entries.keys()))
        };
    }

    /// Entry for an already-normalized token.
    pub fn get(&self, token: &str) -> Option<&IndexEntry> {
        self.entries.get(token)
    }

    /// Entry for free text, normalized first.
    pub fn lookup(&self, text: &str) -> Option<&IndexEntry> {
        self.entries.get(&normalize(text))
    }

    /// Tokens whose stem is `stem`, in first-insertion order.
    pub fn stem_candidates(&self, stem: &str) -> &[String] {
        self.stems.get(stem).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn entries(&self) -> &BTreeMap<String, IndexEntry> {
        &self.entries
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn bktree(&self) -> Option<&BkTree> {
        self.bktree.as_ref()
    }

    pub fn ambiguous_tokens(&self) -> impl Iterator<Item = (&str, &IndexEntry)> {
        self.entries
            .iter()
            .filter(|(_, e)| e.ambiguous)
            .map(|(k, e)| (k.as_str(), e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// IndexBuilder
// ============================================================================

/// Builds a [`NameIndex`] from a set of named identities.
#[derive(Debug, Clone, Copy)]
pub struct IndexBuilder {
    min_token_len: usize,
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self {
            min_token_len: DEFAULT_MIN_TOKEN_LEN,
        }
    }
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_token_len(mut self, min_token_len: usize) -> Self {
        self.min_token_len = min_token_len;
        self
    }

    /// Index every identity.
    ///
    /// Identities are ordered by kind then lowercase primary name first, so
    /// the result does not depend on input order and persons are indexed
    /// before their characters.
    pub fn build<T: Named>(&self, identities: &[T]) -> NameIndex {
        let mut ordered: Vec<&T> = identities.iter().collect();
        ordered.sort_by_cached_key(|i| (i.kind(), i.primary_name().to_lowercase()));

        let mut index = NameIndex::new();
        for identity in ordered {
            index.insert_named(identity, self.min_token_len);
        }
        index.rebuild_bktree();

        info!(
            identities = identities.len(),
            tokens = index.len(),
            ambiguous = index.ambiguous_tokens().count(),
            "Name index built"
        );
        index
    }
}

/// Build an index with default settings.
pub fn build_index<T: Named>(identities: &[T]) -> NameIndex {
    IndexBuilder::new().build(identities)
}
