//! Identity data model.
//!
//! An [`Identity`] is one named thing in the campaign record: a player, one of
//! their characters, an NPC, a faction, a place or an item. Everything that
//! can change over time lives in a [`History`]; the [`CurrentState`] snapshot
//! is derived from those histories for a reference date.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::morphology::normalize;
use super::temporal::{History, HistoryEntry, ValidityRange};

// ============================================================================
// IdentityKind
// ============================================================================

/// Closed set of identity kinds.
///
/// Declaration order is the indexing order: persons are indexed before their
/// characters.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
    /// A real person at the table (player or game master)
    Person,
    /// A character played by a person
    Character,
    /// Non-player character
    Npc,
    /// Faction, guild or other organization
    Faction,
    /// Place (region, city, building, room)
    Place,
    /// Item or artifact
    Item,
}

impl IdentityKind {
    pub const ALL: [IdentityKind; 6] = [
        IdentityKind::Person,
        IdentityKind::Character,
        IdentityKind::Npc,
        IdentityKind::Faction,
        IdentityKind::Place,
        IdentityKind::Item,
    ];

    /// Lowercase label used in canonical identifiers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Character => "character",
            Self::Npc => "npc",
            Self::Faction => "faction",
            Self::Place => "place",
            Self::Item => "item",
        }
    }

    /// Map a registry section header to a kind.
    ///
    /// Accepts English singular/plural labels and the Polish labels used in
    /// campaign notes.
    pub fn from_label(label: &str) -> Option<Self> {
        match normalize(label).as_str() {
            "person" | "people" | "persons" | "players" | "player" | "gracze" | "osoby" => {
                Some(Self::Person)
            }
            "character" | "characters" | "pc" | "pcs" | "postać" | "postacie" => {
                Some(Self::Character)
            }
            "npc" | "npcs" | "bn" | "bohaterowie niezależni" => Some(Self::Npc),
            "faction" | "factions" | "group" | "groups" | "frakcja" | "frakcje" => {
                Some(Self::Faction)
            }
            "place" | "places" | "location" | "locations" | "miejsce" | "miejsca" => {
                Some(Self::Place)
            }
            "item" | "items" | "przedmiot" | "przedmioty" => Some(Self::Item),
            _ => None,
        }
    }
}

impl fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdentityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| format!("unknown identity kind '{s}'"))
    }
}

// ============================================================================
// OwnerRef
// ============================================================================

/// Reference to an identity by kind and primary name.
///
/// This is what the name index stores and what the resolver returns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerRef {
    pub kind: IdentityKind,
    pub name: String,
}

impl OwnerRef {
    pub fn new(kind: IdentityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

// ============================================================================
// Named capability
// ============================================================================

/// Anything the name index can ingest.
pub trait Named {
    /// Primary display name. Unique within a kind.
    fn primary_name(&self) -> &str;

    fn kind(&self) -> IdentityKind;

    /// Every name the identity answers to, primary name included.
    fn resolvable_names(&self) -> Vec<&str>;

    /// For characters: the person who plays them.
    fn owning_person(&self) -> Option<&str> {
        None
    }

    fn owner_ref(&self) -> OwnerRef {
        OwnerRef::new(self.kind(), self.primary_name())
    }
}

impl<T: Named + ?Sized> Named for &T {
    fn primary_name(&self) -> &str {
        (**self).primary_name()
    }

    fn kind(&self) -> IdentityKind {
        (**self).kind()
    }

    fn resolvable_names(&self) -> Vec<&str> {
        (**self).resolvable_names()
    }

    fn owning_person(&self) -> Option<&str> {
        (**self).owning_person()
    }
}

// ============================================================================
// Tags and attributes
// ============================================================================

/// Temporal attributes with a dedicated history.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Attribute {
    Alias,
    Location,
    Status,
    Group,
    Owner,
    Quantity,
    Access,
    Kind,
    /// Any other tag, stored under its own name.
    Other(String),
}

impl Attribute {
    /// List attributes collect every covering entry; the rest are scalars.
    pub fn is_list(&self) -> bool {
        matches!(self, Self::Alias | Self::Group | Self::Access)
    }
}

/// Where a `@tag` line goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagRoute {
    /// Scoped history entry.
    Temporal(Attribute),
    /// Parent place (non-temporal).
    Containment,
    /// Generic synonym, resolvable but not an alias (non-temporal).
    Synonym,
    /// Character to person link (non-temporal).
    Player,
}

impl TagRoute {
    /// Route a tag name (without the `@`), case-insensitively.
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim().trim_start_matches('@').to_lowercase();
        match tag.as_str() {
            "alias" | "aka" | "pseudonim" => Self::Temporal(Attribute::Alias),
            "location" | "loc" | "where" | "lokacja" => Self::Temporal(Attribute::Location),
            "status" => Self::Temporal(Attribute::Status),
            "group" | "faction" | "member" | "frakcja" => Self::Temporal(Attribute::Group),
            "owner" | "owned_by" | "właściciel" => Self::Temporal(Attribute::Owner),
            "quantity" | "qty" | "count" | "ilość" => Self::Temporal(Attribute::Quantity),
            "access" | "link" | "door" | "przejście" => Self::Temporal(Attribute::Access),
            "kind" | "type" | "typ" => Self::Temporal(Attribute::Kind),
            "in" | "parent" | "within" | "part_of" => Self::Containment,
            "synonym" | "generic" | "synonim" => Self::Synonym,
            "player" | "played_by" | "gracz" => Self::Player,
            _ => Self::Temporal(Attribute::Other(tag)),
        }
    }
}

// ============================================================================
// Histories
// ============================================================================

/// Every temporal attribute of an identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histories {
    pub alias: History,
    pub location: History,
    pub status: History,
    pub group: History,
    pub owner: History,
    pub quantity: History,
    pub access: History,
    pub kind: History,
    /// Unrecognized tags, keyed by lowercase tag name.
    pub extra: BTreeMap<String, History>,
}

impl Histories {
    pub fn get(&self, attribute: &Attribute) -> Option<&History> {
        match attribute {
            Attribute::Alias => Some(&self.alias),
            Attribute::Location => Some(&self.location),
            Attribute::Status => Some(&self.status),
            Attribute::Group => Some(&self.group),
            Attribute::Owner => Some(&self.owner),
            Attribute::Quantity => Some(&self.quantity),
            Attribute::Access => Some(&self.access),
            Attribute::Kind => Some(&self.kind),
            Attribute::Other(tag) => self.extra.get(tag),
        }
    }

    pub fn get_mut(&mut self, attribute: &Attribute) -> &mut History {
        match attribute {
            Attribute::Alias => &mut self.alias,
            Attribute::Location => &mut self.location,
            Attribute::Status => &mut self.status,
            Attribute::Group => &mut self.group,
            Attribute::Owner => &mut self.owner,
            Attribute::Quantity => &mut self.quantity,
            Attribute::Access => &mut self.access,
            Attribute::Kind => &mut self.kind,
            Attribute::Other(tag) => self.extra.entry(tag.clone()).or_default(),
        }
    }

    /// Concatenate another identity's histories into this one.
    pub fn absorb(&mut self, other: Histories) {
        self.alias.extend(other.alias);
        self.location.extend(other.location);
        self.status.extend(other.status);
        self.group.extend(other.group);
        self.owner.extend(other.owner);
        self.quantity.extend(other.quantity);
        self.access.extend(other.access);
        self.kind.extend(other.kind);
        for (tag, history) in other.extra {
            self.extra.entry(tag).or_default().extend(history);
        }
    }

    /// Re-sort every history by start date.
    pub fn sort_all(&mut self) {
        for history in self.iter_mut() {
            history.sort();
        }
    }

    /// Total number of entries across all histories.
    pub fn entry_count(&self) -> usize {
        self.iter().map(History::len).sum()
    }

    fn iter(&self) -> impl Iterator<Item = &History> {
        [
            &self.alias,
            &self.location,
            &self.status,
            &self.group,
            &self.owner,
            &self.quantity,
            &self.access,
            &self.kind,
        ]
        .into_iter()
        .chain(self.extra.values())
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut History> {
        [
            &mut self.alias,
            &mut self.location,
            &mut self.status,
            &mut self.group,
            &mut self.owner,
            &mut self.quantity,
            &mut self.access,
            &mut self.kind,
        ]
        .into_iter()
        .chain(self.extra.values_mut())
    }
}

// ============================================================================
// CurrentState
// ============================================================================

/// Attribute values in effect on a reference date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentState {
    pub as_of: Option<NaiveDate>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub owner: Option<String>,
    pub quantity: Option<String>,
    /// Kind override in effect, if any.
    pub kind: Option<IdentityKind>,
    pub aliases: Vec<String>,
    pub groups: Vec<String>,
    pub access: Vec<String>,
    /// Scalar value of each unrecognized tag.
    pub extra: BTreeMap<String, String>,
}

// ============================================================================
// Identity
// ============================================================================

/// A named campaign identity with its attribute histories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub kind: IdentityKind,
    /// Hierarchical identifier, filled in when the registry is finalized.
    pub canonical_id: String,
    /// Generic synonyms (non-temporal).
    pub synonyms: Vec<String>,
    /// Parent places, in declaration order (non-temporal).
    pub contained_in: Vec<String>,
    /// For characters: the person who plays them.
    pub player: Option<String>,
    /// For persons: names of the characters they play.
    pub characters: Vec<String>,
    pub histories: Histories,
    pub current: CurrentState,
    /// Registry sources that declared this identity, in load order.
    pub sources: Vec<String>,
}

impl Identity {
    pub fn new(kind: IdentityKind, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            canonical_id: flat_id(kind, &name),
            name,
            kind,
            synonyms: Vec::new(),
            contained_in: Vec::new(),
            player: None,
            characters: Vec::new(),
            histories: Histories::default(),
            current: CurrentState::default(),
            sources: Vec::new(),
        }
    }

    /// Builder-style scoped attribute.
    pub fn with_tag(mut self, tag: &str, value: impl Into<String>, range: ValidityRange) -> Self {
        self.apply_tag(tag, value, range);
        self
    }

    /// Route one tag value to its history or non-temporal list.
    ///
    /// Non-temporal tags ignore `range`.
    pub fn apply_tag(&mut self, tag: &str, value: impl Into<String>, range: ValidityRange) {
        let value = value.into();
        match TagRoute::from_tag(tag) {
            TagRoute::Temporal(attribute) => {
                self.histories
                    .get_mut(&attribute)
                    .push(HistoryEntry::new(value, range));
            }
            TagRoute::Containment => push_unique(&mut self.contained_in, value),
            TagRoute::Synonym => push_unique(&mut self.synonyms, value),
            TagRoute::Player => self.player = Some(value),
        }
    }

    /// Fold another declaration of the same identity into this one.
    ///
    /// Histories are concatenated; nothing already recorded is replaced.
    pub fn absorb(&mut self, other: Identity) {
        self.histories.absorb(other.histories);
        for synonym in other.synonyms {
            push_unique(&mut self.synonyms, synonym);
        }
        for parent in other.contained_in {
            push_unique(&mut self.contained_in, parent);
        }
        for character in other.characters {
            push_unique(&mut self.characters, character);
        }
        if self.player.is_none() {
            self.player = other.player;
        }
        for source in other.sources {
            push_unique(&mut self.sources, source);
        }
    }

    /// Kind in effect at the last recomputation, honoring `@kind` overrides.
    pub fn effective_kind(&self) -> IdentityKind {
        self.current.kind.unwrap_or(self.kind)
    }

    /// Snapshot of every attribute at `date`.
    pub fn state_at(&self, date: NaiveDate) -> CurrentState {
        let scalar = |history: &History| history.current_at(date).map(|e| e.value.clone());
        let list = |history: &History| {
            history
                .all_at(date)
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<_>>()
        };

        let h = &self.histories;
        CurrentState {
            as_of: Some(date),
            location: scalar(&h.location),
            status: scalar(&h.status),
            owner: scalar(&h.owner),
            quantity: scalar(&h.quantity),
            kind: h
                .kind
                .current_at(date)
                .and_then(|e| e.value.parse::<IdentityKind>().ok()),
            aliases: list(&h.alias),
            groups: list(&h.group),
            access: list(&h.access),
            extra: h
                .extra
                .iter()
                .filter_map(|(tag, history)| {
                    history
                        .current_at(date)
                        .map(|e| (tag.clone(), e.value.clone()))
                })
                .collect(),
        }
    }

    /// Recompute [`Identity::current`] for `date`.
    pub fn recompute_current(&mut self, date: NaiveDate) {
        self.current = self.state_at(date);
    }

    /// Value of any tag at `date`. List attributes return their first value.
    pub fn value_at(&self, tag: &str, date: NaiveDate) -> Option<&str> {
        let TagRoute::Temporal(attribute) = TagRoute::from_tag(tag) else {
            return None;
        };
        let history = self.histories.get(&attribute)?;
        if attribute.is_list() {
            history.all_at(date).into_iter().next()
        } else {
            history.current_at(date).map(|e| e.value.as_str())
        }
    }
}

impl Named for Identity {
    fn primary_name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> IdentityKind {
        self.kind
    }

    /// Primary name, every alias ever recorded, synonyms, and for persons the
    /// names of their characters.
    fn resolvable_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = vec![self.name.as_str()];
        let extra = self
            .histories
            .alias
            .values()
            .chain(self.synonyms.iter().map(String::as_str))
            .chain(self.characters.iter().map(String::as_str));

        for name in extra {
            let normalized = normalize(name);
            if !normalized.is_empty() && !names.iter().any(|n| normalize(n) == normalized) {
                names.push(name);
            }
        }
        names
    }

    fn owning_person(&self) -> Option<&str> {
        match self.kind {
            IdentityKind::Character => self.player.as_deref(),
            _ => None,
        }
    }
}

/// Flat `kind/name` identifier.
pub fn flat_id(kind: IdentityKind, name: &str) -> String {
    format!("{}/{}", kind.as_str(), name)
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.iter().any(|v| v.eq_ignore_ascii_case(&value)) {
        list.push(value);
    }
}
