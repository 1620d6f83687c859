//! Hierarchical canonical identifiers for places.
//!
//! A place's identifier is the path of its containment chain, root first:
//!
//! ```text
//! Wieliczka  --in-->  Małopolska  --in-->  Polska
//!
//! place/Polska/Małopolska/Wieliczka
//! ```
//!
//! Only the first declared parent is followed. A parent that is not itself a
//! declared place still becomes the root segment. Every other kind gets the
//! flat `kind/name` identifier.
//!
//! Chains are walked with a visited set. A place on a containment cycle falls
//! back to its flat identifier, and the cycle is reported once no matter how
//! many places lead into it. Results are memoized per place.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::error::{CodexError, Diagnostics};
use super::identity::{flat_id, Identity, IdentityKind};

#[derive(Debug, Clone)]
struct PlaceNode {
    name: String,
    parent: Option<String>,
}

/// Memoizing canonical-id builder over a fixed set of places.
#[derive(Debug, Default)]
pub struct CanonicalNamer {
    /// Lowercase place name -> declared name and first parent.
    places: HashMap<String, PlaceNode>,
    /// Lowercase place name -> resolved identifier.
    memo: HashMap<String, String>,
}

impl CanonicalNamer {
    /// Collect every place and its first containment parent.
    pub fn new<'a, I>(identities: I) -> Self
    where
        I: IntoIterator<Item = &'a Identity>,
    {
        let places = identities
            .into_iter()
            .filter(|i| i.kind == IdentityKind::Place)
            .map(|i| {
                (
                    i.name.to_lowercase(),
                    PlaceNode {
                        name: i.name.clone(),
                        parent: i.contained_in.first().cloned(),
                    },
                )
            })
            .collect();

        Self {
            places,
            memo: HashMap::new(),
        }
    }

    /// Canonical identifier of a declared place.
    ///
    /// Unknown names get the flat identifier without being memoized.
    pub fn place_id(&mut self, name: &str, diagnostics: &mut Diagnostics) -> String {
        let key = name.to_lowercase();
        if let Some(id) = self.memo.get(&key) {
            return id.clone();
        }
        let Some(start) = self.places.get(&key) else {
            return flat_id(IdentityKind::Place, name);
        };

        // Names from the start upward, declared spelling where known.
        let mut chain: Vec<String> = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut current = start.name.clone();
        let mut root: Option<String> = None;

        let base = loop {
            let lower = current.to_lowercase();

            if !chain.is_empty() {
                if let Some(id) = self.memo.get(&lower) {
                    break id.clone();
                }
            }

            if visited.contains(&lower) {
                let cycle_start = chain
                    .iter()
                    .position(|n| n.to_lowercase() == lower)
                    .unwrap_or(0);
                let cycle_path: Vec<String> = chain[cycle_start..]
                    .iter()
                    .cloned()
                    .chain(std::iter::once(current.clone()))
                    .collect();
                diagnostics.report(CodexError::CycleDetected { cycle_path });

                for member in chain.drain(cycle_start..) {
                    self.memo
                        .insert(member.to_lowercase(), flat_id(IdentityKind::Place, &member));
                }
                break self
                    .memo
                    .get(&lower)
                    .cloned()
                    .unwrap_or_else(|| flat_id(IdentityKind::Place, &current));
            }

            visited.insert(lower.clone());
            chain.push(current.clone());

            let Some(parent) = self.places.get(&lower).and_then(|n| n.parent.clone()) else {
                break IdentityKind::Place.as_str().to_string();
            };
            match self.places.get(&parent.to_lowercase()) {
                Some(node) => current = node.name.clone(),
                None => {
                    debug!(
                        place = %current,
                        parent = %parent,
                        "Containment parent is not a declared place"
                    );
                    root = Some(parent);
                    break IdentityKind::Place.as_str().to_string();
                }
            }
        };

        let mut path = base;
        if let Some(root) = root {
            path = format!("{path}/{root}");
        }
        for member in chain.iter().rev() {
            path = format!("{path}/{member}");
            self.memo.insert(member.to_lowercase(), path.clone());
        }

        self.memo
            .get(&key)
            .cloned()
            .unwrap_or_else(|| flat_id(IdentityKind::Place, name))
    }

    /// Canonical identifier for any identity.
    pub fn canonical_id(&mut self, identity: &Identity, diagnostics: &mut Diagnostics) -> String {
        match identity.kind {
            IdentityKind::Place => self.place_id(&identity.name, diagnostics),
            kind => flat_id(kind, &identity.name),
        }
    }

    /// Fill in `canonical_id` on every identity.
    pub fn assign_all(&mut self, identities: &mut [Identity], diagnostics: &mut Diagnostics) {
        for identity in identities.iter_mut() {
            identity.canonical_id = self.canonical_id(identity, diagnostics);
        }
    }
}
