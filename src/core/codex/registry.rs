//! Identity registry: override files -> identities.
//!
//! # Format
//!
//! ```text
//! ## Places                     <- section names the kind
//! * Wieliczka                   <- identity declaration
//!   - @in: Małopolska           <- non-temporal tag
//!   - @status: Open (2021:)     <- scoped tag
//! ```
//!
//! Level-one headings are document titles and are skipped. Any other heading
//! that does not name a kind is reported and its items ignored.
//!
//! Several files may declare the same identity. Their histories are
//! concatenated in load order; nothing is overwritten.
//!
//! After every file is added, [`Registry::finalize`] links characters to
//! their players, assigns canonical identifiers and computes current state.

use std::collections::HashMap;
use std::path::Path;

use chrono::{Local, NaiveDate};
use tracing::{debug, info};

use crate::config::CodexConfig;

use super::canonical::CanonicalNamer;
use super::document::{Document, OutlineItem};
use super::error::{CodexError, Diagnostics, Result};
use super::identity::{Identity, IdentityKind};
use super::temporal::{ScopedValue, ValidityRange};

/// Parsed identities from one or more registry files.
#[derive(Debug, Default)]
pub struct Registry {
    identities: Vec<Identity>,
    /// (kind, lowercase name) -> position in `identities`.
    by_name: HashMap<(IdentityKind, String), usize>,
    diagnostics: Diagnostics,
    reference_date: Option<NaiveDate>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Date used for current state. Defaults to today.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| Local::now().date_naive())
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Load the files listed in configuration, with its reference date.
    pub fn from_config(config: &CodexConfig) -> Result<Self> {
        let mut registry = Self::new();
        registry.reference_date = config.registry.reference_date;
        registry.load_files(&config.registry.files)?;
        Ok(registry)
    }

    /// Read and parse registry files in order.
    ///
    /// Stops at the first file that cannot be read.
    pub fn load_files<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<()> {
        for path in paths {
            let path = path.as_ref();
            let text = std::fs::read_to_string(path)
                .map_err(|e| CodexError::read_failed(path, e))?;
            self.add_source(path.display().to_string(), &text);
        }
        Ok(())
    }

    /// Parse one registry file held in memory.
    pub fn add_source(&mut self, source: impl Into<String>, markdown: &str) {
        let document = Document::parse(source, markdown);
        self.add_document(&document);
    }

    /// Add every identity declared in an outline.
    pub fn add_document(&mut self, document: &Document) {
        let before = self.identities.len();
        let mut declarations = 0usize;

        if !document.preamble.is_empty() {
            debug!(
                source = %document.source,
                items = document.preamble.len(),
                "Ignoring items outside any section"
            );
        }

        for section in &document.sections {
            if section.level <= 1 {
                continue;
            }
            let Some(kind) = IdentityKind::from_label(&section.title) else {
                self.diagnostics.report(CodexError::UnknownSection {
                    title: section.title.clone(),
                });
                continue;
            };

            for item in &section.items {
                if let Some(identity) = self.parse_declaration(kind, item, &document.source) {
                    declarations += 1;
                    self.upsert(identity);
                }
            }
        }

        info!(
            source = %document.source,
            declarations,
            new_identities = self.identities.len() - before,
            "Registry source loaded"
        );
    }

    fn parse_declaration(
        &mut self,
        kind: IdentityKind,
        item: &OutlineItem,
        source: &str,
    ) -> Option<Identity> {
        let name = item.text.trim();
        if name.is_empty() || name.starts_with('@') {
            debug!(source = %source, text = %name, "Skipping item that is not a declaration");
            return None;
        }

        let mut identity = Identity::new(kind, name);
        identity.sources.push(source.to_string());

        for child in &item.children {
            self.apply_tag_line(&mut identity, &child.text);
        }
        Some(identity)
    }

    fn apply_tag_line(&mut self, identity: &mut Identity, line: &str) {
        let Some(rest) = line.trim().strip_prefix('@') else {
            debug!(identity = %identity.name, line = %line, "Ignoring line without a tag");
            return;
        };
        let Some((tag, value)) = rest.split_once(':') else {
            debug!(identity = %identity.name, line = %line, "Ignoring tag without a value");
            return;
        };
        let tag = tag.trim();
        if tag.is_empty() || value.trim().is_empty() {
            debug!(identity = %identity.name, line = %line, "Ignoring empty tag line");
            return;
        }

        match ScopedValue::parse(value) {
            ScopedValue::Unscoped(value) => identity.apply_tag(tag, value, ValidityRange::always()),
            ScopedValue::Scoped(value, range) => identity.apply_tag(tag, value, range),
            ScopedValue::Malformed { value, raw, reason } => {
                self.diagnostics.report(CodexError::malformed_range(
                    identity.name.as_str(),
                    raw,
                    reason,
                ));
                identity.apply_tag(tag, value, ValidityRange::always());
            }
        }
    }

    fn upsert(&mut self, identity: Identity) {
        let key = (identity.kind, identity.name.to_lowercase());
        match self.by_name.get(&key) {
            Some(&position) => self.identities[position].absorb(identity),
            None => {
                self.by_name.insert(key, self.identities.len());
                self.identities.push(identity);
            }
        }
    }

    // ========================================================================
    // Finalization
    // ========================================================================

    /// Link characters, assign canonical ids, sort histories and compute
    /// current state. Call once after every source is loaded.
    pub fn finalize(&mut self) {
        self.link_characters();

        let mut namer = CanonicalNamer::new(&self.identities);
        namer.assign_all(&mut self.identities, &mut self.diagnostics);

        let date = self.reference_date();
        for identity in &mut self.identities {
            identity.histories.sort_all();
            identity.recompute_current(date);
        }

        info!(
            identities = self.identities.len(),
            diagnostics = self.diagnostics.len(),
            reference_date = %date,
            "Registry finalized"
        );
    }

    /// Attach each character's name to the person named by its `@player` tag.
    ///
    /// The tag may name the person by alias; it is rewritten to the person's
    /// primary name so index ownership checks see one spelling.
    fn link_characters(&mut self) {
        let mut links: Vec<(usize, usize)> = Vec::new();

        for (position, identity) in self.identities.iter().enumerate() {
            if identity.kind != IdentityKind::Character {
                continue;
            }
            let Some(player) = identity.player.as_deref() else {
                continue;
            };
            match self.person_position(player) {
                Some(person) => links.push((position, person)),
                None => self.diagnostics.report(CodexError::unresolved(
                    player,
                    format!("@player of {}", identity.name),
                )),
            }
        }

        for (character, person) in links {
            let person_name = self.identities[person].name.clone();
            let character_name = self.identities[character].name.clone();
            self.identities[character].player = Some(person_name);

            let person = &mut self.identities[person];
            if !person.characters.contains(&character_name) {
                person.characters.push(character_name);
            }
        }
    }

    /// Person by primary name or any recorded alias.
    fn person_position(&self, name: &str) -> Option<usize> {
        if let Some(&position) = self
            .by_name
            .get(&(IdentityKind::Person, name.to_lowercase()))
        {
            return Some(position);
        }
        let lower = name.to_lowercase();
        self.identities.iter().position(|i| {
            i.kind == IdentityKind::Person
                && i.histories.alias.values().any(|a| a.to_lowercase() == lower)
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn identities(&self) -> &[Identity] {
        &self.identities
    }

    pub fn into_identities(self) -> Vec<Identity> {
        self.identities
    }

    /// Identity by kind and primary name, case-insensitively.
    pub fn get(&self, kind: IdentityKind, name: &str) -> Option<&Identity> {
        self.by_name
            .get(&(kind, name.to_lowercase()))
            .map(|&position| &self.identities[position])
    }

    /// Identity of any kind by primary name. Kinds are tried in declaration order.
    pub fn find(&self, name: &str) -> Option<&Identity> {
        IdentityKind::ALL
            .iter()
            .find_map(|&kind| self.get(kind, name))
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Serialize every identity as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.identities)?)
    }
}
