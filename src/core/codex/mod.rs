//! Campaign Codex: name resolution and temporal identity registry.
//!
//! Session notes mention people, characters, places and factions by whatever
//! name comes to mind: mistyped, declined ("w Krakowie"), or by alias. The
//! codex maps those references back to canonical identities and keeps each
//! identity's attributes as dated histories merged from several sources.
//!
//! # Overview
//!
//! - **Registry**: [`Registry`] parses override files into [`Identity`]
//!   records with per-attribute [`History`] lists and canonical identifiers
//! - **Index**: [`IndexBuilder`] turns identities into a [`NameIndex`] of
//!   tokens, stems and a [`BkTree`]
//! - **Resolution**: [`NameResolver`] runs the exact, stem, alternation and
//!   fuzzy stages, optionally through a [`ResolutionCache`]
//! - **Merging**: [`merge_state`] folds dated [`ChangeEvent`]s into histories
//!
//! # Architecture
//!
//! ```text
//!   registry files
//!         |
//!         v
//!   +-------------+     +-------------+     +--------------+
//!   |  Registry   | --> | IndexBuilder| --> |  NameIndex   |
//!   +-------------+     +-------------+     +--------------+
//!         |                                        |
//!         | identities                             v
//!         |                                 +--------------+
//!         +-------------------------------> | NameResolver |
//!         |                                 +--------------+
//!         v                                        ^
//!   +-------------+        targets                 |
//!   | merge_state | -------------------------------+
//!   +-------------+
//!         |
//!         v
//!   enriched identities
//! ```
//!
//! # Usage Examples
//!
//! ```rust,ignore
//! use campaign_codex::core::codex::{
//!     build_index, merge_state, ChangeEvent, NameResolver, Registry, TagChange,
//! };
//!
//! let mut registry = Registry::new();
//! registry.load_files(&["campaign.md", "overrides.md"])?;
//! registry.finalize();
//!
//! let index = build_index(registry.identities());
//! let owner = NameResolver::new(&index).resolve("Krakowie", None);
//!
//! let event = ChangeEvent::new("Zordonem", date)
//!     .with_tag(TagChange::new("location", "Gdańsk"));
//! let (identities, report) = merge_state(registry.into_identities(), vec![event], None);
//! ```
//!
//! # Diagnostics
//!
//! Unresolved names, ambiguous tokens, containment cycles and malformed
//! validity ranges are never errors. They are collected in [`Diagnostics`]
//! and logged as warnings. Only reading files can fail.

// ============================================================================
// Module Declarations
// ============================================================================

pub mod bktree;
pub mod canonical;
pub mod distance;
pub mod document;
pub mod error;
pub mod identity;
pub mod index;
pub mod merge;
pub mod morphology;
pub mod registry;
pub mod resolver;
pub mod temporal;

// ============================================================================
// Re-exports: Error Types
// ============================================================================

pub use error::{CodexError, Diagnostics, Result};

// ============================================================================
// Re-exports: Core Types
// ============================================================================

pub use identity::{
    flat_id,
    Attribute,
    CurrentState,
    Histories,
    Identity,
    IdentityKind,
    Named,
    OwnerRef,
    TagRoute,
};
pub use temporal::{History, HistoryEntry, ScopedValue, ValidityRange};

// ============================================================================
// Re-exports: Matching
// ============================================================================

pub use bktree::{BkMatch, BkTree};
pub use distance::distance;
pub use index::{
    build_index,
    IndexBuilder,
    IndexEntry,
    InsertOutcome,
    NameIndex,
    Priority,
    TokenClaim,
};
pub use morphology::{alternation_candidates, normalize, stem};
pub use resolver::{
    resolve,
    CacheLookup,
    CacheStats,
    MatchStage,
    NameResolver,
    Resolution,
    ResolutionCache,
    ResolveMode,
    ResolverSettings,
};

// ============================================================================
// Re-exports: Registry and Merging
// ============================================================================

pub use canonical::CanonicalNamer;
pub use document::{Document, OutlineItem, Section};
pub use merge::{
    merge_state,
    merge_state_with,
    ChangeEvent,
    MergeReport,
    StateMerger,
    TagChange,
};
pub use registry::Registry;
