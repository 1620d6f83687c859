//! Error types for the Campaign Codex.
//!
//! Most codex failures are recoverable: a name that does not resolve, a token
//! claimed by two identities, a containment loop or a date range nobody can
//! read. Those are collected in a [`Diagnostics`] sink and logged, never
//! raised. Only loading registry files from disk produces a hard error.

use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

/// Result type alias for codex operations.
pub type Result<T> = std::result::Result<T, CodexError>;

/// Error enum for codex operations.
#[derive(Error, Debug)]
pub enum CodexError {
    // =========================================================================
    // Resolution Errors
    // =========================================================================

    /// No resolution stage produced an owner for the reference.
    #[error("Unresolved reference '{name}' ({context})")]
    UnresolvedReference {
        /// The free-text name that failed to resolve
        name: String,
        /// Where the reference came from (event, tag, link)
        context: String,
    },

    /// Two or more distinct owners tie on the same token.
    #[error("Ambiguous reference '{token}' claimed by {owners:?}")]
    AmbiguousReference {
        /// The normalized token
        token: String,
        /// Every distinct owner that claimed it
        owners: Vec<String>,
    },

    // =========================================================================
    // Registry Errors
    // =========================================================================

    /// A containment chain revisited a place it had already passed through.
    #[error("Containment cycle detected: {}", cycle_path.join(" -> "))]
    CycleDetected {
        /// Places that form the cycle, first place repeated at the end
        cycle_path: Vec<String>,
    },

    /// A validity suffix could not be parsed; the value is treated as always active.
    #[error("Malformed validity range '({raw})' on '{identity}': {reason}")]
    MalformedValidityRange {
        /// Identity the tag line belongs to
        identity: String,
        /// Raw text between the parentheses
        raw: String,
        /// Why parsing failed
        reason: String,
    },

    /// A section header that does not name a known identity kind.
    #[error("Unknown registry section '{title}'")]
    UnknownSection {
        /// The header text
        title: String,
    },

    // =========================================================================
    // I/O Errors
    // =========================================================================

    /// Failed to read a registry file.
    #[error("Failed to read registry file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize identities.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CodexError {
    /// Create an UnresolvedReference error.
    pub fn unresolved(name: impl Into<String>, context: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            name: name.into(),
            context: context.into(),
        }
    }

    /// Create a MalformedValidityRange error.
    pub fn malformed_range(
        identity: impl Into<String>,
        raw: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedValidityRange {
            identity: identity.into(),
            raw: raw.into(),
            reason: reason.into(),
        }
    }

    /// Create a ReadFailed error.
    pub fn read_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFailed {
            path: path.into(),
            source,
        }
    }

    /// Check if this error is recoverable (the codex continues with a fallback).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedReference { .. }
                | Self::AmbiguousReference { .. }
                | Self::CycleDetected { .. }
                | Self::MalformedValidityRange { .. }
                | Self::UnknownSection { .. }
        )
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Collector for recoverable problems found while parsing or merging.
///
/// Every reported entry is also emitted as a `tracing` warning, so callers that
/// only care about logs can ignore the collected values.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<CodexError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic and log it.
    pub fn report(&mut self, error: CodexError) {
        warn!(recoverable = error.is_recoverable(), "{}", error);
        self.entries.push(error);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CodexError> {
        self.entries.iter()
    }

    /// Number of containment cycles reported.
    pub fn cycle_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, CodexError::CycleDetected { .. }))
            .count()
    }

    /// Names that failed to resolve, in report order.
    pub fn unresolved_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                CodexError::UnresolvedReference { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Number of malformed validity ranges reported.
    pub fn malformed_range_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, CodexError::MalformedValidityRange { .. }))
            .count()
    }

    pub fn into_vec(self) -> Vec<CodexError> {
        self.entries
    }
}
