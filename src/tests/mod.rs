//! Crate-level tests that span several codex modules.

mod common;
mod property;
