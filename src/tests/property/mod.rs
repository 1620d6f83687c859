//! Property-based tests for the Campaign Codex
//!
//! Property tests verify invariants that should hold for all inputs, rather
//! than testing specific cases.
//!
//! ## Running Property Tests
//!
//! ```sh
//! cargo test property --release
//! ```
//!
//! ## Test Modules
//!
//! - `distance_props`: Levenshtein distance
//!   - Agrees with an independent implementation
//!   - Identity, symmetry and triangle inequality
//!   - Bounded by the length difference and the longer length
//!
//! - `bktree_props`: BK-tree search
//!   - Returns exactly the brute-force key set for any threshold
//!   - Reported distances are exact
//!
//! - `morphology_props`: Normalization and stemming
//!   - Normalization is idempotent
//!   - Stems are prefixes of the normalized input and keep three characters
//!   - An inflected name and its bare stem resolve to the same owner
//!
//! - `index_props`: Name index construction
//!   - Rebuilding with repeated identities changes nothing
//!   - Input order does not change the index
//!   - Unambiguous full names resolve exactly to their owner
//!
//! - `history_props`: Attribute histories
//!   - Entries stay sorted by start, open starts first
//!   - The current value covers the date and has the latest start
//!
//! ## Configuration
//!
//! By default, proptest runs 256 cases per property. This can be configured
//! via the `PROPTEST_CASES` environment variable:
//!
//! ```sh
//! PROPTEST_CASES=1000 cargo test property --release
//! ```

mod bktree_props;
mod distance_props;
mod history_props;
mod index_props;
mod morphology_props;
