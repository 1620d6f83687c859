/// Campaign Codex - identity resolution for TTRPG campaign records
///
/// Resolves free-text references to people, characters, places and
/// factions into canonical identities, and keeps each identity's
/// attributes as dated histories merged from several sources.

pub mod config;
pub mod core;

#[cfg(test)]
mod tests;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
