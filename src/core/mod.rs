pub mod logging;

// Name resolution and temporal identity registry
pub mod codex;
