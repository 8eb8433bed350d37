/// Compendium Forge - rulebook content pipeline
///
/// Library providing heuristic extraction of game content from a rulebook
/// text corpus, staged normalization with human review, cross-reference
/// validation, deterministic identity assignment and compendium pack output.

pub mod config;
pub mod core;
pub mod ingestion;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
