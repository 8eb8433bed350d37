//! Ingestion module for rulebook text.
//!
//! # Modules
//!
//! - `corpus` - Line corpus and bounded windowed search
//! - `vocabulary` - Configurable markers, noise labels and window sizes
//! - `extractors` - Per-family heuristic extraction of provisional records

pub mod corpus;
pub mod extractors;
pub mod vocabulary;

pub use corpus::{Direction, LineCorpus, Scan};
pub use extractors::{Extraction, HeuristicExtractor};
pub use vocabulary::{ExtractionVocabulary, ScanWindows};
