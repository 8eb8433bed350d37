//! Core pipeline components.
//!
//! # Modules
//!
//! - `model` - Entity record envelope and entity types
//! - `text` - Lexical helpers shared by extraction, normalization and validation
//! - `casing` - Display name casing rules
//! - `normalize` - Per-type field normalization and derived fields
//! - `validate` - Cross-reference validation of assignments
//! - `identity` - Content-addressed record ids
//! - `merge` - Prioritized first-writer-wins merge
//! - `pack_writer` - One-record-per-line pack output
//! - `stage_store` - Raw / normalized / reviewed tiers
//! - `audit` - Non-fatal quality findings
//! - `loadout` - Gear synthesized from assignment equipment
//! - `pipeline` - Command-level orchestration
//! - `logging` - Tracing setup and console output

pub mod audit;
pub mod casing;
pub mod errors;
pub mod file_utils;
pub mod identity;
pub mod loadout;
pub mod logging;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod pack_writer;
pub mod pipeline;
pub mod stage_store;
pub mod text;
pub mod validate;

pub use errors::{ConfigError, PipelineError, Result};
pub use model::{EntityRecord, EntityType};
pub use pipeline::{BuildReport, Pipeline, StageOptions};
