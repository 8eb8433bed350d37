//! Pipeline Error Types
//!
//! Fatal, run-level failures. Non-fatal conditions (extraction misses,
//! malformed records) never become errors; they are logged and skipped.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

use super::validate::ValidationReport;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug, Diagnostic)]
pub enum PipelineError {
    /// A required source file for a mandatory content type is absent.
    #[error("Missing required source file: {}", path.display())]
    #[diagnostic(
        code(forge::missing_artifact),
        help("Create the file or mark the content entry as non-mandatory")
    )]
    MissingArtifact { path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    #[diagnostic(code(forge::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    #[diagnostic(code(forge::write))]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}: {source}", path.display())]
    #[diagnostic(code(forge::json), help("Content files must hold a JSON array of records"))]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{} must contain a JSON array of records", path.display())]
    #[diagnostic(code(forge::not_a_collection))]
    NotACollection { path: PathBuf },

    #[error("Invalid extraction pattern '{pattern}': {source}")]
    #[diagnostic(code(forge::pattern), help("Check the [extraction] section of the config"))]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to serialize records: {0}")]
    #[diagnostic(code(forge::serialize))]
    Serialize(#[source] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationReport),
}

impl PipelineError {
    pub fn missing(path: impl AsRef<Path>) -> Self {
        Self::MissingArtifact {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn read(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn write(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn json(path: impl AsRef<Path>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn pattern(pattern: impl Into<String>, source: regex::Error) -> Self {
        Self::Pattern {
            pattern: pattern.into(),
            source,
        }
    }

    /// Validation failures are the only errors that carry an itemized report.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Configuration loading failures.
#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("Config file not found: {}", path.display())]
    #[diagnostic(code(forge::config::not_found))]
    NotFound { path: PathBuf },

    #[error("Failed to read config {}: {source}", path.display())]
    #[diagnostic(code(forge::config::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {}: {source}", path.display())]
    #[diagnostic(code(forge::config::parse), help("See compendium.toml.example for the expected layout"))]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config value '{key}': {reason}")]
    #[diagnostic(code(forge::config::invalid))]
    Invalid { key: String, reason: String },
}
