//! Stage Store
//!
//! Three parallel tiers per content file under the stage root:
//!
//! ```text
//! <stage_dir>/raw/<file>          verbatim input bytes
//! <stage_dir>/normalized/<file>   schema-coerced records, pretty JSON
//! <stage_dir>/reviewed/<file>     human-approved snapshot
//! ```
//!
//! File presence is meaningful: a missing reviewed file means the content
//! has never been promoted. Every write replaces the whole file.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::errors::Result;
use super::file_utils::{copy_file, read_json_array, write_atomic, write_json_pretty};
use super::model::EntityRecord;

// ============================================================================
// Tiers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Raw,
    Normalized,
    Reviewed,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Raw, Tier::Normalized, Tier::Reviewed];

    pub fn dir_name(&self) -> &'static str {
        match self {
            Tier::Raw => "raw",
            Tier::Normalized => "normalized",
            Tier::Reviewed => "reviewed",
        }
    }

    fn from_dir_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.dir_name() == name)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

// ============================================================================
// Reports
// ============================================================================

/// Record counts after staging one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub file: String,
    pub raw: usize,
    pub normalized: usize,
    pub reviewed: usize,
    pub promoted: bool,
    pub synced: bool,
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "staged {}: raw={} normalized={} reviewed={}",
            self.file, self.raw, self.normalized, self.reviewed
        )?;
        if self.promoted {
            f.write_str(" (promoted)")?;
        }
        if self.synced {
            f.write_str(" (synced)")?;
        }
        Ok(())
    }
}

/// Which tiers hold a file and how many records each has. `None` means
/// the tier file is absent or unreadable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileStatus {
    pub file: String,
    pub tiers: BTreeMap<Tier, Option<usize>>,
}

impl FileStatus {
    pub fn count(&self, tier: Tier) -> Option<usize> {
        self.tiers.get(&tier).copied().flatten()
    }

    pub fn has(&self, tier: Tier) -> bool {
        self.tiers.contains_key(&tier)
    }
}

// ============================================================================
// Store
// ============================================================================

#[derive(Debug, Clone)]
pub struct StageStore {
    root: PathBuf,
}

impl StageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, tier: Tier, file: &str) -> PathBuf {
        self.root.join(tier.dir_name()).join(file)
    }

    pub fn exists(&self, tier: Tier, file: &str) -> bool {
        self.path(tier, file).is_file()
    }

    /// Records of a tier file as raw JSON values.
    pub fn read(&self, tier: Tier, file: &str) -> Result<Vec<serde_json::Value>> {
        read_json_array(&self.path(tier, file))
    }

    /// Write the raw tier verbatim and the normalized tier from `normalized`.
    pub fn stage(&self, file: &str, raw: &[u8], normalized: &[EntityRecord]) -> Result<()> {
        write_atomic(&self.path(Tier::Raw, file), raw)?;
        write_json_pretty(&self.path(Tier::Normalized, file), normalized)?;
        debug!(file, records = normalized.len(), "Wrote raw and normalized tiers");
        Ok(())
    }

    /// Replace the reviewed snapshot with the normalized one.
    pub fn promote(&self, file: &str) -> Result<()> {
        copy_file(&self.path(Tier::Normalized, file), &self.path(Tier::Reviewed, file))?;
        info!(file, "Promoted normalized tier to reviewed");
        Ok(())
    }

    /// Copy the reviewed snapshot out to the canonical input location.
    pub fn sync(&self, file: &str, canonical: &Path) -> Result<()> {
        copy_file(&self.path(Tier::Reviewed, file), canonical)?;
        info!(file, target = %canonical.display(), "Synced reviewed tier");
        Ok(())
    }

    /// Per-file tier presence and record counts, sorted by file name.
    pub fn status(&self) -> Vec<FileStatus> {
        let mut files: BTreeMap<String, FileStatus> = BTreeMap::new();

        for tier in Tier::ALL {
            let dir = self.root.join(tier.dir_name());
            for entry in WalkDir::new(&dir)
                .min_depth(1)
                .max_depth(1)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                let Some(name) = entry.file_name().to_str() else {
                    continue;
                };
                if !name.ends_with(".json") {
                    continue;
                }
                let count = read_json_array(entry.path()).ok().map(|records| records.len());
                let status = files.entry(name.to_string()).or_insert_with(|| FileStatus {
                    file: name.to_string(),
                    ..FileStatus::default()
                });
                if let Some(tier) = entry
                    .path()
                    .parent()
                    .and_then(|p| p.file_name())
                    .and_then(|n| n.to_str())
                    .and_then(Tier::from_dir_name)
                {
                    status.tiers.insert(tier, count);
                }
            }
        }

        files.into_values().collect()
    }
}
