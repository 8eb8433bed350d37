//! Build Pipeline
//!
//! Orchestrates the command-level operations over a [`PipelineConfig`]:
//!
//! - `extract`: line corpus to raw per-family content files
//! - `stage`: canonical files through the raw / normalized / reviewed tiers
//! - `build`: canonical files to validated, deduplicated packs
//! - `status`: tier presence per content file
//!
//! Every stage reads its whole input before writing anything, and `build`
//! runs the cross-reference gate before the first pack is written.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::audit::{audit_collection, log_findings, Finding};
use super::errors::{PipelineError, Result};
use super::file_utils::{parse_json_array, read_bytes, write_json_pretty};
use super::identity::IdentityAssigner;
use super::loadout;
use super::merge::{dedupe, merge, MergeSource, Priority};
use super::model::{EntityRecord, EntityType};
use super::normalize::Normalizer;
use super::pack_writer::write_pack;
use super::stage_store::{FileStatus, StageReport, StageStore, Tier};
use super::validate::validate_report;
use crate::config::{ContentFile, PipelineConfig};
use crate::ingestion::{HeuristicExtractor, LineCorpus};

/// Item types in the merged pack, in merge order.
pub const MERGED_TYPES: [EntityType; 7] = [
    EntityType::Gear,
    EntityType::Weapon,
    EntityType::Armour,
    EntityType::Spell,
    EntityType::Talent,
    EntityType::Skill,
    EntityType::Assignment,
];

// ============================================================================
// Reports
// ============================================================================

/// One written pack file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackSummary {
    pub pack: String,
    pub path: PathBuf,
    pub records: usize,
}

#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub packs: Vec<PackSummary>,
    pub findings: Vec<Finding>,
    /// Records dropped as duplicates, within files and across the merge.
    pub discarded: usize,
    /// Optional content files that were absent.
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractReport {
    pub written: Vec<(String, usize)>,
    /// Files left untouched because they already existed.
    pub kept: Vec<String>,
}

/// Caller gates for the two overwriting stage operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct StageOptions {
    /// Replace existing reviewed snapshots.
    pub promote: bool,
    /// Copy reviewed snapshots over the canonical files.
    pub sync: bool,
}

/// A loaded, normalized content file.
#[derive(Debug, Clone)]
struct Collection {
    entry: ContentFile,
    records: Vec<EntityRecord>,
}

// ============================================================================
// Pipeline
// ============================================================================

#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    normalizer: Normalizer,
    ids: IdentityAssigner,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            normalizer: Normalizer::from_config(&config),
            ids: IdentityAssigner::with_length(config.output.id_length),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn stage_store(&self) -> StageStore {
        StageStore::new(self.config.stage_dir())
    }

    /// Canonical skill table as raw skill records.
    pub fn canonical_skills(&self) -> Vec<EntityRecord> {
        self.config
            .skills
            .iter()
            .map(|skill| {
                let mut record = EntityRecord::new(EntityType::Skill, skill.name.clone());
                record
                    .attributes
                    .insert("attribute".into(), json!(skill.attribute));
                record
            })
            .collect()
    }

    /// Read records from parsed JSON. Malformed entries are logged and
    /// skipped.
    pub fn parse_records(&self, path: &Path, values: &[Value], implied: EntityType) -> Vec<EntityRecord> {
        values
            .iter()
            .enumerate()
            .filter_map(|(index, value)| match EntityRecord::from_raw(value, Some(implied)) {
                Ok(record) => Some(record),
                Err(reason) => {
                    warn!(file = %path.display(), index, %reason, "Skipping malformed record");
                    None
                }
            })
            .collect()
    }

    /// Normalize a collection and backfill ids.
    pub fn prepare(&self, raw: &[EntityRecord]) -> Vec<EntityRecord> {
        let mut records = self.normalizer.normalize_collection(raw);
        self.ids.assign_all(&mut records);
        records
    }

    /// Raw records of a canonical content file, or `None` when an optional
    /// file is absent. A missing skills file falls back to the canonical
    /// table; a missing mandatory file is fatal.
    fn load_raw(&self, entry: &ContentFile) -> Result<Option<Vec<EntityRecord>>> {
        let path = self.config.canonical_path(&entry.file);
        if !path.is_file() {
            if entry.mandatory {
                return Err(PipelineError::missing(&path));
            }
            if entry.entity_type == EntityType::Skill {
                info!(file = %entry.file, "No skills file, using the canonical skill table");
                return Ok(Some(self.canonical_skills()));
            }
            debug!(file = %entry.file, "Optional content file absent");
            return Ok(None);
        }
        let bytes = read_bytes(&path)?;
        let values = parse_json_array(&path, &bytes)?;
        Ok(Some(self.parse_records(&path, &values, entry.entity_type)))
    }

    // ------------------------------------------------------------------------
    // build
    // ------------------------------------------------------------------------

    /// Validate the canonical content and write one pack per file plus the
    /// merged item pack. Nothing is written when validation fails.
    pub fn build(&self) -> Result<BuildReport> {
        let mut report = BuildReport::default();
        let mut collections = Vec::new();

        for entry in &self.config.content {
            let Some(raw) = self.load_raw(entry)? else {
                report.skipped.push(entry.file.clone());
                continue;
            };
            let normalized = self.prepare(&raw);
            report
                .findings
                .extend(audit_collection(&entry.file, &raw, &normalized, &self.normalizer));

            let outcome = dedupe(&normalized);
            report.discarded += outcome.discarded.len();
            collections.push(Collection {
                entry: entry.clone(),
                records: outcome.records,
            });
        }
        log_findings(&report.findings);

        let of_type = |entity_type: EntityType| -> Vec<EntityRecord> {
            collections
                .iter()
                .filter(|c| c.entry.entity_type == entity_type)
                .flat_map(|c| c.records.iter().cloned())
                .collect()
        };
        let assignments = of_type(EntityType::Assignment);
        let mut skills = of_type(EntityType::Skill);
        if skills.is_empty() {
            skills = self.prepare(&self.canonical_skills());
        }
        let talents = of_type(EntityType::Talent);

        validate_report(&assignments, &skills, &talents).into_result()?;
        info!(assignments = assignments.len(), "Cross-reference validation passed");

        let loadouts = loadout::synthesize(&assignments, &self.normalizer, &self.ids);

        for collection in &collections {
            let pack = collection.entry.pack_name();
            let path = self.config.pack_path(&pack);
            let records = write_pack(&path, &collection.records)?;
            report.packs.push(PackSummary { pack, path, records });
        }

        let by_type: HashMap<EntityType, Vec<EntityRecord>> = MERGED_TYPES
            .iter()
            .map(|t| (*t, of_type(*t)))
            .collect();
        let mut sources: Vec<MergeSource<'_>> = MERGED_TYPES
            .iter()
            .filter_map(|t| by_type.get(t).map(|records| MergeSource::new(t.as_str(), Priority::Curated, records)))
            .collect();
        sources.push(MergeSource::new("loadout", Priority::Generated, &loadouts));
        let merged = merge(&sources);
        report.discarded += merged.discarded.len();

        let pack = self.config.output.merged_pack.clone();
        let path = self.config.pack_path(&pack);
        let records = write_pack(&path, &merged.records)?;
        report.packs.push(PackSummary { pack, path, records });

        info!(packs = report.packs.len(), discarded = report.discarded, "Build complete");
        Ok(report)
    }

    // ------------------------------------------------------------------------
    // stage
    // ------------------------------------------------------------------------

    /// Stage canonical files through the tiers. An empty `files` list stages
    /// every content entry marked `staged`.
    ///
    /// The reviewed tier is written only on first staging or with
    /// `options.promote`; the canonical file is overwritten only with
    /// `options.sync`.
    pub fn stage(&self, files: &[String], options: StageOptions) -> Result<Vec<StageReport>> {
        for requested in files {
            if self.config.content_file(requested).is_none() {
                warn!(file = %requested, "Not a configured content file, ignoring");
            }
        }

        let store = self.stage_store();
        let mut reports = Vec::new();

        for entry in self
            .config
            .content
            .iter()
            .filter(|c| c.staged && (files.is_empty() || files.contains(&c.file)))
        {
            let canonical = self.config.canonical_path(&entry.file);
            if !canonical.is_file() {
                debug!(file = %entry.file, "Nothing to stage");
                continue;
            }

            let bytes = read_bytes(&canonical)?;
            let values = parse_json_array(&canonical, &bytes)?;
            let normalized = self.prepare(&self.parse_records(&canonical, &values, entry.entity_type));
            store.stage(&entry.file, &bytes, &normalized)?;

            let promoted = options.promote || !store.exists(Tier::Reviewed, &entry.file);
            let reviewed = if promoted {
                store.promote(&entry.file)?;
                normalized.len()
            } else {
                store.read(Tier::Reviewed, &entry.file)?.len()
            };

            if options.sync {
                store.sync(&entry.file, &canonical)?;
            }

            let report = StageReport {
                file: entry.file.clone(),
                raw: values.len(),
                normalized: normalized.len(),
                reviewed,
                promoted,
                synced: options.sync,
            };
            info!(%report, "Staged");
            reports.push(report);
        }

        Ok(reports)
    }

    // ------------------------------------------------------------------------
    // extract
    // ------------------------------------------------------------------------

    /// Run the heuristic extractor and write one raw content file per
    /// family, plus the skill table, into `out`. Existing files are kept
    /// unless `force` is set.
    pub fn extract_to(&self, corpus: &LineCorpus, out: &Path, force: bool) -> Result<ExtractReport> {
        let extractor = HeuristicExtractor::new(self.config.extraction.clone(), self.normalizer.names().clone())?;
        let extraction = extractor.extract(corpus);

        let skills = self.canonical_skills();
        let mut families: Vec<(EntityType, &[EntityRecord])> = vec![(EntityType::Skill, skills.as_slice())];
        families.extend(extraction.families());

        let mut report = ExtractReport::default();
        for (entity_type, records) in families {
            let file = self
                .config
                .content_for(entity_type)
                .map(|c| c.file.clone())
                .unwrap_or_else(|| format!("{}s.json", entity_type.as_str()));
            let path = out.join(&file);
            if path.exists() && !force {
                warn!(file = %path.display(), "Exists, not overwriting without --force");
                report.kept.push(file);
                continue;
            }
            write_json_pretty(&path, records)?;
            report.written.push((file, records.len()));
        }
        Ok(report)
    }

    // ------------------------------------------------------------------------
    // status
    // ------------------------------------------------------------------------

    /// Tier status for every configured content file, in config order,
    /// followed by any unconfigured files found in the store.
    pub fn status(&self) -> Vec<FileStatus> {
        let mut found: HashMap<String, FileStatus> = self
            .stage_store()
            .status()
            .into_iter()
            .map(|s| (s.file.clone(), s))
            .collect();

        let mut out: Vec<FileStatus> = self
            .config
            .content
            .iter()
            .map(|entry| {
                found.remove(&entry.file).unwrap_or_else(|| FileStatus {
                    file: entry.file.clone(),
                    ..FileStatus::default()
                })
            })
            .collect();
        let mut extra: Vec<FileStatus> = found.into_values().collect();
        extra.sort_by(|a, b| a.file.cmp(&b.file));
        out.extend(extra);
        out
    }
}
