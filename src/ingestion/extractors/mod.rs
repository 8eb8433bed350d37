//! Heuristic Field Extractor
//!
//! Best-effort extraction of provisional records from the line corpus.
//! Each content family has its own anchor-and-window algorithm in a
//! submodule; all of them share the vocabulary, the noise set and the
//! name formatter held by [`HeuristicExtractor`].
//!
//! An anchor whose name cannot be resolved is an extraction miss: it is
//! logged at debug level and skipped, never an error.

mod assignments;
mod gear;
mod spells;
mod tables;
mod talents;

use std::collections::HashSet;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::corpus::LineCorpus;
use super::vocabulary::{ExtractionVocabulary, NoiseSet};
use crate::core::casing::NameFormatter;
use crate::core::errors::{PipelineError, Result};
use crate::core::model::{EntityRecord, EntityType};
use crate::core::text::{casefold, is_upper_line};

/// Compiled patterns derived from the vocabulary.
#[derive(Debug, Clone)]
struct Patterns {
    attribute_header: Regex,
    armour_header: Regex,
}

impl Patterns {
    fn compile(vocab: &ExtractionVocabulary) -> Result<Self> {
        let header = vocab
            .attribute_header
            .iter()
            .map(|label| regex::escape(label))
            .collect::<Vec<_>>()
            .join(r"\s+");
        let attribute_header = Regex::new(&header).map_err(|e| PipelineError::pattern(&header, e))?;
        let armour_header = Regex::new(&vocab.armour_table_header)
            .map_err(|e| PipelineError::pattern(&vocab.armour_table_header, e))?;
        Ok(Self {
            attribute_header,
            armour_header,
        })
    }
}

/// Extractor configured with an injected vocabulary.
#[derive(Debug, Clone)]
pub struct HeuristicExtractor {
    vocab: ExtractionVocabulary,
    noise: NoiseSet,
    names: NameFormatter,
    patterns: Patterns,
}

/// Provisional records per content family.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub talents: Vec<EntityRecord>,
    pub assignments: Vec<EntityRecord>,
    pub spells: Vec<EntityRecord>,
    pub weapons: Vec<EntityRecord>,
    pub armour: Vec<EntityRecord>,
    pub gear: Vec<EntityRecord>,
}

impl Extraction {
    /// Families with their entity type, in output order.
    pub fn families(&self) -> [(EntityType, &[EntityRecord]); 6] {
        [
            (EntityType::Talent, self.talents.as_slice()),
            (EntityType::Assignment, self.assignments.as_slice()),
            (EntityType::Spell, self.spells.as_slice()),
            (EntityType::Weapon, self.weapons.as_slice()),
            (EntityType::Armour, self.armour.as_slice()),
            (EntityType::Gear, self.gear.as_slice()),
        ]
    }

    pub fn total(&self) -> usize {
        self.families().iter().map(|(_, records)| records.len()).sum()
    }
}

impl HeuristicExtractor {
    /// Build an extractor. Fails only when a configured pattern is not a
    /// valid regex.
    pub fn new(vocab: ExtractionVocabulary, names: NameFormatter) -> Result<Self> {
        let patterns = Patterns::compile(&vocab)?;
        Ok(Self {
            noise: vocab.noise_set(),
            vocab,
            names,
            patterns,
        })
    }

    /// Run every family over the corpus.
    pub fn extract(&self, corpus: &LineCorpus) -> Extraction {
        let talents = self.talents(corpus);
        let assignments = self.assignments(corpus);
        let spells = self.spells(corpus);
        let weapons = self.weapons(corpus);
        let armour = self.armour(corpus);

        // Table rows also carry requisition markers; they are not gear.
        let tabled: HashSet<String> = weapons
            .iter()
            .chain(armour.iter())
            .map(|r| casefold(&r.name))
            .collect();
        let gear = self.gear(corpus, &tabled);

        let extraction = Extraction {
            talents,
            assignments,
            spells,
            weapons,
            armour,
            gear,
        };
        info!(
            lines = corpus.len(),
            talents = extraction.talents.len(),
            assignments = extraction.assignments.len(),
            spells = extraction.spells.len(),
            weapons = extraction.weapons.len(),
            armour = extraction.armour.len(),
            gear = extraction.gear.len(),
            "Extraction complete"
        );
        extraction
    }

    /// Upper-case line that is not a known section label.
    fn is_name_line(&self, line: &str) -> bool {
        is_upper_line(line) && !self.noise.contains(line)
    }

    /// Line carrying both the requisition and the difficulty marker.
    fn is_requisition_line(&self, line: &str) -> bool {
        line.contains(&self.vocab.requisition_marker) && line.contains(&self.vocab.difficulty_marker)
    }

    fn record(&self, entity_type: EntityType, raw_name: &str, attributes: Map<String, Value>) -> EntityRecord {
        EntityRecord::new(entity_type, self.names.display_name(raw_name)).with_attributes(attributes)
    }
}

/// Keep the first record per case-folded name.
fn first_seen(records: Vec<EntityRecord>) -> Vec<EntityRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| {
            let fresh = seen.insert(casefold(&record.name));
            if !fresh {
                debug!(entity_type = %record.entity_type, name = %record.name, "Discarding repeated extraction");
            }
            fresh
        })
        .collect()
}
