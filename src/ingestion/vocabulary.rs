//! Extraction Vocabulary
//!
//! Anchors, labels and window bounds used by the heuristic extractors.
//! Everything that describes how the rulebook is laid out lives here as
//! data, so each extraction family can be exercised with a synthetic
//! vocabulary in isolation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::core::text::casefold;

/// Bounds of the windowed searches, in lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanWindows {
    /// Lookback from a talent or gear anchor to its name.
    pub name_lookback: usize,
    /// Lookahead from a talent anchor to its description.
    pub description_lookahead: usize,
    /// Lookback from an assignment header to its name.
    pub assignment_lookback: usize,
    /// Lookahead from an assignment header for labeled sub-fields.
    pub assignment_lookahead: usize,
    /// Maximum continuation lines absorbed into one sub-field.
    pub continuation: usize,
    /// Lookahead from a spell name for its attributes.
    pub spell_lookahead: usize,
}

impl Default for ScanWindows {
    fn default() -> Self {
        Self {
            name_lookback: 5,
            description_lookahead: 5,
            assignment_lookback: 9,
            assignment_lookahead: 29,
            continuation: 4,
            spell_lookahead: 40,
        }
    }
}

/// Injected extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionVocabulary {
    /// Upper-case lines that are section headers or captions, never names.
    pub noise_labels: Vec<String>,
    /// Token introducing a talent's requirement.
    pub requirement_marker: String,
    /// Requisition and difficulty tokens that anchor gear.
    pub requisition_marker: String,
    pub difficulty_marker: String,
    /// The three attribute column names of an assignment header, in order.
    pub attribute_header: Vec<String>,
    /// Lines containing these tokens are skipped when resolving an
    /// assignment name.
    pub assignment_skip_tokens: Vec<String>,
    /// Heading of the spell summary listing and the heading that ends it.
    pub spell_listing_heading: String,
    pub spell_listing_end: String,
    /// Keywords identifying a spell school heading.
    pub spell_school_keywords: Vec<String>,
    pub weapon_table_heading: String,
    /// Regex matching the armour table header row.
    pub armour_table_header: String,
    /// First name after the armour table; ends the table.
    pub armour_table_end: String,
    pub windows: ScanWindows,
}

impl Default for ExtractionVocabulary {
    fn default() -> Self {
        let strings = |values: &[&str]| values.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            noise_labels: strings(&[
                "SKILL LIST",
                "SKILLS",
                "FOCUS",
                "TRAINING",
                "TALENTS",
                "REQUIREMENTS",
                "COMMON SPELLS",
                "SPELLS SUMMARY",
                "SPELLS",
                "THE LADDER",
                "ASSIGNMENT",
                "WEAPON TABLE",
                "WEAPONS AND ARMOUR",
                "BODY ARMOUR",
                "RANGED WEAPONS",
                "MELEE WEAPONS",
                "DAMAGE",
                "ARMOUR",
                "TRAITS",
                "RANGE",
            ]),
            requirement_marker: "REQUIREMENTS:".to_string(),
            requisition_marker: "REQUISITION".to_string(),
            difficulty_marker: "DN".to_string(),
            attribute_header: strings(&["Body", "Mind", "Spirit"]),
            assignment_skip_tokens: strings(&["DEPARTMENT"]),
            spell_listing_heading: "SPELLS SUMMARY".to_string(),
            spell_listing_end: "COMMON SPELLS".to_string(),
            spell_school_keywords: strings(&[
                "PROTECTION",
                "CONTROL",
                "DIVINATION",
                "ENFORCEMENT",
                "PERCEPTION",
                "DEFENCE",
                "DEFENSE",
            ]),
            weapon_table_heading: "WEAPON TABLE".to_string(),
            armour_table_header: r"TYPE\s+REQ\.\s+PREREQ\.\s+ARMOUR".to_string(),
            armour_table_end: "DISGUISED PISTOL".to_string(),
            windows: ScanWindows::default(),
        }
    }
}

impl ExtractionVocabulary {
    /// Compiled case-insensitive noise set.
    pub fn noise_set(&self) -> NoiseSet {
        NoiseSet(self.noise_labels.iter().map(|l| casefold(l)).collect())
    }
}

/// Case-insensitive membership test for noise labels.
#[derive(Debug, Clone, Default)]
pub struct NoiseSet(HashSet<String>);

impl NoiseSet {
    pub fn contains(&self, line: &str) -> bool {
        self.0.contains(&casefold(line))
    }
}
