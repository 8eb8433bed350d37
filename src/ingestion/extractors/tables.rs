//! Weapon and armour table extraction.
//!
//! Both tables are fixed-width listings where one logical row may wrap
//! over several physical lines, so each is read by a small state machine
//! instead of a single windowed search.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map};
use tracing::debug;

use super::{first_seen, HeuristicExtractor};
use crate::core::model::{EntityRecord, EntityType};
use crate::core::text::{has_alpha, is_upper_line, split_columns};
use crate::ingestion::corpus::LineCorpus;

/// Requisition rating such as `2:1`; marks an armour data row.
static RATING: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+:\d").expect("Invalid rating regex"));

static TRAILING_DIGIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d)\s*$").expect("Invalid trailing digit regex"));

/// Longest cell accepted as a fragment of a wrapped armour name.
const MAX_NAME_FRAGMENT: usize = 20;

/// Header cells that must never be taken as a name fragment.
const ARMOUR_HEADER_CELLS: [&str; 2] = ["REQ.", "ARMOUR"];

// ============================================================================
// Weapons
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct WeaponRow {
    name: String,
    requisition: String,
    damage: String,
    traits: String,
}

impl WeaponRow {
    fn from_columns(cols: &[&str]) -> Self {
        Self {
            name: cols[0].to_string(),
            requisition: cols[1].to_string(),
            damage: cols[2].to_string(),
            traits: cols[3..].join(" "),
        }
    }

    fn absorb(&mut self, line: &str) {
        let target = if line.starts_with('(') {
            &mut self.name
        } else {
            &mut self.traits
        };
        if !target.is_empty() {
            target.push(' ');
        }
        target.push_str(line);
    }
}

enum WeaponState {
    SeekingRow,
    SeekingContinuation(WeaponRow),
    RowComplete,
}

// ============================================================================
// Armour
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ArmourRow {
    name: String,
    requisition: String,
    prerequisite: String,
    protection: String,
}

impl ArmourRow {
    /// Parse a data row. The name cell is absent when the whole name sat on
    /// the lines above the row.
    fn from_line(line: &str, pending: &[String]) -> Self {
        let cols = split_columns(line);
        let cell = |i: usize| cols.get(i).map(|c| c.to_string()).unwrap_or_default();

        let (name_cell, requisition, prerequisite, protection) = match cols.first() {
            Some(first) if RATING.is_match(first) && first.starts_with(|c: char| c.is_ascii_digit()) => {
                (String::new(), cell(0), cell(1), cell(2))
            }
            Some(_) => (cell(0), cell(1), cell(2), cell(3)),
            None => Default::default(),
        };

        let protection = if protection.is_empty() {
            TRAILING_DIGIT
                .captures(line)
                .map(|c| c[1].to_string())
                .unwrap_or_default()
        } else {
            protection
        };

        let mut name = pending.join(" ");
        if !name_cell.is_empty() {
            if !name.is_empty() {
                name.push(' ');
            }
            name.push_str(&name_cell);
        }

        Self {
            name,
            requisition,
            prerequisite,
            protection,
        }
    }
}

enum ArmourState {
    SeekingRow { pending: Vec<String> },
    SeekingContinuation(ArmourRow),
    RowComplete,
}

impl HeuristicExtractor {
    /// Rows of the weapon table.
    ///
    /// A line with at least three columns starts a row. A following line
    /// opening with `(` extends the name; any other line extends the
    /// traits. The first blank line after a row ends the table.
    pub fn weapons(&self, corpus: &LineCorpus) -> Vec<EntityRecord> {
        let heading = self.vocab.weapon_table_heading.to_uppercase();
        let Some(start) = corpus.position_from(0, |line| line.to_uppercase() == heading) else {
            return Vec::new();
        };

        let mut rows = Vec::new();
        let mut state = WeaponState::SeekingRow;

        for index in start + 1..corpus.len() {
            let line = corpus.trimmed(index);
            let cols = split_columns(line);
            let is_header = is_upper_line(line) && !line.chars().any(|c| c.is_ascii_digit());

            state = match state {
                WeaponState::SeekingRow if line.is_empty() || is_header || cols.len() < 3 => WeaponState::SeekingRow,
                WeaponState::SeekingRow => WeaponState::SeekingContinuation(WeaponRow::from_columns(&cols)),
                WeaponState::SeekingContinuation(row) if line.is_empty() => {
                    rows.push(row);
                    WeaponState::RowComplete
                }
                WeaponState::SeekingContinuation(row) if cols.len() >= 3 => {
                    rows.push(row);
                    WeaponState::SeekingContinuation(WeaponRow::from_columns(&cols))
                }
                WeaponState::SeekingContinuation(mut row) => {
                    row.absorb(line);
                    WeaponState::SeekingContinuation(row)
                }
                WeaponState::RowComplete => break,
            };
            if matches!(state, WeaponState::RowComplete) {
                break;
            }
        }
        if let WeaponState::SeekingContinuation(row) = state {
            rows.push(row);
        }
        debug!(start = start + 1, rows = rows.len(), "Weapon table read");

        let weapons = rows
            .into_iter()
            .map(|row| {
                let mut attributes = Map::new();
                attributes.insert("damage".into(), json!(row.damage.replace(' ', "")));
                attributes.insert("range".into(), json!(""));
                attributes.insert("traits".into(), json!(row.traits));
                attributes.insert("equipped".into(), json!(false));
                attributes.insert(
                    "description".into(),
                    json!(format!("Requisition DN: {}", row.requisition)),
                );
                self.record(EntityType::Weapon, &row.name, attributes)
            })
            .collect();
        first_seen(weapons)
    }

    /// Rows of the armour table, read from the header row up to the
    /// configured end marker.
    ///
    /// Names may wrap: short text lines before a data row are collected as
    /// leading fragments, and one short digit-free line right after the
    /// row is taken as a trailing fragment.
    pub fn armour(&self, corpus: &LineCorpus) -> Vec<EntityRecord> {
        let Some(start) = corpus.position_from(0, |line| self.patterns.armour_header.is_match(line)) else {
            return Vec::new();
        };
        let end_marker = self.vocab.armour_table_end.to_uppercase();

        let mut rows: Vec<ArmourRow> = Vec::new();
        let mut state = ArmourState::SeekingRow { pending: Vec::new() };

        for index in start + 1..corpus.len() {
            let line = corpus.trimmed(index);
            if line.to_uppercase().contains(&end_marker) {
                break;
            }

            state = match state {
                ArmourState::SeekingContinuation(mut row) => {
                    if let Some(fragment) = name_fragment(line, &end_marker) {
                        if !row.name.is_empty() {
                            row.name.push(' ');
                        }
                        row.name.push_str(fragment);
                        rows.push(row);
                        ArmourState::RowComplete
                    } else {
                        rows.push(row);
                        self.armour_line(line, Vec::new())
                    }
                }
                ArmourState::SeekingRow { pending } => self.armour_line(line, pending),
                ArmourState::RowComplete => self.armour_line(line, Vec::new()),
            };
        }
        if let ArmourState::SeekingContinuation(row) = state {
            rows.push(row);
        }
        debug!(start = start + 1, rows = rows.len(), "Armour table read");

        let armour = rows
            .into_iter()
            .filter(|row| !row.name.trim().is_empty())
            .map(|row| {
                let mut attributes = Map::new();
                attributes.insert(
                    "protection".into(),
                    json!(row.protection.parse::<i64>().unwrap_or(0)),
                );
                attributes.insert("traits".into(), json!(row.prerequisite));
                attributes.insert("equipped".into(), json!(false));
                attributes.insert(
                    "description".into(),
                    json!(format!("Requisition DN: {}", row.requisition)),
                );
                self.record(EntityType::Armour, &row.name, attributes)
            })
            .collect();
        first_seen(armour)
    }

    /// Transition for a line read while no row is open.
    fn armour_line(&self, line: &str, mut pending: Vec<String>) -> ArmourState {
        if line.is_empty() {
            return ArmourState::SeekingRow { pending: Vec::new() };
        }
        if RATING.is_match(line) {
            return ArmourState::SeekingContinuation(ArmourRow::from_line(line, &pending));
        }
        if let Some(first) = split_columns(line).first() {
            if has_alpha(first) && first.chars().count() <= MAX_NAME_FRAGMENT {
                pending.push(first.to_string());
            }
        }
        ArmourState::SeekingRow { pending }
    }
}

/// First cell of a line that can continue a wrapped armour name.
fn name_fragment<'a>(line: &'a str, end_marker: &str) -> Option<&'a str> {
    let first = *split_columns(line).first()?;
    let usable = first.chars().count() <= MAX_NAME_FRAGMENT
        && !first.chars().any(|c| c.is_ascii_digit())
        && !ARMOUR_HEADER_CELLS.contains(&first)
        && !first.to_uppercase().contains(end_marker);
    usable.then_some(first)
}
