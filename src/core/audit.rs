//! Quality Audit Module
//!
//! Non-fatal checks over normalized collections. Findings are reported as
//! warnings and never stop a build; fatal cross-reference problems belong
//! to the validator.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::model::{EntityRecord, EntityType};
use super::normalize::{Normalizer, ATTRIBUTE_KEYS};
use super::text::casefold;

// ============================================================================
// Types
// ============================================================================

/// A suspicious but tolerated condition in a content file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Finding {
    /// The same name appears more than once in one file; later copies are
    /// dropped by deduplication.
    DuplicateName { file: String, name: String, count: usize },
    EmptyDamage { file: String, name: String },
    ZeroProtection { file: String, name: String },
    /// A skill's authored attribute was not body, mind or spirit.
    CoercedAttribute {
        file: String,
        name: String,
        given: String,
        used: String,
    },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateName { file, name, count } => {
                write!(f, "{file}: '{name}' appears {count} times")
            }
            Self::EmptyDamage { file, name } => write!(f, "{file}: weapon '{name}' has no damage"),
            Self::ZeroProtection { file, name } => {
                write!(f, "{file}: armour '{name}' has zero protection")
            }
            Self::CoercedAttribute {
                file,
                name,
                given,
                used,
            } => write!(f, "{file}: skill '{name}' attribute '{given}' replaced with '{used}'"),
        }
    }
}

// ============================================================================
// Checks
// ============================================================================

/// Audit one content file.
///
/// `raw` is the parsed input before normalization (used to detect coerced
/// values); `normalized` is the normalized collection before deduplication.
pub fn audit_collection(
    file: &str,
    raw: &[EntityRecord],
    normalized: &[EntityRecord],
    normalizer: &Normalizer,
) -> Vec<Finding> {
    let mut findings = duplicate_names(file, normalized);

    for record in normalized {
        match record.entity_type {
            EntityType::Weapon if record.attr_str("damage").trim().is_empty() => {
                findings.push(Finding::EmptyDamage {
                    file: file.to_string(),
                    name: record.name.clone(),
                });
            }
            EntityType::Armour
                if record.attributes.get("protection").and_then(Value::as_i64).unwrap_or(0) == 0 =>
            {
                findings.push(Finding::ZeroProtection {
                    file: file.to_string(),
                    name: record.name.clone(),
                });
            }
            _ => {}
        }
    }

    for record in raw.iter().filter(|r| r.entity_type == EntityType::Skill) {
        let Some(given) = record.attributes.get("attribute").and_then(Value::as_str) else {
            continue;
        };
        if given.trim().is_empty() || ATTRIBUTE_KEYS.contains(&casefold(given).as_str()) {
            continue;
        }
        let used = normalizer.skill_attribute(&record.name).unwrap_or("mind");
        findings.push(Finding::CoercedAttribute {
            file: file.to_string(),
            name: record.name.clone(),
            given: given.to_string(),
            used: used.to_string(),
        });
    }

    findings
}

fn duplicate_names(file: &str, records: &[EntityRecord]) -> Vec<Finding> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (position, record) in records.iter().enumerate() {
        counts.entry(casefold(&record.name)).or_insert((position, 0)).1 += 1;
    }

    let mut repeated: Vec<(usize, usize)> = counts.into_values().filter(|(_, n)| *n > 1).collect();
    repeated.sort_unstable();
    repeated
        .into_iter()
        .map(|(position, count)| Finding::DuplicateName {
            file: file.to_string(),
            name: records[position].name.clone(),
            count,
        })
        .collect()
}

/// Emit findings as warnings.
pub fn log_findings(findings: &[Finding]) {
    for finding in findings {
        warn!(%finding, "Quality audit");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn with(entity_type: EntityType, name: &str, attrs: Value) -> EntityRecord {
        EntityRecord::new(entity_type, name).with_attributes(attrs.as_object().cloned().unwrap())
    }

    #[test]
    fn test_duplicate_names_in_first_seen_order() {
        let records = vec![
            EntityRecord::new(EntityType::Gear, "Rope"),
            EntityRecord::new(EntityType::Gear, "Torch"),
            EntityRecord::new(EntityType::Gear, "torch"),
            EntityRecord::new(EntityType::Gear, "ROPE"),
            EntityRecord::new(EntityType::Gear, "Rope"),
        ];
        let findings = duplicate_names("gear.json", &records);
        assert_eq!(
            findings,
            vec![
                Finding::DuplicateName {
                    file: "gear.json".into(),
                    name: "Rope".into(),
                    count: 3
                },
                Finding::DuplicateName {
                    file: "gear.json".into(),
                    name: "Torch".into(),
                    count: 2
                },
            ]
        );
    }

    #[test]
    fn test_weapon_and_armour_checks() {
        let normalized = vec![
            with(EntityType::Weapon, "Stick", json!({"damage": ""})),
            with(EntityType::Weapon, "Knife", json!({"damage": "1d6"})),
            with(EntityType::Armour, "Coat", json!({"protection": 0})),
            with(EntityType::Armour, "Vest", json!({"protection": 2})),
        ];
        let findings = audit_collection("mixed.json", &[], &normalized, &Normalizer::default());
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].to_string(), "mixed.json: weapon 'Stick' has no damage");
        assert_eq!(findings[1].to_string(), "mixed.json: armour 'Coat' has zero protection");
    }

    #[test]
    fn test_coerced_skill_attribute() {
        let raw = vec![
            with(EntityType::Skill, "Athletics", json!({"attribute": "strength"})),
            with(EntityType::Skill, "Occult", json!({"attribute": "Spirit"})),
            with(EntityType::Skill, "Unlisted", json!({"attribute": "luck"})),
            with(EntityType::Skill, "Bare", json!({})),
        ];
        let findings = audit_collection("skills.json", &raw, &[], &Normalizer::default());
        assert_eq!(findings.len(), 2);
        assert_eq!(
            findings[0],
            Finding::CoercedAttribute {
                file: "skills.json".into(),
                name: "Athletics".into(),
                given: "strength".into(),
                used: "body".into(),
            }
        );
        assert!(findings[1].to_string().ends_with("replaced with 'mind'"));
    }
}
