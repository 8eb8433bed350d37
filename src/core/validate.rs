//! Cross-Reference Validator
//!
//! Checks assignments against the skill and talent collections. Every
//! violation across every assignment is collected before anything is
//! reported, so one run surfaces the complete defect set.
//!
//! An assignment carries its skills twice: the declared `coreSkills` list
//! and the `coreSkill` + `skillOptions` sub-fields it was derived from.
//! Neither is treated as authoritative; a disagreement is a violation.

use std::collections::HashSet;
use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

use super::model::{EntityRecord, EntityType};
use super::text::{casefold, duplicate_values, split_csv, unique_casefold};

/// Minimum similarity for a "did you mean" hint.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// A single cross-reference defect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// The same skill appears twice in one skill set.
    DuplicateSkills { assignment: String, names: Vec<String> },
    /// The same talent appears twice in one talent set.
    DuplicateTalents { assignment: String, names: Vec<String> },
    /// Declared and derived skill sets are not set-equal.
    InconsistentSkills {
        assignment: String,
        declared: Vec<String>,
        derived: Vec<String>,
    },
    UnknownSkill {
        assignment: String,
        name: String,
        suggestion: Option<String>,
    },
    UnknownTalent {
        assignment: String,
        name: String,
        suggestion: Option<String>,
    },
}

impl Violation {
    pub fn assignment(&self) -> &str {
        match self {
            Self::DuplicateSkills { assignment, .. }
            | Self::DuplicateTalents { assignment, .. }
            | Self::InconsistentSkills { assignment, .. }
            | Self::UnknownSkill { assignment, .. }
            | Self::UnknownTalent { assignment, .. } => assignment,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateSkills { assignment, names } => {
                write!(f, "{assignment}: duplicate skills [{}]", names.join(", "))
            }
            Self::DuplicateTalents { assignment, names } => {
                write!(f, "{assignment}: duplicate talents [{}]", names.join(", "))
            }
            Self::InconsistentSkills {
                assignment,
                declared,
                derived,
            } => write!(
                f,
                "{assignment}: coreSkills [{}] does not match coreSkill + skillOptions [{}]",
                declared.join(", "),
                derived.join(", ")
            ),
            Self::UnknownSkill {
                assignment,
                name,
                suggestion,
            } => {
                write!(f, "{assignment}: unknown skill '{name}'")?;
                if let Some(s) = suggestion {
                    write!(f, " (did you mean '{s}'?)")?;
                }
                Ok(())
            }
            Self::UnknownTalent {
                assignment,
                name,
                suggestion,
            } => {
                write!(f, "{assignment}: unknown talent '{name}'")?;
                if let Some(s) = suggestion {
                    write!(f, " (did you mean '{s}'?)")?;
                }
                Ok(())
            }
        }
    }
}

/// Aggregate of every violation found in one validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("Assignment validation failed with {} violation(s):\n{}", .violations.len(), itemize(.violations))]
#[diagnostic(
    code(forge::validation),
    help("Fix the listed assignments or add the missing skills/talents, then rebuild")
)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

fn itemize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("  - {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl ValidationReport {
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// `Ok(())` when clean, otherwise the report itself as the error.
    pub fn into_result(self) -> Result<(), ValidationReport> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// Known names, case-insensitive, with the original spellings kept for hints.
struct NameIndex<'a> {
    folded: HashSet<String>,
    names: Vec<&'a str>,
}

impl<'a> NameIndex<'a> {
    fn new(records: &'a [EntityRecord], entity_type: EntityType) -> Self {
        let names: Vec<&str> = records
            .iter()
            .filter(|r| r.entity_type == entity_type)
            .map(|r| r.name.as_str())
            .collect();
        Self {
            folded: names.iter().map(|n| casefold(n)).collect(),
            names,
        }
    }

    fn contains(&self, name: &str) -> bool {
        self.folded.contains(&casefold(name))
    }

    fn suggest(&self, name: &str) -> Option<String> {
        let needle = casefold(name);
        self.names
            .iter()
            .map(|candidate| (strsim::jaro_winkler(&needle, &casefold(candidate)), *candidate))
            .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, candidate)| candidate.to_string())
    }
}

fn csv_attr(record: &EntityRecord, key: &str) -> Vec<String> {
    split_csv(record.attr_str(key))
}

/// Validate assignments against the skill and talent collections.
///
/// Returns every violation found; an empty list means the build may proceed.
pub fn validate(
    assignments: &[EntityRecord],
    skills: &[EntityRecord],
    talents: &[EntityRecord],
) -> Vec<Violation> {
    let skill_index = NameIndex::new(skills, EntityType::Skill);
    let talent_index = NameIndex::new(talents, EntityType::Talent);
    let mut violations = Vec::new();

    for record in assignments.iter().filter(|r| r.entity_type == EntityType::Assignment) {
        let assignment = record.name.clone();

        let mut derived = csv_attr(record, "coreSkill");
        derived.extend(csv_attr(record, "skillOptions"));
        let declared = csv_attr(record, "coreSkills");

        let duplicates: Vec<String> = unique_casefold(
            duplicate_values(&declared)
                .into_iter()
                .chain(duplicate_values(&derived)),
        );
        if !duplicates.is_empty() {
            violations.push(Violation::DuplicateSkills {
                assignment: assignment.clone(),
                names: duplicates,
            });
        }

        if !declared.is_empty() && !derived.is_empty() {
            let declared_set: HashSet<String> = declared.iter().map(|s| casefold(s)).collect();
            let derived_set: HashSet<String> = derived.iter().map(|s| casefold(s)).collect();
            if declared_set != derived_set {
                violations.push(Violation::InconsistentSkills {
                    assignment: assignment.clone(),
                    declared: declared.clone(),
                    derived: derived.clone(),
                });
            }
        }

        let referenced = if derived.is_empty() { &declared } else { &derived };
        for name in unique_casefold(referenced) {
            if !skill_index.contains(&name) {
                violations.push(Violation::UnknownSkill {
                    assignment: assignment.clone(),
                    suggestion: skill_index.suggest(&name),
                    name,
                });
            }
        }

        let mut talent_set = csv_attr(record, "coreTalent");
        talent_set.extend(csv_attr(record, "talents"));
        let duplicates = duplicate_values(&talent_set);
        if !duplicates.is_empty() {
            violations.push(Violation::DuplicateTalents {
                assignment: assignment.clone(),
                names: duplicates,
            });
        }
        for name in unique_casefold(&talent_set) {
            if !talent_index.contains(&name) {
                violations.push(Violation::UnknownTalent {
                    assignment: assignment.clone(),
                    suggestion: talent_index.suggest(&name),
                    name,
                });
            }
        }
    }

    violations
}

/// [`validate`] wrapped into a report.
pub fn validate_report(
    assignments: &[EntityRecord],
    skills: &[EntityRecord],
    talents: &[EntityRecord],
) -> ValidationReport {
    ValidationReport {
        violations: validate(assignments, skills, talents),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn named(entity_type: EntityType, names: &[&str]) -> Vec<EntityRecord> {
        names.iter().map(|n| EntityRecord::new(entity_type, *n)).collect()
    }

    fn assignment(system: serde_json::Value) -> EntityRecord {
        EntityRecord::new(EntityType::Assignment, "Analyst")
            .with_attributes(system.as_object().cloned().unwrap())
    }

    fn catalogs() -> (Vec<EntityRecord>, Vec<EntityRecord>) {
        (
            named(EntityType::Skill, &["Bureaucracy", "Computers", "Occult"]),
            named(EntityType::Talent, &["Lucky", "Brave"]),
        )
    }

    #[test]
    fn test_clean_assignment() {
        let (skills, talents) = catalogs();
        let a = assignment(json!({
            "coreSkill": "Bureaucracy",
            "skillOptions": "computers, Occult",
            "coreSkills": "Bureaucracy, Computers, Occult",
            "coreTalent": "Lucky",
            "talents": "Brave"
        }));
        assert!(validate(&[a], &skills, &talents).is_empty());
    }

    #[test]
    fn test_reports_every_violation_in_one_call() {
        let (skills, talents) = catalogs();
        let a = assignment(json!({
            "coreSkill": "Bureaucracy",
            "skillOptions": "Basket Weaving, Juggling",
            "coreTalent": "Lucky",
            "talents": "Lucky, Brave"
        }));
        let violations = validate(&[a], &skills, &talents);
        assert_eq!(violations.len(), 3);
        assert!(violations.contains(&Violation::UnknownSkill {
            assignment: "Analyst".into(),
            name: "Basket Weaving".into(),
            suggestion: None,
        }));
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::UnknownSkill { name, .. } if name == "Juggling")));
        assert!(violations.contains(&Violation::DuplicateTalents {
            assignment: "Analyst".into(),
            names: vec!["Lucky".into()],
        }));

        let report = ValidationReport { violations };
        let text = report.to_string();
        assert!(text.contains("3 violation(s)"));
        assert!(text.contains("Basket Weaving"));
        assert!(text.contains("Juggling"));
        assert!(text.contains("duplicate talents [Lucky]"));
    }

    #[test]
    fn test_inconsistent_skill_sets() {
        let (skills, talents) = catalogs();
        let a = assignment(json!({
            "coreSkill": "Bureaucracy",
            "skillOptions": "Computers",
            "coreSkills": "Bureaucracy, Occult"
        }));
        let violations = validate(&[a], &skills, &talents);
        assert_eq!(violations.len(), 1);
        assert!(matches!(violations[0], Violation::InconsistentSkills { .. }));
    }

    #[test]
    fn test_duplicate_skills_case_insensitive() {
        let (skills, talents) = catalogs();
        let a = assignment(json!({
            "coreSkill": "Occult",
            "skillOptions": "occult",
            "coreSkills": "Occult, occult"
        }));
        let violations = validate(&[a], &skills, &talents);
        assert_eq!(
            violations,
            vec![Violation::DuplicateSkills {
                assignment: "Analyst".into(),
                names: vec!["occult".into()],
            }]
        );
    }

    #[test]
    fn test_declared_only_skills_are_resolved() {
        let (skills, talents) = catalogs();
        let a = assignment(json!({"coreSkills": "Occult, Ocult"}));
        let violations = validate(&[a], &skills, &talents);
        assert_eq!(
            violations,
            vec![Violation::UnknownSkill {
                assignment: "Analyst".into(),
                name: "Ocult".into(),
                suggestion: Some("Occult".into()),
            }]
        );
        assert!(violations[0].to_string().contains("did you mean 'Occult'"));
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationReport { violations: vec![] }.into_result().is_ok());
        let (skills, talents) = catalogs();
        let report = validate_report(&[assignment(json!({"talents": "Sneaky"}))], &skills, &talents);
        assert_eq!(report.len(), 1);
        assert!(report.into_result().is_err());
    }
}
