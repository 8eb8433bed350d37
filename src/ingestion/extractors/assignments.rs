//! Assignment extraction: attribute-header anchors with labeled sub-fields.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map};
use tracing::debug;

use super::{first_seen, HeuristicExtractor};
use crate::core::model::{EntityRecord, EntityType};
use crate::core::text::{casefold, clean_csv_list, has_alpha, is_upper_line, unique_casefold};
use crate::ingestion::corpus::{Direction, LineCorpus, Scan};

static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("Invalid number regex"));

static CORE_SKILL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Core Skill:\s*(.*)$").expect("Invalid core skill regex"));

static SKILLS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Skills\s*\((\d+)\s*XP\):\s*(.*)$").expect("Invalid skills regex"));

static CORE_TALENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Core Talent:\s*(.*)$").expect("Invalid core talent regex"));

/// `Talents (Choose 2): ...`; the count is optional so a garbled count
/// still yields the list.
static TALENTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Talents\s*\(Choose\s*(\d*)[^:]*\):\s*(.*)$").expect("Invalid talents regex")
});

static EQUIPMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Equipment:\s*(.*)$").expect("Invalid equipment regex"));

/// A recognized sub-field label and its inline value.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Label {
    CoreSkill(String),
    Skills { xp: u32, list: String },
    CoreTalent(String),
    Talents { choices: u32, list: String },
    Equipment(String),
}

impl Label {
    fn parse(line: &str) -> Option<Self> {
        let value = |caps: &regex::Captures<'_>, group: usize| {
            caps.get(group).map_or("", |m| m.as_str()).trim().to_string()
        };
        let count = |caps: &regex::Captures<'_>| caps.get(1).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);

        if let Some(caps) = CORE_SKILL.captures(line) {
            Some(Self::CoreSkill(value(&caps, 1)))
        } else if let Some(caps) = SKILLS.captures(line) {
            Some(Self::Skills {
                xp: count(&caps),
                list: value(&caps, 2),
            })
        } else if let Some(caps) = CORE_TALENT.captures(line) {
            Some(Self::CoreTalent(value(&caps, 1)))
        } else if let Some(caps) = TALENTS.captures(line) {
            Some(Self::Talents {
                choices: count(&caps),
                list: value(&caps, 2),
            })
        } else {
            EQUIPMENT.captures(line).map(|caps| Self::Equipment(value(&caps, 1)))
        }
    }
}

/// Raw sub-field text collected from the lookahead window.
#[derive(Debug, Default)]
struct AssignmentFields {
    core_skill: String,
    skills: String,
    skill_xp: u32,
    core_talent: String,
    talents: String,
    talent_choices: u32,
    equipment: String,
}

impl HeuristicExtractor {
    /// Assignments anchored on the attribute header followed by a line of
    /// exactly three numbers.
    pub fn assignments(&self, corpus: &LineCorpus) -> Vec<EntityRecord> {
        let windows = self.vocab.windows;
        let mut assignments = Vec::new();

        for (index, line) in corpus.iter() {
            if !self.patterns.attribute_header.is_match(line) {
                continue;
            }
            let numbers: Vec<i64> = NUMBER
                .find_iter(corpus.line(index + 1))
                .filter_map(|m| m.as_str().parse().ok())
                .collect();
            let &[body, mind, spirit] = numbers.as_slice() else {
                continue;
            };

            let name = corpus.search(index, Direction::Backward, windows.assignment_lookback, |_, candidate| {
                let upper = candidate.to_uppercase();
                if candidate.is_empty()
                    || self.vocab.assignment_skip_tokens.iter().any(|t| upper.contains(&t.to_uppercase()))
                    || (is_upper_line(candidate) && self.noise.contains(candidate))
                {
                    Scan::Skip
                } else if has_alpha(candidate) {
                    Scan::Found(candidate.to_string())
                } else {
                    Scan::Skip
                }
            });
            let Some(name) = name else {
                debug!(line = index + 1, "Attribute header without an assignment name");
                continue;
            };

            let fields = self.assignment_fields(corpus, index + 1);

            let core_list = clean_csv_list(&fields.core_skill);
            let core_skill = core_list.first().cloned().unwrap_or_default();
            let options: Vec<String> = clean_csv_list(&fields.skills)
                .into_iter()
                .filter(|s| casefold(s) != casefold(&core_skill))
                .collect();
            let core_skills = unique_casefold(core_list.iter().chain(options.iter()));

            let mut attributes = Map::new();
            attributes.insert(
                "attributes".into(),
                json!({"body": body, "mind": mind, "spirit": spirit}),
            );
            attributes.insert("coreSkill".into(), json!(core_skill));
            attributes.insert("skillOptions".into(), json!(options.join(", ")));
            attributes.insert("skillXP".into(), json!(fields.skill_xp));
            attributes.insert("talentChoices".into(), json!(fields.talent_choices));
            attributes.insert("coreSkills".into(), json!(core_skills.join(", ")));
            attributes.insert("coreTalent".into(), json!(fields.core_talent));
            attributes.insert(
                "talents".into(),
                json!(clean_csv_list(&fields.talents).join(", ")),
            );
            attributes.insert(
                "equipment".into(),
                json!(clean_csv_list(&fields.equipment).join(", ")),
            );
            attributes.insert("description".into(), json!(""));
            assignments.push(self.record(EntityType::Assignment, &name, attributes));
        }

        first_seen(assignments)
    }

    /// Scan the window after the attribute triple for labeled sub-fields.
    /// Stops at `Equipment:` or at the next assignment header.
    fn assignment_fields(&self, corpus: &LineCorpus, numbers_line: usize) -> AssignmentFields {
        let windows = self.vocab.windows;
        let mut fields = AssignmentFields::default();
        let end = (numbers_line + windows.assignment_lookahead).min(corpus.len());

        let mut index = numbers_line + 1;
        while index < end {
            let line = corpus.trimmed(index);
            if self.patterns.attribute_header.is_match(line) {
                break;
            }
            match Label::parse(line) {
                Some(Label::CoreSkill(value)) => {
                    let (value, last) = wrapped_list(corpus, index, value, windows.continuation);
                    fields.core_skill = value;
                    index = last;
                }
                Some(Label::Skills { xp, list }) => {
                    fields.skill_xp = xp;
                    let (list, last) = continuation(corpus, index, list, windows.continuation);
                    fields.skills = list;
                    index = last;
                }
                Some(Label::CoreTalent(value)) => {
                    let (value, last) = wrapped_list(corpus, index, value, windows.continuation);
                    fields.core_talent = value;
                    index = last;
                }
                Some(Label::Talents { choices, list }) => {
                    fields.talent_choices = choices;
                    let (list, last) = continuation(corpus, index, list, windows.continuation);
                    fields.talents = list;
                    index = last;
                }
                Some(Label::Equipment(value)) => {
                    fields.equipment = wrapped_list(corpus, index, value, windows.continuation).0;
                    break;
                }
                None => {}
            }
            index += 1;
        }
        fields
    }
}

/// Absorb wrapped list lines after a label until a blank line or the next
/// label. Returns the joined text and the last absorbed line index.
fn continuation(corpus: &LineCorpus, label_line: usize, mut text: String, limit: usize) -> (String, usize) {
    let mut last = label_line;
    for index in label_line + 1..=(label_line + limit).min(corpus.len().saturating_sub(1)) {
        let line = corpus.trimmed(index);
        if line.is_empty() || Label::parse(line).is_some() {
            break;
        }
        text.push(' ');
        text.push_str(line);
        last = index;
    }
    (text, last)
}

/// Continuation for single-value labels: the next line is absorbed only
/// while the text so far ends with a comma, so the prose that usually
/// follows these labels is left alone.
fn wrapped_list(corpus: &LineCorpus, label_line: usize, mut text: String, limit: usize) -> (String, usize) {
    let mut last = label_line;
    for index in label_line + 1..=(label_line + limit).min(corpus.len().saturating_sub(1)) {
        let line = corpus.trimmed(index);
        if !text.trim_end().ends_with(',') || line.is_empty() || Label::parse(line).is_some() {
            break;
        }
        text.push(' ');
        text.push_str(line);
        last = index;
    }
    (text, last)
}

#[cfg(test)]
mod tests {
    use super::super::tests::extractor;
    use super::*;

    fn analyst() -> LineCorpus {
        LineCorpus::from_lines([
            "ADMINISTRATION DEPARTMENT",
            "Analyst",
            "",
            "Body   Mind   Spirit",
            "2      4      3",
            "Core Skill: Bureaucracy",
            "Skills (12 XP): Bureaucracy, Computers,",
            "Occult*, computers",
            "Core Talent: Lucky",
            "Talents (Choose 2): Brave, Alert,",
            "Lucky",
            "Equipment: Warrant card, Laptop",
            "Not part of the record",
        ])
    }

    #[test]
    fn test_label_parse() {
        assert_eq!(
            Label::parse("Skills (6 XP): Stealth"),
            Some(Label::Skills {
                xp: 6,
                list: "Stealth".into()
            })
        );
        assert_eq!(
            Label::parse("Talents (Choose 1): Alert"),
            Some(Label::Talents {
                choices: 1,
                list: "Alert".into()
            })
        );
        assert_eq!(Label::parse("Equipment:"), Some(Label::Equipment(String::new())));
        assert_eq!(Label::parse("Skillset"), None);
    }

    #[test]
    fn test_full_assignment() {
        let records = extractor().assignments(&analyst());
        assert_eq!(records.len(), 1);
        let a = &records[0];
        assert_eq!(a.name, "Analyst");
        assert_eq!(a.attributes["attributes"], json!({"body": 2, "mind": 4, "spirit": 3}));
        assert_eq!(a.attr_str("coreSkill"), "Bureaucracy");
        assert_eq!(a.attr_str("skillOptions"), "Computers, Occult");
        assert_eq!(a.attr_str("coreSkills"), "Bureaucracy, Computers, Occult");
        assert_eq!(a.attributes["skillXP"], 12);
        assert_eq!(a.attr_str("coreTalent"), "Lucky");
        assert_eq!(a.attr_str("talents"), "Brave, Alert, Lucky");
        assert_eq!(a.attributes["talentChoices"], 2);
        assert_eq!(a.attr_str("equipment"), "Warrant card, Laptop");
    }

    #[test]
    fn test_requires_three_numbers() {
        let corpus = LineCorpus::from_lines(["Analyst", "Body Mind Spirit", "2 4"]);
        assert!(extractor().assignments(&corpus).is_empty());
    }

    #[test]
    fn test_name_skips_department_and_noise() {
        let corpus = LineCorpus::from_lines([
            "Field Agent",
            "ASSIGNMENT",
            "OPERATIONS DEPARTMENT",
            "Body Mind Spirit",
            "3 2 2",
        ]);
        let records = extractor().assignments(&corpus);
        assert_eq!(records[0].name, "Field Agent");
    }

    #[test]
    fn test_single_value_labels_take_wrapped_lists() {
        let corpus = LineCorpus::from_lines([
            "Archivist",
            "Body   Mind   Spirit",
            "1      4      3",
            "Core Skill: Academics,",
            "Bureaucracy",
            "Core Talent: Alert",
            "Not a talent",
            "Equipment: Warrant card,",
            "Laptop, Torch",
            "Not part of the record",
        ]);
        let records = extractor().assignments(&corpus);
        let a = &records[0];
        assert_eq!(a.attr_str("coreSkill"), "Academics");
        assert_eq!(a.attr_str("coreSkills"), "Academics, Bureaucracy");
        assert_eq!(a.attr_str("coreTalent"), "Alert");
        assert_eq!(a.attr_str("equipment"), "Warrant card, Laptop, Torch");
    }

    #[test]
    fn test_window_stops_at_next_header() {
        let corpus = LineCorpus::from_lines([
            "Clerk",
            "Body Mind Spirit",
            "1 3 2",
            "Core Skill: Bureaucracy",
            "Auditor",
            "Body Mind Spirit",
            "1 4 2",
            "Core Skill: Academics",
        ]);
        let records = extractor().assignments(&corpus);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].attr_str("coreSkill"), "Bureaucracy");
        assert_eq!(records[1].name, "Auditor");
        assert_eq!(records[1].attr_str("coreSkill"), "Academics");
    }
}
