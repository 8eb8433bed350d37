//! Spell extraction: summary listing plus per-spell attribute blocks.

use std::collections::HashSet;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map};
use tracing::debug;

use super::HeuristicExtractor;
use crate::core::model::{EntityRecord, EntityType};
use crate::core::text::{casefold, is_upper_line, split_columns};
use crate::ingestion::corpus::{Direction, LineCorpus, Scan};

/// `DN: 4:2`, `DN: 4:Special` or plain `DN: 4`.
static DIFFICULTY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)(?::(\w+))?").expect("Invalid spell difficulty regex"));

/// School headings are short upper-case lines.
const SCHOOL_HEADING_LEN: Range<usize> = 6..41;

/// Labeled attributes of one spell block; first occurrence of each wins.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SpellBlock {
    dn: i64,
    complexity: i64,
    casting_time: Option<String>,
    target: Option<String>,
    range: Option<String>,
    duration: Option<String>,
    dn_seen: bool,
}

impl Default for SpellBlock {
    fn default() -> Self {
        Self {
            dn: 4,
            complexity: 1,
            casting_time: None,
            target: None,
            range: None,
            duration: None,
            dn_seen: false,
        }
    }
}

impl SpellBlock {
    fn absorb(&mut self, line: &str) {
        let label = |prefix: &str| line.strip_prefix(prefix).map(|rest| rest.trim().to_string());

        if let Some(rest) = label("DN:") {
            if self.dn_seen {
                return;
            }
            if let Some(caps) = DIFFICULTY.captures(&rest) {
                self.dn_seen = true;
                self.dn = caps[1].parse().unwrap_or(4);
                self.complexity = caps
                    .get(2)
                    .and_then(|m| m.as_str().parse().ok())
                    .unwrap_or(1);
            }
        } else if let Some(rest) = label("Casting Time:") {
            self.casting_time.get_or_insert(rest);
        } else if let Some(rest) = label("Target:") {
            self.target.get_or_insert(rest);
        } else if let Some(rest) = label("Range:") {
            self.range.get_or_insert(rest);
        } else if let Some(rest) = label("Duration:") {
            self.duration.get_or_insert(rest);
        }
    }
}

impl HeuristicExtractor {
    /// Candidate names from the summary listing and the listing's extent.
    fn spell_listing(&self, corpus: &LineCorpus) -> (Vec<String>, Range<usize>) {
        let heading = self.vocab.spell_listing_heading.as_str();
        let Some(start) = corpus.position_from(0, |line| line.contains(heading)) else {
            return (Vec::new(), 0..0);
        };
        let end_marker = self.vocab.spell_listing_end.as_str();
        let end = corpus
            .position_from(start + 1, |line| line.contains(end_marker))
            .unwrap_or(corpus.len());

        let mut seen = HashSet::new();
        let names = (start + 1..end)
            .map(|i| corpus.trimmed(i))
            .filter(|line| !line.is_empty() && !line.starts_with("SPELL"))
            .filter_map(|line| split_columns(line).first().map(|c| c.trim().to_string()))
            .filter(|name| !name.is_empty() && seen.insert(casefold(name)))
            .collect();
        (names, start..end)
    }

    fn is_school_heading(&self, line: &str) -> bool {
        is_upper_line(line)
            && SCHOOL_HEADING_LEN.contains(&line.chars().count())
            && !line.contains("SPELLS")
            && self
                .vocab
                .spell_school_keywords
                .iter()
                .any(|k| line.contains(k.as_str()))
    }

    /// Spells named in the summary listing, with attributes collected from
    /// each spell's own block. A listed spell whose block cannot be found is
    /// still emitted with defaults.
    pub fn spells(&self, corpus: &LineCorpus) -> Vec<EntityRecord> {
        let (names, listing) = self.spell_listing(corpus);
        if names.is_empty() {
            return Vec::new();
        }
        let folded: HashSet<String> = names.iter().map(|n| casefold(n)).collect();
        let lookahead = self.vocab.windows.spell_lookahead;

        names
            .iter()
            .map(|name| {
                let key = casefold(name);
                let origin = corpus
                    .iter()
                    .find(|(i, line)| !listing.contains(i) && casefold(line) == key)
                    .map(|(i, _)| i);

                let mut block = SpellBlock::default();
                let mut school = String::new();
                match origin {
                    Some(origin) => {
                        school = corpus
                            .search(origin, Direction::Backward, origin, |_, line| {
                                if self.is_school_heading(line) {
                                    Scan::Found(self.names.display_name(line))
                                } else {
                                    Scan::Skip
                                }
                            })
                            .unwrap_or_default();
                        corpus.search(origin, Direction::Forward, lookahead, |_, line| {
                            if folded.contains(&casefold(line)) {
                                return Scan::Stop;
                            }
                            block.absorb(line);
                            Scan::<()>::Skip
                        });
                    }
                    None => debug!(spell = %name, "Spell listed but its block was not found"),
                }

                let mut attributes = Map::new();
                attributes.insert("level".into(), json!(1));
                attributes.insert("dn".into(), json!(block.dn));
                attributes.insert("complexity".into(), json!(block.complexity));
                attributes.insert("castingTime".into(), json!(block.casting_time.unwrap_or_default()));
                attributes.insert("target".into(), json!(block.target.unwrap_or_default()));
                attributes.insert("range".into(), json!(block.range.unwrap_or_default()));
                attributes.insert("duration".into(), json!(block.duration.unwrap_or_default()));
                attributes.insert("school".into(), json!(school));
                attributes.insert("description".into(), json!(""));
                self.record(EntityType::Spell, name, attributes)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::extractor;
    use super::*;

    fn grimoire() -> LineCorpus {
        LineCorpus::from_lines([
            "SPELLS SUMMARY",
            "SPELL        DN     TYPE",
            "Ward of Protection   4:2   Defence",
            "Eye of Horus         5:1   Divination",
            "Absent Friend        3     Divination",
            "",
            "COMMON SPELLS",
            "PROTECTION AND DEFENCE",
            "WARD OF PROTECTION",
            "DN: 4:2",
            "Casting Time: 1 minute",
            "Target: One person",
            "Range: Touch",
            "Duration: 1 hour",
            "Range: ignored second value",
            "DIVINATION MAGIC",
            "Eye of Horus",
            "DN: 5:Special",
            "Casting Time: 1 round",
        ])
    }

    #[test]
    fn test_spell_listing() {
        let (names, listing) = extractor().spell_listing(&grimoire());
        assert_eq!(names, vec!["Ward of Protection", "Eye of Horus", "Absent Friend"]);
        assert_eq!(listing, 0..6);
    }

    #[test]
    fn test_spell_blocks() {
        let spells = extractor().spells(&grimoire());
        assert_eq!(spells.len(), 3);

        let ward = &spells[0];
        assert_eq!(ward.name, "Ward of Protection");
        assert_eq!(ward.attributes["dn"], 4);
        assert_eq!(ward.attributes["complexity"], 2);
        assert_eq!(ward.attr_str("castingTime"), "1 minute");
        assert_eq!(ward.attr_str("target"), "One person");
        assert_eq!(ward.attr_str("range"), "Touch");
        assert_eq!(ward.attr_str("duration"), "1 hour");
        assert_eq!(ward.attr_str("school"), "Protection and Defence");

        let eye = &spells[1];
        assert_eq!(eye.attributes["dn"], 5);
        assert_eq!(eye.attributes["complexity"], 1);
        assert_eq!(eye.attr_str("school"), "Divination Magic");
        assert_eq!(eye.attr_str("castingTime"), "1 round");
    }

    #[test]
    fn test_unlocated_spell_gets_defaults() {
        let spells = extractor().spells(&grimoire());
        let absent = &spells[2];
        assert_eq!(absent.name, "Absent Friend");
        assert_eq!(absent.attributes["dn"], 4);
        assert_eq!(absent.attributes["level"], 1);
        assert_eq!(absent.attr_str("school"), "");
    }

    #[test]
    fn test_block_scan_stops_at_next_spell() {
        let corpus = LineCorpus::from_lines([
            "SPELLS SUMMARY",
            "Alpha   2",
            "Beta    3",
            "COMMON SPELLS",
            "ALPHA",
            "BETA",
            "DN: 6:3",
        ]);
        let spells = extractor().spells(&corpus);
        assert_eq!(spells[0].attributes["dn"], 4);
        assert_eq!(spells[1].attributes["dn"], 6);
        assert_eq!(spells[1].attributes["complexity"], 3);
    }

    #[test]
    fn test_no_listing() {
        assert!(extractor().spells(&LineCorpus::from_lines(["nothing here"])).is_empty());
    }
}
