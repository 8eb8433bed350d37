//! Gear extraction: requisition-line anchors.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map};
use tracing::debug;

use super::{first_seen, HeuristicExtractor};
use crate::core::model::{EntityRecord, EntityType};
use crate::core::text::{casefold, has_alpha};
use crate::ingestion::corpus::{Direction, LineCorpus, Scan};

/// `DN: 3` or `DN 3:2`; the second number is the complexity.
static REQUISITION_RATING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"DN\s*:?\s*(\d+)(?:\s*:\s*(\d+))?").expect("Invalid requisition rating regex")
});

impl HeuristicExtractor {
    /// Gear anchored on lines carrying both the requisition and difficulty
    /// markers. Names in `exclude` (case-folded) belong to table rows and
    /// are skipped.
    pub fn gear(&self, corpus: &LineCorpus, exclude: &HashSet<String>) -> Vec<EntityRecord> {
        let windows = self.vocab.windows;
        let requisition_marker = self.vocab.requisition_marker.as_str();
        let requirement_marker = self.vocab.requirement_marker.as_str();
        let mut gear = Vec::new();

        for (index, line) in corpus.iter() {
            if !self.is_requisition_line(line) {
                continue;
            }

            let name = corpus.search(index, Direction::Backward, windows.name_lookback, |_, candidate| {
                if candidate.is_empty() || self.noise.contains(candidate) {
                    Scan::Skip
                } else if has_alpha(candidate) {
                    Scan::Found(candidate.to_string())
                } else {
                    Scan::Skip
                }
            });
            let Some(name) = name else {
                debug!(line = index + 1, "Requisition line without a gear name");
                continue;
            };
            if exclude.contains(&casefold(&self.names.display_name(&name))) {
                continue;
            }

            let requisition = line.trim().replace(requisition_marker, "Requisition");
            let requirements = corpus
                .line(index + 1)
                .split_once(requirement_marker)
                .map(|(_, rest)| rest.trim().to_string())
                .unwrap_or_default();
            let description = if requirements.is_empty() {
                requisition.clone()
            } else {
                format!("{requisition}. Requirements: {requirements}")
            };

            let (dn, complexity) = REQUISITION_RATING
                .captures(line)
                .map(|caps| {
                    let dn = caps[1].parse::<i64>().unwrap_or(4);
                    let complexity = caps.get(2).and_then(|m| m.as_str().parse::<i64>().ok()).unwrap_or(1);
                    (dn, complexity)
                })
                .unwrap_or((4, 1));

            let mut attributes = Map::new();
            attributes.insert(
                "requisition".into(),
                json!({
                    "dn": dn,
                    "complexity": complexity,
                    "requirements": requirements,
                    "source": "",
                    "sourcePage": "",
                }),
            );
            attributes.insert("quantity".into(), json!(1));
            attributes.insert("weight".into(), json!(0));
            attributes.insert("description".into(), json!(description));
            gear.push(self.record(EntityType::Gear, &name, attributes));
        }

        first_seen(gear)
    }
}
