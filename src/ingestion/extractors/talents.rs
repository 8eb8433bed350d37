//! Talent extraction: requirement-marker anchors.

use serde_json::{json, Map};
use tracing::debug;

use super::{first_seen, HeuristicExtractor};
use crate::core::model::{EntityRecord, EntityType};
use crate::core::text::is_upper_line;
use crate::ingestion::corpus::{Direction, LineCorpus, Scan};

impl HeuristicExtractor {
    /// Talents anchored on the requirement marker.
    ///
    /// The requirement is the marker's remainder, or the next line when the
    /// marker stands alone. The name is the nearest upper-case non-noise
    /// line above; a requisition line in between means the marker belongs
    /// to gear. The description is the first plain line after the
    /// requirement.
    pub fn talents(&self, corpus: &LineCorpus) -> Vec<EntityRecord> {
        let marker = self.vocab.requirement_marker.as_str();
        let windows = self.vocab.windows;
        let mut talents = Vec::new();

        for (index, line) in corpus.iter() {
            let Some(position) = line.find(marker) else {
                continue;
            };

            let mut requirement = line[position + marker.len()..].trim().to_string();
            let mut body_start = index;
            if requirement.is_empty() && !corpus.trimmed(index + 1).is_empty() {
                requirement = corpus.trimmed(index + 1).to_string();
                body_start = index + 1;
            }

            let name = corpus.search(index, Direction::Backward, windows.name_lookback, |_, candidate| {
                if candidate.is_empty() {
                    Scan::Skip
                } else if self.is_requisition_line(candidate) {
                    Scan::Stop
                } else if self.is_name_line(candidate) {
                    Scan::Found(candidate.to_string())
                } else {
                    Scan::Skip
                }
            });
            let Some(name) = name else {
                debug!(line = index + 1, "Requirement marker without a talent name");
                continue;
            };

            let description = corpus
                .search(body_start, Direction::Forward, windows.description_lookahead, |_, text| {
                    if text.is_empty() {
                        Scan::Skip
                    } else if is_upper_line(text) || text.contains(marker) {
                        Scan::Stop
                    } else {
                        Scan::Found(text.to_string())
                    }
                })
                .unwrap_or_default();

            let mut attributes = Map::new();
            attributes.insert("requirements".into(), json!(requirement));
            attributes.insert("description".into(), json!(description));
            talents.push(self.record(EntityType::Talent, &name, attributes));
        }

        first_seen(talents)
    }
}
