//! Merge/Dedup Assembler
//!
//! Combines several collections into one canonical, duplicate-free
//! collection. Precedence is explicit: every source carries a [`Priority`]
//! and sources are visited in priority order regardless of how the caller
//! listed them. Within one priority, caller order decides. The first record
//! seen for a `(type, casefolded name)` key wins; later ones are discarded
//! whole (no field-level merge).

use std::collections::HashSet;

use tracing::debug;

use super::model::{EntityRecord, RecordKey};

/// Merge precedence, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Hand-curated or reviewed content.
    Curated,
    /// Heuristically extracted content.
    Extracted,
    /// Records synthesized by the pipeline itself (loadout gear).
    Generated,
}

/// One input collection of a merge.
#[derive(Debug, Clone, Copy)]
pub struct MergeSource<'a> {
    pub label: &'a str,
    pub priority: Priority,
    pub records: &'a [EntityRecord],
}

impl<'a> MergeSource<'a> {
    pub fn new(label: &'a str, priority: Priority, records: &'a [EntityRecord]) -> Self {
        Self {
            label,
            priority,
            records,
        }
    }
}

/// A record that lost to an earlier one with the same key.
#[derive(Debug, Clone, PartialEq)]
pub struct Discarded {
    pub source: String,
    pub key: RecordKey,
}

/// Canonical collection plus what was dropped to build it.
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub records: Vec<EntityRecord>,
    pub discarded: Vec<Discarded>,
}

/// First-writer-wins merge over prioritized sources.
pub fn merge(sources: &[MergeSource<'_>]) -> MergeOutcome {
    let mut ordered: Vec<&MergeSource<'_>> = sources.iter().collect();
    ordered.sort_by_key(|s| s.priority);

    let mut seen: HashSet<RecordKey> = HashSet::new();
    let mut outcome = MergeOutcome::default();

    for source in ordered {
        for record in source.records {
            let key = record.key();
            if seen.insert(key.clone()) {
                outcome.records.push(record.clone());
            } else {
                debug!(source = source.label, entity_type = %key.entity_type, name = %record.name, "Discarding duplicate record");
                outcome.discarded.push(Discarded {
                    source: source.label.to_string(),
                    key,
                });
            }
        }
    }

    outcome
}

/// Deduplicate a single collection, keeping first occurrences.
pub fn dedupe(records: &[EntityRecord]) -> MergeOutcome {
    merge(&[MergeSource::new("collection", Priority::Curated, records)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::EntityType;
    use proptest::prelude::*;
    use serde_json::json;

    fn gear(name: &str, quantity: i64) -> EntityRecord {
        EntityRecord::new(EntityType::Gear, name)
            .with_attributes(json!({"quantity": quantity}).as_object().cloned().unwrap())
    }

    #[test]
    fn test_first_source_wins() {
        let a = vec![gear("Flashlight", 1)];
        let b = vec![gear("flashlight", 7), gear("Rope", 1)];
        let outcome = merge(&[
            MergeSource::new("a", Priority::Curated, &a),
            MergeSource::new("b", Priority::Curated, &b),
        ]);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].attributes["quantity"], 1);
        assert_eq!(outcome.records[0].name, "Flashlight");
        assert_eq!(outcome.discarded.len(), 1);
        assert_eq!(outcome.discarded[0].source, "b");
    }

    #[test]
    fn test_priority_beats_argument_order() {
        let generated = vec![gear("Flashlight", 9)];
        let curated = vec![gear("Flashlight", 1)];
        let outcome = merge(&[
            MergeSource::new("loadout", Priority::Generated, &generated),
            MergeSource::new("gear.json", Priority::Curated, &curated),
        ]);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].attributes["quantity"], 1);
    }

    #[test]
    fn test_same_name_different_type_is_kept() {
        let items = vec![
            gear("Glock 17", 1),
            EntityRecord::new(EntityType::Weapon, "Glock 17"),
        ];
        assert_eq!(dedupe(&items).records.len(), 2);
    }

    proptest! {
        #[test]
        fn prop_merge_keys_are_unique(names in proptest::collection::vec("[a-cA-C]{1,2}", 0..30)) {
            let records: Vec<EntityRecord> = names.iter().map(|n| gear(n, 1)).collect();
            let outcome = dedupe(&records);
            let keys: HashSet<RecordKey> = outcome.records.iter().map(EntityRecord::key).collect();
            prop_assert_eq!(keys.len(), outcome.records.len());
            prop_assert_eq!(outcome.records.len() + outcome.discarded.len(), records.len());
        }
    }
}
