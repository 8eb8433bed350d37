//! Loadout gear synthesized from assignment equipment lists.
//!
//! Every item named in an assignment's `equipment` becomes a generated gear
//! record. These rank below curated gear in the merged pack, so an item the
//! authors describe themselves always wins over its generated stand-in.

use serde_json::json;
use tracing::debug;

use super::identity::IdentityAssigner;
use super::model::{Attributes, EntityRecord, EntityType};
use super::normalize::Normalizer;
use super::text::split_csv;

pub const LOADOUT_CATEGORY: &str = "Assignment Loadout";
pub const LOADOUT_TAG: &str = "loadout";

/// Normalized gear, with ids, for every equipment entry of `assignments`.
/// Repeated items keep the first assignment that lists them.
pub fn synthesize(
    assignments: &[EntityRecord],
    normalizer: &Normalizer,
    ids: &IdentityAssigner,
) -> Vec<EntityRecord> {
    let generated: Vec<EntityRecord> = assignments
        .iter()
        .filter(|a| a.entity_type == EntityType::Assignment)
        .flat_map(|assignment| {
            split_csv(assignment.attr_str("equipment"))
                .into_iter()
                .map(move |item| loadout_item(&item, &assignment.name))
        })
        .collect();

    let mut gear = super::merge::dedupe(&normalizer.normalize_collection(&generated)).records;
    ids.assign_all(&mut gear);
    debug!(assignments = assignments.len(), items = gear.len(), "Synthesized loadout gear");
    gear
}

fn loadout_item(name: &str, assignment: &str) -> EntityRecord {
    let mut attributes = Attributes::new();
    attributes.insert("quantity".into(), json!(1));
    attributes.insert("weight".into(), json!(0));
    attributes.insert(
        "description".into(),
        json!(format!("Standard issue for the {assignment} assignment.")),
    );
    attributes.insert("category".into(), json!(LOADOUT_CATEGORY));
    attributes.insert("tags".into(), json!([LOADOUT_TAG]));
    EntityRecord::new(EntityType::Gear, name).with_attributes(attributes)
}
