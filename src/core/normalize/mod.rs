//! Type Normalizer
//!
//! Per-type coercion of raw record attributes into the pack schema:
//! defaulting, clamping, enumeration canonicalization and the derived
//! category / tags / search keyword fields.
//!
//! Derived fields are written to `flags[<namespace>]` rather than into the
//! type payload. They are read back from either place on input, so running
//! the normalizer over its own output is a no-op.

mod actors;
mod documents;
pub(crate) mod fields;
mod items;

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::config::{PipelineConfig, SkillDefinition};

use super::casing::NameFormatter;
use super::model::{Attributes, EntityRecord, EntityType};
use super::text::{casefold, clean_text, unique_casefold};
use fields::string_list;

/// Attribute keys a skill may be tested against.
pub const ATTRIBUTE_KEYS: [&str; 3] = ["body", "mind", "spirit"];

/// Keys carried in the flag namespace instead of the type payload.
const DERIVED_KEYS: [&str; 3] = ["category", "tags", "searchKeywords"];

/// Output of the per-type transform before derived fields are merged in.
#[derive(Debug, Default)]
pub(crate) struct Shaped {
    pub attributes: Attributes,
    /// Category used when the author supplied none.
    pub default_category: Option<String>,
    /// Tags beyond the type name and category.
    pub tags: Vec<String>,
    /// Search terms beyond name, type and category.
    pub search_terms: Vec<String>,
}

impl Shaped {
    pub(crate) fn new(attributes: Attributes) -> Self {
        Self {
            attributes,
            ..Self::default()
        }
    }
}

/// Fully normalized payload plus its derived fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub attributes: Attributes,
    pub category: String,
    pub tags: Vec<String>,
    pub search_keywords: Vec<String>,
}

/// Stateless per-type normalizer configured with naming rules and the
/// canonical skill table.
#[derive(Debug, Clone)]
pub struct Normalizer {
    names: NameFormatter,
    skills: Vec<SkillDefinition>,
    flag_namespace: String,
    image_root: String,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl Normalizer {
    pub fn new(
        names: NameFormatter,
        skills: Vec<SkillDefinition>,
        flag_namespace: impl Into<String>,
        image_root: impl Into<String>,
    ) -> Self {
        Self {
            names,
            skills,
            flag_namespace: flag_namespace.into(),
            image_root: image_root.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.naming.formatter(),
            config.skills.clone(),
            config.output.flag_namespace.clone(),
            config.output.image_root.clone(),
        )
    }

    pub fn flag_namespace(&self) -> &str {
        &self.flag_namespace
    }

    pub fn names(&self) -> &NameFormatter {
        &self.names
    }

    /// Canonical attribute of a skill from the skill table.
    pub fn skill_attribute(&self, skill: &str) -> Option<&str> {
        let key = casefold(skill);
        self.skills
            .iter()
            .find(|s| casefold(&s.name) == key)
            .map(|s| s.attribute.as_str())
    }

    /// Placeholder image for records that do not name one.
    pub fn default_image(&self, entity_type: EntityType) -> String {
        format!("{}/{}.webp", self.image_root, entity_type.as_str())
    }

    /// Pure attribute transform for one record.
    ///
    /// Returns `None` when the type requires content the record lacks
    /// (a journal entry without text, a roll table without results).
    /// `position` is the record's index in its collection, used only for
    /// ordering defaults.
    pub fn normalize_attributes(
        &self,
        entity_type: EntityType,
        name: &str,
        raw: &Attributes,
        position: usize,
    ) -> Option<Normalized> {
        self.derive(entity_type, name, raw, &Map::new(), position)
    }

    /// Normalize a whole record. Records whose name is empty after
    /// cleaning are dropped.
    pub fn normalize(&self, record: &EntityRecord) -> Option<EntityRecord> {
        self.normalize_at(record, 0)
    }

    fn normalize_at(&self, record: &EntityRecord, position: usize) -> Option<EntityRecord> {
        let name = self.names.display_name(&clean_text(&record.name));
        if name.is_empty() {
            debug!(entity_type = %record.entity_type, "Dropping record with empty name");
            return None;
        }

        let previous = record
            .flags
            .get(&self.flag_namespace)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let Some(normalized) =
            self.derive(record.entity_type, &name, &record.attributes, &previous, position)
        else {
            debug!(entity_type = %record.entity_type, name = %name, "Dropping record without required content");
            return None;
        };

        let mut flags = record.flags.clone();
        let mut namespace = previous;
        namespace.insert("category".to_string(), json!(normalized.category));
        namespace.insert("tags".to_string(), json!(normalized.tags));
        namespace.insert("searchKeywords".to_string(), json!(normalized.search_keywords));
        flags.insert(self.flag_namespace.clone(), Value::Object(namespace));

        let image = match record.image.trim() {
            "" => self.default_image(record.entity_type),
            image => image.to_string(),
        };

        Some(EntityRecord {
            id: record.id.trim().to_string(),
            name,
            entity_type: record.entity_type,
            image,
            attributes: normalized.attributes,
            effects: record.effects.clone(),
            flags,
        })
    }

    /// Normalize a collection, dropping invalid records and applying the
    /// per-type collection ordering.
    pub fn normalize_collection(&self, records: &[EntityRecord]) -> Vec<EntityRecord> {
        let mut out: Vec<EntityRecord> = records
            .iter()
            .enumerate()
            .filter_map(|(position, record)| self.normalize_at(record, position))
            .collect();
        self.order(&mut out);
        out
    }

    /// Gear and npcs are ordered by (category, name); everything else keeps
    /// input order. The sort is stable.
    pub fn order(&self, records: &mut [EntityRecord]) {
        let sorted_types = [EntityType::Gear, EntityType::Npc];
        if !records.iter().all(|r| sorted_types.contains(&r.entity_type)) {
            return;
        }
        records.sort_by_cached_key(|r| (casefold(self.category_of(r)), casefold(&r.name)));
    }

    /// Derived category of a normalized record.
    pub fn category_of<'a>(&self, record: &'a EntityRecord) -> &'a str {
        record
            .flags
            .get(&self.flag_namespace)
            .and_then(|ns| ns.get("category"))
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    /// Derived tags of a normalized record.
    pub fn tags_of(&self, record: &EntityRecord) -> Vec<String> {
        string_list(
            record
                .flags
                .get(&self.flag_namespace)
                .and_then(|ns| ns.get("tags")),
        )
    }

    fn derive(
        &self,
        entity_type: EntityType,
        name: &str,
        raw: &Attributes,
        previous: &Map<String, Value>,
        position: usize,
    ) -> Option<Normalized> {
        let shaped = match entity_type {
            EntityType::Skill => items::skill(self, name, raw),
            EntityType::Talent => items::talent(raw),
            EntityType::Assignment => items::assignment(raw),
            EntityType::Weapon => items::weapon(raw),
            EntityType::Armour => items::armour(raw),
            EntityType::Spell => items::spell(raw),
            EntityType::Gear => items::gear(raw),
            EntityType::Npc => actors::npc(raw),
            EntityType::JournalEntry => documents::journal_entry(raw)?,
            EntityType::RollTable => documents::roll_table(raw, position)?,
            EntityType::Macro => documents::macro_record(raw),
        };

        let authored_category = [raw.get("category"), previous.get("category")]
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .map(clean_text)
            .find(|c| !c.is_empty());
        let category = authored_category
            .or(shaped.default_category)
            .unwrap_or_else(|| entity_type.default_category().to_string());

        let mut tags = string_list(raw.get("tags"));
        tags.extend(string_list(previous.get("tags")));
        tags.push(entity_type.as_str().to_string());
        tags.extend(shaped.tags);
        tags.push(category.clone());

        let mut search = string_list(raw.get("searchKeywords"));
        search.extend(string_list(previous.get("searchKeywords")));
        search.extend([name.to_string(), entity_type.as_str().to_string(), category.clone()]);
        search.extend(shaped.search_terms);

        let mut attributes = shaped.attributes;
        for key in DERIVED_KEYS {
            attributes.remove(key);
        }

        Some(Normalized {
            attributes,
            category,
            tags: unique_casefold(tags.iter().filter(|t| !t.trim().is_empty())),
            search_keywords: unique_casefold(search.iter().filter(|t| !t.trim().is_empty())),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn attrs(value: Value) -> Attributes {
        value.as_object().cloned().unwrap()
    }

    fn record(entity_type: EntityType, name: &str, system: Value) -> EntityRecord {
        EntityRecord::new(entity_type, name).with_attributes(attrs(system))
    }

    fn flags(record: &EntityRecord) -> &Value {
        &record.flags["compendium"]
    }

    #[rstest]
    #[case(json!(9), 6)]
    #[case(json!(0), 2)]
    #[case(json!("5"), 5)]
    #[case(json!(null), 4)]
    fn test_spell_dn_is_clamped(#[case] dn: Value, #[case] expected: i64) {
        let normalizer = Normalizer::default();
        let out = normalizer
            .normalize_attributes(EntityType::Spell, "Ward", &attrs(json!({"dn": dn})), 0)
            .unwrap();
        assert_eq!(out.attributes["dn"], expected);
    }

    #[test]
    fn test_negative_quantity_is_zero() {
        let normalizer = Normalizer::default();
        let out = normalizer
            .normalize_attributes(EntityType::Gear, "Torch", &attrs(json!({"quantity": -4})), 0)
            .unwrap();
        assert_eq!(out.attributes["quantity"], 0);
        assert_eq!(out.attributes["weight"], 0);
    }

    #[test]
    fn test_empty_name_is_dropped() {
        let normalizer = Normalizer::default();
        assert!(normalizer.normalize(&record(EntityType::Gear, "   ", json!({}))).is_none());
    }

    #[test]
    fn test_name_casing_and_default_image() {
        let normalizer = Normalizer::default();
        let out = normalizer
            .normalize(&record(EntityType::Weapon, "MP5 SUBMACHINE GUN", json!({"traits": "Range"})))
            .unwrap();
        assert_eq!(out.name, "MP5 Submachine Gun");
        assert!(out.image.ends_with("/weapon.webp"));
    }

    #[test]
    fn test_derived_fields_live_in_flags() {
        let normalizer = Normalizer::default();
        let out = normalizer
            .normalize(&record(
                EntityType::Gear,
                "Flashlight",
                json!({"category": "Tools", "tags": ["light", "Gear"], "quantity": 2}),
            ))
            .unwrap();
        assert!(!out.attributes.contains_key("category"));
        assert!(!out.attributes.contains_key("tags"));
        assert_eq!(flags(&out)["category"], "Tools");
        assert_eq!(flags(&out)["tags"], json!(["light", "Gear", "requisition", "Tools"]));
        let keywords = &flags(&out)["searchKeywords"];
        assert_eq!(keywords[0], "Flashlight");
        assert_eq!(keywords[1], "gear");
        assert_eq!(keywords[2], "Tools");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let normalizer = Normalizer::default();
        let raw = record(
            EntityType::Npc,
            "FEEDER SWARM",
            json!({"threat": "MAJOR", "attributes": {"body": "3"}, "source": "Bestiary p. 12"}),
        );
        let once = normalizer.normalize(&raw).unwrap();
        let twice = normalizer.normalize(&once).unwrap();
        assert_eq!(once, twice);
        assert_eq!(
            serde_json::to_string(&once).unwrap(),
            serde_json::to_string(&twice).unwrap()
        );
    }

    #[test]
    fn test_collection_orders_gear_by_category_then_name() {
        let normalizer = Normalizer::default();
        let records = vec![
            record(EntityType::Gear, "Zip Ties", json!({"category": "Tools"})),
            record(EntityType::Gear, "Camera", json!({"category": "Surveillance"})),
            record(EntityType::Gear, "Axe", json!({"category": "tools"})),
        ];
        let names: Vec<_> = normalizer
            .normalize_collection(&records)
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Camera", "Axe", "Zip Ties"]);
    }

    #[test]
    fn test_collection_keeps_order_for_talents() {
        let normalizer = Normalizer::default();
        let records = vec![
            record(EntityType::Talent, "Zealot", json!({})),
            record(EntityType::Talent, "Alert", json!({})),
        ];
        let names: Vec<_> = normalizer
            .normalize_collection(&records)
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Zealot", "Alert"]);
    }

    #[test]
    fn test_skill_attribute_lookup() {
        let normalizer = Normalizer::default();
        assert_eq!(normalizer.skill_attribute("close combat"), Some("body"));
        assert_eq!(normalizer.skill_attribute("Basket Weaving"), None);
    }
}
