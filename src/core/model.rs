//! Entity Data Model
//!
//! The generic record envelope shared by every content type, the closed
//! set of entity types, and lenient parsing of hand-authored or staged
//! JSON records into that envelope.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::text::casefold;

// ============================================================================
// Entity Types
// ============================================================================

/// Closed enumeration of content types a pack can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityType {
    Skill,
    Talent,
    Assignment,
    Weapon,
    Armour,
    Spell,
    Gear,
    Npc,
    JournalEntry,
    RollTable,
    Macro,
}

impl EntityType {
    pub const ALL: [EntityType; 11] = [
        Self::Skill,
        Self::Talent,
        Self::Assignment,
        Self::Weapon,
        Self::Armour,
        Self::Spell,
        Self::Gear,
        Self::Npc,
        Self::JournalEntry,
        Self::RollTable,
        Self::Macro,
    ];

    /// Canonical wire name, also the identity hash prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skill => "skill",
            Self::Talent => "talent",
            Self::Assignment => "assignment",
            Self::Weapon => "weapon",
            Self::Armour => "armour",
            Self::Spell => "spell",
            Self::Gear => "gear",
            Self::Npc => "npc",
            Self::JournalEntry => "journal-entry",
            Self::RollTable => "roll-table",
            Self::Macro => "macro",
        }
    }

    /// Category used when a record does not name one.
    pub fn default_category(&self) -> &'static str {
        match self {
            Self::Skill => "Skills",
            Self::Talent => "Talents",
            Self::Assignment => "Assignments",
            Self::Weapon => "Weapons",
            Self::Armour => "Armour",
            Self::Spell => "Spells",
            Self::Gear => "Field Gear",
            Self::Npc => "Bestiary",
            Self::JournalEntry => "Rules",
            Self::RollTable => "Tables",
            Self::Macro => "Macros",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = MalformedRecord;

    /// Accepts the canonical names plus the spellings found in authored files.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        let entity_type = match key.as_str() {
            "skill" => Self::Skill,
            "talent" => Self::Talent,
            "assignment" => Self::Assignment,
            "weapon" => Self::Weapon,
            "armour" | "armor" => Self::Armour,
            "spell" => Self::Spell,
            "gear" | "item" => Self::Gear,
            "npc" | "enemy" => Self::Npc,
            "journalentry" | "journal" => Self::JournalEntry,
            "rolltable" | "table" => Self::RollTable,
            "macro" => Self::Macro,
            _ => return Err(MalformedRecord::UnknownType(s.trim().to_string())),
        };
        Ok(entity_type)
    }
}

// ============================================================================
// Records
// ============================================================================

/// Type-specific payload ("system" data) of a record.
pub type Attributes = Map<String, Value>;

/// Keys that belong to the envelope rather than the payload of a flat record.
const ENVELOPE_KEYS: &[&str] = &[
    "_id", "id", "name", "type", "img", "image", "system", "effects", "flags",
];

/// Why a raw record could not be read into an [`EntityRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedRecord {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("record has no string 'name'")]
    MissingName,

    #[error("record has no 'type' and none is implied by its file")]
    MissingType,

    #[error("unknown entity type '{0}'")]
    UnknownType(String),
}

/// Generic record envelope written to packs.
///
/// Field order is the pack line order: `_id, name, type, img, system,
/// effects, flags`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    #[serde(rename = "img", default, skip_serializing_if = "String::is_empty")]
    pub image: String,
    #[serde(rename = "system", default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub effects: Vec<Value>,
    #[serde(default)]
    pub flags: Map<String, Value>,
}

/// Deduplication key: type plus case-folded name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub entity_type: EntityType,
    pub folded_name: String,
}

impl EntityRecord {
    /// A fresh record with an empty payload and no id.
    pub fn new(entity_type: EntityType, name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            entity_type,
            image: String::new(),
            attributes: Attributes::new(),
            effects: Vec::new(),
            flags: Map::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn key(&self) -> RecordKey {
        RecordKey {
            entity_type: self.entity_type,
            folded_name: casefold(&self.name),
        }
    }

    /// String attribute or "" when missing or not a string.
    pub fn attr_str(&self, key: &str) -> &str {
        self.attributes.get(key).and_then(Value::as_str).unwrap_or("")
    }

    /// Read a hand-authored or staged JSON value.
    ///
    /// The type implied by the source file wins over the record's own
    /// `type` field. Records without a `system` object are treated as
    /// flat: every non-envelope key becomes an attribute.
    pub fn from_raw(value: &Value, implied: Option<EntityType>) -> Result<Self, MalformedRecord> {
        let obj = value.as_object().ok_or(MalformedRecord::NotAnObject)?;

        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or(MalformedRecord::MissingName)?
            .to_string();

        let entity_type = match (implied, obj.get("type").and_then(Value::as_str)) {
            (Some(t), _) => t,
            (None, Some(raw)) => raw.parse()?,
            (None, None) => return Err(MalformedRecord::MissingType),
        };

        let id = ["_id", "id"]
            .iter()
            .filter_map(|k| obj.get(*k))
            .find_map(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .unwrap_or_default();

        let image = ["img", "image"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_str))
            .unwrap_or("")
            .trim()
            .to_string();

        let attributes = match obj.get("system").and_then(Value::as_object) {
            Some(system) => system.clone(),
            None => obj
                .iter()
                .filter(|(k, _)| !ENVELOPE_KEYS.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };

        let effects = obj
            .get("effects")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let flags = obj
            .get("flags")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        Ok(Self {
            id,
            name,
            entity_type,
            image,
            attributes,
            effects,
            flags,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entity_type_parse_aliases() {
        assert_eq!("Armor".parse::<EntityType>().unwrap(), EntityType::Armour);
        assert_eq!("journal-entry".parse::<EntityType>().unwrap(), EntityType::JournalEntry);
        assert_eq!("RollTable".parse::<EntityType>().unwrap(), EntityType::RollTable);
        assert!("vehicle".parse::<EntityType>().is_err());
    }

    #[test]
    fn test_entity_type_serde_names() {
        let json = serde_json::to_string(&EntityType::RollTable).unwrap();
        assert_eq!(json, "\"roll-table\"");
        for t in EntityType::ALL {
            assert_eq!(t.as_str().parse::<EntityType>().unwrap(), t);
        }
    }

    #[test]
    fn test_from_raw_with_system_object() {
        let raw = json!({
            "_id": "abc123",
            "name": "Glock 17",
            "type": "weapon",
            "img": "icons/glock.webp",
            "system": {"damage": "1d6+1"}
        });
        let record = EntityRecord::from_raw(&raw, None).unwrap();
        assert_eq!(record.id, "abc123");
        assert_eq!(record.entity_type, EntityType::Weapon);
        assert_eq!(record.image, "icons/glock.webp");
        assert_eq!(record.attr_str("damage"), "1d6+1");
        assert!(record.effects.is_empty());
    }

    #[test]
    fn test_from_raw_flat_record_uses_implied_type() {
        let raw = json!({
            "name": "Feeder",
            "type": "monster",
            "threat": "major",
            "attributes": {"body": 3}
        });
        let record = EntityRecord::from_raw(&raw, Some(EntityType::Npc)).unwrap();
        assert_eq!(record.entity_type, EntityType::Npc);
        assert_eq!(record.attr_str("threat"), "major");
        assert_eq!(record.attributes["attributes"]["body"], 3);
        assert!(!record.attributes.contains_key("name"));
    }

    #[test]
    fn test_from_raw_malformed() {
        assert_eq!(EntityRecord::from_raw(&json!([1, 2]), None), Err(MalformedRecord::NotAnObject));
        assert_eq!(
            EntityRecord::from_raw(&json!({"type": "gear"}), None),
            Err(MalformedRecord::MissingName)
        );
        assert_eq!(
            EntityRecord::from_raw(&json!({"name": "Torch"}), None),
            Err(MalformedRecord::MissingType)
        );
    }

    #[test]
    fn test_record_key_casefolds() {
        let a = EntityRecord::new(EntityType::Gear, "Flashlight");
        let b = EntityRecord::new(EntityType::Gear, " FLASHLIGHT ");
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), EntityRecord::new(EntityType::Weapon, "Flashlight").key());
    }

    #[test]
    fn test_serialized_field_order() {
        let mut record = EntityRecord::new(EntityType::Skill, "Occult");
        record.id = "0123456789abcdef".to_string();
        record.image = "icons/skill.webp".to_string();
        let line = serde_json::to_string(&record).unwrap();
        assert_eq!(
            line,
            r#"{"_id":"0123456789abcdef","name":"Occult","type":"skill","img":"icons/skill.webp","system":{},"effects":[],"flags":{}}"#
        );
    }
}
