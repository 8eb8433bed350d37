//! NPC normalization.

use serde_json::{json, Map, Value};

use super::fields::{at_least, bool_value, choice, flag, int_value, object, text, within};
use super::items::{DN_DEFAULT, DN_MAX, DN_MIN};
use super::{Shaped, ATTRIBUTE_KEYS};
use crate::core::model::Attributes;
use crate::core::text::extract_source_page;

const NPC_CLASSES: [&str; 3] = ["minion", "elite", "boss"];
const MODES: [&str; 2] = ["lite", "full"];
const THREATS: [&str; 4] = ["minor", "moderate", "major", "extreme"];
const ACTION_KINDS: [&str; 3] = ["attack", "spell", "test"];

/// Page reference used when a preset's source cites no page.
const PRESET_PAGE: &str = "system-preset";

pub(super) fn npc(raw: &Attributes) -> Shaped {
    let stats = object(raw, "attributes");
    let attributes: Attributes = ATTRIBUTE_KEYS
        .iter()
        .map(|key| (key.to_string(), json!(at_least(&stats, key, 1, 1))))
        .collect();
    let body = attributes.get("body").and_then(Value::as_i64).unwrap_or(1);

    let source = text(raw, "source");
    let source_page = match text(raw, "sourcePage") {
        page if page.is_empty() => extract_source_page(&source, PRESET_PAGE),
        page => page,
    };
    let npc_class = choice(raw, "npcClass", &NPC_CLASSES, "elite");
    let threat = choice(raw, "threat", &THREATS, "minor");

    let mut out = raw.clone();
    out.insert("source".into(), json!(source));
    out.insert("sourcePage".into(), json!(source_page));
    out.insert("npcClass".into(), json!(npc_class));
    out.insert("mode".into(), json!(choice(raw, "mode", &MODES, "lite")));
    out.insert("threat".into(), json!(threat));
    out.insert("mobSize".into(), json!(at_least(raw, "mobSize", 1, 1)));
    out.insert("fastDamage".into(), json!(flag(raw, "fastDamage", true)));
    out.insert("trackInjuries".into(), json!(flag(raw, "trackInjuries", false)));
    out.insert("description".into(), json!(text(raw, "description")));
    out.insert("attributes".into(), Value::Object(attributes));
    out.insert("skillTraining".into(), Value::Object(skill_training(raw)));
    out.insert("quickActions".into(), Value::Array(quick_actions(raw.get("quickActions"), body)));

    Shaped {
        tags: vec![threat.clone(), npc_class],
        search_terms: vec![source, source_page, threat],
        ..Shaped::new(out)
    }
}

/// Skill name to training level; blank names dropped, levels `>= 0`.
fn skill_training(raw: &Attributes) -> Map<String, Value> {
    object(raw, "skillTraining")
        .iter()
        .filter_map(|(skill, level)| {
            let skill = skill.trim();
            if skill.is_empty() {
                return None;
            }
            let level = int_value(level).unwrap_or(0).max(0);
            Some((skill.to_string(), json!(level)))
        })
        .collect()
}

fn default_action_name(kind: &str) -> &'static str {
    match kind {
        "spell" => "Occult Effect",
        "test" => "Pressure Test",
        _ => "Signature Attack",
    }
}

/// Normalized quick actions. An npc without any gets a single signature
/// attack rolled on its body pool.
fn quick_actions(value: Option<&Value>, body: i64) -> Vec<Value> {
    let mut actions: Vec<Value> = value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
        .map(|action| {
            let kind = choice(action, "kind", &ACTION_KINDS, "attack");
            let name = ["name", "label", "title"]
                .iter()
                .map(|key| text(action, key))
                .find(|n| !n.is_empty())
                .unwrap_or_else(|| default_action_name(&kind).to_string());
            let is_magic = action.get("isMagic").and_then(bool_value).unwrap_or(false) || kind == "spell";
            json!({
                "name": name,
                "kind": kind,
                "pool": at_least(action, "pool", body, 0),
                "dn": within(action, "dn", DN_DEFAULT, DN_MIN, DN_MAX),
                "complexity": at_least(action, "complexity", 1, 1),
                "damage": text(action, "damage"),
                "traits": text(action, "traits"),
                "isMagic": is_magic,
            })
        })
        .collect();

    if actions.is_empty() {
        actions.push(json!({
            "name": default_action_name("attack"),
            "kind": "attack",
            "pool": body.max(1),
            "dn": DN_DEFAULT,
            "complexity": 1,
            "damage": "",
            "traits": "",
            "isMagic": false,
        }));
    }
    actions
}
