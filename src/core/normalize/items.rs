//! Item-family normalizers: skills, talents, assignments, weapons, armour,
//! spells and requisition gear.

use serde_json::{json, Value};

use super::fields::{at_least, choice, csv_text, flag, object, string_list, text, verbatim, within};
use super::{Normalizer, Shaped, ATTRIBUTE_KEYS};
use crate::core::model::Attributes;
use crate::core::text::{casefold, extract_source_page, squash_requisition, unique_casefold};

/// Closed range of difficulty numbers.
pub(crate) const DN_MIN: i64 = 2;
pub(crate) const DN_MAX: i64 = 6;
pub(crate) const DN_DEFAULT: i64 = 4;

const RANGED: &str = "Ranged";
const CLOSE_COMBAT: &str = "Close Combat";

/// Trait words that mark a weapon as ranged.
const RANGED_TRAITS: [&str; 4] = ["range", "thrown", "blast", "spread"];

pub(super) fn skill(normalizer: &Normalizer, name: &str, raw: &Attributes) -> Shaped {
    let fallback = normalizer.skill_attribute(name).unwrap_or("mind");
    let attribute = choice(raw, "attribute", &ATTRIBUTE_KEYS, fallback);

    let mut out = raw.clone();
    out.insert("attribute".into(), json!(attribute));
    out.insert("training".into(), json!(at_least(raw, "training", 0, 0)));
    out.insert("focus".into(), json!(at_least(raw, "focus", 0, 0)));
    out.insert("description".into(), json!(text(raw, "description")));

    Shaped {
        tags: vec![attribute.clone()],
        search_terms: vec![attribute],
        ..Shaped::new(out)
    }
}

pub(super) fn talent(raw: &Attributes) -> Shaped {
    let mut out = raw.clone();
    out.insert("requirements".into(), json!(text(raw, "requirements")));
    out.insert(
        "description".into(),
        json!(squash_requisition(&text(raw, "description"))),
    );
    Shaped::new(out)
}

pub(super) fn assignment(raw: &Attributes) -> Shaped {
    let stats = object(raw, "attributes");
    let attributes: Attributes = ATTRIBUTE_KEYS
        .iter()
        .map(|key| (key.to_string(), json!(at_least(&stats, key, 1, 1))))
        .collect();

    let core_skill = csv_text(raw, "coreSkill");
    let skill_options = csv_text(raw, "skillOptions");
    let core_skills = if raw.contains_key("coreSkills") {
        csv_text(raw, "coreSkills")
    } else {
        // Derived the same way extraction builds it; duplicates are left to
        // the validator.
        string_list(Some(&json!(core_skill)))
            .into_iter()
            .chain(string_list(Some(&json!(skill_options))))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut out = raw.clone();
    out.insert("attributes".into(), Value::Object(attributes));
    out.insert("coreSkill".into(), json!(core_skill));
    out.insert("skillOptions".into(), json!(skill_options));
    out.insert("coreSkills".into(), json!(core_skills));
    out.insert("skillXP".into(), json!(at_least(raw, "skillXP", 0, 0)));
    out.insert("coreTalent".into(), json!(csv_text(raw, "coreTalent")));
    out.insert("talents".into(), json!(csv_text(raw, "talents")));
    out.insert("talentChoices".into(), json!(at_least(raw, "talentChoices", 0, 0)));
    out.insert("equipment".into(), json!(csv_text(raw, "equipment")));
    out.insert("description".into(), json!(text(raw, "description")));

    Shaped {
        search_terms: vec![core_skill, csv_text(raw, "coreTalent")],
        ..Shaped::new(out)
    }
}

/// `Ranged` or `Close Combat`; anything else is derived from the traits.
fn weapon_skill(raw: &Attributes, traits: &str) -> &'static str {
    match casefold(&text(raw, "skill")).as_str() {
        "ranged" => RANGED,
        "close combat" | "melee" => CLOSE_COMBAT,
        _ => {
            let traits = casefold(traits);
            if RANGED_TRAITS.iter().any(|t| traits.contains(t)) {
                RANGED
            } else {
                CLOSE_COMBAT
            }
        }
    }
}

pub(super) fn weapon(raw: &Attributes) -> Shaped {
    let traits = text(raw, "traits");
    let skill = weapon_skill(raw, &traits);
    let damage: String = text(raw, "damage").chars().filter(|c| !c.is_whitespace()).collect();
    let range = text(raw, "range");

    let mut out = raw.clone();
    out.insert("damage".into(), json!(damage));
    out.insert("range".into(), json!(range));
    out.insert("skill".into(), json!(skill));
    out.insert("traits".into(), json!(traits));
    out.insert("ammo".into(), json!(at_least(raw, "ammo", 0, 0)));
    out.insert("ammoMax".into(), json!(at_least(raw, "ammoMax", 0, 0)));
    out.insert("areaDistance".into(), json!(at_least(raw, "areaDistance", 2, 1)));
    out.insert("equipped".into(), json!(flag(raw, "equipped", false)));
    out.insert(
        "description".into(),
        json!(squash_requisition(&text(raw, "description"))),
    );

    let category = if skill == RANGED { "Ranged Weapons" } else { "Melee Weapons" };
    Shaped {
        default_category: Some(category.to_string()),
        tags: vec![skill.to_string()],
        search_terms: vec![skill.to_string(), range],
        ..Shaped::new(out)
    }
}

pub(super) fn armour(raw: &Attributes) -> Shaped {
    let mut out = raw.clone();
    out.insert("protection".into(), json!(at_least(raw, "protection", 0, 0)));
    out.insert("traits".into(), json!(text(raw, "traits")));
    out.insert("equipped".into(), json!(flag(raw, "equipped", false)));
    out.insert(
        "description".into(),
        json!(squash_requisition(&text(raw, "description"))),
    );
    Shaped::new(out)
}

pub(super) fn spell(raw: &Attributes) -> Shaped {
    let level = at_least(raw, "level", 1, 1);
    let school = text(raw, "school");
    let range = text(raw, "range");

    let mut out = raw.clone();
    out.insert("level".into(), json!(level));
    out.insert("dn".into(), json!(within(raw, "dn", DN_DEFAULT, DN_MIN, DN_MAX)));
    out.insert("complexity".into(), json!(at_least(raw, "complexity", level, 1)));
    out.insert("school".into(), json!(school));
    for key in ["castingTime", "target", "duration", "description"] {
        out.insert(key.into(), json!(text(raw, key)));
    }
    out.insert("range".into(), json!(range));

    Shaped {
        default_category: (!school.is_empty()).then(|| school.clone()),
        tags: vec![school.clone()],
        search_terms: vec![school, range],
        ..Shaped::new(out)
    }
}

pub(super) fn gear(raw: &Attributes) -> Shaped {
    let requisition = object(raw, "requisition");
    let source = text(&requisition, "source");
    let source_page = match text(&requisition, "sourcePage") {
        page if page.is_empty() => extract_source_page(&source, "p.unknown"),
        page => page,
    };

    let mut req = requisition.clone();
    req.insert("id".into(), json!(verbatim(&requisition, "id")));
    req.insert(
        "dn".into(),
        json!(within(&requisition, "dn", DN_DEFAULT, DN_MIN, DN_MAX)),
    );
    req.insert("complexity".into(), json!(at_least(&requisition, "complexity", 1, 1)));
    req.insert("requirements".into(), json!(text(&requisition, "requirements")));
    req.insert("source".into(), json!(source));
    req.insert("sourcePage".into(), json!(source_page));

    let mut out = raw.clone();
    out.insert("quantity".into(), json!(at_least(raw, "quantity", 1, 0)));
    out.insert("weight".into(), json!(at_least(raw, "weight", 0, 0)));
    out.insert(
        "description".into(),
        json!(squash_requisition(&text(raw, "description"))),
    );
    out.insert("requisition".into(), Value::Object(req));

    Shaped {
        tags: vec!["requisition".to_string()],
        search_terms: unique_casefold([source_page, source]),
        ..Shaped::new(out)
    }
}
