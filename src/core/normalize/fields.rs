//! Lenient field coercion shared by the per-type normalizers.
//!
//! Authored JSON is loose: numbers arrive as strings, booleans as "yes",
//! lists as comma-separated text. Every helper here accepts the loose form
//! and falls back to a documented default instead of failing.

use serde_json::{Map, Value};

use crate::core::model::Attributes;
use crate::core::text::{clean_text, split_csv};

/// Integer view of a JSON value. Floats truncate, numeric strings parse.
pub(crate) fn int_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}

pub(crate) fn int_or(raw: &Attributes, key: &str, default: i64) -> i64 {
    raw.get(key).and_then(int_value).unwrap_or(default)
}

/// Integer clamped to `>= min`.
pub(crate) fn at_least(raw: &Attributes, key: &str, default: i64, min: i64) -> i64 {
    int_or(raw, key, default).max(min)
}

/// Integer clamped to `[lo, hi]`.
pub(crate) fn within(raw: &Attributes, key: &str, default: i64, lo: i64, hi: i64) -> i64 {
    int_or(raw, key, default).clamp(lo, hi)
}

fn string_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Cleaned free text (typography and whitespace normalized).
pub(crate) fn text(raw: &Attributes, key: &str) -> String {
    raw.get(key)
        .and_then(string_value)
        .map(|s| clean_text(&s))
        .unwrap_or_default()
}

/// Text that must keep its layout (scripts, HTML bodies): trimmed only.
pub(crate) fn verbatim(raw: &Attributes, key: &str) -> String {
    raw.get(key)
        .and_then(string_value)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

pub(crate) fn bool_value(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" | "on" => Some(true),
            "false" | "no" | "n" | "0" | "off" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub(crate) fn flag(raw: &Attributes, key: &str, default: bool) -> bool {
    raw.get(key).and_then(bool_value).unwrap_or(default)
}

/// Lower-cased member of a closed set; anything else collapses to `default`.
pub(crate) fn choice(raw: &Attributes, key: &str, allowed: &[&str], default: &str) -> String {
    let value = verbatim(raw, key).to_lowercase();
    if allowed.contains(&value.as_str()) {
        value
    } else {
        default.to_string()
    }
}

/// A list given either as a JSON array or as comma-separated text.
pub(crate) fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(string_value)
            .map(|s| clean_text(&s))
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => split_csv(&clean_text(s)),
        _ => Vec::new(),
    }
}

/// Comma-separated text field re-joined in canonical `a, b, c` form.
///
/// Duplicates are kept; they are a validation concern.
pub(crate) fn csv_text(raw: &Attributes, key: &str) -> String {
    string_list(raw.get(key)).join(", ")
}

/// Nested object, or an empty one.
pub(crate) fn object(raw: &Attributes, key: &str) -> Map<String, Value> {
    raw.get(key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: Value) -> Attributes {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_int_value_is_lenient() {
        assert_eq!(int_value(&json!(4)), Some(4));
        assert_eq!(int_value(&json!(4.9)), Some(4));
        assert_eq!(int_value(&json!(" 7 ")), Some(7));
        assert_eq!(int_value(&json!("2.5")), Some(2));
        assert_eq!(int_value(&json!("lots")), None);
        assert_eq!(int_value(&json!(null)), None);
        assert_eq!(int_value(&json!(true)), None);
    }

    #[test]
    fn test_clamps() {
        let raw = attrs(json!({"dn": 9, "low": 0, "qty": -3, "junk": "x"}));
        assert_eq!(within(&raw, "dn", 4, 2, 6), 6);
        assert_eq!(within(&raw, "low", 4, 2, 6), 2);
        assert_eq!(within(&raw, "missing", 4, 2, 6), 4);
        assert_eq!(at_least(&raw, "qty", 1, 0), 0);
        assert_eq!(at_least(&raw, "junk", 1, 0), 1);
    }

    #[test]
    fn test_flag_and_choice() {
        let raw = attrs(json!({"equipped": "yes", "mode": " FULL ", "kind": "dance"}));
        assert!(flag(&raw, "equipped", false));
        assert!(flag(&raw, "missing", true));
        assert_eq!(choice(&raw, "mode", &["lite", "full"], "lite"), "full");
        assert_eq!(choice(&raw, "kind", &["attack", "spell"], "attack"), "attack");
    }

    #[test]
    fn test_string_list_forms() {
        assert_eq!(string_list(Some(&json!(["a", " b ", "", 3]))), vec!["a", "b", "3"]);
        assert_eq!(string_list(Some(&json!("a,  b ,,c"))), vec!["a", "b", "c"]);
        assert!(string_list(Some(&json!({"a": 1}))).is_empty());
        assert!(string_list(None).is_empty());
    }

    #[test]
    fn test_csv_text_keeps_duplicates() {
        let raw = attrs(json!({"talents": "Lucky,Brave ,  lucky"}));
        assert_eq!(csv_text(&raw, "talents"), "Lucky, Brave, lucky");
    }

    #[test]
    fn test_text_and_verbatim() {
        let raw = attrs(json!({"desc": "  two   spaces  ", "level": 3}));
        assert_eq!(text(&raw, "desc"), "two spaces");
        assert_eq!(verbatim(&raw, "desc"), "two   spaces");
        assert_eq!(text(&raw, "level"), "3");
    }
}
