//! Journal entries, roll tables and macros.

use serde_json::{json, Value};

use super::fields::{at_least, choice, flag, int_or, int_value, text, verbatim};
use super::Shaped;
use crate::core::model::Attributes;
use crate::core::text::extract_source_page;

const RESULT_IMAGE: &str = "icons/svg/d20-grey.svg";
const MACRO_TYPES: [&str; 2] = ["script", "chat"];
const MACRO_SCOPES: [&str; 3] = ["global", "actors", "actor"];

/// Authored page reference, else one parsed from the source citation.
fn source_page(raw: &Attributes, source: &str) -> String {
    match text(raw, "sourcePage") {
        page if page.is_empty() => extract_source_page(source, ""),
        page => page,
    }
}

/// Journal entries without content are dropped.
pub(super) fn journal_entry(raw: &Attributes) -> Option<Shaped> {
    let content = verbatim(raw, "content");
    if content.is_empty() {
        return None;
    }
    let source = text(raw, "source");

    let mut out = raw.clone();
    out.insert("content".into(), json!(content));
    out.insert("source".into(), json!(source));
    out.insert("sourcePage".into(), json!(source_page(raw, &source)));

    Some(Shaped {
        search_terms: vec![source],
        ..Shaped::new(out)
    })
}

/// Parse an explicit result range. Accepts `[lo, hi]`, `"lo-hi"`, `"lo+"`
/// and a bare integer; `next` fills in unparseable bounds.
fn parse_range(value: Option<&Value>, next: i64) -> (i64, i64) {
    let bound = |v: Option<&Value>, fallback: i64| v.and_then(int_value).unwrap_or(fallback).max(1);

    match value {
        Some(Value::Array(items)) if items.len() >= 2 => {
            let low = bound(items.first(), next);
            (low, bound(items.get(1), low).max(low))
        }
        Some(Value::String(s)) if s.contains('-') => {
            let (left, right) = s.split_once('-').unwrap_or((s, ""));
            let low = bound(Some(&json!(left)), next);
            (low, bound(Some(&json!(right)), low).max(low))
        }
        Some(Value::String(s)) if s.trim().ends_with('+') => {
            let low = bound(Some(&json!(s.trim().trim_end_matches('+'))), next);
            (low, low)
        }
        Some(v) => {
            let single = bound(Some(v), next);
            (single, single)
        }
        None => (next.max(1), next.max(1)),
    }
}

/// Roll tables need at least one non-empty result; ranges without an
/// explicit value continue from the previous result.
pub(super) fn roll_table(raw: &Attributes, position: usize) -> Option<Shaped> {
    let mut next = 1;
    let mut highest = 1;
    let mut results = Vec::new();

    for entry in raw.get("results").and_then(Value::as_array).into_iter().flatten() {
        let result = match entry {
            Value::Object(result) => {
                let body = text(result, "text");
                if body.is_empty() {
                    continue;
                }
                let (low, high) = parse_range(result.get("range"), next);
                let image = match verbatim(result, "img") {
                    img if img.is_empty() => RESULT_IMAGE.to_string(),
                    img => img,
                };
                json!({
                    "range": [low, high],
                    "text": body,
                    "weight": at_least(result, "weight", 1, 1),
                    "img": image,
                })
            }
            Value::String(s) if !s.trim().is_empty() => json!({
                "range": [next, next],
                "text": s.trim(),
                "weight": 1,
                "img": RESULT_IMAGE,
            }),
            _ => continue,
        };
        let high = result["range"][1].as_i64().unwrap_or(next);
        next = high.saturating_add(1);
        highest = highest.max(high);
        results.push(result);
    }

    if results.is_empty() {
        return None;
    }

    let formula = match verbatim(raw, "formula") {
        f if f.is_empty() => format!("1d{highest}"),
        f => f,
    };
    let default_sort = i64::try_from(position).unwrap_or(i64::MAX / 1000) * 1000;
    let source = text(raw, "source");

    let mut out = raw.clone();
    out.insert("results".into(), Value::Array(results));
    out.insert("formula".into(), json!(formula));
    out.insert("replacement".into(), json!(flag(raw, "replacement", true)));
    out.insert("displayRoll".into(), json!(flag(raw, "displayRoll", true)));
    out.insert("sort".into(), json!(int_or(raw, "sort", default_sort)));
    out.insert("description".into(), json!(text(raw, "description")));
    out.insert("source".into(), json!(source));
    out.insert("sourcePage".into(), json!(source_page(raw, &source)));

    Some(Shaped {
        search_terms: vec![source],
        ..Shaped::new(out)
    })
}

pub(super) fn macro_record(raw: &Attributes) -> Shaped {
    let mut out = raw.clone();
    out.insert("command".into(), json!(verbatim(raw, "command")));
    out.insert("macroType".into(), json!(choice(raw, "macroType", &MACRO_TYPES, "script")));
    out.insert("scope".into(), json!(choice(raw, "scope", &MACRO_SCOPES, "global")));
    out.insert("description".into(), json!(text(raw, "description")));
    Shaped::new(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(value: Value) -> Attributes {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_journal_requires_content() {
        assert!(journal_entry(&attrs(json!({"content": "   "}))).is_none());
        let out = journal_entry(&attrs(json!({"content": "<p>Rules</p>\n", "source": "Handbook p.12"}))).unwrap();
        assert_eq!(out.attributes["content"], "<p>Rules</p>");
        assert_eq!(out.attributes["sourcePage"], "p.12");
    }

    #[test]
    fn test_parse_range_forms() {
        assert_eq!(parse_range(Some(&json!([2, 4])), 1), (2, 4));
        assert_eq!(parse_range(Some(&json!([5, 3])), 1), (5, 5));
        assert_eq!(parse_range(Some(&json!("3-6")), 1), (3, 6));
        assert_eq!(parse_range(Some(&json!("7+")), 1), (7, 7));
        assert_eq!(parse_range(Some(&json!(4)), 1), (4, 4));
        assert_eq!(parse_range(None, 9), (9, 9));
    }

    #[test]
    fn test_roll_table_results() {
        let out = roll_table(
            &attrs(json!({
                "results": [
                    {"range": "1-2", "text": "Quiet night"},
                    "Sirens",
                    {"text": ""},
                    {"text": "Incursion", "weight": 0}
                ]
            })),
            3,
        )
        .unwrap();
        let a = &out.attributes;
        assert_eq!(a["results"][0]["range"], json!([1, 2]));
        assert_eq!(a["results"][1]["range"], json!([3, 3]));
        assert_eq!(a["results"][2]["range"], json!([4, 4]));
        assert_eq!(a["results"][2]["weight"], 1);
        assert_eq!(a["results"][1]["img"], RESULT_IMAGE);
        assert_eq!(a["formula"], "1d4");
        assert_eq!(a["sort"], 3000);
        assert_eq!(a["replacement"], true);
    }

    #[test]
    fn test_roll_table_range_at_integer_limit() {
        let out = roll_table(
            &attrs(json!({"results": [{"range": [1, i64::MAX], "text": "Everything"}, "Overflow"]})),
            0,
        )
        .unwrap();
        assert_eq!(out.attributes["results"][1]["range"], json!([i64::MAX, i64::MAX]));
        assert_eq!(out.attributes["formula"], format!("1d{}", i64::MAX));
    }

    #[test]
    fn test_authored_source_page_is_kept() {
        let journal = journal_entry(&attrs(json!({
            "content": "<p>Rules</p>",
            "source": "Handbook",
            "sourcePage": "p.88",
        })))
        .unwrap();
        assert_eq!(journal.attributes["sourcePage"], "p.88");

        let table = roll_table(
            &attrs(json!({"results": ["Sirens"], "source": "Handbook", "sourcePage": "p.9"})),
            0,
        )
        .unwrap();
        assert_eq!(table.attributes["sourcePage"], "p.9");

        let parsed = journal_entry(&attrs(json!({"content": "x", "source": "Handbook p.12", "sourcePage": " "}))).unwrap();
        assert_eq!(parsed.attributes["sourcePage"], "p.12");
    }

    #[test]
    fn test_empty_roll_table_dropped() {
        assert!(roll_table(&attrs(json!({"results": ["", {"text": " "}]})), 0).is_none());
        assert!(roll_table(&attrs(json!({})), 0).is_none());
    }

    #[test]
    fn test_macro_defaults() {
        let out = macro_record(&attrs(json!({"command": "  game.roll();\n  ", "macroType": "shell"})));
        assert_eq!(out.attributes["command"], "game.roll();");
        assert_eq!(out.attributes["macroType"], "script");
        assert_eq!(out.attributes["scope"], "global");
    }
}
