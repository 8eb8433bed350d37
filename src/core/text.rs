//! Text Utilities
//!
//! Small lexical helpers shared by the extractor, the normalizer and the
//! validator: case folding, comma-separated list handling, cleanup of
//! PDF-derived text and source page parsing.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// Matches two or more consecutive spaces used as column separators.
static COLUMN_GAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").expect("Invalid column regex"));

/// "Requisition DN: 4" or "Requisition DN: 4:2"
static REQUISITION_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(Requisition\s*DN\s*:\s*[^\s,;]+(?:\s*:\s*[^\s,;]+)?)")
        .expect("Invalid requisition regex")
});

/// "p.47", "p 4-26", "P. 12 - 14"
static SOURCE_PAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bp\.?\s*(\d+(?:\s*-\s*\d+)?)\b").expect("Invalid source page regex")
});

/// Case-insensitive comparison key for names.
pub fn casefold(value: &str) -> String {
    value.trim().to_lowercase()
}

/// True when the line has at least one cased character and no lowercase ones.
pub fn is_upper_line(line: &str) -> bool {
    let mut has_cased = false;
    for ch in line.chars() {
        if ch.is_lowercase() {
            return false;
        }
        if ch.is_uppercase() {
            has_cased = true;
        }
    }
    has_cased
}

/// True when the text contains at least one alphabetic character.
pub fn has_alpha(line: &str) -> bool {
    line.chars().any(char::is_alphabetic)
}

/// Split a fixed-width table row into columns on runs of two or more spaces.
pub fn split_columns(line: &str) -> Vec<&str> {
    COLUMN_GAP
        .split(line.trim())
        .filter(|col| !col.is_empty())
        .collect()
}

/// Split a comma-separated value into trimmed, non-empty tokens.
///
/// Duplicates are kept; use [`unique_casefold`] to drop them.
pub fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Order-preserving case-insensitive deduplication. First spelling wins.
pub fn unique_casefold<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for value in values {
        let value = value.as_ref().trim();
        if value.is_empty() {
            continue;
        }
        if seen.insert(casefold(value)) {
            out.push(value.to_string());
        }
    }
    out
}

/// Values that occur more than once (case-insensitively), sorted.
pub fn duplicate_values(values: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut dupes: Vec<String> = Vec::new();
    for value in values {
        if !seen.insert(casefold(value)) && !dupes.iter().any(|d| casefold(d) == casefold(value)) {
            dupes.push(value.clone());
        }
    }
    dupes.sort();
    dupes
}

/// Parse an extracted list: comma separated, footnote asterisks stripped,
/// deduplicated case-insensitively.
pub fn clean_csv_list(value: &str) -> Vec<String> {
    let parts = value
        .split(',')
        .map(|raw| raw.trim().trim_end_matches('*').trim().to_string())
        .filter(|part| !part.is_empty());
    unique_casefold(parts)
}

/// Normalize typography and whitespace of PDF-derived text.
pub fn clean_text(value: &str) -> String {
    let replaced: String = value
        .chars()
        .map(|ch| match ch {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            other => other,
        })
        .collect();
    WHITESPACE_RUN
        .replace_all(&replaced, " ")
        .trim()
        .replace(" ,", ",")
        .replace(" .", ".")
}

/// Keep only the first requisition token of a description, moved to the front.
pub fn squash_requisition(description: &str) -> String {
    let matches: Vec<&str> = REQUISITION_TOKEN
        .find_iter(description)
        .map(|m| m.as_str())
        .collect();
    if matches.len() <= 1 {
        return description.to_string();
    }
    let first = matches[0].trim_end_matches(['.', ',', ';']).to_string();
    let rest = clean_text(&REQUISITION_TOKEN.replace_all(description, ""));
    let rest = rest.trim_start_matches(['.', ',', ';', ' ']).to_string();
    if rest.is_empty() {
        first
    } else {
        format!("{first}. {rest}")
    }
}

/// Pull a `p.N` / `p.N-M` page reference out of a source citation.
pub fn extract_source_page(source: &str, fallback: &str) -> String {
    match SOURCE_PAGE.captures(source) {
        Some(caps) => format!("p.{}", caps[1].replace(' ', "")),
        None => fallback.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_upper_line() {
        assert!(is_upper_line("KNIFE FIGHTING"));
        assert!(is_upper_line("MP5 (9MM)"));
        assert!(!is_upper_line("Knife Fighting"));
        assert!(!is_upper_line("1234 - 56"));
        assert!(!is_upper_line(""));
    }

    #[test]
    fn test_split_columns() {
        let cols = split_columns("  Glock 17     4:1    1d6+1   Range 20m, Reload  ");
        assert_eq!(cols, vec!["Glock 17", "4:1", "1d6+1", "Range 20m, Reload"]);
        assert!(split_columns("   ").is_empty());
    }

    #[test]
    fn test_split_csv_keeps_duplicates() {
        assert_eq!(split_csv("Ranged, ,ranged ,Stealth"), vec!["Ranged", "ranged", "Stealth"]);
        assert!(split_csv("").is_empty());
    }

    #[test]
    fn test_unique_casefold_first_spelling_wins() {
        let values = unique_casefold(["Occult", "OCCULT", "Magic", "occult", " "]);
        assert_eq!(values, vec!["Occult", "Magic"]);
    }

    #[test]
    fn test_duplicate_values() {
        let values: Vec<String> = ["Lucky", "Brave", "lucky", "LUCKY"].iter().map(|s| s.to_string()).collect();
        assert_eq!(duplicate_values(&values), vec!["lucky".to_string()]);
    }

    #[test]
    fn test_clean_csv_list_strips_footnotes() {
        assert_eq!(
            clean_csv_list("Computers*, Occult, computers, Science**"),
            vec!["Computers", "Occult", "Science"]
        );
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  It\u{2019}s   a \u{2013} test ,  really .  "), "It's a - test, really.");
    }

    #[test]
    fn test_squash_requisition() {
        let desc = "Requisition DN: 4:1. Handy. Requisition DN: 5:2";
        assert_eq!(squash_requisition(desc), "Requisition DN: 4:1. Handy.");
        assert_eq!(squash_requisition("Requisition DN: 3"), "Requisition DN: 3");
    }

    #[test]
    fn test_extract_source_page() {
        assert_eq!(extract_source_page("Operative's Handbook p. 47", "p.unknown"), "p.47");
        assert_eq!(extract_source_page("A Man of the People p 4 - 26", ""), "p.4-26");
        assert_eq!(extract_source_page("Handbook", "p.unknown"), "p.unknown");
    }
}
