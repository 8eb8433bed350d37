//! Display Name Casing
//!
//! Brings hand-authored and extracted names onto one display convention.
//! Rulebook headings arrive in all caps ("MP5 SUBMACHINE GUN") while authored
//! files use mixed case; both converge on "MP5 Submachine Gun".

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Well-formed Roman numeral (I..MMMCMXCIX).
static ROMAN_NUMERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^M{0,3}(CM|CD|D?C{0,3})(XC|XL|L?X{0,3})(IX|IV|V?I{0,3})$")
        .expect("Invalid roman numeral regex")
});

/// Longest token still considered for the Roman numeral rule.
const MAX_ROMAN_LEN: usize = 4;

/// Shortest lower-case token still matched against the acronym set, so
/// "id" and "tv" stay words while "cctv" becomes "CCTV".
const MIN_LOWER_ACRONYM_LEN: usize = 3;

/// Casing rules for display names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NameStyle {
    /// Tokens always written in upper case.
    pub acronyms: Vec<String>,
    /// Words kept lower case unless they start the name.
    pub minor_words: Vec<String>,
}

impl Default for NameStyle {
    fn default() -> Self {
        let acronyms = [
            "ANPR", "CCTV", "CIA", "DN", "EMP", "FBI", "GPS", "HQ", "ID", "LED", "MI5", "MI6",
            "NATO", "PC", "PDA", "SAS", "SWAT", "TV", "UK", "USB", "UV",
        ];
        let minor_words = [
            "a", "an", "and", "as", "at", "by", "for", "from", "in", "of", "on", "or", "the", "to",
            "with",
        ];
        Self {
            acronyms: acronyms.iter().map(|s| s.to_string()).collect(),
            minor_words: minor_words.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl NameStyle {
    /// Compile the word lists into a reusable formatter.
    pub fn formatter(&self) -> NameFormatter {
        NameFormatter {
            acronyms: self.acronyms.iter().map(|a| a.to_uppercase()).collect(),
            minor_words: self.minor_words.iter().map(|w| w.to_lowercase()).collect(),
        }
    }
}

/// Compiled casing rules.
#[derive(Debug, Clone)]
pub struct NameFormatter {
    acronyms: HashSet<String>,
    minor_words: HashSet<String>,
}

impl Default for NameFormatter {
    fn default() -> Self {
        NameStyle::default().formatter()
    }
}

impl NameFormatter {
    /// Normalize a display name.
    ///
    /// Per whitespace token (hyphenated parts handled separately):
    /// - tokens with digits are upper-cased;
    /// - known acronyms are upper-cased when written in capitals, or in lower
    ///   case if at least three letters long;
    /// - capitalized Roman numerals stay upper-case;
    /// - minor words after the first token are lower-cased;
    /// - all-caps tokens of three or more letters and all-lowercase tokens
    ///   are title-cased;
    /// - mixed-case tokens ("McAllister") are left unchanged.
    pub fn display_name(&self, raw: &str) -> String {
        raw.split_whitespace()
            .enumerate()
            .map(|(position, token)| {
                token
                    .split('-')
                    .enumerate()
                    .map(|(part_idx, part)| self.format_part(part, position == 0 && part_idx == 0))
                    .collect::<Vec<_>>()
                    .join("-")
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn format_part(&self, part: &str, leading: bool) -> String {
        // Keep surrounding punctuation ("(class", "1/4)") out of the decision.
        let start = part.find(char::is_alphanumeric);
        let end = part.rfind(char::is_alphanumeric);
        let (Some(start), Some(end)) = (start, end) else {
            return part.to_string();
        };
        let end = end + part[end..].chars().next().map_or(1, char::len_utf8);
        let (prefix, core, suffix) = (&part[..start], &part[start..end], &part[end..]);

        format!("{prefix}{}{suffix}", self.format_core(core, leading))
    }

    fn format_core(&self, core: &str, leading: bool) -> String {
        let upper = core.to_uppercase();
        let lower = core.to_lowercase();
        let all_upper = core == upper;
        let all_lower = core == lower;
        let length = core.chars().count();

        if core.chars().any(|c| c.is_ascii_digit()) {
            return upper;
        }
        if self.acronyms.contains(&upper) && (all_upper || (all_lower && length >= MIN_LOWER_ACRONYM_LEN)) {
            return upper;
        }
        if all_upper && length <= MAX_ROMAN_LEN && is_roman_numeral(core) && !self.minor_words.contains(&lower) {
            return core.to_string();
        }
        if !leading && self.minor_words.contains(&lower) {
            return lower;
        }

        let letters = core.chars().filter(|c| c.is_alphabetic()).count();
        if (all_upper && letters >= 3) || all_lower || (leading && all_upper) {
            return title_case(core);
        }
        core.to_string()
    }
}

/// Upper-case the first character, lower-case the rest.
pub fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn is_roman_numeral(token: &str) -> bool {
    !token.is_empty() && ROMAN_NUMERAL.is_match(token)
}
