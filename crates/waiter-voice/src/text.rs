//! Text normalization shared by the intent parser and the fuzzy matcher.

use unicode_normalization::UnicodeNormalization;

const APOSTROPHES: &[char] = &['\'', '’', '‘', '`', 'ʼ', '´'];

/// Canonical form for name matching: NFC, lowercase, apostrophes removed,
/// every other non-alphanumeric character turned into a space, whitespace collapsed.
pub fn normalize(s: &str) -> String {
    let cleaned: String = s
        .nfc()
        .flat_map(char::to_lowercase)
        .filter(|c| !APOSTROPHES.contains(c))
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    collapse_whitespace(&cleaned)
}

/// Canonical form for command parsing. Like [`normalize`] but keeps the
/// separators the grammar relies on (`,` `+` `.`) and only strips trailing
/// sentence punctuation.
pub fn normalize_transcript(s: &str) -> String {
    let cleaned: String = s
        .nfc()
        .flat_map(char::to_lowercase)
        .filter(|c| !APOSTROPHES.contains(c))
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ',' | '+' | '.') {
                c
            } else {
                ' '
            }
        })
        .collect();
    collapse_whitespace(&cleaned)
        .trim_end_matches(|c: char| matches!(c, ',' | '+' | '.') || c.is_whitespace())
        .to_string()
}

/// True when the transcript holds no letters or digits at all.
pub fn is_blank(s: &str) -> bool {
    normalize(s).is_empty()
}

/// Whitespace-separated tokens of the normalized text.
pub fn tokens(s: &str) -> Vec<String> {
    normalize(s)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

// Longest first so that "ою" wins over "у".
const ENDINGS: &[&str] = &[
    "ого", "ому", "ами", "ями", "ові", "еві", "ою", "ею", "ом", "ем", "ам", "ям", "ах", "ях", "ів", "їв", "ий",
    "ій", "а", "я", "у", "ю", "і", "и", "ї", "о", "е", "ь", "s",
];

/// Strip one trailing inflectional ending, keeping at least three characters.
///
/// Accusative "маргариту" and nominative "маргарита" share the stem "маргарит".
pub fn stem(token: &str) -> String {
    let len = token.chars().count();
    for ending in ENDINGS {
        if let Some(base) = token.strip_suffix(ending) {
            if base.chars().count() >= 3 && len > ending.chars().count() {
                return base.to_string();
            }
        }
    }
    token.to_string()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
