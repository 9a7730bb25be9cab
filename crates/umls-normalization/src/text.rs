//! Text normalization for mentions and reference surface strings.
//!
//! Two forms are used throughout grounding:
//!
//! - **normalized**: lowercase, whitespace collapsed and trimmed, then every
//!   character other than `a-z`, `0-9`, whitespace and `-` removed. This is the
//!   batch-wide identity of a mention and its first lookup key.
//! - **canonical**: lowercase with every character other than `a-z`/`0-9`
//!   turned into a separator, separators collapsed to single spaces and
//!   trimmed. Reference surface strings are compared in this form.

use std::sync::LazyLock;

use regex::Regex;

/// `<number>[.<number>] <unit>` as a whole word, with unit mm, cm, or m.
static MEASUREMENT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d+(\.\d+)?\s*(mm|cm|m)\b").expect("Invalid measurement regex")
});

/// Normalize mention text.
///
/// Characters are removed after whitespace is collapsed, so a dropped
/// character next to a space can leave a double or edge space behind
/// (`"? effusion"` becomes `" effusion"`).
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut collapsed = String::with_capacity(lowered.len());
    let mut in_space = false;
    for ch in lowered.trim().chars() {
        if ch.is_whitespace() {
            if !in_space {
                collapsed.push(' ');
                in_space = true;
            }
        } else {
            collapsed.push(ch);
            in_space = false;
        }
    }
    collapsed.retain(|ch| {
        ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch.is_whitespace() || ch == '-'
    });
    collapsed
}

/// Canonicalize text for lookups.
pub fn canonicalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    canonicalize_into(text, &mut out);
    out
}

/// Canonicalize `text` into a reusable buffer.
///
/// The buffer is cleared first. Used on the reference scan hot path so rows
/// that match no key cost no allocation.
pub fn canonicalize_into(text: &str, out: &mut String) {
    out.clear();
    let mut pending_space = false;
    for ch in text.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
        } else {
            pending_space = true;
        }
    }
}

/// True if the text contains a measurement token such as `3.5 cm` or `10mm`.
pub fn is_measurement_like(text: &str) -> bool {
    MEASUREMENT_REGEX.is_match(text)
}

/// Normalize an extractor relation label: `"located at"` becomes `LOCATED_AT`.
pub fn normalize_relation_type(relation: &str) -> String {
    relation.to_lowercase().replace(' ', "_").to_uppercase()
}
