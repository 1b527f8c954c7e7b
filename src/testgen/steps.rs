//! `test_steps` coercion.
//!
//! Models return steps as a JSON list, a numbered string, a `;`-separated
//! string, or all of those run together on one line. Everything ends up as
//! `"1. ...\n2. ..."` with no gaps.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

/// Steps shorter than this (in characters, after trimming) are noise.
pub const MIN_STEP_CHARS: usize = 4;

fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // a digit run is a marker only when whitespace follows: "8-character" is text
        Regex::new(r"(?i)^\s*(?:(?:step|bước)\s*\d+\s*[:.)\-]?|\d{1,3}[.):]|\d{1,3}\s+-|[-*•])(?:\s+|$)")
            .expect("marker regex")
    })
}

fn leading_enum_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\d{1,2}[.)]\s").expect("leading enum regex"))
}

fn inline_enum_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s(\d{1,2}[.)]\s)").expect("inline enum regex"))
}

/// Coerce any JSON shape into the numbered-string form.
pub fn normalize_steps(raw: &Value) -> String {
    match raw {
        Value::Array(items) => steps_from_list(items),
        Value::String(s) => steps_from_text(s),
        Value::Null => String::new(),
        other => steps_from_text(&item_text(other)),
    }
}

pub fn steps_from_list(items: &[Value]) -> String {
    number_steps(items.iter().flat_map(|item| {
        // one list item is one step unless it carries its own enumeration
        let flat = item_text(item).split_whitespace().collect::<Vec<_>>().join(" ");
        split_inline_enumeration(&flat)
            .into_iter()
            .map(str::to_owned)
            .collect::<Vec<_>>()
    }))
}

pub fn steps_from_text(text: &str) -> String {
    let mut pieces = Vec::new();
    for line in text.split(['\n', ';']) {
        pieces.extend(split_inline_enumeration(line));
    }
    number_steps(pieces)
}

/// Strip markers, drop noise, renumber from 1 and join with newlines.
pub fn number_steps<I, S>(steps: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    steps
        .into_iter()
        .map(|s| strip_marker(s.as_ref()).to_string())
        .filter(|s| s.chars().count() >= MIN_STEP_CHARS)
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, s))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove one leading enumeration marker (`1.`, `2)`, `Step 3:`, `Bước 4:`, `-`).
pub fn strip_marker(step: &str) -> &str {
    let trimmed = step.trim();
    match marker_re().find(trimmed) {
        Some(m) => trimmed[m.end()..].trim(),
        None => trimmed,
    }
}

/// `"1. Open page 2. Type email 3. Submit"` → three pieces.
fn split_inline_enumeration(line: &str) -> Vec<&str> {
    if !leading_enum_re().is_match(line) {
        return vec![line];
    }

    let cuts: Vec<usize> = inline_enum_re()
        .captures_iter(line)
        .filter_map(|c| c.get(1).map(|m| m.start()))
        .collect();

    if cuts.is_empty() {
        return vec![line];
    }

    let mut out = Vec::with_capacity(cuts.len() + 1);
    let mut from = 0;
    for cut in cuts {
        out.push(&line[from..cut]);
        from = cut;
    }
    out.push(&line[from..]);
    out
}

/// Text of a single step item, whatever shape the model used.
fn item_text(item: &Value) -> String {
    match item {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Object(map) => ["action", "step", "description", "text"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str))
            .or_else(|| map.values().find_map(Value::as_str))
            .map(str::to_owned)
            .unwrap_or_else(|| item.to_string()),
        other => other.to_string(),
    }
}
