//! Raw completion → typed `TestCase` records.

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::testgen::case::{renumber, TestCase};
use crate::testgen::extract::{extract_payload, ParseTier};
use crate::testgen::steps::normalize_steps;

/// Result of normalizing one completion.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub cases: Vec<TestCase>,
    /// `None` when nothing parseable was found.
    pub tier: Option<ParseTier>,
    /// Records present in the payload but rejected.
    pub dropped: usize,
}

/// Parse, coerce and cap. Never fails: an unusable completion yields an
/// empty list with `tier == None`.
pub fn normalize_completion(raw: &str, requested: usize) -> Normalized {
    let Some((payload, tier)) = extract_payload(raw) else {
        return Normalized {
            cases: Vec::new(),
            tier: None,
            dropped: 0,
        };
    };

    let records: &[Value] = match payload.get("test_cases") {
        Some(Value::Array(items)) => items.as_slice(),
        Some(_) => {
            warn!("`test_cases` is not a list");
            &[]
        }
        None => {
            warn!("payload has no `test_cases` key");
            &[]
        }
    };

    let mut cases = Vec::with_capacity(records.len());
    let mut dropped = 0;

    for (index, record) in records.iter().enumerate() {
        match coerce_record(record) {
            Some(case) => cases.push(case),
            None => {
                dropped += 1;
                warn!(index, "dropping malformed test case record");
            }
        }
    }

    let ids_unique = {
        let mut ids: Vec<u32> = cases.iter().map(|c| c.test_case_id).collect();
        ids.sort_unstable();
        ids.windows(2).all(|w| w[0] != w[1])
    };
    if !ids_unique {
        debug!("model returned duplicate test_case_id values");
    }

    if cases.len() > requested {
        info!(parsed = cases.len(), requested, "capping to requested count");
        cases.truncate(requested);
    }
    renumber(&mut cases);

    Normalized {
        cases,
        tier: Some(tier),
        dropped,
    }
}

/// One record, or `None` if it cannot become a valid case.
pub fn coerce_record(record: &Value) -> Option<TestCase> {
    let map = record.as_object()?;
    let test_case_id = coerce_id(map.get("test_case_id")?)?;

    let test_steps = normalize_steps(map.get("test_steps").unwrap_or(&Value::Null));
    if test_steps.is_empty() {
        return None;
    }

    Some(TestCase {
        test_case_id,
        test_title: text_field(map, "test_title"),
        description: text_field(map, "description"),
        preconditions: text_field(map, "preconditions"),
        test_steps,
        test_data: text_field(map, "test_data"),
        expected_result: text_field(map, "expected_result"),
        comments: text_field(map, "comments"),
    })
}

/// Positive integer, from a number or a numeric string (`"3"`, `"TC-3"`).
fn coerce_id(raw: &Value) -> Option<u32> {
    let id = match raw {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .map(|f| f as u64)
        })?,
        Value::String(s) => {
            let digits: String = s
                .chars()
                .skip_while(|c| !c.is_ascii_digit())
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse().ok()?
        }
        _ => return None,
    };

    u32::try_from(id).ok().filter(|id| *id > 0)
}

fn text_field(map: &Map<String, Value>, key: &str) -> String {
    map.get(key).map(value_to_text).unwrap_or_default()
}

/// Force any JSON value into a plain string.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{}: {}", k, value_to_text(v)))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
