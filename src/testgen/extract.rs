//! Pull a JSON payload out of a raw completion.
//!
//! Tiers, in order: strict parse, repaired parse, `"test_cases"` fragment
//! parse. Anything past that is reported as unparsable and the caller falls
//! back.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Which tier produced the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseTier {
    Strict,
    Repaired,
    Fragment,
}

fn missing_comma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""[ \t]*\r?\n(\s*)""#).expect("missing comma regex"))
}

fn trailing_comma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",(\s*[}\]])").expect("trailing comma regex"))
}

/// Interior of a ```` ```json ```` (or bare ```` ``` ````) fence, if any.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();

    if let Some(start) = trimmed.find("```json") {
        let body = &trimmed[start + 7..];
        return match body.find("```") {
            Some(end) => body[..end].trim(),
            None => body.trim(),
        };
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        // skip a language tag on the fence line
        let body = match after.find('\n') {
            Some(nl) if !after[..nl].contains('{') => &after[nl + 1..],
            _ => after,
        };
        return match body.find("```") {
            Some(end) => body[..end].trim(),
            None => body.trim(),
        };
    }

    trimmed
}

/// First `{` through last `}`.
pub fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Insert commas between adjacent quoted strings on consecutive lines and
/// drop trailing commas before `}` / `]`.
pub fn repair(candidate: &str) -> String {
    let with_commas = missing_comma_re().replace_all(candidate, "\",\n$1\"");
    trailing_comma_re().replace_all(&with_commas, "$1").into_owned()
}

/// The `[ ... ]` that follows `"test_cases"`, bracket-matched outside strings.
pub fn test_cases_fragment(text: &str) -> Option<&str> {
    let key = text.find("\"test_cases\"")?;
    let open = key + text[key..].find('[')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[open..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[open..=open + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Run the full tier sequence on a raw completion.
pub fn extract_payload(raw: &str) -> Option<(Value, ParseTier)> {
    let unfenced = strip_code_fence(raw);
    let candidate = object_span(unfenced).unwrap_or(unfenced);

    match serde_json::from_str::<Value>(candidate) {
        Ok(v) => return Some((v, ParseTier::Strict)),
        Err(e) => debug!(error = %e, "strict parse failed"),
    }

    let repaired = repair(candidate);
    match serde_json::from_str::<Value>(&repaired) {
        Ok(v) => return Some((v, ParseTier::Repaired)),
        Err(e) => debug!(error = %e, "repaired parse failed"),
    }

    if let Some(fragment) = test_cases_fragment(unfenced) {
        let parsed = serde_json::from_str::<Value>(fragment)
            .or_else(|_| serde_json::from_str::<Value>(&repair(fragment)));
        match parsed {
            Ok(arr @ Value::Array(_)) => {
                return Some((json!({ "test_cases": arr }), ParseTier::Fragment))
            }
            Ok(_) => debug!("test_cases fragment is not an array"),
            Err(e) => debug!(error = %e, "fragment parse failed"),
        }
    }

    warn!("completion is not recoverable JSON");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fence_interior_is_taken() {
        let raw = "Here you go:\n```json\n{\"a\": 1}\n```\nThanks";
        assert_eq!(strip_code_fence(raw), "{\"a\": 1}");

        let raw = "```\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fence(raw), "{\"a\": 1}");

        let raw = "```{\"a\": 1}```";
        assert_eq!(strip_code_fence(raw), "{\"a\": 1}");
    }

    #[test]
    fn unterminated_fence_keeps_the_rest() {
        let raw = "```json\n{\"a\": 1}";
        assert_eq!(strip_code_fence(raw), "{\"a\": 1}");
    }

    #[test]
    fn span_is_first_open_to_last_close() {
        assert_eq!(object_span("noise {\"a\": {\"b\": 2}} tail"), Some("{\"a\": {\"b\": 2}}"));
        assert_eq!(object_span("no braces"), None);
        assert_eq!(object_span("} backwards {"), None);
    }

    #[test]
    fn repair_inserts_missing_commas() {
        let broken = "{\n  \"a\": \"x\"\n  \"b\": \"y\"\n}";
        let fixed = repair(broken);
        let v: Value = serde_json::from_str(&fixed).unwrap();
        assert_eq!(v["b"], "y");
    }

    #[test]
    fn repair_strips_trailing_commas() {
        let broken = "{\"a\": [1, 2,], \"b\": {\"c\": 3,},}";
        let v: Value = serde_json::from_str(&repair(broken)).unwrap();
        assert_eq!(v["a"][1], 2);
        assert_eq!(v["b"]["c"], 3);
    }

    #[test]
    fn fenced_trailing_comma_recovers() {
        let raw = "```json\n{\"test_cases\": [{\"test_case_id\":1, \"test_title\": \"Login\",}]}\n```";
        let (v, tier) = extract_payload(raw).unwrap();
        assert_eq!(tier, ParseTier::Repaired);
        assert_eq!(v["test_cases"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn fragment_ignores_brackets_inside_strings() {
        let text = r#"{"meta": oops, "test_cases": [{"t": "a ] b"}, {"t": "c"}] trailing"#;
        assert_eq!(
            test_cases_fragment(text),
            Some(r#"[{"t": "a ] b"}, {"t": "c"}]"#)
        );
    }

    #[test]
    fn fragment_tier_wraps_the_array() {
        let raw = r#"{"summary": this is not json, "test_cases": [{"test_case_id": 1}]"#;
        let (v, tier) = extract_payload(raw).unwrap();
        assert_eq!(tier, ParseTier::Fragment);
        assert_eq!(v["test_cases"][0]["test_case_id"], 1);
    }

    #[test]
    fn garbage_is_unrecoverable() {
        assert!(extract_payload("I could not generate test cases, sorry.").is_none());
        assert!(extract_payload("{ totally: broken").is_none());
    }

    #[test]
    fn strict_tier_for_clean_json() {
        let (_, tier) = extract_payload("{\"test_cases\": []}").unwrap();
        assert_eq!(tier, ParseTier::Strict);
    }
}
