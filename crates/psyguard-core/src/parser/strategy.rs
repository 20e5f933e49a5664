//! The three extraction strategies, from strict to permissive.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value as JsonValue};

/// Field names the tag-soup strategy recognises.
pub const KNOWN_TAGS: [&str; 4] = ["risk", "reason", "analysis", "confidence"];

lazy_static! {
    /// First fenced block, optionally tagged `json`. Non-greedy so the
    /// closing fence is the nearest one.
    static ref FENCE_PATTERN: Regex = Regex::new(r"(?is)```(?:json)?\s*(.*?)\s*```").unwrap();

    /// One matcher per known tag; names are case-insensitive and the
    /// markers tolerate inner whitespace (`< risk >`, `</ risk>`).
    static ref TAG_PATTERNS: Vec<(&'static str, Regex)> = KNOWN_TAGS
        .iter()
        .map(|name| {
            let pattern = format!(r"(?is)<\s*{name}\s*>(.*?)<\s*/\s*{name}\s*>");
            (*name, Regex::new(&pattern).unwrap())
        })
        .collect();
}

/// Decode the whole string as a JSON object.
pub(super) fn direct_json(raw: &str) -> Result<Map<String, JsonValue>, String> {
    let value: JsonValue =
        serde_json::from_str(raw).map_err(|e| format!("not valid JSON: {}", e))?;
    into_object(value)
}

/// Decode the interior of the first fenced block only.
pub(super) fn fenced_block(raw: &str) -> Result<Map<String, JsonValue>, String> {
    let caps = FENCE_PATTERN
        .captures(raw)
        .ok_or_else(|| "no fenced block found".to_string())?;
    let inner = caps.get(1).map(|m| m.as_str()).unwrap_or_default();

    if inner.is_empty() {
        return Err("first fenced block is empty".to_string());
    }

    let value: JsonValue = serde_json::from_str(inner)
        .map_err(|e| format!("first fenced block is not valid JSON: {}", e))?;
    into_object(value).map_err(|reason| format!("first fenced block {}", reason))
}

/// Collect `<name>value</name>` pairs for the known tags.
///
/// Absent tags are omitted, never defaulted. A repeated tag keeps its first
/// occurrence.
pub(super) fn tag_soup(raw: &str) -> Result<Map<String, JsonValue>, String> {
    let mut fields = Map::new();

    for (name, pattern) in TAG_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(raw) {
            let value = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
            fields.insert((*name).to_string(), JsonValue::String(value.to_string()));
        }
    }

    if fields.is_empty() {
        return Err(format!("none of the known tags {:?} present", KNOWN_TAGS));
    }

    Ok(fields)
}

fn into_object(value: JsonValue) -> Result<Map<String, JsonValue>, String> {
    match value {
        JsonValue::Object(map) => Ok(map),
        JsonValue::Array(_) => Err("decoded to a list, not an object".to_string()),
        other => Err(format!("decoded to a scalar ({}), not an object", kind(&other))),
    }
}

fn kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_json_rejects_list() {
        let err = direct_json("[1, 2]").unwrap_err();
        assert!(err.contains("list"));
    }

    #[test]
    fn test_direct_json_rejects_scalar() {
        let err = direct_json("42").unwrap_err();
        assert!(err.contains("scalar"));
    }

    #[test]
    fn test_fenced_block_untagged() {
        let map = fenced_block("text\n```\n{\"risk\": 1}\n```").unwrap();
        assert_eq!(map["risk"], 1);
    }

    #[test]
    fn test_fenced_block_tag_is_case_insensitive() {
        let map = fenced_block("```JSON\n{\"risk\": 0}\n```").unwrap();
        assert_eq!(map["risk"], 0);
    }

    #[test]
    fn test_fenced_block_empty() {
        let err = fenced_block("```json\n\n```").unwrap_err();
        assert!(err.contains("empty"));
    }

    #[test]
    fn test_fenced_block_other_language_fails() {
        assert!(fenced_block("```python\nprint('hello')\n```").is_err());
    }

    #[test]
    fn test_tag_soup_whitespace_and_case() {
        let map = tag_soup("< RISK > 2 </risk>\n<Reason>  plan mentioned </REASON>").unwrap();
        assert_eq!(map["risk"], "2");
        assert_eq!(map["reason"], "plan mentioned");
        assert!(!map.contains_key("analysis"));
    }

    #[test]
    fn test_tag_soup_first_occurrence_wins() {
        let map = tag_soup("<risk>1</risk><risk>3</risk>").unwrap();
        assert_eq!(map["risk"], "1");
    }

    #[test]
    fn test_tag_soup_ignores_unknown_tags() {
        assert!(tag_soup("<key>value</key>").is_err());
    }

    #[test]
    fn test_tag_soup_multiline_value() {
        let map = tag_soup("<analysis>line one\nline two</analysis>").unwrap();
        assert_eq!(map["analysis"], "line one\nline two");
    }
}
