//! JSON Schema validation for guardrail configuration documents.
//!
//! The schema ships inside the crate (`schema/guardrail-config.schema.json`)
//! and is compiled once on first use.

use std::sync::OnceLock;

use serde_json::Value as JsonValue;

/// Embedded configuration schema (loaded at compile time).
const CONFIG_SCHEMA_JSON: &str = include_str!("../../schema/guardrail-config.schema.json");

/// Compiled validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

fn validator() -> Result<&'static jsonschema::Validator, String> {
    COMPILED_SCHEMA
        .get_or_init(|| {
            let schema: JsonValue = serde_json::from_str(CONFIG_SCHEMA_JSON)
                .map_err(|e| format!("Invalid schema JSON: {}", e))?;
            jsonschema::options()
                .build(&schema)
                .map_err(|e| format!("Failed to compile schema: {}", e))
        })
        .as_ref()
        .map_err(Clone::clone)
}

/// Validate a configuration document against the schema.
///
/// Returns every violation, each suffixed with its instance path.
pub fn validate_config_schema(document: &JsonValue) -> Result<(), Vec<String>> {
    let validator = validator().map_err(|e| vec![e])?;

    let errors: Vec<String> = validator
        .iter_errors(document)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_object_is_valid() {
        assert!(validate_config_schema(&json!({})).is_ok());
    }

    #[test]
    fn test_full_document_is_valid() {
        let doc = json!({
            "sensitivity": "high",
            "risk_threshold": "active",
            "reasoning_enabled": true,
            "confidence_enabled": true,
            "temperature": 0.0,
            "max_tokens": 256,
            "timeout_seconds": 15
        });
        assert!(validate_config_schema(&doc).is_ok());
    }

    #[test]
    fn test_unknown_sensitivity_fails() {
        let errors = validate_config_schema(&json!({ "sensitivity": "extreme" })).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_numeric_threshold_fails() {
        assert!(validate_config_schema(&json!({ "risk_threshold": 2 })).is_err());
    }

    #[test]
    fn test_additional_properties_fail() {
        assert!(validate_config_schema(&json!({ "retries": 3 })).is_err());
    }

    #[test]
    fn test_temperature_range() {
        assert!(validate_config_schema(&json!({ "temperature": 2.5 })).is_err());
        assert!(validate_config_schema(&json!({ "temperature": -0.1 })).is_err());
    }

    #[test]
    fn test_non_object_fails() {
        assert!(validate_config_schema(&json!(null)).is_err());
        assert!(validate_config_schema(&json!(["low"])).is_err());
    }
}
