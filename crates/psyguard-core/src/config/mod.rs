//! Guardrail configuration.
//!
//! Configuration is checked twice before any guardrail exists: structurally
//! against the embedded JSON Schema, then semantically by
//! [`GuardrailConfig::validate`]. Both failures are [`ConfigError`]s raised at
//! construction time, never at call time.

mod schema;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::taxonomy::{HarmClassification, HarmPolicy, RiskLevel, Sensitivity};

pub use schema::validate_config_schema;

/// Errors raised while building configuration or guardrails.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Config does not match schema: {}", .0.join("; "))]
    SchemaViolation(Vec<String>),

    #[error("Invalid value for {field}: {detail}")]
    InvalidValue { field: &'static str, detail: String },

    #[error("Unknown guardrail '{name}'. Available: {available:?}")]
    UnknownGuardrail { name: String, available: Vec<String> },

    #[error("Guardrail '{0}' is already registered")]
    DuplicateGuardrail(String),
}

/// Configuration shared by every guardrail created through the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailConfig {
    /// Prompt strictness
    pub sensitivity: Sensitivity,

    /// Lowest risk level that triggers
    pub risk_threshold: RiskLevel,

    /// Ask the model for a short analysis
    pub reasoning_enabled: bool,

    /// Ask the model for a confidence score
    pub confidence_enabled: bool,

    /// Sampling temperature forwarded to the driver
    pub temperature: f32,

    /// Completion cap forwarded to the driver
    pub max_tokens: Option<u32>,

    /// Upper bound on one model call
    pub timeout_seconds: u64,

    /// Lowest harm classification that triggers `ai_harm_detection`
    pub harm_threshold: HarmClassification,

    /// Policies described to the harm classifier
    pub monitored_policies: Vec<HarmPolicy>,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            sensitivity: Sensitivity::Medium,
            risk_threshold: RiskLevel::Possible,
            reasoning_enabled: true,
            confidence_enabled: false,
            temperature: 0.1,
            max_tokens: None,
            timeout_seconds: 30,
            harm_threshold: HarmClassification::Borderline,
            monitored_policies: HarmPolicy::ALL.to_vec(),
        }
    }
}

impl GuardrailConfig {
    /// Parse from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let document: JsonValue = serde_yaml::from_str(yaml)?;
        Self::from_document(document)
    }

    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let document: JsonValue = serde_json::from_str(json)?;
        Self::from_document(document)
    }

    /// Parse from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse from a file, picking the format by extension (`.json`, else YAML).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json_file(path),
            _ => Self::from_yaml_file(path),
        }
    }

    fn from_document(document: JsonValue) -> Result<Self, ConfigError> {
        validate_config_schema(&document).map_err(ConfigError::SchemaViolation)?;
        let config: GuardrailConfig = serde_json::from_value(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Semantic checks the schema cannot express.
    ///
    /// Also the gate for configs built in code, which never see the schema.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_threshold(self.risk_threshold)?;

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "temperature",
                detail: format!("{} is outside 0.0..=2.0", self.temperature),
            });
        }

        if self.max_tokens == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "max_tokens",
                detail: "must be greater than 0".to_string(),
            });
        }

        if self.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout_seconds",
                detail: "must be greater than 0".to_string(),
            });
        }

        validate_harm_threshold(self.harm_threshold)?;

        if self.monitored_policies.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "monitored_policies",
                detail: "at least one policy must be monitored".to_string(),
            });
        }

        Ok(())
    }
}

/// A threshold of `none` would trigger on every response.
pub fn validate_threshold(threshold: RiskLevel) -> Result<(), ConfigError> {
    if threshold == RiskLevel::None {
        return Err(ConfigError::InvalidValue {
            field: "risk_threshold",
            detail: "'none' would trigger on every response; use 'possible' or higher"
                .to_string(),
        });
    }
    Ok(())
}

/// A harm threshold of `safe` would trigger on every response.
pub fn validate_harm_threshold(threshold: HarmClassification) -> Result<(), ConfigError> {
    if threshold == HarmClassification::Safe {
        return Err(ConfigError::InvalidValue {
            field: "harm_threshold",
            detail: "'safe' would trigger on every response; use 'borderline' or 'harmful'"
                .to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_yaml_mapping() {
        let config = GuardrailConfig::from_yaml("{}").unwrap();
        assert_eq!(config, GuardrailConfig::default());
    }

    #[test]
    fn test_parse_yaml() {
        let config = GuardrailConfig::from_yaml(
            r#"
sensitivity: high
risk_threshold: active
confidence_enabled: true
max_tokens: 300
"#,
        )
        .unwrap();
        assert_eq!(config.sensitivity, Sensitivity::High);
        assert_eq!(config.risk_threshold, RiskLevel::Active);
        assert!(config.confidence_enabled);
        assert!(config.reasoning_enabled);
        assert_eq!(config.max_tokens, Some(300));
    }

    #[test]
    fn test_parse_json() {
        let config =
            GuardrailConfig::from_json(r#"{"sensitivity": "low", "temperature": 0.0}"#).unwrap();
        assert_eq!(config.sensitivity, Sensitivity::Low);
        assert_eq!(config.temperature, 0.0);
    }

    #[test]
    fn test_threshold_none_rejected() {
        let result = GuardrailConfig::from_yaml("risk_threshold: none");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                field: "risk_threshold",
                ..
            })
        ));
    }

    #[test]
    fn test_schema_violation_reported() {
        let result = GuardrailConfig::from_yaml("sensitivity: extreme");
        assert!(matches!(result, Err(ConfigError::SchemaViolation(_))));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = GuardrailConfig::from_json(r#"{"retry_attempts": 3}"#);
        assert!(matches!(result, Err(ConfigError::SchemaViolation(_))));
    }

    #[test]
    fn test_programmatic_config_validated() {
        let config = GuardrailConfig {
            temperature: 3.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = GuardrailConfig {
            timeout_seconds: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_harm_settings() {
        let config = GuardrailConfig::from_yaml(
            r#"
harm_threshold: harmful
monitored_policies: ["1.3", "2.1"]
"#,
        )
        .unwrap();
        assert_eq!(config.harm_threshold, HarmClassification::Harmful);
        assert_eq!(
            config.monitored_policies,
            vec![HarmPolicy::InstructionalHarm, HarmPolicy::EatingDisorders]
        );

        assert!(matches!(
            GuardrailConfig::from_yaml("harm_threshold: safe"),
            Err(ConfigError::InvalidValue {
                field: "harm_threshold",
                ..
            })
        ));
        assert!(matches!(
            GuardrailConfig::from_yaml("monitored_policies: []"),
            Err(ConfigError::SchemaViolation(_))
        ));
        assert!(matches!(
            GuardrailConfig::from_yaml("monitored_policies: [\"3.1\"]"),
            Err(ConfigError::SchemaViolation(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = GuardrailConfig::from_file("/nonexistent/psyguard.yaml");
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }
}
