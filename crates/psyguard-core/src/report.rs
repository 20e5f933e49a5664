//! Violations, validation reports and the report merge rule.
//!
//! Merge is deterministic:
//! 1. `is_valid` is the logical AND of every input
//! 2. violations are concatenated in input order, never re-sorted
//! 3. metadata is a shallow union where later keys overwrite earlier ones
//!
//! Input order carries guardrail priority, so callers must not rely on an
//! earlier report's metadata surviving a collision.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::types::Metadata;

/// Violation codes emitted by the built-in guardrails.
pub mod codes {
    pub const PARSE_FAILURE: &str = "PARSE_FAILURE";
    pub const INVALID_RISK_VALUE: &str = "INVALID_RISK_VALUE";
    pub const INVALID_STRUCTURED_OUTPUT: &str = "INVALID_STRUCTURED_OUTPUT";
    pub const RISK_THRESHOLD_EXCEEDED: &str = "RISK_THRESHOLD_EXCEEDED";
    pub const CONFIDENCE_CLAMPED: &str = "CONFIDENCE_CLAMPED";
    pub const VALIDATOR_ERROR: &str = "VALIDATOR_ERROR";
    pub const PII_DETECTED: &str = "PII_DETECTED";
    pub const CREDENTIALS_DETECTED: &str = "CREDENTIALS_DETECTED";
    pub const HARMFUL_CONTENT_DETECTED: &str = "HARMFUL_CONTENT_DETECTED";
    pub const INVALID_HARM_CLASSIFICATION: &str = "INVALID_HARM_CLASSIFICATION";
}

/// How serious a violation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

/// A single recorded policy failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub severity: Severity,

    /// Machine-readable code (see [`codes`])
    pub code: String,

    /// Human-readable explanation
    pub message: String,

    #[serde(default)]
    pub context: Metadata,
}

impl Violation {
    /// Create a violation with empty context.
    pub fn new(severity: Severity, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: code.into(),
            message: message.into(),
            context: Metadata::new(),
        }
    }

    /// Attach a context entry.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Outcome of validating one response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,

    #[serde(default)]
    pub violations: Vec<Violation>,

    #[serde(default)]
    pub metadata: Metadata,
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::valid()
    }
}

impl ValidationReport {
    /// A passing report with no findings. Identity element of [`merge`](Self::merge).
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            violations: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    /// A failing report carrying a single violation.
    pub fn invalid(violation: Violation) -> Self {
        Self {
            is_valid: false,
            violations: vec![violation],
            metadata: Metadata::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Append a violation without changing validity.
    pub fn with_violation(mut self, violation: Violation) -> Self {
        self.violations.push(violation);
        self
    }

    /// Combine two reports into a new one. `other` wins metadata collisions.
    pub fn merge(self, other: ValidationReport) -> ValidationReport {
        let mut violations = self.violations;
        violations.extend(other.violations);

        let mut metadata = self.metadata;
        metadata.extend(other.metadata);

        ValidationReport {
            is_valid: self.is_valid && other.is_valid,
            violations,
            metadata,
        }
    }

    /// Fold any number of reports left to right. An empty input is valid.
    pub fn merge_all<I>(reports: I) -> ValidationReport
    where
        I: IntoIterator<Item = ValidationReport>,
    {
        reports
            .into_iter()
            .fold(ValidationReport::valid(), ValidationReport::merge)
    }

    /// Highest severity among the violations, if any.
    pub fn max_severity(&self) -> Option<Severity> {
        self.violations.iter().map(|v| v.severity).max()
    }

    /// Whether any violation carries `code`.
    pub fn has_code(&self, code: &str) -> bool {
        self.violations.iter().any(|v| v.code == code)
    }
}
