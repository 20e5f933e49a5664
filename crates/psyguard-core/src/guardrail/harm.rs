//! Harm threshold validation over the harm classifier's verdict.
//!
//! Mirrors [`RiskThresholdValidator`](super::RiskThresholdValidator) and
//! fails closed the same way:
//!
//! | outcome | code | severity |
//! |---------|------|----------|
//! | no strategy produced a mapping | `PARSE_FAILURE` | critical |
//! | classification missing or unknown | `INVALID_HARM_CLASSIFICATION` | critical |
//! | any other binding error | `INVALID_STRUCTURED_OUTPUT` | error |
//! | `classification >= threshold` | `HARMFUL_CONTENT_DETECTED` | by classification |
//! | confidence clamped | `CONFIDENCE_CLAMPED` | warning, validity unchanged |
//!
//! A borderline verdict is a warning, a harmful one critical.

use crate::catalog::patterns::redact;
use crate::config::{validate_harm_threshold, ConfigError};
use crate::output::{HarmVerdict, OutputError};
use crate::parser;
use crate::report::{codes, Severity, ValidationReport, Violation};
use crate::taxonomy::HarmClassification;

use super::risk::{binding_failure, clamp_warnings, fail_closed, parse_failure};
use super::{ResponseValidator, ValidatorError};

/// Triggers when the harm classification meets a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarmThresholdValidator {
    threshold: HarmClassification,
}

impl HarmThresholdValidator {
    /// Fails for a threshold of [`HarmClassification::Safe`].
    pub fn new(threshold: HarmClassification) -> Result<Self, ConfigError> {
        validate_harm_threshold(threshold)?;
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> HarmClassification {
        self.threshold
    }

    /// Judge a classifier reply. Errors become failing reports.
    pub fn check(&self, response: &str) -> ValidationReport {
        let parsed = match parser::parse(response) {
            Ok(parsed) => parsed,
            Err(e) => return self.fail_closed(parse_failure(&e)),
        };

        let verdict = match HarmVerdict::from_parsed(&parsed) {
            Ok(verdict) => verdict,
            Err(e) => return self.output_failure(e),
        };

        let triggered = verdict.is_triggered(self.threshold);
        let policy_id = verdict.violated_policy.map_or("N/A", |p| p.id());
        tracing::debug!(
            classification = %verdict.classification,
            policy = policy_id,
            threshold = %self.threshold,
            triggered,
            "harm classified"
        );

        let mut report = ValidationReport::valid();
        if triggered {
            let mut violation = Violation::new(
                severity_for(verdict.classification),
                codes::HARMFUL_CONTENT_DETECTED,
                format!(
                    "Reply classified {} (threshold {}), policy {}",
                    verdict.classification, self.threshold, policy_id
                ),
            )
            .with_context("classification", verdict.classification.label())
            .with_context("violated_policy_id", policy_id);
            if let Some(policy) = verdict.violated_policy {
                violation = violation.with_context("policy", policy.description());
            }
            report = ValidationReport::invalid(violation);
        }

        for warning in clamp_warnings(&verdict.flags) {
            report = report.with_violation(warning);
        }

        report = report
            .with_metadata("classification", verdict.classification.label())
            .with_metadata("violated_policy_id", policy_id)
            .with_metadata("triggered", triggered)
            .with_metadata("harm_threshold", self.threshold.label())
            .with_metadata("parse_strategy", parsed.strategy().label());
        if let Some(reasoning) = &verdict.reasoning {
            report = report.with_metadata("reasoning", redact(reasoning));
        }
        if let Some(confidence) = verdict.confidence {
            report = report.with_metadata("confidence", confidence);
        }
        report
    }

    fn output_failure(&self, error: OutputError) -> ValidationReport {
        let (severity, code) = match &error {
            OutputError::MissingField {
                field: "classification",
                ..
            }
            | OutputError::InvalidField {
                field: "classification",
                ..
            } => (Severity::Critical, codes::INVALID_HARM_CLASSIFICATION),
            _ => (Severity::Error, codes::INVALID_STRUCTURED_OUTPUT),
        };
        self.fail_closed(binding_failure(&error, severity, code))
    }

    fn fail_closed(&self, violation: Violation) -> ValidationReport {
        fail_closed(violation).with_metadata("harm_threshold", self.threshold.label())
    }
}

impl ResponseValidator for HarmThresholdValidator {
    fn name(&self) -> &str {
        "harm_threshold"
    }

    fn validate(&self, response: &str) -> Result<ValidationReport, ValidatorError> {
        Ok(self.check(response))
    }
}

fn severity_for(classification: HarmClassification) -> Severity {
    match classification {
        HarmClassification::Safe => Severity::Info,
        HarmClassification::Borderline => Severity::Warning,
        HarmClassification::Harmful => Severity::Critical,
    }
}
