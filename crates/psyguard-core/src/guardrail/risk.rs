//! Risk threshold validation: parse, bind, decide.
//!
//! Every failure is converted to a failing report so a response that cannot
//! be read is never treated as safe:
//!
//! | outcome | code | severity |
//! |---------|------|----------|
//! | no strategy produced a mapping | `PARSE_FAILURE` | critical |
//! | risk missing or outside `0..=3` | `INVALID_RISK_VALUE` | critical |
//! | any other binding error | `INVALID_STRUCTURED_OUTPUT` | error |
//! | `risk >= threshold` | `RISK_THRESHOLD_EXCEEDED` | by risk level |
//! | confidence clamped | `CONFIDENCE_CLAMPED` | warning, validity unchanged |
//!
//! Model text echoed into a report (raw response, partial fields, reason,
//! analysis) passes through [`redact`] first.

use serde_json::Value as JsonValue;

use crate::catalog::patterns::{redact, redact_json};
use crate::config::{validate_threshold, ConfigError};
use crate::output::{OutputError, OutputFlag, StructuredOutput};
use crate::parser::{self, ParseError};
use crate::report::{codes, Severity, ValidationReport, Violation};
use crate::taxonomy::RiskLevel;

use super::{ResponseValidator, ValidatorError};

/// Triggers when the classified risk meets a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskThresholdValidator {
    threshold: RiskLevel,
}

impl RiskThresholdValidator {
    /// Fails for a threshold of [`RiskLevel::None`].
    pub fn new(threshold: RiskLevel) -> Result<Self, ConfigError> {
        validate_threshold(threshold)?;
        Ok(Self { threshold })
    }

    /// The configured threshold.
    pub fn threshold(&self) -> RiskLevel {
        self.threshold
    }

    /// Judge a response. Infallible: errors become failing reports.
    pub fn check(&self, response: &str) -> ValidationReport {
        let parsed = match parser::parse(response) {
            Ok(parsed) => parsed,
            Err(e) => return self.fail_closed(parse_failure(&e)),
        };

        let output = match StructuredOutput::from_parsed(&parsed) {
            Ok(output) => output,
            Err(e) => return self.output_failure(e),
        };

        let triggered = output.is_triggered(self.threshold);
        let reason = redact(&output.reason);
        tracing::debug!(
            risk = output.risk.level(),
            threshold = self.threshold.level(),
            triggered,
            strategy = %parsed.strategy(),
            "risk classified"
        );

        let mut report = ValidationReport::valid();
        if triggered {
            report = ValidationReport::invalid(
                Violation::new(
                    severity_for(output.risk),
                    codes::RISK_THRESHOLD_EXCEEDED,
                    format!(
                        "Risk {} meets threshold {}: {}",
                        output.risk, self.threshold, reason
                    ),
                )
                .with_context("risk", output.risk.level())
                .with_context("threshold", self.threshold.level()),
            );
        }

        for warning in clamp_warnings(&output.flags) {
            report = report.with_violation(warning);
        }

        report = report
            .with_metadata("risk", output.risk.level())
            .with_metadata("risk_label", output.risk.label())
            .with_metadata("reason", reason)
            .with_metadata("triggered", triggered)
            .with_metadata("threshold", self.threshold.level())
            .with_metadata("parse_strategy", parsed.strategy().label());
        if let Some(analysis) = &output.analysis {
            report = report.with_metadata("analysis", redact(analysis));
        }
        if let Some(confidence) = output.confidence {
            report = report.with_metadata("confidence", confidence);
        }
        report
    }

    fn output_failure(&self, error: OutputError) -> ValidationReport {
        let (severity, code) = match error {
            OutputError::InvalidRiskValue { .. } => (Severity::Critical, codes::INVALID_RISK_VALUE),
            _ => (Severity::Error, codes::INVALID_STRUCTURED_OUTPUT),
        };
        self.fail_closed(binding_failure(&error, severity, code))
    }

    fn fail_closed(&self, violation: Violation) -> ValidationReport {
        fail_closed(violation).with_metadata("threshold", self.threshold.level())
    }
}

/// `PARSE_FAILURE` with every strategy's reason and the redacted text.
pub(super) fn parse_failure(error: &ParseError) -> Violation {
    tracing::warn!(reason = %error.reason, "unparseable response, failing closed");
    let attempts: Vec<JsonValue> = error
        .attempts
        .iter()
        .map(|a| JsonValue::from(format!("{}: {}", a.strategy, a.reason)))
        .collect();

    Violation::new(
        Severity::Critical,
        codes::PARSE_FAILURE,
        format!("Could not parse model response: {}", error.reason),
    )
    .with_context("attempts", attempts)
    .with_context("raw_text", redact(&error.raw_text))
}

/// A binding failure carrying the redacted partial mapping.
pub(super) fn binding_failure(error: &OutputError, severity: Severity, code: &str) -> Violation {
    tracing::warn!(error = %error, "structured output rejected, failing closed");
    let partial = redact_json(&JsonValue::Object(error.partial().clone()));
    Violation::new(severity, code, error.to_string()).with_context("partial", partial)
}

/// One `CONFIDENCE_CLAMPED` warning per clamp.
pub(super) fn clamp_warnings(flags: &[OutputFlag]) -> impl Iterator<Item = Violation> + '_ {
    flags.iter().map(|flag| {
        let OutputFlag::ConfidenceClamped { original, clamped } = flag;
        Violation::new(
            Severity::Warning,
            codes::CONFIDENCE_CLAMPED,
            format!("Confidence {} clamped to {}", original, clamped),
        )
        .with_context("original", *original)
        .with_context("clamped", *clamped)
    })
}

pub(super) fn fail_closed(violation: Violation) -> ValidationReport {
    ValidationReport::invalid(violation)
        .with_metadata("triggered", true)
        .with_metadata("fail_closed", true)
}

impl ResponseValidator for RiskThresholdValidator {
    fn name(&self) -> &str {
        "risk_threshold"
    }

    fn validate(&self, response: &str) -> Result<ValidationReport, ValidatorError> {
        Ok(self.check(response))
    }
}

fn severity_for(risk: RiskLevel) -> Severity {
    match risk {
        RiskLevel::None => Severity::Info,
        RiskLevel::Possible => Severity::Warning,
        RiskLevel::Active => Severity::Error,
        RiskLevel::PlanImminent => Severity::Critical,
    }
}
