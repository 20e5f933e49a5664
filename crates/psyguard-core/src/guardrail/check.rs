//! Check-only guardrail: passes requests through, validates responses.

use std::fmt;
use std::sync::Arc;

use crate::report::{codes, Severity, ValidationReport, Violation};
use crate::types::{ChatRequest, GuardedRequest};

use super::{Guardrail, ResponseValidator, ValidatorError};

/// Runs an ordered list of validators over every response.
///
/// Reports are merged in validator order. A validator that returns an error
/// contributes a failing report, so the guardrail fails closed.
#[derive(Clone)]
pub struct CheckGuardrail {
    name: String,
    validators: Vec<Arc<dyn ResponseValidator>>,
}

impl CheckGuardrail {
    /// Create a guardrail with no validators.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            validators: Vec::new(),
        }
    }

    /// Append a validator.
    pub fn with_validator(mut self, validator: impl ResponseValidator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Number of validators.
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Whether no validators are configured.
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    fn run(&self, validator: &dyn ResponseValidator, response: &str) -> ValidationReport {
        match validator.validate(response) {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(
                    guardrail = %self.name,
                    validator = validator.name(),
                    error = %e,
                    "validator errored, failing closed"
                );
                ValidationReport::invalid(
                    Violation::new(
                        Severity::Error,
                        codes::VALIDATOR_ERROR,
                        format!("Validator {} errored: {}", validator.name(), e),
                    )
                    .with_context("validator", validator.name()),
                )
            }
        }
    }
}

impl Guardrail for CheckGuardrail {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, request: &ChatRequest) -> GuardedRequest {
        GuardedRequest::passthrough(request)
            .with_metadata("guardrail_type", "check")
            .with_metadata("guardrail", self.name.clone())
            .with_metadata("num_validators", self.validators.len())
    }

    fn validate(&self, response: &str) -> ValidationReport {
        let merged = ValidationReport::merge_all(
            self.validators
                .iter()
                .map(|validator| self.run(validator.as_ref(), response)),
        );

        merged
            .with_metadata("guardrail_type", "check")
            .with_metadata("num_validators_executed", self.validators.len())
    }
}

impl fmt::Debug for CheckGuardrail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.validators.iter().map(|v| v.name()).collect();
        f.debug_struct("CheckGuardrail")
            .field("name", &self.name)
            .field("validators", &names)
            .finish()
    }
}

/// Adapts a closure into a [`ResponseValidator`].
pub struct FnValidator<F> {
    name: String,
    func: F,
}

impl<F> FnValidator<F>
where
    F: Fn(&str) -> Result<ValidationReport, ValidatorError> + Send + Sync,
{
    /// Wrap `func` under `name`.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> ResponseValidator for FnValidator<F>
where
    F: Fn(&str) -> Result<ValidationReport, ValidatorError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, response: &str) -> Result<ValidationReport, ValidatorError> {
        (self.func)(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;

    type Check = Result<ValidationReport, ValidatorError>;

    fn rejects(word: &'static str) -> FnValidator<impl Fn(&str) -> Check> {
        FnValidator::new(format!("no_{word}"), move |response: &str| {
            if response.contains(word) {
                Ok(ValidationReport::invalid(Violation::new(
                    Severity::Error,
                    format!("CONTAINS_{}", word.to_uppercase()),
                    format!("response mentions {word}"),
                )))
            } else {
                Ok(ValidationReport::valid())
            }
        })
    }

    #[test]
    fn test_apply_is_passthrough() {
        let guardrail = CheckGuardrail::new("check").with_validator(rejects("x"));
        let request = ChatRequest::new(vec![Message::user("hello")]);
        let guarded = guardrail.apply(&request);

        assert_eq!(guarded.modified_request, request);
        assert!(!guarded.is_modified());
        assert_eq!(guarded.metadata["num_validators"], 1);
    }

    #[test]
    fn test_no_validators_is_valid() {
        let report = CheckGuardrail::new("empty").validate("anything");
        assert!(report.is_valid);
        assert_eq!(report.metadata["num_validators_executed"], 0);
    }

    #[test]
    fn test_validators_merge_in_order() {
        let guardrail = CheckGuardrail::new("check")
            .with_validator(rejects("alpha"))
            .with_validator(rejects("beta"));

        let report = guardrail.validate("alpha and beta");
        assert!(!report.is_valid);
        let codes: Vec<_> = report.violations.iter().map(|v| v.code.as_str()).collect();
        assert_eq!(codes, vec!["CONTAINS_ALPHA", "CONTAINS_BETA"]);

        assert!(guardrail.validate("gamma").is_valid);
    }

    #[test]
    fn test_erroring_validator_fails_closed() {
        let broken = FnValidator::new("broken", |_: &str| {
            Err(ValidatorError::Failed("lookup table missing".to_string()))
        });
        let guardrail = CheckGuardrail::new("check")
            .with_validator(broken)
            .with_validator(rejects("beta"));

        let report = guardrail.validate("fine");
        assert!(!report.is_valid);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].code, codes::VALIDATOR_ERROR);
        assert_eq!(report.violations[0].context["validator"], "broken");
    }

    #[test]
    fn test_debug_lists_validator_names() {
        let guardrail = CheckGuardrail::new("check").with_validator(rejects("x"));
        let debug = format!("{:?}", guardrail);
        assert!(debug.contains("no_x"));
    }
}
