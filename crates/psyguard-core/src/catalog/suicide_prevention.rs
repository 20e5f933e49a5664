//! `suicide_prevention`: asks the model to classify suicide risk in the user's
//! messages and judges the classification against the configured threshold.

use crate::config::{ConfigError, GuardrailConfig};
use crate::guardrail::{CheckGuardrail, Guardrail, PromptGuardrail, RiskThresholdValidator};
use crate::report::ValidationReport;
use crate::taxonomy::Sensitivity;
use crate::types::{ChatRequest, GuardedRequest};

use super::prompts::build_suicide_prompt;

pub const NAME: &str = "suicide_prevention";

/// Classification prompt rendered per request, plus a risk threshold check.
#[derive(Debug, Clone)]
pub struct SuicidePreventionGuardrail {
    sensitivity: Sensitivity,
    reasoning: bool,
    confidence: bool,
    check: CheckGuardrail,
    validator: RiskThresholdValidator,
}

impl SuicidePreventionGuardrail {
    pub fn new(config: &GuardrailConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let validator = RiskThresholdValidator::new(config.risk_threshold)?;

        Ok(Self {
            sensitivity: config.sensitivity,
            reasoning: config.reasoning_enabled,
            confidence: config.confidence_enabled,
            check: CheckGuardrail::new(format!("{NAME}.check")).with_validator(validator),
            validator,
        })
    }

    /// Render the instruction for one request.
    pub fn render(&self, request: &ChatRequest) -> String {
        build_suicide_prompt(
            &request.user_transcript(),
            self.sensitivity,
            self.reasoning,
            self.confidence,
        )
    }
}

impl Guardrail for SuicidePreventionGuardrail {
    fn name(&self) -> &str {
        NAME
    }

    fn apply(&self, request: &ChatRequest) -> GuardedRequest {
        PromptGuardrail::new(NAME, self.render(request))
            .with_metadata("sensitivity", self.sensitivity.label())
            .with_metadata("reasoning_enabled", self.reasoning)
            .with_metadata("confidence_enabled", self.confidence)
            .with_metadata("risk_threshold", self.validator.threshold().level())
            .apply(request)
    }

    fn validate(&self, response: &str) -> ValidationReport {
        self.check.validate(response).with_metadata("guardrail", NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::codes;
    use crate::taxonomy::RiskLevel;
    use crate::types::Message;

    fn guardrail(threshold: RiskLevel) -> SuicidePreventionGuardrail {
        SuicidePreventionGuardrail::new(&GuardrailConfig {
            risk_threshold: threshold,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_apply_embeds_user_transcript_only() {
        let request = ChatRequest::new(vec![
            Message::user("I feel like a burden"),
            Message::assistant("I'm sorry to hear that."),
            Message::user("nothing will ever change"),
        ]);
        let guarded = guardrail(RiskLevel::Possible).apply(&request);

        let system = &guarded.modified_request.messages[0];
        assert!(system.content.contains("I feel like a burden\nnothing will ever change"));
        assert!(!system.content.contains("I'm sorry to hear that."));
        assert_eq!(guarded.modified_request.messages.len(), 4);
        assert_eq!(guarded.metadata["sensitivity"], "medium");
        assert_eq!(guarded.metadata["risk_threshold"], 1);
    }

    #[test]
    fn test_validate_triggers_on_threshold() {
        let report = guardrail(RiskLevel::Possible)
            .validate("<analysis>explicit wish</analysis><risk>2</risk><reason>ideation</reason>");
        assert!(!report.is_valid);
        assert!(report.has_code(codes::RISK_THRESHOLD_EXCEEDED));
        assert_eq!(report.metadata["analysis"], "explicit wish");
    }

    #[test]
    fn test_validate_below_threshold() {
        let report =
            guardrail(RiskLevel::Active).validate(r#"{"risk": 1, "reason": "hopelessness"}"#);
        assert!(report.is_valid);
    }

    #[test]
    fn test_threshold_none_is_config_error() {
        let result = SuicidePreventionGuardrail::new(&GuardrailConfig {
            risk_threshold: RiskLevel::None,
            ..Default::default()
        });
        assert!(result.is_err());
    }
}
