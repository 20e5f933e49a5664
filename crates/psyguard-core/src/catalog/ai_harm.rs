//! `ai_harm_detection`: asks the model to audit the assistant's own replies
//! against the harm policies and judges the verdict against the configured
//! harm threshold.

use crate::config::{ConfigError, GuardrailConfig};
use crate::guardrail::{CheckGuardrail, Guardrail, HarmThresholdValidator, PromptGuardrail};
use crate::report::ValidationReport;
use crate::taxonomy::HarmPolicy;
use crate::types::{ChatRequest, GuardedRequest};

use super::prompts::build_harm_prompt;

pub const NAME: &str = "ai_harm_detection";

/// Harm classification prompt rendered per request, plus a harm threshold check.
#[derive(Debug, Clone)]
pub struct AiHarmDetectionGuardrail {
    policies: Vec<HarmPolicy>,
    reasoning: bool,
    confidence: bool,
    check: CheckGuardrail,
    validator: HarmThresholdValidator,
}

impl AiHarmDetectionGuardrail {
    pub fn new(config: &GuardrailConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let validator = HarmThresholdValidator::new(config.harm_threshold)?;

        Ok(Self {
            policies: config.monitored_policies.clone(),
            reasoning: config.reasoning_enabled,
            confidence: config.confidence_enabled,
            check: CheckGuardrail::new(format!("{NAME}.check")).with_validator(validator),
            validator,
        })
    }

    /// Render the audit instruction for one request.
    pub fn render(&self, request: &ChatRequest) -> String {
        build_harm_prompt(
            &request.user_transcript(),
            &request.assistant_transcript(),
            &self.policies,
            self.reasoning,
            self.confidence,
        )
    }

    fn policy_ids(&self) -> Vec<&'static str> {
        self.policies.iter().map(|p| p.id()).collect()
    }
}

impl Guardrail for AiHarmDetectionGuardrail {
    fn name(&self) -> &str {
        NAME
    }

    fn apply(&self, request: &ChatRequest) -> GuardedRequest {
        PromptGuardrail::new(NAME, self.render(request))
            .with_metadata("monitored_policies", self.policy_ids())
            .with_metadata("harm_threshold", self.validator.threshold().label())
            .with_metadata("reasoning_enabled", self.reasoning)
            .with_metadata("confidence_enabled", self.confidence)
            .apply(request)
    }

    fn validate(&self, response: &str) -> ValidationReport {
        self.check
            .validate(response)
            .with_metadata("guardrail", NAME)
            .with_metadata("monitored_policies", self.policy_ids())
    }
}
