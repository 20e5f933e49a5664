//! `mental_health_support`: prompt-only guardrail steering the model toward a
//! supportive, non-clinical reply.

use crate::config::GuardrailConfig;
use crate::guardrail::PromptGuardrail;

use super::prompts::MENTAL_HEALTH_SUPPORT_PROMPT;

pub const NAME: &str = "mental_health_support";

pub fn build(config: &GuardrailConfig) -> PromptGuardrail {
    PromptGuardrail::new(NAME, MENTAL_HEALTH_SUPPORT_PROMPT.trim())
        .with_metadata("sensitivity", config.sensitivity.label())
}
