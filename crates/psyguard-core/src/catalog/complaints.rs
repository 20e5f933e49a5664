//! `complaints_handling`: prompt-only guardrail that frames the user's
//! current turn as a possible complaint and tells the model how to handle it.

use crate::guardrail::{Guardrail, PromptGuardrail};
use crate::report::ValidationReport;
use crate::types::{ChatRequest, GuardedRequest};

use super::prompts::build_complaints_prompt;

pub const NAME: &str = "complaints_handling";

/// Renders the triage instruction per request from the latest user turn.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComplaintsHandlingGuardrail;

impl Guardrail for ComplaintsHandlingGuardrail {
    fn name(&self) -> &str {
        NAME
    }

    /// An empty conversation passes through unmodified.
    fn apply(&self, request: &ChatRequest) -> GuardedRequest {
        if request.messages.is_empty() {
            return GuardedRequest::passthrough(request).with_metadata("guardrail", NAME);
        }

        let user_input = request.latest_user_turn().unwrap_or_default();
        PromptGuardrail::new(NAME, build_complaints_prompt(user_input))
            .with_metadata("has_user_turn", request.latest_user_turn().is_some())
            .apply(request)
    }

    fn validate(&self, _response: &str) -> ValidationReport {
        ValidationReport::valid()
            .with_metadata("guardrail_type", "prompt")
            .with_metadata("guardrail", NAME)
    }
}
