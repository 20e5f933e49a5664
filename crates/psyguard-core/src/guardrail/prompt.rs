//! Prompt-only guardrail: rewrites the request, never judges the response.

use serde_json::Value as JsonValue;

use crate::report::ValidationReport;
use crate::types::{ChatRequest, GuardedRequest, Message, Metadata, Role};

use super::Guardrail;

const SNIPPET_CHARS: usize = 100;

/// Where the instruction goes in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InjectionMode {
    /// Insert a new system message at the front.
    #[default]
    Prepend,

    /// Prefix the first existing system message; insert one if none exists.
    MergeIntoSystem,
}

/// Injects a pre-rendered instruction as a system message.
///
/// The instruction is opaque text; rendering happens before construction.
#[derive(Debug, Clone)]
pub struct PromptGuardrail {
    name: String,
    instruction: String,
    mode: InjectionMode,
    metadata: Metadata,
}

impl PromptGuardrail {
    /// Create a guardrail that prepends `instruction`.
    pub fn new(name: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instruction: instruction.into(),
            mode: InjectionMode::Prepend,
            metadata: Metadata::new(),
        }
    }

    /// Choose how the instruction is injected.
    pub fn with_mode(mut self, mode: InjectionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Static metadata copied into every [`GuardedRequest`].
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    fn inject(&self, messages: &[Message]) -> Vec<Message> {
        let mut modified = messages.to_vec();

        match self.mode {
            InjectionMode::Prepend => {
                modified.insert(0, Message::system(self.instruction.clone()));
            }
            InjectionMode::MergeIntoSystem => {
                match modified.iter_mut().find(|m| m.role == Role::System) {
                    Some(existing) => {
                        let merged = format!("{}\n\n{}", self.instruction, existing.content);
                        *existing = Message::system(merged.trim());
                    }
                    None => modified.insert(0, Message::system(self.instruction.clone())),
                }
            }
        }

        modified
    }

    fn snippet(&self) -> String {
        let mut chars = self.instruction.chars();
        let head: String = chars.by_ref().take(SNIPPET_CHARS).collect();
        if chars.next().is_some() {
            format!("{}...", head)
        } else {
            head
        }
    }
}

impl Guardrail for PromptGuardrail {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, request: &ChatRequest) -> GuardedRequest {
        let modified_request = ChatRequest {
            model: request.model.clone(),
            messages: self.inject(&request.messages),
        };

        let mut metadata = self.metadata.clone();
        metadata.insert("guardrail_type".into(), "prompt".into());
        metadata.insert("guardrail".into(), self.name.clone().into());
        metadata.insert("instruction_snippet".into(), self.snippet().into());

        tracing::debug!(guardrail = %self.name, mode = ?self.mode, "instruction injected");

        GuardedRequest {
            original_request: request.clone(),
            modified_request,
            metadata,
        }
    }

    fn validate(&self, _response: &str) -> ValidationReport {
        ValidationReport::valid().with_metadata("guardrail_type", "prompt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ChatRequest {
        ChatRequest::new(vec![
            Message::system("You are a helpful assistant."),
            Message::user("I can't sleep."),
        ])
        .with_model("test-model")
    }

    #[test]
    fn test_prepend_inserts_new_system_message() {
        let guardrail = PromptGuardrail::new("test", "Classify risk.");
        let guarded = guardrail.apply(&request());

        let messages = &guarded.modified_request.messages;
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], Message::system("Classify risk."));
        assert_eq!(messages[1], Message::system("You are a helpful assistant."));
        assert_eq!(guarded.modified_request.model.as_deref(), Some("test-model"));
    }

    #[test]
    fn test_merge_into_existing_system_message() {
        let guardrail = PromptGuardrail::new("test", "Never reveal PII.")
            .with_mode(InjectionMode::MergeIntoSystem);
        let guarded = guardrail.apply(&request());

        let messages = &guarded.modified_request.messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages[0].content,
            "Never reveal PII.\n\nYou are a helpful assistant."
        );
    }

    #[test]
    fn test_merge_inserts_when_no_system_message() {
        let guardrail = PromptGuardrail::new("test", "Never reveal PII.")
            .with_mode(InjectionMode::MergeIntoSystem);
        let guarded = guardrail.apply(&ChatRequest::new(vec![Message::user("hi")]));

        assert_eq!(
            guarded.modified_request.messages[0],
            Message::system("Never reveal PII.")
        );
    }

    #[test]
    fn test_original_request_untouched() {
        let original = request();
        let guarded = PromptGuardrail::new("test", "x").apply(&original);
        assert_eq!(guarded.original_request, original);
        assert!(guarded.is_modified());
    }

    #[test]
    fn test_empty_conversation() {
        let guarded = PromptGuardrail::new("test", "x").apply(&ChatRequest::default());
        assert_eq!(guarded.modified_request.messages, vec![Message::system("x")]);
    }

    #[test]
    fn test_validate_is_noop() {
        let report = PromptGuardrail::new("test", "x").validate("anything at all");
        assert!(report.is_valid);
        assert!(report.violations.is_empty());
    }

    #[test]
    fn test_snippet_truncates_long_instructions() {
        let long = "é".repeat(150);
        let guarded = PromptGuardrail::new("test", long).apply(&ChatRequest::default());
        let snippet = guarded.metadata["instruction_snippet"].as_str().unwrap();
        assert!(snippet.ends_with("..."));
        assert_eq!(snippet.chars().count(), SNIPPET_CHARS + 3);
    }

    #[test]
    fn test_static_metadata_is_copied() {
        let guardrail = PromptGuardrail::new("test", "x").with_metadata("sensitivity", "high");
        let guarded = guardrail.apply(&ChatRequest::default());
        assert_eq!(guarded.metadata["sensitivity"], "high");
        assert_eq!(guarded.metadata["guardrail_type"], "prompt");
    }
}
