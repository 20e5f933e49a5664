//! Conversation and request types shared by every guardrail.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Free-form metadata attached to requests and reports.
///
/// BTreeMap keeps serialized output ordering deterministic.
pub type Metadata = BTreeMap<String, JsonValue>;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a message with an explicit role.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Ordered messages, oldest first. May be empty.
pub type Conversation = Vec<Message>;

/// The request guardrails transform before it reaches a model driver.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Target model, if the caller pins one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Conversation to send
    #[serde(default)]
    pub messages: Conversation,
}

impl ChatRequest {
    /// Build a request from a conversation.
    pub fn new(messages: Conversation) -> Self {
        Self {
            model: None,
            messages,
        }
    }

    /// Pin the target model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// User-authored content joined oldest to newest.
    pub fn user_transcript(&self) -> String {
        self.transcript(Role::User)
    }

    /// Assistant replies joined oldest to newest.
    pub fn assistant_transcript(&self) -> String {
        self.transcript(Role::Assistant)
    }

    /// The user's current turn: the last message if the user wrote it, or the
    /// one before a trailing assistant reply.
    pub fn latest_user_turn(&self) -> Option<&str> {
        match self.messages.as_slice() {
            [.., last] if last.role == Role::User => Some(last.content.as_str()),
            [.., previous, last] if last.role == Role::Assistant && previous.role == Role::User => {
                Some(previous.content.as_str())
            }
            _ => None,
        }
    }

    fn transcript(&self, role: Role) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == role && !m.content.is_empty())
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Result of running one or more `apply` steps over a request.
///
/// `original_request` is always the request handed to the outermost
/// guardrail; intermediate requests are never stored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardedRequest {
    pub original_request: ChatRequest,
    pub modified_request: ChatRequest,
    #[serde(default)]
    pub metadata: Metadata,
}

impl GuardedRequest {
    /// A request passed through unchanged.
    pub fn passthrough(request: &ChatRequest) -> Self {
        Self {
            original_request: request.clone(),
            modified_request: request.clone(),
            metadata: Metadata::new(),
        }
    }

    /// Whether any step changed the request.
    pub fn is_modified(&self) -> bool {
        self.original_request != self.modified_request
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_transcript_skips_other_roles() {
        let request = ChatRequest::new(vec![
            Message::system("be kind"),
            Message::user("first"),
            Message::assistant("reply"),
            Message::user(""),
            Message::user("second"),
        ]);
        assert_eq!(request.user_transcript(), "first\nsecond");
    }

    #[test]
    fn test_latest_user_turn() {
        let request = ChatRequest::new(vec![
            Message::user("first"),
            Message::assistant("reply"),
            Message::user("second"),
        ]);
        assert_eq!(request.latest_user_turn(), Some("second"));
        assert_eq!(request.assistant_transcript(), "reply");

        let trailing = ChatRequest::new(vec![Message::user("only"), Message::assistant("reply")]);
        assert_eq!(trailing.latest_user_turn(), Some("only"));

        let system_only = ChatRequest::new(vec![Message::system("rules")]);
        assert_eq!(system_only.latest_user_turn(), None);
        assert_eq!(ChatRequest::new(vec![]).latest_user_turn(), None);
    }

    #[test]
    fn test_passthrough_is_unmodified() {
        let request = ChatRequest::new(vec![Message::user("hi")]);
        let guarded = GuardedRequest::passthrough(&request);
        assert!(!guarded.is_modified());
        assert_eq!(guarded.original_request, request);
    }

    #[test]
    fn test_request_deserializes_without_model() {
        let request: ChatRequest =
            serde_json::from_str(r#"{"messages":[{"role":"user","content":"hey"}]}"#).unwrap();
        assert_eq!(request.model, None);
        assert_eq!(request.messages, vec![Message::user("hey")]);
    }
}
