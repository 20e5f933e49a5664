//! Detection patterns for personal data and credentials in model responses.
//!
//! Findings carry the kind and a match count only. Matched text is never
//! copied into reports, so an audit trail cannot leak what it flagged. Any
//! other guardrail that echoes model text into a report runs it through
//! [`redact`] first.

use lazy_static::lazy_static;
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

lazy_static! {
    /// Email address (RFC 5322 simplified)
    static ref EMAIL_PATTERN: Regex = Regex::new(
        r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}"
    ).unwrap();

    /// North American phone number with optional country code
    static ref PHONE_PATTERN: Regex = Regex::new(
        r"(?:\+?1[-.\s]?)?(?:\([0-9]{3}\)|\b[0-9]{3})[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}\b"
    ).unwrap();

    /// US Social Security Number (XXX-XX-XXXX or XXX XX XXXX)
    static ref SSN_PATTERN: Regex = Regex::new(
        r"\b\d{3}[-\s]\d{2}[-\s]\d{4}\b"
    ).unwrap();

    /// 16-digit payment card number with optional separators
    static ref CREDIT_CARD_PATTERN: Regex = Regex::new(
        r"\b\d{4}[\s-]?\d{4}[\s-]?\d{4}[\s-]?\d{4}\b"
    ).unwrap();

    /// Labelled API key, secret or token
    static ref API_KEY_PATTERN: Regex = Regex::new(
        r#"(?i)(api[_-]?key|secret[_-]?key|access[_-]?token|auth[_-]?token|bearer|password|secret|token)[\s:=]+['"]?[a-zA-Z0-9_-]{16,}['"]?"#
    ).unwrap();

    /// AWS access key id (all documented prefixes)
    static ref AWS_KEY_PATTERN: Regex = Regex::new(
        r"\b(AKIA|ABIA|ACCA|AGPA|AIDA|AIPA|ANPA|ANVA|AROA|ASCA|ASIA)[A-Z0-9]{16}\b"
    ).unwrap();
}

/// What a pattern detects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitiveKind {
    Email,
    Phone,
    Ssn,
    CreditCard,
    ApiKey,
    AwsKey,
}

impl SensitiveKind {
    /// Every kind, personal data first.
    pub const ALL: [SensitiveKind; 6] = [
        SensitiveKind::Email,
        SensitiveKind::Phone,
        SensitiveKind::Ssn,
        SensitiveKind::CreditCard,
        SensitiveKind::ApiKey,
        SensitiveKind::AwsKey,
    ];

    /// Whether this kind is a credential rather than personal data.
    pub fn is_credential(self) -> bool {
        matches!(self, Self::ApiKey | Self::AwsKey)
    }

    /// Stable label used in report context.
    pub fn label(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Ssn => "ssn",
            Self::CreditCard => "credit_card",
            Self::ApiKey => "api_key",
            Self::AwsKey => "aws_key",
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            Self::Email => &EMAIL_PATTERN,
            Self::Phone => &PHONE_PATTERN,
            Self::Ssn => &SSN_PATTERN,
            Self::CreditCard => &CREDIT_CARD_PATTERN,
            Self::ApiKey => &API_KEY_PATTERN,
            Self::AwsKey => &AWS_KEY_PATTERN,
        }
    }

    /// Number of non-overlapping matches in `content`.
    pub fn count(self, content: &str) -> usize {
        self.pattern().find_iter(content).count()
    }
}

/// A kind found in content, with how often it occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub kind: SensitiveKind,
    pub matches: usize,
}

/// Scan `content` for every kind, in [`SensitiveKind::ALL`] order.
pub fn detect(content: &str) -> Vec<Detection> {
    SensitiveKind::ALL
        .iter()
        .filter_map(|&kind| match kind.count(content) {
            0 => None,
            matches => Some(Detection { kind, matches }),
        })
        .collect()
}

/// Most specific first, so a card number is not half-masked as a phone.
const REDACTION_ORDER: [SensitiveKind; 6] = [
    SensitiveKind::AwsKey,
    SensitiveKind::ApiKey,
    SensitiveKind::Email,
    SensitiveKind::CreditCard,
    SensitiveKind::Ssn,
    SensitiveKind::Phone,
];

/// Replace every match with a `[REDACTED:<kind>]` marker.
pub fn redact(content: &str) -> String {
    REDACTION_ORDER.iter().fold(content.to_string(), |text, &kind| {
        let marker = format!("[REDACTED:{}]", kind.label());
        kind.pattern()
            .replace_all(&text, NoExpand(&marker))
            .into_owned()
    })
}

/// [`redact`] applied to every string inside a JSON value.
pub fn redact_json(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::String(s) => JsonValue::String(redact(s)),
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(redact_json).collect()),
        JsonValue::Object(map) => JsonValue::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), redact_json(value)))
                .collect(),
        ),
        other => other.clone(),
    }
}
