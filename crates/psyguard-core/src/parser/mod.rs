//! Response parsing.
//!
//! Models do not reliably follow output-format instructions, so a raw
//! response is tried against an ordered list of strategies, each applied to
//! the entire text. The first strategy that yields a mapping wins:
//!
//! 1. **Direct JSON** - the whole string is one JSON object
//! 2. **Fenced block** - the first ```` ``` ```` / ```` ```json ```` block holds a JSON object
//! 3. **Tag soup** - `<risk>`, `<reason>`, `<analysis>`, `<confidence>` tags
//!
//! Later strategies are more permissive, so the order is fixed. When the
//! first fenced block does not decode, later fences are not tried; parsing
//! falls through to tag soup over the whole text.
//!
//! Parsing never guesses: if nothing matches, [`ParseError`] carries every
//! strategy's failure reason for diagnostics.

mod strategy;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

pub use strategy::KNOWN_TAGS;

/// Which strategy produced a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStrategy {
    DirectJson,
    FencedBlock,
    TagSoup,
}

impl ParseStrategy {
    /// Stable label used in logs and report metadata.
    pub fn label(self) -> &'static str {
        match self {
            Self::DirectJson => "direct_json",
            Self::FencedBlock => "fenced_block",
            Self::TagSoup => "tag_soup",
        }
    }
}

impl fmt::Display for ParseStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

type StrategyFn = fn(&str) -> Result<Map<String, JsonValue>, String>;

/// Evaluation order. Strict first, permissive last.
const STRATEGIES: [(ParseStrategy, StrategyFn); 3] = [
    (ParseStrategy::DirectJson, strategy::direct_json),
    (ParseStrategy::FencedBlock, strategy::fenced_block),
    (ParseStrategy::TagSoup, strategy::tag_soup),
];

/// Why a single strategy did not produce a mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyFailure {
    pub strategy: ParseStrategy,
    pub reason: String,
}

/// No strategy produced a mapping.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("failed to parse response: {reason}")]
pub struct ParseError {
    /// The full raw response, kept for audit
    pub raw_text: String,

    /// Summary of why parsing failed
    pub reason: String,

    /// Every attempted strategy in order, with its failure reason.
    /// Empty when the input was blank and no strategy ran.
    pub attempts: Vec<StrategyFailure>,
}

impl ParseError {
    fn empty(raw_text: &str) -> Self {
        Self {
            raw_text: raw_text.to_string(),
            reason: "empty response".to_string(),
            attempts: Vec::new(),
        }
    }

    fn exhausted(raw_text: &str, attempts: Vec<StrategyFailure>) -> Self {
        let reason = attempts
            .iter()
            .map(|a| format!("{}: {}", a.strategy, a.reason))
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            raw_text: raw_text.to_string(),
            reason,
            attempts,
        }
    }
}

/// A mapping recovered from a raw response.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    fields: Map<String, JsonValue>,
    strategy: ParseStrategy,
}

impl ParsedResponse {
    /// The strategy that succeeded.
    pub fn strategy(&self) -> ParseStrategy {
        self.strategy
    }

    /// All recovered fields, keys as the model wrote them.
    pub fn fields(&self) -> &Map<String, JsonValue> {
        &self.fields
    }

    /// Case-insensitive field lookup. An exact-case key wins over others.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.fields.get(key).or_else(|| {
            self.fields
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })
    }
}

/// Parse a complete raw response into a field mapping.
///
/// Must be called on the whole document; partial stream chunks are the
/// caller's job to buffer.
pub fn parse(raw_text: &str) -> Result<ParsedResponse, ParseError> {
    if raw_text.trim().is_empty() {
        tracing::debug!("empty response, no strategy attempted");
        return Err(ParseError::empty(raw_text));
    }

    let mut attempts = Vec::with_capacity(STRATEGIES.len());

    for (strategy, run) in STRATEGIES {
        match run(raw_text) {
            Ok(fields) => {
                tracing::debug!(
                    strategy = %strategy,
                    fields = fields.len(),
                    failed_before = attempts.len(),
                    "parsed response"
                );
                return Ok(ParsedResponse { fields, strategy });
            }
            Err(reason) => {
                tracing::debug!(strategy = %strategy, %reason, "strategy did not match");
                attempts.push(StrategyFailure { strategy, reason });
            }
        }
    }

    tracing::warn!(
        length = raw_text.len(),
        "no parse strategy produced a mapping"
    );
    Err(ParseError::exhausted(raw_text, attempts))
}
