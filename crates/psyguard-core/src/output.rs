//! Structured output bound from parsed response fields.
//!
//! Each field is coerced independently:
//!
//! | field | required | coercion |
//! |-------|----------|----------|
//! | `risk` | yes | integer in `0..=3`; anything else is [`OutputError::InvalidRiskValue`] |
//! | `reason` | yes | non-empty string (numbers and bools are stringified) |
//! | `analysis` | no | string; empty is treated as absent |
//! | `confidence` | no | float; outside `[0, 1]` is clamped and flagged |
//!
//! Risk is never clamped. Confidence is clamped because a slightly
//! out-of-range score is still informative, but the clamp is recorded in
//! [`StructuredOutput::flags`] so it cannot go unnoticed.
//!
//! [`HarmVerdict`] binds the harm classifier's reply the same way:
//!
//! | field | required | coercion |
//! |-------|----------|----------|
//! | `classification` | yes | `SAFE`, `BORDERLINE` or `HARMFUL`, any case |
//! | `violated_policy_id` | no | policy id such as `1.3`; `N/A` is absent |
//! | `reasoning` | no | string; empty is treated as absent |
//! | `confidence_score` / `confidence` | no | as above |

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

use crate::parser::{self, ParseError, ParseStrategy, ParsedResponse};
use crate::taxonomy::{HarmClassification, HarmPolicy, RiskLevel};

/// Errors binding parsed fields to a [`StructuredOutput`].
///
/// Every variant carries the partial mapping so the audit trail keeps
/// whatever the model did return.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OutputError {
    #[error("invalid risk value: {detail}")]
    InvalidRiskValue {
        detail: String,
        partial: Map<String, JsonValue>,
    },

    #[error("missing required field: {field}")]
    MissingField {
        field: &'static str,
        partial: Map<String, JsonValue>,
    },

    #[error("invalid value for {field}: {detail}")]
    InvalidField {
        field: &'static str,
        detail: String,
        partial: Map<String, JsonValue>,
    },
}

impl OutputError {
    /// The fields recovered before binding failed.
    pub fn partial(&self) -> &Map<String, JsonValue> {
        match self {
            Self::InvalidRiskValue { partial, .. }
            | Self::MissingField { partial, .. }
            | Self::InvalidField { partial, .. } => partial,
        }
    }
}

/// Either stage of turning raw text into a [`StructuredOutput`] can fail.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifyError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

/// A note that a value was adjusted during binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputFlag {
    /// Confidence was outside `[0, 1]` and has been clamped.
    ConfidenceClamped { original: f64, clamped: f64 },
}

/// Typed verdict recovered from one model response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredOutput {
    pub risk: RiskLevel,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Adjustments made while binding
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<OutputFlag>,
}

impl StructuredOutput {
    /// Bind parsed fields. Fails rather than constructing a partial output.
    pub fn from_parsed(parsed: &ParsedResponse) -> Result<Self, OutputError> {
        let partial = || parsed.fields().clone();

        let risk = coerce_risk(parsed.get("risk")).map_err(|detail| {
            OutputError::InvalidRiskValue {
                detail,
                partial: partial(),
            }
        })?;

        let reason = coerce_text(parsed.get("reason")).ok_or_else(|| OutputError::MissingField {
            field: "reason",
            partial: partial(),
        })?;

        let analysis = coerce_text(parsed.get("analysis"));

        let mut flags = Vec::new();
        let confidence = bind_confidence(parsed, parsed.get("confidence"), &mut flags)?;

        Ok(Self {
            risk,
            reason,
            analysis,
            confidence,
            flags,
        })
    }

    /// Parse raw text and bind it in one step.
    pub fn from_raw(raw_text: &str) -> Result<(Self, ParseStrategy), ClassifyError> {
        let parsed = parser::parse(raw_text)?;
        let output = Self::from_parsed(&parsed)?;
        Ok((output, parsed.strategy()))
    }

    /// Trigger decision for a guardrail-owned threshold.
    pub fn is_triggered(&self, threshold: RiskLevel) -> bool {
        self.risk.meets(threshold)
    }

    /// Whether any value was adjusted during binding.
    pub fn was_adjusted(&self) -> bool {
        !self.flags.is_empty()
    }
}

/// Harm classifier verdict on an assistant reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarmVerdict {
    pub classification: HarmClassification,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violated_policy: Option<HarmPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<OutputFlag>,
}

impl HarmVerdict {
    /// Bind parsed fields. A missing or unknown classification is an error.
    pub fn from_parsed(parsed: &ParsedResponse) -> Result<Self, OutputError> {
        let partial = || parsed.fields().clone();

        let classification = match parsed.get("classification") {
            None | Some(JsonValue::Null) => {
                return Err(OutputError::MissingField {
                    field: "classification",
                    partial: partial(),
                })
            }
            Some(value) => value
                .as_str()
                .and_then(HarmClassification::from_label)
                .ok_or_else(|| OutputError::InvalidField {
                    field: "classification",
                    detail: format!("{} is not SAFE, BORDERLINE or HARMFUL", value),
                    partial: partial(),
                })?,
        };

        let violated_policy = match coerce_text(parsed.get("violated_policy_id")) {
            None => None,
            Some(id) if id.eq_ignore_ascii_case("n/a") || id.eq_ignore_ascii_case("none") => None,
            Some(id) => Some(HarmPolicy::from_id(&id).ok_or_else(|| {
                OutputError::InvalidField {
                    field: "violated_policy_id",
                    detail: format!("{:?} is not a known policy", id),
                    partial: partial(),
                }
            })?),
        };
        if classification == HarmClassification::Harmful && violated_policy.is_none() {
            tracing::warn!("HARMFUL classification without a policy id");
        }

        let reasoning = coerce_text(parsed.get("reasoning"));

        let mut flags = Vec::new();
        let score = parsed.get("confidence_score").or_else(|| parsed.get("confidence"));
        let confidence = bind_confidence(parsed, score, &mut flags)?;

        Ok(Self {
            classification,
            violated_policy,
            reasoning,
            confidence,
            flags,
        })
    }

    /// Whether the classification meets `threshold`.
    pub fn is_triggered(&self, threshold: HarmClassification) -> bool {
        self.classification >= threshold
    }
}

/// Clamp an optional confidence into `[0, 1]`, flagging any adjustment.
fn bind_confidence(
    parsed: &ParsedResponse,
    value: Option<&JsonValue>,
    flags: &mut Vec<OutputFlag>,
) -> Result<Option<f64>, OutputError> {
    let value = match value {
        None | Some(JsonValue::Null) => return Ok(None),
        Some(value) => value,
    };

    let original = coerce_float(value).ok_or_else(|| OutputError::InvalidField {
        field: "confidence",
        detail: format!("{} is not a number", value),
        partial: parsed.fields().clone(),
    })?;
    let clamped = original.clamp(0.0, 1.0);
    if clamped != original {
        tracing::warn!(original, clamped, "confidence outside [0, 1], clamped");
        flags.push(OutputFlag::ConfidenceClamped { original, clamped });
    }
    Ok(Some(clamped))
}

fn coerce_risk(value: Option<&JsonValue>) -> Result<RiskLevel, String> {
    let value = match value {
        None | Some(JsonValue::Null) => return Err("risk field is missing".to_string()),
        Some(v) => v,
    };

    let level = match value {
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => i,
            None => n
                .as_f64()
                .and_then(whole_number)
                .ok_or_else(|| format!("{} is not an integer", n))?,
        },
        JsonValue::String(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(i) => i,
                Err(_) => s
                    .parse::<f64>()
                    .ok()
                    .and_then(whole_number)
                    .ok_or_else(|| format!("{:?} is not an integer", s))?,
            }
        }
        other => return Err(format!("{} is not an integer", other)),
    };

    RiskLevel::from_level(level).ok_or_else(|| format!("{} is outside 0..=3", level))
}

/// `2.0` is 2; `2.5`, NaN and infinities are not integers.
fn whole_number(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() <= i64::MAX as f64).then_some(f as i64)
}

fn coerce_text(value: Option<&JsonValue>) -> Option<String> {
    let text = match value? {
        JsonValue::String(s) => s.trim().to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn coerce_float(value: &JsonValue) -> Option<f64> {
    let f = match value {
        JsonValue::Number(n) => n.as_f64()?,
        JsonValue::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    f.is_finite().then_some(f)
}
