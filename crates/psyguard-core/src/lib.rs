//! # psyguard-core
//!
//! Defensive parsing of LLM classification responses and composable
//! guardrails around them.
//!
//! This crate answers, for one model response:
//! - What did the model actually say? ([`parse`], [`StructuredOutput`])
//! - Does it meet the risk threshold? ([`classify`])
//! - Do all composed policies accept it? ([`Guardrail::validate`])
//! - How often does a guardrail get recorded cases right? ([`evaluation`])
//!
//! ## Key Guarantees
//!
//! 1. **Fail closed**: an unreadable response is never reported as safe
//! 2. **No guessing**: risk outside `0..=3` is an error, never clamped
//! 3. **Deterministic**: same input, same report, including metadata order
//! 4. **No I/O**: model calls live in `psyguard-runtime`
//!
//! ## Example
//!
//! ```rust,ignore
//! use psyguard_core::{GuardrailConfig, GuardrailRegistry, Guardrail};
//!
//! let registry = GuardrailRegistry::with_defaults();
//! let guardrail = registry.compose(&["suicide_prevention"], &GuardrailConfig::default())?;
//!
//! let guarded = guardrail.apply(&request);
//! let response = driver.send(&guarded.modified_request).await?;
//! let report = guardrail.validate(&response);
//!
//! if !report.is_valid {
//!     for v in &report.violations {
//!         println!("{:?} {}: {}", v.severity, v.code, v.message);
//!     }
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod evaluation;
pub mod guardrail;
pub mod output;
pub mod parser;
pub mod report;
pub mod taxonomy;
pub mod types;

// Re-export main types at crate root
pub use catalog::{GuardrailFactory, GuardrailRegistry};
pub use config::{ConfigError, GuardrailConfig};
pub use evaluation::{evaluate, EvaluationSummary, TestCase};
pub use guardrail::{
    CheckGuardrail, CompositeGuardrail, FnValidator, Guardrail, HarmThresholdValidator,
    InjectionMode, PromptGuardrail, ResponseValidator, RiskThresholdValidator, ValidatorError,
};
pub use output::{ClassifyError, HarmVerdict, OutputError, OutputFlag, StructuredOutput};
pub use parser::{parse, ParseError, ParseStrategy, ParsedResponse};
pub use report::{codes, Severity, ValidationReport, Violation};
pub use taxonomy::{HarmClassification, HarmPolicy, RiskLevel, Sensitivity};
pub use types::{ChatRequest, Conversation, GuardedRequest, Message, Metadata, Role};

use serde::Serialize;

/// A risk verdict together with how it was recovered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub output: StructuredOutput,
    pub strategy: ParseStrategy,
    pub threshold: RiskLevel,
    pub triggered: bool,
}

/// Parse a raw response, bind it and decide against `threshold`.
///
/// Unlike [`RiskThresholdValidator`], errors are returned rather than
/// folded into a report.
pub fn classify(raw_text: &str, threshold: RiskLevel) -> Result<Classification, ClassifyError> {
    let (output, strategy) = StructuredOutput::from_raw(raw_text)?;
    let triggered = output.is_triggered(threshold);
    Ok(Classification {
        output,
        strategy,
        threshold,
        triggered,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_triggered() {
        let result = classify(r#"{"risk": 2, "reason": "explicit"}"#, RiskLevel::Possible).unwrap();
        assert!(result.triggered);
        assert_eq!(result.output.risk, RiskLevel::Active);
        assert_eq!(result.strategy, ParseStrategy::DirectJson);
    }

    #[test]
    fn test_classify_not_triggered() {
        let result = classify("<risk>0</risk><reason>NA</reason>", RiskLevel::Possible).unwrap();
        assert!(!result.triggered);
    }

    #[test]
    fn test_classify_surfaces_errors() {
        assert!(matches!(
            classify("I think you're fine.", RiskLevel::Possible),
            Err(ClassifyError::Parse(_))
        ));
        assert!(matches!(
            classify(r#"{"risk": -1, "reason": "x"}"#, RiskLevel::Possible),
            Err(ClassifyError::Output(OutputError::InvalidRiskValue { .. }))
        ));
    }

    #[test]
    fn test_end_to_end_with_registry() {
        let registry = GuardrailRegistry::with_defaults();
        let guardrail = registry
            .compose(&["suicide_prevention", "pii_protection"], &GuardrailConfig::default())
            .unwrap();

        let request = ChatRequest::new(vec![Message::user("I don't see the point anymore")]);
        let guarded = guardrail.apply(&request);
        assert_eq!(guarded.original_request, request);
        assert_eq!(guarded.modified_request.messages.len(), 2);

        let report = guardrail.validate("<risk>2</risk><reason>hopelessness</reason>");
        assert!(!report.is_valid);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].code, codes::RISK_THRESHOLD_EXCEEDED);
        assert_eq!(report.metadata["num_composed_guardrails"], 2);
    }
}
