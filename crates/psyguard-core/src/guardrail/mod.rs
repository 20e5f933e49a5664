//! The guardrail contract and its variants.
//!
//! A guardrail exposes two capabilities:
//! - `apply` derives a new request from the caller's (never mutating it)
//! - `validate` judges one complete model response
//!
//! | Variant | `apply` | `validate` |
//! |---------|---------|------------|
//! | [`PromptGuardrail`] | injects a system instruction | always valid |
//! | [`CheckGuardrail`] | passthrough | runs its validators, merges |
//! | [`CompositeGuardrail`] | left fold over children | fan-out over children, merges |
//!
//! Guardrails hold no mutable state, so one instance can serve concurrent
//! calls without coordination.

mod check;
mod composite;
mod harm;
mod prompt;
mod risk;

use thiserror::Error;

use crate::report::ValidationReport;
use crate::types::{ChatRequest, GuardedRequest};

pub use check::{CheckGuardrail, FnValidator};
pub use composite::CompositeGuardrail;
pub use harm::HarmThresholdValidator;
pub use prompt::{InjectionMode, PromptGuardrail};
pub use risk::RiskThresholdValidator;

/// A validator could not produce a report.
///
/// The owning [`CheckGuardrail`] turns this into a failing report.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidatorError {
    #[error("validator failed: {0}")]
    Failed(String),
}

/// A policy unit that can rewrite requests and judge responses.
pub trait Guardrail: Send + Sync {
    /// Stable name used in metadata and logs.
    fn name(&self) -> &str;

    /// Derive a guarded request. The input is never modified.
    fn apply(&self, request: &ChatRequest) -> GuardedRequest;

    /// Judge one complete response.
    ///
    /// Never fails: anything that prevents a judgement becomes an invalid
    /// report.
    fn validate(&self, response: &str) -> ValidationReport;
}

/// One independent check over a response, run by a [`CheckGuardrail`].
pub trait ResponseValidator: Send + Sync {
    /// Name recorded when the validator errors.
    fn name(&self) -> &str;

    /// Inspect the response.
    fn validate(&self, response: &str) -> Result<ValidationReport, ValidatorError>;
}
