//! Composite guardrail: ordered aggregation of child guardrails.
//!
//! - `apply` folds left to right. Child *i*'s `modified_request` is child
//!   *i+1*'s input; the final `original_request` is always the composite's
//!   own input.
//! - `validate` fans out. Every child judges the same response and the
//!   reports are merged in child order (see [`ValidationReport::merge`]).

use std::fmt;

use serde_json::Value as JsonValue;

use crate::report::ValidationReport;
use crate::types::{ChatRequest, GuardedRequest, Metadata};

use super::Guardrail;

/// An ordered sequence of guardrails evaluated as one.
///
/// Zero children is allowed: apply is then identity and validate is valid.
pub struct CompositeGuardrail {
    name: String,
    children: Vec<Box<dyn Guardrail>>,
}

impl CompositeGuardrail {
    /// Compose `children` in priority order.
    pub fn new(name: impl Into<String>, children: Vec<Box<dyn Guardrail>>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }

    /// Append a child at the lowest priority.
    pub fn with(mut self, child: impl Guardrail + 'static) -> Self {
        self.children.push(Box::new(child));
        self
    }

    /// Child names in order.
    pub fn sequence(&self) -> Vec<&str> {
        self.children.iter().map(|c| c.name()).collect()
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether there are no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Guardrail for CompositeGuardrail {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, request: &ChatRequest) -> GuardedRequest {
        let mut current = request.clone();
        let mut metadata = Metadata::new();
        metadata.insert(
            "composite_sequence".into(),
            JsonValue::from(self.sequence()),
        );

        for (i, child) in self.children.iter().enumerate() {
            let step = child.apply(&current);
            metadata.insert(
                format!("step_{}_{}", i, child.name()),
                JsonValue::Object(step.metadata.into_iter().collect()),
            );
            current = step.modified_request;
        }

        GuardedRequest {
            original_request: request.clone(),
            modified_request: current,
            metadata,
        }
    }

    fn validate(&self, response: &str) -> ValidationReport {
        let reports = self.children.iter().map(|child| {
            let report = child.validate(response);
            tracing::debug!(
                composite = %self.name,
                guardrail = child.name(),
                is_valid = report.is_valid,
                violations = report.violations.len(),
                "child validated"
            );
            report
        });

        ValidationReport::merge_all(reports)
            .with_metadata("guardrail_type", "composite")
            .with_metadata("num_composed_guardrails", self.children.len())
    }
}

impl fmt::Debug for CompositeGuardrail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeGuardrail")
            .field("name", &self.name)
            .field("children", &self.sequence())
            .finish()
    }
}
