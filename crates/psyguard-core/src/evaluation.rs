//! Offline evaluation of a guardrail against recorded cases.
//!
//! Cases are JSON Lines, one object per line:
//!
//! ```json
//! {"id": "c1", "input_request": {"messages": []}, "response": "...", "expected_valid": false}
//! ```
//!
//! Each case runs `apply` on the request and `validate` on the recorded
//! response. No model is called. Lines that fail to decode are skipped and
//! reported, never fatal.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::guardrail::Guardrail;
use crate::report::ValidationReport;
use crate::types::ChatRequest;

#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("Failed to read cases: {0}")]
    Io(#[from] std::io::Error),
}

/// One recorded exchange and the outcome it should produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_request: ChatRequest,
    /// Model response fed to `validate`
    pub response: String,
    /// `None` records the outcome without scoring it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_valid: Option<bool>,
}

/// A line that could not be decoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedLine {
    /// 1-based
    pub line: usize,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadedCases {
    pub cases: Vec<TestCase>,
    pub skipped: Vec<SkippedLine>,
}

/// Decode JSON Lines. Blank lines are ignored.
pub fn parse_cases(jsonl: &str) -> LoadedCases {
    let mut loaded = LoadedCases::default();
    for (index, line) in jsonl.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<TestCase>(line) {
            Ok(case) => loaded.cases.push(case),
            Err(e) => {
                tracing::warn!(line = index + 1, error = %e, "skipping invalid test case");
                loaded.skipped.push(SkippedLine {
                    line: index + 1,
                    error: e.to_string(),
                });
            }
        }
    }
    loaded
}

/// Read and decode a JSON Lines file.
pub fn load_cases(path: impl AsRef<Path>) -> Result<LoadedCases, EvaluationError> {
    let contents = fs::read_to_string(path)?;
    Ok(parse_cases(&contents))
}

/// Outcome of one case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseResult {
    pub id: String,
    /// True when the outcome matched, or when nothing was expected
    pub passed: bool,
    pub expected_valid: Option<bool>,
    pub request_modified: bool,
    pub report: ValidationReport,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationSummary {
    pub guardrail: String,
    pub results: Vec<CaseResult>,
    /// Cases with an expectation
    pub scored: usize,
    pub correct: usize,
    /// `correct / scored`; absent when nothing was scored
    pub accuracy: Option<f64>,
}

impl EvaluationSummary {
    /// Whether every case passed.
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseResult> {
        self.results.iter().filter(|r| !r.passed)
    }
}

/// Run every case through `guardrail` in order.
pub fn evaluate(guardrail: &dyn Guardrail, cases: &[TestCase]) -> EvaluationSummary {
    let results: Vec<CaseResult> = cases
        .iter()
        .map(|case| {
            let guarded = guardrail.apply(&case.input_request);
            let report = guardrail.validate(&case.response);
            let passed = case.expected_valid.map_or(true, |expected| expected == report.is_valid);
            if !passed {
                tracing::info!(case = %case.id, is_valid = report.is_valid, "case failed");
            }
            CaseResult {
                id: case.id.clone(),
                passed,
                expected_valid: case.expected_valid,
                request_modified: guarded.is_modified(),
                report,
            }
        })
        .collect();

    let scored = results.iter().filter(|r| r.expected_valid.is_some()).count();
    let correct = results
        .iter()
        .filter(|r| r.expected_valid.is_some() && r.passed)
        .count();
    let accuracy = (scored > 0).then(|| correct as f64 / scored as f64);

    tracing::debug!(guardrail = guardrail.name(), scored, correct, "evaluation complete");

    EvaluationSummary {
        guardrail: guardrail.name().to_string(),
        results,
        scored,
        correct,
        accuracy,
    }
}
