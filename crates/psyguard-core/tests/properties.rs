//! Property tests for parsing, binding and composition.

use proptest::prelude::*;
use serde_json::{json, Map, Value as JsonValue};

use psyguard_core::{
    codes, parse, ChatRequest, CompositeGuardrail, Guardrail, Message, OutputError, OutputFlag,
    ParseStrategy, PromptGuardrail, RiskLevel, RiskThresholdValidator, Severity,
    StructuredOutput, ValidationReport, Violation,
};

fn text() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z ,']{0,30}[a-zA-Z]"
}

fn prose() -> impl Strategy<Value = String> {
    "[a-zA-Z ,.:]{0,40}"
}

#[derive(Debug, Clone)]
struct Verdict {
    risk: i64,
    reason: String,
    analysis: Option<String>,
    confidence: Option<f64>,
}

fn verdict() -> impl Strategy<Value = Verdict> {
    (
        0i64..=3,
        text(),
        proptest::option::of(text()),
        proptest::option::of((0u32..=100).prop_map(|n| n as f64 / 100.0)),
    )
        .prop_map(|(risk, reason, analysis, confidence)| Verdict {
            risk,
            reason,
            analysis,
            confidence,
        })
}

impl Verdict {
    fn to_json(&self) -> String {
        let mut map = Map::new();
        map.insert("risk".into(), json!(self.risk));
        map.insert("reason".into(), json!(self.reason));
        if let Some(a) = &self.analysis {
            map.insert("analysis".into(), json!(a));
        }
        if let Some(c) = self.confidence {
            map.insert("confidence".into(), json!(c));
        }
        JsonValue::Object(map).to_string()
    }

    fn tags(&self) -> Vec<String> {
        let mut tags = vec![
            format!("<risk>{}</risk>", self.risk),
            format!("<reason>{}</reason>", self.reason),
        ];
        if let Some(a) = &self.analysis {
            tags.push(format!("<analysis>{}</analysis>", a));
        }
        if let Some(c) = self.confidence {
            tags.push(format!("<confidence>{}</confidence>", c));
        }
        tags
    }

    fn check(&self, output: &StructuredOutput) {
        assert_eq!(output.risk.level() as i64, self.risk);
        assert_eq!(output.reason, self.reason);
        assert_eq!(output.analysis, self.analysis);
        assert_eq!(output.confidence, self.confidence);
        assert!(output.flags.is_empty());
    }
}

fn report() -> impl Strategy<Value = ValidationReport> {
    (
        any::<bool>(),
        proptest::collection::vec("[A-Z]{1,4}", 0..3),
        proptest::collection::btree_map("[a-c]", 0i64..5, 0..3),
    )
        .prop_map(|(is_valid, codes, metadata)| ValidationReport {
            is_valid,
            violations: codes
                .into_iter()
                .map(|c| Violation::new(Severity::Error, c, "generated"))
                .collect(),
            metadata: metadata
                .into_iter()
                .map(|(k, v)| (k, JsonValue::from(v)))
                .collect(),
        })
}

proptest! {
    #[test]
    fn direct_json_round_trips(v in verdict()) {
        let parsed = parse(&v.to_json()).unwrap();
        prop_assert_eq!(parsed.strategy(), ParseStrategy::DirectJson);
        v.check(&StructuredOutput::from_parsed(&parsed).unwrap());
    }

    #[test]
    fn fenced_matches_bare(
        v in verdict(),
        before in prose(),
        after in prose(),
        tagged in any::<bool>(),
    ) {
        let fence = if tagged { "```json" } else { "```" };
        let raw = format!("{}\n{}\n{}\n```\n{}", before, fence, v.to_json(), after);

        let fenced = parse(&raw).unwrap();
        prop_assert_eq!(fenced.strategy(), ParseStrategy::FencedBlock);

        let bare = parse(&v.to_json()).unwrap();
        prop_assert_eq!(
            StructuredOutput::from_parsed(&fenced).unwrap(),
            StructuredOutput::from_parsed(&bare).unwrap()
        );
    }

    #[test]
    fn tag_soup_recovers_fields_in_any_order(
        v in verdict(),
        order in Just((0..4).collect::<Vec<usize>>()).prop_shuffle(),
        filler in prose(),
    ) {
        let tags = v.tags();
        let shuffled: Vec<&str> = order
            .iter()
            .filter_map(|&i| tags.get(i).map(|s| s.as_str()))
            .collect();
        let raw = format!("{}\n{}", filler, shuffled.join("\n"));

        let parsed = parse(&raw).unwrap();
        prop_assert_eq!(parsed.strategy(), ParseStrategy::TagSoup);
        prop_assert_eq!(parsed.fields().len(), tags.len());
        v.check(&StructuredOutput::from_parsed(&parsed).unwrap());
    }

    #[test]
    fn out_of_range_risk_is_rejected(
        risk in prop_oneof![i64::MIN..0i64, 4i64..i64::MAX],
        reason in text(),
    ) {
        let raw = json!({"risk": risk, "reason": reason}).to_string();
        let parsed = parse(&raw).unwrap();

        match StructuredOutput::from_parsed(&parsed) {
            Err(OutputError::InvalidRiskValue { partial, .. }) => {
                prop_assert_eq!(&partial["risk"], &json!(risk));
            }
            other => prop_assert!(false, "expected InvalidRiskValue, got {:?}", other),
        }
    }

    #[test]
    fn out_of_range_confidence_is_clamped_and_flagged(
        extra in 0.01f64..100.0,
        above in any::<bool>(),
    ) {
        let original = if above { 1.0 + extra } else { -extra };
        let raw = json!({"risk": 0, "reason": "NA", "confidence": original}).to_string();
        let output = StructuredOutput::from_parsed(&parse(&raw).unwrap()).unwrap();

        let clamped = if above { 1.0 } else { 0.0 };
        prop_assert_eq!(output.confidence, Some(clamped));
        prop_assert_eq!(output.flags, vec![OutputFlag::ConfidenceClamped { original, clamped }]);
    }

    #[test]
    fn unstructured_text_fails_closed(raw in "[a-zA-Z .,']{0,80}") {
        let validator = RiskThresholdValidator::new(RiskLevel::Possible).unwrap();
        let report = validator.check(&raw);
        prop_assert!(!report.is_valid);
        prop_assert!(report.has_code(codes::PARSE_FAILURE));
    }

    #[test]
    fn composite_keeps_first_original(n in 0usize..6, user in text()) {
        let children: Vec<Box<dyn Guardrail>> = (0..n)
            .map(|i| {
                Box::new(PromptGuardrail::new(format!("p{i}"), format!("rule {i}")))
                    as Box<dyn Guardrail>
            })
            .collect();
        let composite = CompositeGuardrail::new("c", children);

        let request = ChatRequest::new(vec![Message::user(user)]);
        let guarded = composite.apply(&request);

        prop_assert_eq!(&guarded.original_request, &request);
        prop_assert_eq!(guarded.modified_request.messages.len(), n + 1);
    }

    #[test]
    fn merge_is_associative(a in report(), b in report(), c in report()) {
        let left = a.clone().merge(b.clone()).merge(c.clone());
        let right = a.merge(b.merge(c));
        prop_assert_eq!(left, right);
    }

    #[test]
    fn merge_identity(a in report()) {
        prop_assert_eq!(ValidationReport::valid().merge(a.clone()), a.clone());
        prop_assert_eq!(a.clone().merge(ValidationReport::valid()), a);
    }
}
