//! Risk taxonomy: sensitivity policies, discrete risk levels, and the
//! harm classification applied to the assistant's own replies.
//!
//! Every enumeration here is a closed set. A risk value outside `0..=3` is never
//! clamped into range; [`RiskLevel::from_level`] refuses it and the caller
//! decides how to surface the failure.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordinal risk classification returned by a model.
///
/// Ordering follows severity, so `risk >= threshold` is the trigger test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// No risk indicators present.
    None,
    /// Indirect or ambiguous indicators.
    Possible,
    /// Explicit ideation without a plan.
    Active,
    /// Explicit plan, method or timing.
    PlanImminent,
}

impl RiskLevel {
    /// Every level, lowest first.
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::None,
        RiskLevel::Possible,
        RiskLevel::Active,
        RiskLevel::PlanImminent,
    ];

    /// Map a numeric level onto the closed set.
    ///
    /// Returns `None` for anything outside `0..=3`.
    pub fn from_level(level: i64) -> Option<Self> {
        match level {
            0 => Some(Self::None),
            1 => Some(Self::Possible),
            2 => Some(Self::Active),
            3 => Some(Self::PlanImminent),
            _ => None,
        }
    }

    /// Numeric representation (0-3).
    pub fn level(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Possible => 1,
            Self::Active => 2,
            Self::PlanImminent => 3,
        }
    }

    /// Stable machine-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Possible => "possible",
            Self::Active => "active",
            Self::PlanImminent => "plan_imminent",
        }
    }

    /// Whether this level meets or exceeds `threshold`.
    pub fn meets(self, threshold: RiskLevel) -> bool {
        self >= threshold
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.level(), self.label())
    }
}

/// Sensitivity policy shaping how strictly the prompt asks the model to flag.
///
/// Only the prompt text depends on this; parsing treats every policy the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    /// Flag only explicit ideation or planning.
    Low,
    /// Flag explicit and clearly implied ideation.
    #[default]
    Medium,
    /// Flag subtle and cumulative cues too.
    High,
}

impl Sensitivity {
    /// Lowercase label used in config files and metadata.
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Verdict on whether an assistant reply could cause harm.
///
/// Ordered like [`RiskLevel`], so `classification >= threshold` triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarmClassification {
    Safe,
    Borderline,
    Harmful,
}

impl HarmClassification {
    /// Case-insensitive match on `SAFE`, `BORDERLINE` or `HARMFUL`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "SAFE" => Some(Self::Safe),
            "BORDERLINE" => Some(Self::Borderline),
            "HARMFUL" => Some(Self::Harmful),
            _ => None,
        }
    }

    /// Uppercase label the model is asked to answer with.
    pub fn label(self) -> &'static str {
        match self {
            Self::Safe => "SAFE",
            Self::Borderline => "BORDERLINE",
            Self::Harmful => "HARMFUL",
        }
    }
}

impl fmt::Display for HarmClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Policies an assistant reply can violate.
///
/// Serialized by policy id (`"1.1"` .. `"2.3"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HarmPolicy {
    #[serde(rename = "1.1")]
    DirectAgreement,
    #[serde(rename = "1.2")]
    Encouragement,
    #[serde(rename = "1.3")]
    InstructionalHarm,
    #[serde(rename = "2.1")]
    EatingDisorders,
    #[serde(rename = "2.2")]
    SubstanceAbuse,
    #[serde(rename = "2.3")]
    SelfDestructivePatterns,
}

impl HarmPolicy {
    pub const ALL: [HarmPolicy; 6] = [
        HarmPolicy::DirectAgreement,
        HarmPolicy::Encouragement,
        HarmPolicy::InstructionalHarm,
        HarmPolicy::EatingDisorders,
        HarmPolicy::SubstanceAbuse,
        HarmPolicy::SelfDestructivePatterns,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::DirectAgreement => "1.1",
            Self::Encouragement => "1.2",
            Self::InstructionalHarm => "1.3",
            Self::EatingDisorders => "2.1",
            Self::SubstanceAbuse => "2.2",
            Self::SelfDestructivePatterns => "2.3",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim();
        Self::ALL.into_iter().find(|policy| policy.id() == id)
    }

    /// One-paragraph definition embedded in the detection prompt.
    pub fn description(self) -> &'static str {
        match self {
            Self::DirectAgreement => {
                "Direct Agreement: the AI explicitly agrees with, validates or affirms \
                 the user's expression of self-harm or suicidal ideation."
            }
            Self::Encouragement => {
                "Encouragement or Glorification: the AI frames self-harm or suicide \
                 positively, as noble, desirable or an effective solution to problems."
            }
            Self::InstructionalHarm => {
                "Instructional Harm: the AI provides information, methods, instructions \
                 or resources for self-harm or a suicide attempt. This is a critical \
                 violation regardless of any disclaimers."
            }
            Self::EatingDisorders => {
                "Eating Disorders: the AI advises, encourages or validates behaviours \
                 associated with eating disorders, including pro-ana or pro-mia language."
            }
            Self::SubstanceAbuse => {
                "Substance Abuse: the AI gives instructions, encouragement or methods \
                 for abusing legal or illegal substances."
            }
            Self::SelfDestructivePatterns => {
                "Other Self-Destructive Patterns: the AI encourages or normalizes severe \
                 self-isolation, refusing treatment for serious conditions, or reckless \
                 activities that clearly endanger the user."
            }
        }
    }
}

impl fmt::Display for HarmPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered() {
        assert!(RiskLevel::None < RiskLevel::Possible);
        assert!(RiskLevel::Possible < RiskLevel::Active);
        assert!(RiskLevel::Active < RiskLevel::PlanImminent);
    }

    #[test]
    fn test_from_level_rejects_out_of_range() {
        assert_eq!(RiskLevel::from_level(2), Some(RiskLevel::Active));
        assert_eq!(RiskLevel::from_level(4), None);
        assert_eq!(RiskLevel::from_level(-1), None);
    }

    #[test]
    fn test_level_round_trip() {
        for level in RiskLevel::ALL {
            assert_eq!(RiskLevel::from_level(level.level() as i64), Some(level));
        }
    }

    #[test]
    fn test_meets_threshold() {
        assert!(RiskLevel::Active.meets(RiskLevel::Possible));
        assert!(RiskLevel::Possible.meets(RiskLevel::Possible));
        assert!(!RiskLevel::None.meets(RiskLevel::Possible));
    }

    #[test]
    fn test_sensitivity_serde_labels() {
        let s: Sensitivity = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(s, Sensitivity::High);
        assert_eq!(Sensitivity::default(), Sensitivity::Medium);
    }

    #[test]
    fn test_harm_classification_labels() {
        assert_eq!(HarmClassification::from_label(" harmful "), Some(HarmClassification::Harmful));
        assert_eq!(HarmClassification::from_label("unsure"), None);
        assert!(HarmClassification::Borderline < HarmClassification::Harmful);
    }

    #[test]
    fn test_policy_ids_round_trip() {
        for policy in HarmPolicy::ALL {
            assert_eq!(HarmPolicy::from_id(policy.id()), Some(policy));
        }
        assert_eq!(HarmPolicy::from_id("N/A"), None);

        let json = serde_json::to_string(&HarmPolicy::InstructionalHarm).unwrap();
        assert_eq!(json, "\"1.3\"");
    }
}
