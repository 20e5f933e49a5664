//! Instruction text for the built-in guardrails.
//!
//! The suicide-risk prompt is assembled from fixed blocks:
//! 1. Role and task framing
//! 2. Risk indicators
//! 3. Sensitivity policy (varies by [`Sensitivity`])
//! 4. Transcript (dynamic)
//! 5. Output format, with optional analysis and confidence tags
//!
//! Its output format always matches what the response parser accepts as tag
//! soup, so a compliant reply parses with no fallback. The harm prompt asks
//! for a JSON object instead.

use crate::taxonomy::{HarmPolicy, Sensitivity};

/// Cues the model is asked to look for in user messages.
pub const RISK_INDICATORS: &str = r#"
- Direct ideation: explicit wish to die or self-harm ("I want to kill myself").
- Indirect allusion: "sleep forever", "won't be a burden much longer".
- Hopelessness or absolutist thinking: "nothing will ever change", "always alone".
- Burdensomeness and social withdrawal: "everyone would be better off without me".
- Death preoccupation and farewells: repeated talk of death, good-bye messages.
- Planning cues: mentions of method, timing, preparations, deleting accounts.
"#;

const LOW_SENSITIVITY: &str = r#"
- Flag ONLY when direct ideation OR planning cues are explicitly present.
- If evidence is ambiguous, default to risk=0 (no risk).
"#;

const MEDIUM_SENSITIVITY: &str = r#"
- Flag explicit ideation AND clearly implied suicidal thoughts or hopelessness.
- When multiple mild cues co-occur, escalate to risk=1.
"#;

const HIGH_SENSITIVITY: &str = r#"
- Flag explicit, implied, and subtle cumulative cues of suicidality.
- Treat even single vague statements of death wish as possible risk (risk>=1).
"#;

const RISK_SCALE: &str = r#"
Risk scale:
0 = no risk indicators
1 = possible risk (indirect or ambiguous cues)
2 = active ideation without a plan
3 = plan or imminent intent (method, timing, preparations)
"#;

/// Supportive-response instruction for the mental health guardrail.
pub const MENTAL_HEALTH_SUPPORT_PROMPT: &str = r#"
You are responding to someone who may be experiencing emotional distress.

## Response Guidelines
1. Acknowledge the person's feelings without judgement or minimisation
2. Do not diagnose, label, or offer clinical treatment advice
3. Encourage reaching out to trusted people and qualified professionals
4. If the person mentions self-harm or suicide, share crisis resources and
   urge them to contact local emergency services
5. Keep a calm, warm tone; avoid platitudes and pressure

You are a supportive companion, not a replacement for professional care.
"#;

/// Data-handling instruction for the PII guardrail.
pub const PII_PROTECTION_PROMPT: &str = r#"
## Personal Data Handling
- Never repeat, infer, or generate personally identifiable information:
  email addresses, phone numbers, government identifiers, payment card numbers.
- Never output credentials: API keys, access tokens, passwords, cloud keys.
- If the conversation contains such data, refer to it generically
  ("the email address you shared") instead of quoting it.
- If asked to reveal or reconstruct personal data, decline briefly.
"#;

/// Sensitivity policy block.
pub fn sensitivity_block(sensitivity: Sensitivity) -> &'static str {
    match sensitivity {
        Sensitivity::Low => LOW_SENSITIVITY,
        Sensitivity::Medium => MEDIUM_SENSITIVITY,
        Sensitivity::High => HIGH_SENSITIVITY,
    }
}

/// Build the suicide-risk classification prompt.
///
/// # Arguments
/// * `transcript` - User messages only, oldest first
/// * `sensitivity` - Policy block to include
/// * `reasoning` - Ask for a short `<analysis>`
/// * `confidence` - Ask for a `<confidence>` score
pub fn build_suicide_prompt(
    transcript: &str,
    sensitivity: Sensitivity,
    reasoning: bool,
    confidence: bool,
) -> String {
    let mut instructions = vec![
        "- Focus exclusively on user language (ignore the assistant's replies).".to_string(),
        format!(
            "- Apply the following sensitivity policy:\n{}",
            sensitivity_block(sensitivity).trim()
        ),
        "- Use the four-level risk scale above.".to_string(),
    ];
    if reasoning {
        instructions.push("- Provide brief evidence (max 25 words) in <analysis>.".to_string());
    }
    if confidence {
        instructions.push("- Provide a confidence score 0.0-1.0 in <confidence>.".to_string());
    }
    instructions.push("- Output ONLY the tags below, in this order. No extra text.".to_string());

    let mut format = Vec::new();
    if reasoning {
        format.push("<analysis>...</analysis>");
    }
    format.push("<risk>0/1/2/3</risk>");
    if confidence {
        format.push("<confidence>x.x</confidence>");
    }
    format.push("<reason>key cue or 'NA'</reason>");

    format!(
        r#"You are a vigilant clinical psychologist specialising in suicide-risk
assessment. Analyse ONLY the user messages in the following chat and
assign a risk level for suicidal intent.

Indicators:
{indicators}
{scale}
================= CHAT TRANSCRIPT =================
{transcript}
===================================================

Instructions
------------
{instructions}

{format}

Begin."#,
        indicators = RISK_INDICATORS.trim(),
        scale = RISK_SCALE,
        transcript = transcript,
        instructions = instructions.join("\n"),
        format = format.join("\n"),
    )
}

/// Build the harm classification prompt over the assistant's replies.
///
/// The reply is requested as a single JSON object so the direct JSON
/// strategy reads it without fallback.
pub fn build_harm_prompt(
    user_context: &str,
    ai_response: &str,
    policies: &[HarmPolicy],
    reasoning: bool,
    confidence: bool,
) -> String {
    let policy_list = policies
        .iter()
        .map(|p| format!("- Policy {}: {}", p.id(), p.description()))
        .collect::<Vec<_>>()
        .join("\n");

    let mut fields = vec![
        r#"  "classification": "SAFE" | "BORDERLINE" | "HARMFUL""#.to_string(),
        r#"  "violated_policy_id": "<policy id>" or "N/A""#.to_string(),
    ];
    if reasoning {
        fields.push(r#"  "reasoning": "<one or two sentences citing the reply>""#.to_string());
    }
    if confidence {
        fields.push(r#"  "confidence_score": <0.0-1.0>"#.to_string());
    }

    format!(
        r#"You are a safety reviewer auditing an AI assistant's replies to a user
who may be vulnerable. Judge ONLY the assistant's replies; the user's
messages are context.

Policies:
{policy_list}

Classification:
- HARMFUL: the reply clearly violates one of the policies above.
- BORDERLINE: the reply is ambiguous or could reasonably be read as a violation.
- SAFE: the reply violates none of the policies.

================= USER CONTEXT =================
{user_context}
================= ASSISTANT REPLY ==============
{ai_response}
================================================

Answer with a single JSON object and nothing else:
{{
{fields}
}}"#,
        policy_list = policy_list,
        user_context = user_context,
        ai_response = ai_response,
        fields = fields.join(",\n"),
    )
}

/// Build the complaint triage instruction for the user's current turn.
pub fn build_complaints_prompt(user_input: &str) -> String {
    format!(
        r#"The user's latest message may contain a complaint.

================= USER MESSAGE =================
{user_input}
================================================

## Complaint Handling
1. Decide whether the message is a complaint. If it is not, reply normally.
2. Identify the category: service, product, billing, staff conduct, or other.
3. Acknowledge the problem in your own words and apologise for the experience
   without admitting fault on anyone's behalf.
4. Offer concrete next steps the user can take, or ask one clarifying question.
5. If the user mentions legal action, safety, or repeated unresolved issues,
   say that the complaint will be escalated to a human team member.
6. Stay calm and courteous even if the message is hostile."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::KNOWN_TAGS;

    #[test]
    fn test_sensitivity_blocks_differ() {
        assert_ne!(
            sensitivity_block(Sensitivity::Low),
            sensitivity_block(Sensitivity::High)
        );
        assert!(sensitivity_block(Sensitivity::Medium).contains("co-occur"));
    }

    #[test]
    fn test_prompt_includes_transcript_and_policy() {
        let prompt = build_suicide_prompt("I can't go on", Sensitivity::High, true, false);
        assert!(prompt.contains("I can't go on"));
        assert!(prompt.contains("subtle cumulative cues"));
        assert!(prompt.contains("<analysis>"));
        assert!(!prompt.contains("<confidence>"));
    }

    #[test]
    fn test_optional_tags_follow_flags() {
        let prompt = build_suicide_prompt("", Sensitivity::Low, false, true);
        assert!(!prompt.contains("<analysis>"));
        assert!(prompt.contains("<confidence>x.x</confidence>"));
        assert!(prompt.contains("<risk>0/1/2/3</risk>"));
        assert!(prompt.contains("<reason>"));
    }

    #[test]
    fn test_requested_tags_are_parseable() {
        for tag in ["analysis", "risk", "confidence", "reason"] {
            assert!(KNOWN_TAGS.contains(&tag));
        }
    }

    #[test]
    fn test_harm_prompt_lists_only_monitored_policies() {
        let prompt = build_harm_prompt(
            "how much is too much",
            "Here is a dosage table",
            &[HarmPolicy::SubstanceAbuse],
            true,
            false,
        );
        assert!(prompt.contains("Policy 2.2"));
        assert!(!prompt.contains("Policy 1.1"));
        assert!(prompt.contains("Here is a dosage table"));
        assert!(prompt.contains(r#""reasoning""#));
        assert!(!prompt.contains("confidence_score"));
    }

    #[test]
    fn test_complaints_prompt_embeds_user_turn() {
        let prompt = build_complaints_prompt("My order never arrived.");
        assert!(prompt.contains("My order never arrived."));
        assert!(prompt.contains("escalated"));
    }
}
