//! Causal chain builder (5-Whys)
//!
//! Each level is a deterministic lookup over the report and its linked
//! context. Every branch has a default answer, so the builder cannot fail
//! and always yields exactly `CHAIN_DEPTH` contiguous levels.

use crate::report::{FailureReport, LinkedSummary};
use crate::types::{ScopeType, TriggerSource};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of levels in every causal chain
pub const CHAIN_DEPTH: usize = 5;

/// Characters of each JSON snapshot kept in the level-1 answer
const SNAPSHOT_CHARS: usize = 100;

/// What a causal-chain answer is based on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceTag {
    /// Observed vs expected snapshots
    FailureSignature,
    /// Trigger source table
    TriggerSourceAnalysis,
    /// Linked strategic/requirements state
    ContextAnalysis,
    /// Trigger tier table
    ProcessGapAnalysis,
    /// Scope table
    SystemicAnalysis,
}

/// One "why" in the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CausalStep {
    /// 1-based level
    pub level: u8,
    /// The question asked at this level
    pub question: String,
    /// The derived answer
    pub answer: String,
    /// Evidence tag
    pub evidence: EvidenceTag,
}

impl CausalStep {
    fn new(level: u8, question: impl Into<String>, answer: impl Into<String>, evidence: EvidenceTag) -> Self {
        Self {
            level,
            question: question.into(),
            answer: answer.into(),
            evidence,
        }
    }
}

/// Fixed-depth causal chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CausalChain {
    steps: [CausalStep; CHAIN_DEPTH],
}

impl CausalChain {
    /// Steps in level order
    #[inline]
    #[must_use]
    pub fn steps(&self) -> &[CausalStep] {
        &self.steps
    }

    /// Deepest ("systemic") level
    #[inline]
    #[must_use]
    pub fn deepest(&self) -> &CausalStep {
        &self.steps[CHAIN_DEPTH - 1]
    }

    /// Always `CHAIN_DEPTH`
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Never empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Owned copy for persistence
    #[must_use]
    pub fn to_vec(&self) -> Vec<CausalStep> {
        self.steps.to_vec()
    }
}

/// Build the 5-Whys chain for a report
#[must_use]
pub fn build_causal_chain(
    report: &FailureReport,
    strategic: Option<&LinkedSummary>,
    requirements: Option<&LinkedSummary>,
) -> CausalChain {
    let trigger = &report.trigger_source;

    let steps = [
        CausalStep::new(
            1,
            format!("Why did \"{}\" occur?", report.problem_statement),
            format!(
                "Observed: {}... Expected: {}...",
                snapshot(&report.observed),
                snapshot(&report.expected)
            ),
            EvidenceTag::FailureSignature,
        ),
        CausalStep::new(
            2,
            format!("Why was the {trigger} behavior different from expected?"),
            trigger_explanation(trigger),
            EvidenceTag::TriggerSourceAnalysis,
        ),
        CausalStep::new(
            3,
            "Why did this root condition exist in the codebase/configuration?",
            context_condition(report, strategic, requirements),
            EvidenceTag::ContextAnalysis,
        ),
        CausalStep::new(
            4,
            "Why wasn't this issue caught during earlier phases?",
            detection_gap(report.trigger_tier),
            EvidenceTag::ProcessGapAnalysis,
        ),
        CausalStep::new(
            5,
            "What systemic or process factor allowed this issue to occur?",
            systemic_factor(&report.scope_type),
            EvidenceTag::SystemicAnalysis,
        ),
    ];

    CausalChain { steps }
}

/// Compact JSON of a snapshot, truncated; absent snapshots render as `{}`
fn snapshot(value: &Value) -> String {
    let json = match value {
        Value::Null => "{}".to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| "{}".to_string()),
    };
    json.chars().take(SNAPSHOT_CHARS).collect()
}

/// Level 2: canned explanation per trigger source
#[must_use]
pub fn trigger_explanation(source: &TriggerSource) -> &'static str {
    match source {
        TriggerSource::QualityGate => {
            "Quality gate validation logic detected a discrepancy between implementation and requirements"
        }
        TriggerSource::CiPipeline => {
            "CI/CD pipeline execution revealed build, test, or deployment issues"
        }
        TriggerSource::Runtime => {
            "Production runtime monitoring detected anomalous behavior or errors"
        }
        TriggerSource::Manual => "Manual inspection or user report identified unexpected behavior",
        TriggerSource::SubAgent => "Sub-agent automated analysis detected validation failures",
        TriggerSource::TestFailure => {
            "Test suite execution revealed failing assertions or coverage gaps"
        }
        TriggerSource::HandoffRejection => {
            "Phase handoff validation rejected due to incomplete or invalid criteria"
        }
        TriggerSource::Other(_) => "Unknown trigger source behavior",
    }
}

/// Level 3: systemic condition suggested by linked-item state
fn context_condition(
    report: &FailureReport,
    strategic: Option<&LinkedSummary>,
    requirements: Option<&LinkedSummary>,
) -> &'static str {
    if requirements.is_some_and(|prd| !prd.is_approved()) {
        return "PRD requirements may not have been fully validated before implementation";
    }
    if strategic.is_some_and(LinkedSummary::is_active) && report.trigger_tier == 1 {
        return "Critical issue in active SD suggests implementation gap or requirements misunderstanding";
    }
    "Implementation proceeded without complete validation of edge cases or error handling"
}

/// Level 4: why the issue slipped through, per tier
fn detection_gap(tier: u8) -> &'static str {
    match tier {
        1 => "T1 critical issue - likely missed due to insufficient test coverage or review depth",
        2 => "T2 high priority - may have been deprioritized or overlooked in code review",
        _ => "Lower priority issue may have been acceptable risk or known limitation",
    }
}

/// Level 5: systemic factor per scope
#[must_use]
pub fn systemic_factor(scope: &ScopeType) -> &'static str {
    match scope {
        ScopeType::Sd => "Strategic directive scope may have been too broad or requirements ambiguous",
        ScopeType::Prd => "Product requirements may need additional validation gates",
        ScopeType::Pipeline => "CI/CD pipeline configuration may need additional quality checks",
        ScopeType::Runtime => "Production monitoring and alerting may need enhancement",
        ScopeType::SubAgent => "Sub-agent coverage or trigger conditions may need expansion",
        ScopeType::Other(_) => "Process improvements needed for earlier detection",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report(source: TriggerSource, scope: ScopeType, tier: u8) -> FailureReport {
        FailureReport::new("rcr-1", "Login test regressed", source, scope, tier)
    }

    #[test]
    fn chain_has_five_contiguous_levels() {
        let chain = build_causal_chain(&report(TriggerSource::TestFailure, ScopeType::Prd, 2), None, None);
        assert_eq!(chain.len(), CHAIN_DEPTH);
        for (i, step) in chain.steps().iter().enumerate() {
            assert_eq!(usize::from(step.level), i + 1);
        }
        assert_eq!(chain.deepest().level, 5);
    }

    #[test]
    fn level_one_restates_snapshots() {
        let r = report(TriggerSource::TestFailure, ScopeType::Prd, 2)
            .with_snapshots(json!({"status": "failed"}), json!({"status": "passed"}));
        let chain = build_causal_chain(&r, None, None);
        let step = &chain.steps()[0];
        assert_eq!(step.question, "Why did \"Login test regressed\" occur?");
        assert_eq!(
            step.answer,
            r#"Observed: {"status":"failed"}... Expected: {"status":"passed"}..."#
        );
    }

    #[test]
    fn absent_snapshots_render_as_empty_objects() {
        let chain = build_causal_chain(&report(TriggerSource::Manual, ScopeType::Sd, 3), None, None);
        assert_eq!(chain.steps()[0].answer, "Observed: {}... Expected: {}...");
    }

    #[test]
    fn long_snapshots_are_truncated() {
        let long = "x".repeat(500);
        let r = report(TriggerSource::Manual, ScopeType::Sd, 3)
            .with_snapshots(json!({ "log": long }), Value::Null);
        let chain = build_causal_chain(&r, None, None);
        let observed = chain.steps()[0]
            .answer
            .strip_prefix("Observed: ")
            .and_then(|s| s.split("... Expected").next())
            .unwrap();
        assert_eq!(observed.chars().count(), SNAPSHOT_CHARS);
    }

    #[test]
    fn unknown_trigger_and_scope_fall_back() {
        let r = report(TriggerSource::from("COSMIC_RAY"), ScopeType::from("TENANT"), 3);
        let chain = build_causal_chain(&r, None, None);
        assert_eq!(chain.steps()[1].answer, "Unknown trigger source behavior");
        assert_eq!(
            chain.steps()[4].answer,
            "Process improvements needed for earlier detection"
        );
    }

    #[test]
    fn unapproved_prd_drives_level_three() {
        let r = report(TriggerSource::QualityGate, ScopeType::Prd, 1);
        let prd = LinkedSummary::new("prd-1").with_status("draft");
        let chain = build_causal_chain(&r, None, Some(&prd));
        assert!(chain.steps()[2].answer.starts_with("PRD requirements"));
    }

    #[test]
    fn active_sd_with_tier_one_drives_level_three() {
        let r = report(TriggerSource::SubAgent, ScopeType::Sd, 1);
        let sd = LinkedSummary::new("sd-1").with_status("active");
        let approved = LinkedSummary::new("prd-1").with_status("approved");
        let chain = build_causal_chain(&r, Some(&sd), Some(&approved));
        assert!(chain.steps()[2].answer.starts_with("Critical issue in active SD"));

        let tier_two = report(TriggerSource::SubAgent, ScopeType::Sd, 2);
        let chain = build_causal_chain(&tier_two, Some(&sd), Some(&approved));
        assert!(chain.steps()[2].answer.starts_with("Implementation proceeded"));
    }

    #[test]
    fn level_four_branches_on_tier() {
        for (tier, prefix) in [(1, "T1"), (2, "T2"), (3, "Lower"), (7, "Lower")] {
            let chain = build_causal_chain(&report(TriggerSource::Runtime, ScopeType::Runtime, tier), None, None);
            assert!(chain.steps()[3].answer.starts_with(prefix), "tier {tier}");
        }
    }

    #[test]
    fn chain_serializes_as_array() {
        let chain = build_causal_chain(&report(TriggerSource::CiPipeline, ScopeType::Pipeline, 2), None, None);
        let value = serde_json::to_value(&chain).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(CHAIN_DEPTH));
        assert_eq!(value[4]["evidence"], "systemic_analysis");
    }
}
