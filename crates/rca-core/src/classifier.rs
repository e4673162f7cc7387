//! Root-cause classifier
//!
//! Category comes from a `(trigger_source, scope_type)` rule table with a
//! source-only fallback. Confidence is an additive score over the report's
//! optional quality signals.

use crate::chain::CausalChain;
use crate::report::FailureReport;
use crate::types::{RootCauseCategory, ScopeType, TriggerSource};
use serde::{Deserialize, Serialize};

/// Starting confidence before any signal is added
pub const BASE_CONFIDENCE: i32 = 40;

/// Confidence ceiling
pub const MAX_CONFIDENCE: u8 = 100;

/// Quality signals feeding the confidence score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceSignals {
    /// 0..20 expected
    pub log_quality: Option<i32>,
    /// 0..20 expected
    pub evidence_strength: Option<i32>,
    /// 0..15 expected
    pub pattern_match_score: Option<i32>,
    /// 0..5 expected
    pub historical_success_bonus: Option<i32>,
}

impl ConfidenceSignals {
    const DEFAULT_LOG_QUALITY: i32 = 10;
    const DEFAULT_EVIDENCE_STRENGTH: i32 = 10;
    const DEFAULT_PATTERN_MATCH: i32 = 5;
    const DEFAULT_HISTORICAL_BONUS: i32 = 0;

    /// Signals recorded on a report
    #[must_use]
    pub fn from_report(report: &FailureReport) -> Self {
        Self {
            log_quality: report.log_quality,
            evidence_strength: report.evidence_strength,
            pattern_match_score: report.pattern_match_score,
            historical_success_bonus: report.historical_success_bonus,
        }
    }

    /// Additive score clamped to `0..=100`
    #[must_use]
    pub fn score(&self) -> u8 {
        let total = BASE_CONFIDENCE
            .saturating_add(self.log_quality.unwrap_or(Self::DEFAULT_LOG_QUALITY))
            .saturating_add(self.evidence_strength.unwrap_or(Self::DEFAULT_EVIDENCE_STRENGTH))
            .saturating_add(self.pattern_match_score.unwrap_or(Self::DEFAULT_PATTERN_MATCH))
            .saturating_add(
                self.historical_success_bonus
                    .unwrap_or(Self::DEFAULT_HISTORICAL_BONUS),
            );
        // clamp guarantees the value fits
        u8::try_from(total.clamp(0, i32::from(MAX_CONFIDENCE))).unwrap_or(MAX_CONFIDENCE)
    }
}

/// Output of the classifier stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Narrative root cause
    pub root_cause: String,
    /// Category
    pub category: RootCauseCategory,
    /// 0..100
    pub confidence: u8,
}

/// Classify a report given its causal chain
#[must_use]
pub fn classify(report: &FailureReport, chain: &CausalChain) -> Classification {
    let category = categorize(&report.trigger_source, &report.scope_type);
    let confidence = ConfidenceSignals::from_report(report).score();
    let root_cause = format!(
        "{} This indicates a {} that requires {}.",
        chain.deepest().answer,
        category.phrase(),
        remediation_action(&category)
    );

    Classification {
        root_cause,
        category,
        confidence,
    }
}

/// Category rule table; the last arm is the catch-all
#[must_use]
pub fn categorize(source: &TriggerSource, scope: &ScopeType) -> RootCauseCategory {
    match (source, scope) {
        (TriggerSource::TestFailure, _) => RootCauseCategory::TestCoverageGap,
        (TriggerSource::CiPipeline, _) => RootCauseCategory::Infrastructure,
        (TriggerSource::QualityGate, ScopeType::Prd) => RootCauseCategory::RequirementsAmbiguity,
        (TriggerSource::QualityGate, _) => RootCauseCategory::CodeDefect,
        (TriggerSource::SubAgent, _) => RootCauseCategory::CodeDefect,
        (TriggerSource::Runtime, _) => RootCauseCategory::Environmental,
        (TriggerSource::HandoffRejection, _) => RootCauseCategory::ProcessGap,
        _ => RootCauseCategory::CodeDefect,
    }
}

/// Remediation action type named in the root-cause narrative
#[must_use]
pub fn remediation_action(category: &RootCauseCategory) -> &'static str {
    match category {
        RootCauseCategory::CodeDefect => "code fix and enhanced testing",
        RootCauseCategory::ConfigError => "configuration correction and validation",
        RootCauseCategory::Infrastructure => "infrastructure remediation and monitoring",
        RootCauseCategory::ProcessGap => "process improvement and documentation",
        RootCauseCategory::RequirementsAmbiguity => "requirements clarification and PRD update",
        RootCauseCategory::TestCoverageGap => "expanded test coverage and automation",
        RootCauseCategory::DependencyIssue => "dependency update or isolation",
        RootCauseCategory::Environmental => "environment configuration and monitoring",
        RootCauseCategory::SchemaMismatch => "schema migration and contract validation",
        RootCauseCategory::SecurityVulnerability => "security patch and threat review",
        RootCauseCategory::PerformanceRegression => "performance profiling and budget enforcement",
        RootCauseCategory::ProtocolViolation => "protocol enforcement and workflow checks",
        RootCauseCategory::Unknown => "further investigation and manual review",
        RootCauseCategory::Other(_) => "remediation",
    }
}
