//! Analysis result returned to the caller
//!
//! Always well formed: a failed analysis is an `ERROR` verdict with one
//! critical issue, never an `Err`.

use crate::chain::CausalStep;
use crate::error::RcaError;
use crate::factors::ContributingFactor;
use crate::pattern::PatternMatch;
use crate::recommendations::Recommendation;
use crate::types::{ReportId, ReportStatus, RootCauseCategory, ScopeType};
use crate::verdict::Verdict;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recommendation attached to a fetch failure
pub const FETCH_FAILURE_RECOMMENDATION: &str = "Check RCR ID and database connectivity";

/// Recommendation attached to an invalid engine configuration
pub const CONFIG_FAILURE_RECOMMENDATION: &str = "Fix engine thresholds so review_threshold <= capa_threshold <= 100";

/// Blocking problem encountered during analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalIssue {
    /// Always `ERROR` today
    pub severity: String,
    /// What went wrong
    pub issue: String,
    /// What to check
    pub recommendation: String,
}

/// Stage outputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    /// Narrative root cause
    pub root_cause: String,
    /// Category
    pub root_cause_category: RootCauseCategory,
    /// 5-Whys chain
    pub causal_chain: Vec<CausalStep>,
    /// Weighted factors
    pub contributing_factors: Vec<ContributingFactor>,
    /// Similar historical reports
    pub pattern_matches: Vec<PatternMatch>,
}

/// Report metadata echoed back
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMetadata {
    /// Status before this run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rcr_status: Option<ReportStatus>,
    /// Trigger tier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_tier: Option<u8>,
    /// Scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_type: Option<ScopeType>,
    /// Status persisted by this run; absent when the update failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persisted_status: Option<ReportStatus>,
    /// Attempt number of this run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_attempt: Option<u32>,
    /// Whether a learning record was written
    #[serde(default)]
    pub learning_record_emitted: bool,
}

/// Caller-facing result of one analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Analyzed report
    #[serde(rename = "rcr_id")]
    pub report_id: ReportId,
    /// When the analysis ran
    pub timestamp: DateTime<Utc>,
    /// Verdict
    pub verdict: Verdict,
    /// 0..100, 0 on error
    pub confidence: u8,
    /// Fatal problems
    pub critical_issues: Vec<CriticalIssue>,
    /// Quality and persistence warnings
    pub warnings: Vec<String>,
    /// Ordered recommendations
    pub recommendations: Vec<Recommendation>,
    /// Stage outputs; absent on error
    pub analysis: Option<Analysis>,
    /// Echoed metadata
    pub metadata: ResultMetadata,
}

impl AnalysisResult {
    /// Result for an analysis aborted before any stage ran
    #[must_use]
    pub fn failed(report_id: ReportId, timestamp: DateTime<Utc>, error: &RcaError) -> Self {
        let recommendation = match error {
            RcaError::Config(_) => CONFIG_FAILURE_RECOMMENDATION,
            _ => FETCH_FAILURE_RECOMMENDATION,
        };
        Self {
            report_id,
            timestamp,
            verdict: Verdict::Error,
            confidence: 0,
            critical_issues: vec![CriticalIssue {
                severity: "ERROR".to_string(),
                issue: error.to_string(),
                recommendation: recommendation.to_string(),
            }],
            warnings: Vec::new(),
            recommendations: Vec::new(),
            analysis: None,
            metadata: ResultMetadata::default(),
        }
    }

    /// True when the verdict is `ERROR`
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.verdict == Verdict::Error
    }
}
