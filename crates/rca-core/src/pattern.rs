//! Pattern matcher
//!
//! Scores each historical report against the current one:
//!
//! | component         | points |
//! |-------------------|--------|
//! | category match    | 0 / 40 |
//! | signature overlap | 0..40  |
//! | scope match       | 0 / 20 |
//!
//! Candidates at or above the threshold are returned, best first. Ties keep
//! the historical (recency) order.

use crate::report::FailureReport;
use crate::types::{ReportId, ReportStatus, RootCauseCategory, TriggerSource};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Default minimum similarity for a match to be surfaced
pub const DEFAULT_SIMILARITY_THRESHOLD: u8 = 50;

const CATEGORY_POINTS: f64 = 40.0;
const SIGNATURE_POINTS: f64 = 40.0;
const SCOPE_POINTS: f64 = 20.0;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]+").expect("static regex"));

/// A historical report judged similar to the current one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternMatch {
    /// Historical report id
    #[serde(rename = "rcr_id")]
    pub report_id: ReportId,
    /// Reused or synthesized pattern id
    pub pattern_id: String,
    /// 0..100
    pub similarity: u8,
    /// Historical category
    pub category: RootCauseCategory,
    /// Historical report already resolved
    pub resolved: bool,
}

/// Per-component similarity score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityBreakdown {
    /// 0 or 40
    pub category: f64,
    /// 0..40
    pub signature: f64,
    /// 0 or 20
    pub scope: f64,
}

impl SimilarityBreakdown {
    /// Unrounded sum of the components
    #[inline]
    #[must_use]
    pub fn raw(&self) -> f64 {
        self.category + self.signature + self.scope
    }

    /// Rounded total
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn total(&self) -> u8 {
        let sum = self.raw().round();
        // components are capped at 40 + 40 + 20
        u8::try_from(sum.clamp(0.0, 100.0) as i64).unwrap_or(100)
    }
}

/// Category inferred from the trigger source alone
#[must_use]
pub fn infer_category(source: &TriggerSource) -> RootCauseCategory {
    match source {
        TriggerSource::TestFailure => RootCauseCategory::TestCoverageGap,
        TriggerSource::CiPipeline => RootCauseCategory::Infrastructure,
        TriggerSource::QualityGate | TriggerSource::SubAgent => RootCauseCategory::CodeDefect,
        TriggerSource::Runtime => RootCauseCategory::Environmental,
        TriggerSource::HandoffRejection => RootCauseCategory::ProcessGap,
        TriggerSource::Manual | TriggerSource::Other(_) => RootCauseCategory::Unknown,
    }
}

/// Lower-cased word tokens of a signature
#[must_use]
pub fn tokenize(signature: &str) -> HashSet<String> {
    NON_WORD
        .split(&signature.to_lowercase())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Share of current tokens found in the historical signature, scaled to 40
#[must_use]
pub fn signature_overlap(current: &HashSet<String>, historical: &HashSet<String>) -> f64 {
    if current.is_empty() {
        return 0.0;
    }
    let shared = current.intersection(historical).count();
    #[allow(clippy::cast_precision_loss)]
    let ratio = shared as f64 / current.len() as f64;
    (ratio * SIGNATURE_POINTS).min(SIGNATURE_POINTS)
}

/// Score one candidate; `None` when it lacks a category or signature
#[must_use]
pub fn score_candidate(current: &FailureReport, historical: &FailureReport) -> Option<SimilarityBreakdown> {
    let historical_category = historical.root_cause_category.as_ref()?;
    let historical_signature = historical.signature()?;

    let inferred = infer_category(&current.trigger_source);
    let category = if current.root_cause_category.as_ref() == Some(historical_category)
        || *historical_category == inferred
    {
        CATEGORY_POINTS
    } else {
        0.0
    };

    let current_tokens = current.signature().map(tokenize).unwrap_or_default();
    let signature = signature_overlap(&current_tokens, &tokenize(historical_signature));

    let scope = if historical.scope_type == current.scope_type {
        SCOPE_POINTS
    } else {
        0.0
    };

    Some(SimilarityBreakdown {
        category,
        signature,
        scope,
    })
}

/// Match the current report against historical candidates
#[must_use]
pub fn find_pattern_matches(
    current: &FailureReport,
    history: &[FailureReport],
    threshold: u8,
) -> Vec<PatternMatch> {
    let mut matches: Vec<PatternMatch> = history
        .iter()
        .filter_map(|historical| {
            let breakdown = score_candidate(current, historical)?;
            let similarity = breakdown.total();
            tracing::debug!(
                candidate = %historical.id,
                similarity,
                category = breakdown.category,
                signature = breakdown.signature,
                scope = breakdown.scope,
                "scored historical candidate"
            );
            // threshold applies to the unrounded score
            (breakdown.raw() >= f64::from(threshold)).then(|| to_match(historical, similarity))
        })
        .collect();

    // stable: equal similarities keep recency order
    matches.sort_by(|a, b| b.similarity.cmp(&a.similarity));
    matches
}

fn to_match(historical: &FailureReport, similarity: u8) -> PatternMatch {
    let category = historical
        .root_cause_category
        .clone()
        .unwrap_or(RootCauseCategory::Unknown);
    let pattern_id = historical.stored_pattern_id().map_or_else(
        || format!("PAT-{}-{}", category, historical.id.prefix(8)),
        str::to_string,
    );

    PatternMatch {
        report_id: historical.id.clone(),
        pattern_id,
        similarity,
        category,
        resolved: historical.status == ReportStatus::Resolved,
    }
}
