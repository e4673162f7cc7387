//! Contributing-factor analyzer
//!
//! Independent checks, each adding one fixed-weight factor when it fires.
//! The result is sorted by weight, heaviest first, keeping detection order
//! on ties.

use crate::chain::{CausalChain, CHAIN_DEPTH};
use crate::report::{FailureReport, LinkedSummary};
use crate::types::ScopeType;
use serde::{Deserialize, Serialize};

/// Which check produced a factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    /// Tier 1 trigger
    CriticalSeverity,
    /// Strategic-directive scope
    SdScope,
    /// No linked requirements item
    MissingRequirements,
    /// Requirements item still in draft
    IncompleteRequirements,
    /// More than one prior analysis
    RepeatedAnalysis,
    /// Seen more than once
    RecurringIssue,
    /// Full 5-Whys depth reached
    DeepCausalChain,
}

impl FactorKind {
    /// Display name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::CriticalSeverity => "Critical severity classification",
            Self::SdScope => "SD-level scope",
            Self::MissingRequirements => "Missing PRD",
            Self::IncompleteRequirements => "Incomplete PRD",
            Self::RepeatedAnalysis => "Repeated analysis required",
            Self::RecurringIssue => "Recurring issue",
            Self::DeepCausalChain => "Deep causal chain",
        }
    }

    /// Fixed weight
    #[must_use]
    pub fn weight(self) -> u32 {
        match self {
            Self::CriticalSeverity => 25,
            Self::SdScope | Self::RecurringIssue => 20,
            Self::MissingRequirements | Self::RepeatedAnalysis => 15,
            Self::IncompleteRequirements | Self::DeepCausalChain => 10,
        }
    }
}

/// Weighted condition explaining severity or complexity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributingFactor {
    /// Check that fired
    pub kind: FactorKind,
    /// Display name
    pub name: String,
    /// Positive weight
    pub weight: u32,
    /// Supporting evidence
    pub evidence: String,
}

impl ContributingFactor {
    fn new(kind: FactorKind, evidence: impl Into<String>) -> Self {
        Self {
            kind,
            name: kind.name().to_string(),
            weight: kind.weight(),
            evidence: evidence.into(),
        }
    }
}

/// Identify contributing factors
///
/// `report.analysis_attempts` is read as the count before this run.
#[must_use]
pub fn identify_contributing_factors(
    report: &FailureReport,
    requirements: Option<&LinkedSummary>,
    chain: &CausalChain,
) -> Vec<ContributingFactor> {
    let mut factors = Vec::new();

    if report.trigger_tier == 1 {
        factors.push(ContributingFactor::new(
            FactorKind::CriticalSeverity,
            "T1 trigger indicates blocking issue",
        ));
    }

    if report.scope_type == ScopeType::Sd {
        factors.push(ContributingFactor::new(
            FactorKind::SdScope,
            "Failure at strategic directive level affects multiple components",
        ));
    }

    match requirements {
        None => factors.push(ContributingFactor::new(
            FactorKind::MissingRequirements,
            "No product requirements document - requirements may be unclear",
        )),
        Some(prd) if prd.is_draft() => factors.push(ContributingFactor::new(
            FactorKind::IncompleteRequirements,
            "PRD in draft phase - requirements not finalized",
        )),
        Some(_) => {}
    }

    if report.analysis_attempts > 1 {
        factors.push(ContributingFactor::new(
            FactorKind::RepeatedAnalysis,
            format!(
                "{} analysis attempts indicate complex root cause",
                report.analysis_attempts
            ),
        ));
    }

    if report.recurrence_count > 1 {
        factors.push(ContributingFactor::new(
            FactorKind::RecurringIssue,
            format!("Issue has occurred {} time(s)", report.recurrence_count),
        ));
    }

    if chain.len() >= CHAIN_DEPTH {
        factors.push(ContributingFactor::new(
            FactorKind::DeepCausalChain,
            "Full 5-Whys analysis reveals systemic root cause",
        ));
    }

    factors.sort_by(|a, b| b.weight.cmp(&a.weight));
    factors
}
