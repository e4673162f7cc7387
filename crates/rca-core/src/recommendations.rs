//! Recommendation synthesizer
//!
//! Concatenates three independent sources in order: the category template,
//! the pattern-based advice, and advice from the two heaviest factors.
//! Overlapping advice is kept as-is.

use crate::factors::{ContributingFactor, FactorKind};
use crate::pattern::PatternMatch;
use crate::types::RootCauseCategory;
use serde::{Deserialize, Serialize};

/// How many of the heaviest factors are scanned for advice
const FACTOR_SCAN_DEPTH: usize = 2;

/// Recommendation priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    /// Act now
    High,
    /// Act soon
    Medium,
    /// Nice to have
    Low,
}

/// Recommendation type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationType {
    /// Fix the defect directly
    ImmediateFix,
    /// Add or extend tests
    TestEnhancement,
    /// Rework requirements
    RequirementsUpdate,
    /// Adjust process
    ProcessImprovement,
    /// Fix infrastructure
    InfrastructureFix,
    /// Add monitoring
    MonitoringEnhancement,
    /// Update or isolate a dependency
    DependencyUpdate,
    /// Reuse a known resolution
    PatternLearning,
    /// Unresolved recurring pattern
    PatternAlert,
    /// Write the missing PRD
    PrdCreation,
    /// Automate regression checks
    RegressionPrevention,
}

/// One recommended action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// What to do
    pub action: String,
    /// Priority
    pub priority: Priority,
    /// Type tag
    #[serde(rename = "type")]
    pub kind: RecommendationType,
}

impl Recommendation {
    /// Create a recommendation
    #[inline]
    #[must_use]
    pub fn new(action: impl Into<String>, priority: Priority, kind: RecommendationType) -> Self {
        Self {
            action: action.into(),
            priority,
            kind,
        }
    }
}

/// Category template; categories outside the table contribute nothing
#[must_use]
pub fn category_template(category: &RootCauseCategory) -> Option<Recommendation> {
    let (action, priority, kind) = match category {
        RootCauseCategory::CodeDefect => (
            "Review and fix the identified code defect",
            Priority::High,
            RecommendationType::ImmediateFix,
        ),
        RootCauseCategory::TestCoverageGap => (
            "Expand test coverage to include the failure scenario",
            Priority::High,
            RecommendationType::TestEnhancement,
        ),
        RootCauseCategory::RequirementsAmbiguity => (
            "Clarify PRD requirements and update acceptance criteria",
            Priority::Medium,
            RecommendationType::RequirementsUpdate,
        ),
        RootCauseCategory::ProcessGap => (
            "Update process documentation and add validation checkpoints",
            Priority::Medium,
            RecommendationType::ProcessImprovement,
        ),
        RootCauseCategory::Infrastructure => (
            "Review and update infrastructure configuration",
            Priority::High,
            RecommendationType::InfrastructureFix,
        ),
        RootCauseCategory::Environmental => (
            "Add environment monitoring and alerting",
            Priority::Medium,
            RecommendationType::MonitoringEnhancement,
        ),
        RootCauseCategory::DependencyIssue => (
            "Update or isolate problematic dependency",
            Priority::High,
            RecommendationType::DependencyUpdate,
        ),
        _ => return None,
    };
    Some(Recommendation::new(action, priority, kind))
}

/// Advice derived from pattern matches
#[must_use]
pub fn pattern_advice(matches: &[PatternMatch]) -> Option<Recommendation> {
    if matches.is_empty() {
        return None;
    }
    let advice = match matches.iter().find(|m| m.resolved) {
        Some(resolved) => Recommendation::new(
            format!(
                "Review resolution from similar pattern ({})",
                resolved.pattern_id
            ),
            Priority::Medium,
            RecommendationType::PatternLearning,
        ),
        None => Recommendation::new(
            "This is part of an unresolved pattern - prioritize systemic fix",
            Priority::High,
            RecommendationType::PatternAlert,
        ),
    };
    Some(advice)
}

/// Advice derived from one contributing factor
fn factor_advice(factor: &ContributingFactor) -> Option<Recommendation> {
    match factor.kind {
        FactorKind::MissingRequirements => Some(Recommendation::new(
            "Create comprehensive PRD before continuing implementation",
            Priority::High,
            RecommendationType::PrdCreation,
        )),
        FactorKind::RecurringIssue => Some(Recommendation::new(
            "Implement automated regression prevention for this failure type",
            Priority::High,
            RecommendationType::RegressionPrevention,
        )),
        _ => None,
    }
}

/// Build the ordered recommendation list
///
/// `factors` must already be sorted heaviest first.
#[must_use]
pub fn synthesize_recommendations(
    category: &RootCauseCategory,
    matches: &[PatternMatch],
    factors: &[ContributingFactor],
) -> Vec<Recommendation> {
    category_template(category)
        .into_iter()
        .chain(pattern_advice(matches))
        .chain(
            factors
                .iter()
                .take(FACTOR_SCAN_DEPTH)
                .filter_map(factor_advice),
        )
        .collect()
}
