//! Learning records
//!
//! A learning record captures the lesson of one analysis run for downstream
//! consumers. Each run produces at most one record; `dedup_key` lets a sink
//! collapse retries of the same attempt.

use crate::config::RcaConfig;
use crate::recommendations::Recommendation;
use crate::types::{ReportId, RootCauseCategory};
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Learning record identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LearningRecordId(pub Ulid);

impl LearningRecordId {
    /// Fresh time-ordered id
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for LearningRecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LearningRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lesson type derived from the root-cause category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LessonType {
    /// Code-level
    Technical,
    /// Configuration or environment
    Operational,
    /// Infrastructure
    Infrastructure,
    /// Workflow
    Process,
    /// Requirements
    Requirements,
    /// Test coverage
    Testing,
    /// Third-party dependency
    Dependency,
    /// Security
    Security,
    /// Performance
    Performance,
    /// Anything else
    General,
}

impl LessonType {
    /// Lesson type for a category; unknown categories are `GENERAL`
    #[must_use]
    pub fn for_category(category: &RootCauseCategory) -> Self {
        match category {
            RootCauseCategory::CodeDefect | RootCauseCategory::SchemaMismatch => Self::Technical,
            RootCauseCategory::ConfigError | RootCauseCategory::Environmental => Self::Operational,
            RootCauseCategory::Infrastructure => Self::Infrastructure,
            RootCauseCategory::ProcessGap | RootCauseCategory::ProtocolViolation => Self::Process,
            RootCauseCategory::RequirementsAmbiguity => Self::Requirements,
            RootCauseCategory::TestCoverageGap => Self::Testing,
            RootCauseCategory::DependencyIssue => Self::Dependency,
            RootCauseCategory::SecurityVulnerability => Self::Security,
            RootCauseCategory::PerformanceRegression => Self::Performance,
            RootCauseCategory::Unknown | RootCauseCategory::Other(_) => Self::General,
        }
    }
}

/// Coarse confidence bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLevel {
    /// At or above the high cut-off
    High,
    /// At or above the learning threshold
    Medium,
    /// Below both
    Low,
}

impl ConfidenceLevel {
    /// Bucket a confidence score
    #[must_use]
    pub fn from_confidence(confidence: u8, config: &RcaConfig) -> Self {
        if confidence >= config.high_confidence_level {
            Self::High
        } else if confidence >= config.learning_threshold {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Counts attached to a learning record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningMetadata {
    /// Classified category
    pub category: RootCauseCategory,
    /// Number of contributing factors
    #[serde(rename = "contributing_factors")]
    pub factor_count: usize,
    /// Number of pattern matches
    #[serde(rename = "pattern_matches")]
    pub pattern_match_count: usize,
}

/// Lesson captured from one analysis run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningRecord {
    /// Record id
    pub id: LearningRecordId,
    /// Analyzed report
    #[serde(rename = "rcr_id")]
    pub report_id: ReportId,
    /// Attempt number this record belongs to (1-based)
    pub attempt: u32,
    /// Lesson type
    pub lesson_type: LessonType,
    /// `Root cause: ` plus a bounded prefix of the narrative
    pub lesson_summary: String,
    /// Top recommendation actions joined with `; `
    pub prevention_guidance: String,
    /// Best pattern id, if any
    pub pattern_id: Option<String>,
    /// Confidence bucket
    pub confidence_level: ConfidenceLevel,
    /// Counts
    pub metadata: LearningMetadata,
}

impl LearningRecord {
    /// Key identifying the (report, attempt) pair
    #[must_use]
    pub fn dedup_key(&self) -> String {
        format!("{}#{}", self.report_id, self.attempt)
    }
}

/// Inputs needed to build a learning record
#[derive(Debug, Clone, Copy)]
pub struct LessonInput<'a> {
    /// Analyzed report
    pub report_id: &'a ReportId,
    /// Attempt number of this run
    pub attempt: u32,
    /// Narrative root cause
    pub root_cause: &'a str,
    /// Category
    pub category: &'a RootCauseCategory,
    /// Confidence
    pub confidence: u8,
    /// Ordered recommendations
    pub recommendations: &'a [Recommendation],
    /// Best pattern id
    pub pattern_id: Option<&'a str>,
    /// Number of contributing factors
    pub factor_count: usize,
    /// Number of pattern matches
    pub pattern_match_count: usize,
}

/// Whether a run at `confidence` should emit a record
#[must_use]
pub fn should_emit(confidence: u8, skip: bool, config: &RcaConfig) -> bool {
    !skip && !config.skip_learning && confidence >= config.learning_threshold
}

/// Build the learning record for a run
#[must_use]
pub fn build_learning_record(input: &LessonInput<'_>, config: &RcaConfig) -> LearningRecord {
    let summary: String = input.root_cause.chars().take(config.lesson_summary_chars).collect();
    let guidance = input
        .recommendations
        .iter()
        .take(config.prevention_guidance_actions)
        .map(|r| r.action.as_str())
        .collect::<Vec<_>>()
        .join("; ");

    LearningRecord {
        id: LearningRecordId::new(),
        report_id: input.report_id.clone(),
        attempt: input.attempt,
        lesson_type: LessonType::for_category(input.category),
        lesson_summary: format!("Root cause: {summary}"),
        prevention_guidance: guidance,
        pattern_id: input.pattern_id.map(str::to_string),
        confidence_level: ConfidenceLevel::from_confidence(input.confidence, config),
        metadata: LearningMetadata {
            category: input.category.clone(),
            factor_count: input.factor_count,
            pattern_match_count: input.pattern_match_count,
        },
    }
}
