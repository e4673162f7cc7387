//! Failure report record and its linked context
//!
//! A `FailureReport` is created by an external trigger. The engine reads the
//! input fields, computes the output fields, and hands a `ReportUpdate` back
//! to the store; it never writes the record in place.

use crate::chain::CausalStep;
use crate::factors::ContributingFactor;
use crate::lifecycle::CapaStatus;
use crate::types::{ReportId, ReportStatus, RootCauseCategory, ScopeType, SeverityPriority, TriggerSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One recorded failure event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    /// Store identifier
    pub id: ReportId,
    /// Normalized failure text used for pattern matching
    #[serde(default)]
    pub failure_signature: Option<String>,
    /// Human-readable problem statement
    pub problem_statement: String,
    /// Observed behaviour snapshot
    #[serde(default)]
    pub observed: Value,
    /// Expected behaviour snapshot
    #[serde(default)]
    pub expected: Value,
    /// Where the failure was detected
    pub trigger_source: TriggerSource,
    /// What the failure affects
    pub scope_type: ScopeType,
    /// 1 = critical .. 3 = low
    pub trigger_tier: u8,
    /// Linked strategic item
    #[serde(default)]
    pub sd_id: Option<String>,
    /// Linked requirements item
    #[serde(default)]
    pub prd_id: Option<String>,
    /// Completed analysis runs before this one
    #[serde(default)]
    pub analysis_attempts: u32,
    /// Times this failure has been seen
    #[serde(default)]
    pub recurrence_count: u32,

    /// Log quality signal (expected 0..20)
    #[serde(default)]
    pub log_quality: Option<i32>,
    /// Evidence strength signal (expected 0..20)
    #[serde(default)]
    pub evidence_strength: Option<i32>,
    /// Pattern match signal (expected 0..15)
    #[serde(default)]
    pub pattern_match_score: Option<i32>,
    /// Historical success bonus (expected 0..5)
    #[serde(default)]
    pub historical_success_bonus: Option<i32>,

    /// Narrative root cause
    #[serde(default)]
    pub root_cause: Option<String>,
    /// Classified category
    #[serde(default)]
    pub root_cause_category: Option<RootCauseCategory>,
    /// 5-Whys chain
    #[serde(default)]
    pub causal_chain: Vec<CausalStep>,
    /// Weighted contributing factors
    #[serde(default)]
    pub contributing_factors: Vec<ContributingFactor>,
    /// Confidence 0..100
    #[serde(default)]
    pub confidence: Option<u8>,
    /// Pattern this report belongs to
    #[serde(default)]
    pub pattern_id: Option<String>,
    /// Similar reports (at most five)
    #[serde(default)]
    pub related_rcr_ids: Vec<ReportId>,
    /// Lifecycle status
    #[serde(default)]
    pub status: ReportStatus,

    /// Severity priority derived by the store
    #[serde(default)]
    pub severity_priority: Option<SeverityPriority>,
    /// Impact level (LOW..CRITICAL)
    #[serde(default)]
    pub impact_level: Option<String>,
    /// Likelihood level (RARE..FREQUENT)
    #[serde(default)]
    pub likelihood_level: Option<String>,
    /// Free-form evidence references (stack traces, logs, screenshots)
    #[serde(default)]
    pub evidence_refs: Value,
    /// Reproduction steps
    #[serde(default)]
    pub repro_steps: Option<String>,
    /// Fraction of successful reproductions
    #[serde(default)]
    pub repro_success_rate: Option<f64>,
    /// Attached CAPA manifests, first one is authoritative
    #[serde(default)]
    pub remediation_manifests: Option<Vec<RemediationManifest>>,

    /// First time the failure happened
    #[serde(default)]
    pub first_occurrence_at: Option<DateTime<Utc>>,
    /// When the trigger detected it
    #[serde(default)]
    pub detected_at: Option<DateTime<Utc>>,
    /// When the CAPA was verified
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
    /// Record creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last write time
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl FailureReport {
    /// Create a report with the required trigger metadata
    #[must_use]
    pub fn new(
        id: impl Into<ReportId>,
        problem_statement: impl Into<String>,
        trigger_source: TriggerSource,
        scope_type: ScopeType,
        trigger_tier: u8,
    ) -> Self {
        Self {
            id: id.into(),
            failure_signature: None,
            problem_statement: problem_statement.into(),
            observed: Value::Null,
            expected: Value::Null,
            trigger_source,
            scope_type,
            trigger_tier,
            sd_id: None,
            prd_id: None,
            analysis_attempts: 0,
            recurrence_count: 0,
            log_quality: None,
            evidence_strength: None,
            pattern_match_score: None,
            historical_success_bonus: None,
            root_cause: None,
            root_cause_category: None,
            causal_chain: Vec::new(),
            contributing_factors: Vec::new(),
            confidence: None,
            pattern_id: None,
            related_rcr_ids: Vec::new(),
            status: ReportStatus::Open,
            severity_priority: None,
            impact_level: None,
            likelihood_level: None,
            evidence_refs: Value::Null,
            repro_steps: None,
            repro_success_rate: None,
            remediation_manifests: None,
            first_occurrence_at: None,
            detected_at: None,
            resolved_at: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// With failure signature
    #[inline]
    #[must_use]
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.failure_signature = Some(signature.into());
        self
    }

    /// With observed/expected snapshots
    #[inline]
    #[must_use]
    pub fn with_snapshots(mut self, observed: Value, expected: Value) -> Self {
        self.observed = observed;
        self.expected = expected;
        self
    }

    /// With linked strategic item
    #[inline]
    #[must_use]
    pub fn with_sd(mut self, sd_id: impl Into<String>) -> Self {
        self.sd_id = Some(sd_id.into());
        self
    }

    /// With linked requirements item
    #[inline]
    #[must_use]
    pub fn with_prd(mut self, prd_id: impl Into<String>) -> Self {
        self.prd_id = Some(prd_id.into());
        self
    }

    /// With stored category
    #[inline]
    #[must_use]
    pub fn with_category(mut self, category: RootCauseCategory) -> Self {
        self.root_cause_category = Some(category);
        self
    }

    /// With lifecycle status
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: ReportStatus) -> Self {
        self.status = status;
        self
    }

    /// With prior analysis attempts and recurrence count
    #[inline]
    #[must_use]
    pub fn with_counters(mut self, analysis_attempts: u32, recurrence_count: u32) -> Self {
        self.analysis_attempts = analysis_attempts;
        self.recurrence_count = recurrence_count;
        self
    }

    /// With all four quality signals
    #[inline]
    #[must_use]
    pub fn with_signals(
        mut self,
        log_quality: i32,
        evidence_strength: i32,
        pattern_match_score: i32,
        historical_success_bonus: i32,
    ) -> Self {
        self.log_quality = Some(log_quality);
        self.evidence_strength = Some(evidence_strength);
        self.pattern_match_score = Some(pattern_match_score);
        self.historical_success_bonus = Some(historical_success_bonus);
        self
    }

    /// With existing pattern id
    #[inline]
    #[must_use]
    pub fn with_pattern_id(mut self, pattern_id: impl Into<String>) -> Self {
        self.pattern_id = Some(pattern_id.into());
        self
    }

    /// With severity priority
    #[inline]
    #[must_use]
    pub fn with_severity(mut self, severity: SeverityPriority) -> Self {
        self.severity_priority = Some(severity);
        self
    }

    /// With a CAPA manifest appended
    #[must_use]
    pub fn with_manifest(mut self, manifest: RemediationManifest) -> Self {
        self.remediation_manifests
            .get_or_insert_with(Vec::new)
            .push(manifest);
        self
    }

    /// First (authoritative) CAPA manifest
    #[inline]
    #[must_use]
    pub fn primary_manifest(&self) -> Option<&RemediationManifest> {
        self.remediation_manifests.as_ref().and_then(|m| m.first())
    }

    /// Trimmed, non-empty failure signature
    #[must_use]
    pub fn signature(&self) -> Option<&str> {
        self.failure_signature
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }

    /// Stored pattern id if non-empty
    #[must_use]
    pub fn stored_pattern_id(&self) -> Option<&str> {
        self.pattern_id.as_deref().filter(|s| !s.is_empty())
    }
}

/// Summary of a linked strategic or requirements item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedSummary {
    /// Item identifier
    pub id: String,
    /// Title
    #[serde(default)]
    pub title: Option<String>,
    /// Status (`active`, `approved`, ...)
    #[serde(default)]
    pub status: Option<String>,
    /// Phase (`draft`, ...)
    #[serde(default)]
    pub phase: Option<String>,
    /// Category or type
    #[serde(default)]
    pub category: Option<String>,
}

impl LinkedSummary {
    /// Create a summary
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// With status
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// With phase
    #[inline]
    #[must_use]
    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    /// With title
    #[inline]
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Status contains "approved"
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.status.as_deref().is_some_and(|s| s.contains("approved"))
    }

    /// Status is exactly "active"
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.as_deref() == Some("active")
    }

    /// Phase is exactly "draft"
    #[must_use]
    pub fn is_draft(&self) -> bool {
        self.phase.as_deref() == Some("draft")
    }
}

/// Kind of linked item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// Strategic directive
    Strategic,
    /// Product requirements
    Requirements,
}

/// Reference to a linked item
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkRef {
    /// Item kind
    pub kind: LinkKind,
    /// Item id
    pub id: String,
}

impl LinkRef {
    /// Strategic item reference
    #[inline]
    #[must_use]
    pub fn strategic(id: impl Into<String>) -> Self {
        Self {
            kind: LinkKind::Strategic,
            id: id.into(),
        }
    }

    /// Requirements item reference
    #[inline]
    #[must_use]
    pub fn requirements(id: impl Into<String>) -> Self {
        Self {
            kind: LinkKind::Requirements,
            id: id.into(),
        }
    }
}

/// Corrective and preventive action plan attached to a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationManifest {
    /// Manifest id
    pub id: String,
    /// CAPA progress
    pub status: CapaStatus,
    /// Verification time
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,
    /// Risk score of the proposed change
    #[serde(default)]
    pub risk_score: Option<i32>,
    /// Strategic items touched by the change
    #[serde(default)]
    pub affected_sd_count: Option<u32>,
    /// Preventive actions
    #[serde(default)]
    pub preventive_actions: Vec<PreventiveAction>,
}

impl RemediationManifest {
    /// Create a manifest
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, status: CapaStatus) -> Self {
        Self {
            id: id.into(),
            status,
            verified_at: None,
            risk_score: None,
            affected_sd_count: None,
            preventive_actions: Vec::new(),
        }
    }
}

/// Single preventive action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreventiveAction {
    /// Action text
    pub action: String,
}

/// Everything the pipeline reads: the report, linked summaries, history
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    /// Report under analysis
    pub report: FailureReport,
    /// Linked strategic item, if any
    pub strategic: Option<LinkedSummary>,
    /// Linked requirements item, if any
    pub requirements: Option<LinkedSummary>,
    /// Historical reports of the same scope, most recent first
    pub history: Vec<FailureReport>,
}

impl AnalysisContext {
    /// Context with no linked items and no history
    #[inline]
    #[must_use]
    pub fn new(report: FailureReport) -> Self {
        Self {
            report,
            strategic: None,
            requirements: None,
            history: Vec::new(),
        }
    }

    /// With strategic summary
    #[inline]
    #[must_use]
    pub fn with_strategic(mut self, summary: LinkedSummary) -> Self {
        self.strategic = Some(summary);
        self
    }

    /// With requirements summary
    #[inline]
    #[must_use]
    pub fn with_requirements(mut self, summary: LinkedSummary) -> Self {
        self.requirements = Some(summary);
        self
    }

    /// With historical candidates
    #[inline]
    #[must_use]
    pub fn with_history(mut self, history: Vec<FailureReport>) -> Self {
        self.history = history;
        self
    }
}
