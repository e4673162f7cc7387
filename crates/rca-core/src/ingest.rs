//! Training-record ingestion for resolved reports
//!
//! Turns a resolved report into a flat feature/label record for offline
//! defect prediction. Absent numeric fields fall back to fixed defaults so
//! every record has the same shape.

use crate::report::FailureReport;
use crate::types::{ReportId, RootCauseCategory, ScopeType, SeverityPriority, TriggerSource};
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Feature vector extracted from one report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Features {
    /// Scope
    pub scope_type: ScopeType,
    /// Trigger source
    pub trigger_source: TriggerSource,
    /// Category
    pub root_cause_category: Option<RootCauseCategory>,
    /// Impact level
    pub impact_level: Option<String>,
    /// Likelihood level
    pub likelihood_level: Option<String>,
    /// Severity priority
    pub severity_priority: Option<SeverityPriority>,

    /// Stored confidence
    pub confidence: Option<u8>,
    /// Log quality, 0 when absent
    pub log_quality: i32,
    /// Evidence strength, 0 when absent
    pub evidence_strength: i32,
    /// Pattern match score, 0 when absent
    pub pattern_match_score: i32,
    /// Recurrence count, at least 1
    pub recurrence_count: u32,
    /// Analysis attempts, at least 1
    pub analysis_attempts: u32,

    /// UTC hour of detection
    pub hour_of_day: Option<u32>,
    /// UTC weekday of detection, Sunday = 0
    pub day_of_week: Option<u32>,

    /// Reproduction steps recorded
    pub has_repro_steps: bool,
    /// Reproduction success rate, 0 when absent
    pub repro_success_rate: f64,
    /// Stack trace attached
    pub has_stack_trace: bool,
    /// Logs attached
    pub has_logs: bool,
    /// Screenshots attached
    pub has_screenshots: bool,

    /// First manifest risk score, 0 when absent
    pub capa_risk_score: i32,
    /// First manifest affected item count, at least 1
    pub affected_sd_count: u32,
    /// First manifest preventive action count
    pub preventive_action_count: usize,
}

/// Lifecycle stage at which a defect could have been prevented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PreventionStage {
    /// Before the strategic item was approved
    LeadPreApproval,
    /// While writing the requirements
    PlanPrd,
    /// During implementation
    ExecImpl,
    /// During plan verification
    PlanVerify,
    /// Not preventable
    Never,
}

/// Preventability assessment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preventability {
    /// Could have been prevented
    pub preventable: bool,
    /// Where
    pub stage: PreventionStage,
    /// Why
    pub reason: String,
}

impl Preventability {
    fn new(stage: PreventionStage, reason: &str) -> Self {
        Self {
            preventable: stage != PreventionStage::Never,
            stage,
            reason: reason.to_string(),
        }
    }
}

/// Detection and resolution latency in hours
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingMetrics {
    /// First occurrence to detection
    pub detect_hours: f64,
    /// Detection to resolution (or now)
    pub resolve_hours: f64,
}

/// Metadata carried next to the label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingMetadata {
    /// Severity
    pub severity: Option<SeverityPriority>,
    /// Trigger source
    pub trigger_source: TriggerSource,
    /// Confidence
    pub confidence: Option<u8>,
    /// Impact level
    pub impact_level: Option<String>,
}

/// One labelled training example
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    /// Source report
    pub rcr_id: ReportId,
    /// Features
    pub features: Features,
    /// `<CATEGORY> - <defect_class>`
    pub label: String,
    /// Taxonomy label
    pub defect_class: String,
    /// Could have been prevented
    pub preventable: bool,
    /// Prevention stage
    pub prevention_stage: PreventionStage,
    /// Detection latency
    pub time_to_detect_hours: f64,
    /// Resolution latency
    pub time_to_resolve_hours: f64,
    /// Metadata
    pub metadata: TrainingMetadata,
}

// null, false, 0 and "" count as absent
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

fn evidence(report: &FailureReport, key: &str) -> bool {
    truthy(report.evidence_refs.get(key))
}

/// Extract the feature vector
#[must_use]
pub fn extract_features(report: &FailureReport) -> Features {
    let manifest = report.primary_manifest();

    Features {
        scope_type: report.scope_type.clone(),
        trigger_source: report.trigger_source.clone(),
        root_cause_category: report.root_cause_category.clone(),
        impact_level: report.impact_level.clone(),
        likelihood_level: report.likelihood_level.clone(),
        severity_priority: report.severity_priority,

        confidence: report.confidence,
        log_quality: report.log_quality.unwrap_or(0),
        evidence_strength: report.evidence_strength.unwrap_or(0),
        pattern_match_score: report.pattern_match_score.unwrap_or(0),
        recurrence_count: report.recurrence_count.max(1),
        analysis_attempts: report.analysis_attempts.max(1),

        hour_of_day: report.detected_at.map(|t| t.hour()),
        day_of_week: report.detected_at.map(|t| t.weekday().num_days_from_sunday()),

        has_repro_steps: report.repro_steps.as_deref().is_some_and(|s| !s.is_empty()),
        repro_success_rate: report.repro_success_rate.unwrap_or(0.0),
        has_stack_trace: evidence(report, "stack_traces") || evidence(report, "stack_trace"),
        has_logs: evidence(report, "logs"),
        has_screenshots: evidence(report, "screenshots") || evidence(report, "screenshot_url"),

        capa_risk_score: manifest.and_then(|m| m.risk_score).unwrap_or(0),
        affected_sd_count: manifest
            .and_then(|m| m.affected_sd_count)
            .filter(|&n| n > 0)
            .unwrap_or(1),
        preventive_action_count: manifest.map_or(0, |m| m.preventive_actions.len()),
    }
}

/// Defect taxonomy label
#[must_use]
pub fn classify_defect(report: &FailureReport) -> &'static str {
    let Some(category) = report.root_cause_category.as_ref() else {
        return "uncategorized";
    };
    match category {
        RootCauseCategory::TestCoverageGap => {
            if report.trigger_source == TriggerSource::TestFailure {
                "test_coverage_gap_regression"
            } else {
                "test_coverage_gap_initial"
            }
        }
        RootCauseCategory::CodeDefect => {
            if evidence(report, "stack_trace") {
                "code_defect_runtime"
            } else {
                "code_defect_logic"
            }
        }
        RootCauseCategory::ConfigError => match report.trigger_source {
            TriggerSource::CiPipeline => "config_error_ci",
            TriggerSource::Runtime => "config_error_env",
            _ => "config_error_application",
        },
        RootCauseCategory::RequirementsAmbiguity => "requirements_ambiguity",
        RootCauseCategory::ProcessGap => "process_gap",
        _ => "uncategorized",
    }
}

/// Where the defect could have been caught
#[must_use]
pub fn analyze_preventability(report: &FailureReport) -> Preventability {
    match (&report.root_cause_category, &report.trigger_source) {
        (Some(RootCauseCategory::RequirementsAmbiguity), _) => Preventability::new(
            PreventionStage::LeadPreApproval,
            "Clearer requirements would have prevented ambiguity",
        ),
        (Some(RootCauseCategory::TestCoverageGap), _) => Preventability::new(
            PreventionStage::PlanPrd,
            "Comprehensive test plan would have caught gap",
        ),
        (Some(RootCauseCategory::CodeDefect), TriggerSource::TestFailure) => Preventability::new(
            PreventionStage::ExecImpl,
            "Better unit testing during implementation",
        ),
        (Some(RootCauseCategory::ProcessGap), _) => Preventability::new(
            PreventionStage::PlanPrd,
            "Process improvement needed in workflow",
        ),
        (Some(RootCauseCategory::ConfigError), _) => Preventability::new(
            PreventionStage::PlanVerify,
            "Configuration validation during verification",
        ),
        _ => Preventability::new(
            PreventionStage::Never,
            "Inherent complexity or external factor",
        ),
    }
}

#[allow(clippy::cast_precision_loss)]
fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    ((to - from).num_milliseconds() as f64 / MS_PER_HOUR).max(0.0)
}

/// Detection and resolution latency; unresolved reports measure up to `now`
#[must_use]
pub fn timing_metrics(report: &FailureReport, now: DateTime<Utc>) -> TimingMetrics {
    let Some(detected) = report.detected_at else {
        return TimingMetrics {
            detect_hours: 0.0,
            resolve_hours: 0.0,
        };
    };
    TimingMetrics {
        detect_hours: report
            .first_occurrence_at
            .map_or(0.0, |first| hours_between(first, detected)),
        resolve_hours: hours_between(detected, report.resolved_at.unwrap_or(now)),
    }
}

/// Build the training record for a report
#[must_use]
pub fn build_training_record(report: &FailureReport, now: DateTime<Utc>) -> TrainingRecord {
    let defect_class = classify_defect(report);
    let prevention = analyze_preventability(report);
    let timing = timing_metrics(report, now);
    let category = report
        .root_cause_category
        .as_ref()
        .map_or("UNKNOWN", RootCauseCategory::as_str);

    TrainingRecord {
        rcr_id: report.id.clone(),
        features: extract_features(report),
        label: format!("{category} - {defect_class}"),
        defect_class: defect_class.to_string(),
        preventable: prevention.preventable,
        prevention_stage: prevention.stage,
        time_to_detect_hours: timing.detect_hours,
        time_to_resolve_hours: timing.resolve_hours,
        metadata: TrainingMetadata {
            severity: report.severity_priority,
            trigger_source: report.trigger_source.clone(),
            confidence: report.confidence,
            impact_level: report.impact_level.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::CapaStatus;
    use crate::report::{PreventiveAction, RemediationManifest};
    use serde_json::json;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn report(category: &str, source: TriggerSource) -> FailureReport {
        FailureReport::new("rcr-123", "p", source, ScopeType::Pipeline, 2)
            .with_category(RootCauseCategory::from(category))
    }

    #[test]
    fn features_from_full_report() {
        let mut r = report("TEST_COVERAGE_GAP", TriggerSource::TestFailure)
            .with_severity(SeverityPriority::P1)
            .with_counters(2, 3);
        r.log_quality = Some(15);
        r.confidence = Some(85);
        r.detected_at = Some(at("2025-10-28T15:30:00Z"));
        r.evidence_refs = json!({"stack_trace": "Error at line 42", "logs": ["l1"], "screenshot_url": "u"});
        r.repro_steps = Some("steps".into());
        r.repro_success_rate = Some(0.85);
        let mut manifest = RemediationManifest::new("m", CapaStatus::Verified);
        manifest.risk_score = Some(40);
        manifest.affected_sd_count = Some(2);
        manifest.preventive_actions = vec![
            PreventiveAction { action: "a".into() },
            PreventiveAction { action: "b".into() },
        ];
        let r = r.with_manifest(manifest);

        let f = extract_features(&r);
        assert_eq!(f.log_quality, 15);
        assert_eq!(f.evidence_strength, 0);
        assert_eq!(f.recurrence_count, 3);
        assert_eq!(f.analysis_attempts, 2);
        assert_eq!(f.hour_of_day, Some(15));
        assert_eq!(f.day_of_week, Some(2));
        assert!(f.has_repro_steps && f.has_stack_trace && f.has_logs && f.has_screenshots);
        assert_eq!(f.capa_risk_score, 40);
        assert_eq!(f.affected_sd_count, 2);
        assert_eq!(f.preventive_action_count, 2);
    }

    #[test]
    fn features_default_when_missing() {
        let f = extract_features(&report("CODE_DEFECT", TriggerSource::Manual));
        assert_eq!(f.recurrence_count, 1);
        assert_eq!(f.analysis_attempts, 1);
        assert_eq!(f.affected_sd_count, 1);
        assert_eq!(f.capa_risk_score, 0);
        assert_eq!(f.preventive_action_count, 0);
        assert!(!f.has_stack_trace && !f.has_logs && !f.has_screenshots && !f.has_repro_steps);
        assert!(f.hour_of_day.is_none());
    }

    #[test]
    fn defect_taxonomy() {
        assert_eq!(classify_defect(&report("TEST_COVERAGE_GAP", TriggerSource::TestFailure)), "test_coverage_gap_regression");
        assert_eq!(classify_defect(&report("TEST_COVERAGE_GAP", TriggerSource::QualityGate)), "test_coverage_gap_initial");
        assert_eq!(classify_defect(&report("CODE_DEFECT", TriggerSource::Manual)), "code_defect_logic");
        assert_eq!(classify_defect(&report("CONFIG_ERROR", TriggerSource::CiPipeline)), "config_error_ci");
        assert_eq!(classify_defect(&report("CONFIG_ERROR", TriggerSource::Runtime)), "config_error_env");
        assert_eq!(classify_defect(&report("CONFIG_ERROR", TriggerSource::Manual)), "config_error_application");
        assert_eq!(classify_defect(&report("PROCESS_GAP", TriggerSource::Manual)), "process_gap");
        assert_eq!(classify_defect(&report("UNKNOWN_CATEGORY", TriggerSource::Manual)), "uncategorized");

        let mut runtime = report("CODE_DEFECT", TriggerSource::Runtime);
        runtime.evidence_refs = json!({"stack_trace": "Error stack"});
        assert_eq!(classify_defect(&runtime), "code_defect_runtime");
    }

    #[test]
    fn preventability_stages() {
        let p = analyze_preventability(&report("REQUIREMENTS_AMBIGUITY", TriggerSource::QualityGate));
        assert_eq!(p.stage, PreventionStage::LeadPreApproval);
        assert!(p.preventable);

        let p = analyze_preventability(&report("CODE_DEFECT", TriggerSource::TestFailure));
        assert_eq!(p.stage, PreventionStage::ExecImpl);

        let p = analyze_preventability(&report("CONFIG_ERROR", TriggerSource::CiPipeline));
        assert_eq!(p.stage, PreventionStage::PlanVerify);

        let p = analyze_preventability(&report("CODE_DEFECT", TriggerSource::Runtime));
        assert_eq!(p.stage, PreventionStage::Never);
        assert!(!p.preventable);
        assert!(p.reason.contains("Inherent complexity"));
    }

    #[test]
    fn timing_is_clamped_and_precise() {
        let mut r = report("CODE_DEFECT", TriggerSource::Runtime);
        r.first_occurrence_at = Some(at("2025-10-28T08:00:00Z"));
        r.detected_at = Some(at("2025-10-28T12:00:00Z"));
        r.resolved_at = Some(at("2025-10-28T18:00:00Z"));
        let t = timing_metrics(&r, Utc::now());
        assert!((t.detect_hours - 4.0).abs() < 1e-9);
        assert!((t.resolve_hours - 6.0).abs() < 1e-9);

        r.resolved_at = Some(at("2025-10-28T10:00:00Z"));
        assert!(timing_metrics(&r, Utc::now()).resolve_hours.abs() < 1e-9);

        r.first_occurrence_at = None;
        r.detected_at = Some(at("2025-10-28T10:00:00.000Z"));
        r.resolved_at = Some(at("2025-10-28T10:30:00.500Z"));
        let t = timing_metrics(&r, Utc::now());
        assert!(t.detect_hours.abs() < 1e-9);
        assert!((t.resolve_hours - 0.508_472).abs() < 1e-3);
    }

    #[test]
    fn unresolved_measures_to_now() {
        let mut r = report("CODE_DEFECT", TriggerSource::Runtime);
        r.detected_at = Some(at("2025-10-28T10:00:00Z"));
        let t = timing_metrics(&r, at("2025-10-28T12:00:00Z"));
        assert!((t.resolve_hours - 2.0).abs() < 1e-9);
    }

    #[test]
    fn record_label_and_metadata() {
        let mut r = report("CODE_DEFECT", TriggerSource::Runtime).with_severity(SeverityPriority::P1);
        r.evidence_refs = json!({"stack_trace": "Error"});
        r.confidence = Some(85);
        r.impact_level = Some("HIGH".into());
        let record = build_training_record(&r, Utc::now());
        assert_eq!(record.label, "CODE_DEFECT - code_defect_runtime");
        assert_eq!(record.rcr_id.as_str(), "rcr-123");
        assert_eq!(record.metadata.severity, Some(SeverityPriority::P1));
        assert_eq!(record.metadata.confidence, Some(85));
        assert!(!record.preventable);
    }
}
