//! Store boundary
//!
//! The engine reads context through `ReportSource` and hands findings to
//! `FindingsSink`. These calls are the only suspension points of an
//! analysis. `MemoryStore` implements all three traits in process and can be
//! round-tripped through a JSON bundle.

use crate::chain::CausalStep;
use crate::error::StoreError;
use crate::factors::ContributingFactor;
use crate::learning::LearningRecord;
use crate::report::{FailureReport, LinkKind, LinkRef, LinkedSummary};
use crate::types::{ReportId, ReportStatus, RootCauseCategory, ScopeType};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Historical candidate query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Only reports of this scope
    pub scope_type: ScopeType,
    /// Report under analysis, never returned
    pub exclude_id: ReportId,
    /// Max reports returned
    pub limit: usize,
}

/// Output fields written back after an analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportUpdate {
    /// Narrative root cause
    pub root_cause: String,
    /// Category
    pub root_cause_category: RootCauseCategory,
    /// 5-Whys chain
    pub causal_chain: Vec<CausalStep>,
    /// Weighted factors
    pub contributing_factors: Vec<ContributingFactor>,
    /// 0..100
    pub confidence: u8,
    /// Best pattern id
    pub pattern_id: Option<String>,
    /// Similar reports, bounded
    pub related_rcr_ids: Vec<ReportId>,
    /// Status to persist
    pub status: ReportStatus,
    /// Previous attempts + 1
    pub analysis_attempts: u32,
    /// Write time
    pub updated_at: DateTime<Utc>,
}

impl ReportUpdate {
    /// Apply onto a stored report
    pub fn apply_to(&self, report: &mut FailureReport) {
        report.root_cause = Some(self.root_cause.clone());
        report.root_cause_category = Some(self.root_cause_category.clone());
        report.causal_chain.clone_from(&self.causal_chain);
        report.contributing_factors.clone_from(&self.contributing_factors);
        report.confidence = Some(self.confidence);
        report.pattern_id.clone_from(&self.pattern_id);
        report.related_rcr_ids.clone_from(&self.related_rcr_ids);
        report.status = self.status;
        report.analysis_attempts = self.analysis_attempts;
        report.updated_at = Some(self.updated_at);
    }
}

/// Read side of the store
#[async_trait::async_trait]
pub trait ReportSource: Send + Sync {
    /// Fetch a report; `NotFound` when absent
    async fn get_failure_report(&self, id: &ReportId) -> Result<FailureReport, StoreError>;

    /// Fetch a linked summary; `Ok(None)` when absent
    async fn get_linked_summary(&self, link: &LinkRef) -> Result<Option<LinkedSummary>, StoreError>;

    /// Reports of the same scope, most recent first
    async fn get_historical_reports(&self, query: &HistoryQuery) -> Result<Vec<FailureReport>, StoreError>;
}

/// Write side of the store
#[async_trait::async_trait]
pub trait FindingsSink: Send + Sync {
    /// Persist analysis output fields
    async fn update_failure_report(&self, id: &ReportId, update: &ReportUpdate) -> Result<(), StoreError>;

    /// Persist a learning record
    async fn emit_learning_record(&self, record: &LearningRecord) -> Result<(), StoreError>;
}

/// Reports considered by the handoff gate
#[async_trait::async_trait]
pub trait GateSource: Send + Sync {
    /// Non-dismissed reports linked to a strategic item that carry a severity
    async fn get_gate_reports(&self, sd_id: &str) -> Result<Vec<FailureReport>, StoreError>;
}

/// Serialized form of a `MemoryStore`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreBundle {
    /// Failure reports
    pub reports: Vec<FailureReport>,
    /// Strategic item summaries
    pub strategic: Vec<LinkedSummary>,
    /// Requirements item summaries
    pub requirements: Vec<LinkedSummary>,
    /// Emitted learning records
    pub learning_records: Vec<LearningRecord>,
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    reports: DashMap<ReportId, FailureReport>,
    links: DashMap<LinkRef, LinkedSummary>,
    learning: RwLock<Vec<LearningRecord>>,
}

impl MemoryStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a bundle
    #[must_use]
    pub fn from_bundle(bundle: StoreBundle) -> Self {
        let store = Self::new();
        for report in bundle.reports {
            store.insert_report(report);
        }
        for summary in bundle.strategic {
            store.insert_link(LinkKind::Strategic, summary);
        }
        for summary in bundle.requirements {
            store.insert_link(LinkKind::Requirements, summary);
        }
        *store.learning.write() = bundle.learning_records;
        store
    }

    /// Snapshot into a bundle; reports ordered by id
    #[must_use]
    pub fn to_bundle(&self) -> StoreBundle {
        let mut reports: Vec<_> = self.reports.iter().map(|e| e.value().clone()).collect();
        reports.sort_by(|a, b| a.id.cmp(&b.id));

        let mut strategic = Vec::new();
        let mut requirements = Vec::new();
        for entry in &self.links {
            match entry.key().kind {
                LinkKind::Strategic => strategic.push(entry.value().clone()),
                LinkKind::Requirements => requirements.push(entry.value().clone()),
            }
        }
        strategic.sort_by(|a, b| a.id.cmp(&b.id));
        requirements.sort_by(|a, b| a.id.cmp(&b.id));

        StoreBundle {
            reports,
            strategic,
            requirements,
            learning_records: self.learning.read().clone(),
        }
    }

    /// Load a JSON bundle file
    pub fn load_bundle(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Unavailable(format!("{}: {e}", path.display())))?;
        let bundle: StoreBundle = serde_json::from_str(&text)?;
        Ok(Self::from_bundle(bundle))
    }

    /// Write a JSON bundle file
    pub fn save_bundle(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(&self.to_bundle())?;
        std::fs::write(path, text)
            .map_err(|e| StoreError::Rejected(format!("{}: {e}", path.display())))
    }

    /// Insert or replace a report
    pub fn insert_report(&self, report: FailureReport) {
        self.reports.insert(report.id.clone(), report);
    }

    /// Insert or replace a linked summary
    pub fn insert_link(&self, kind: LinkKind, summary: LinkedSummary) {
        let key = LinkRef {
            kind,
            id: summary.id.clone(),
        };
        self.links.insert(key, summary);
    }

    /// Snapshot of a stored report
    #[must_use]
    pub fn report(&self, id: &ReportId) -> Option<FailureReport> {
        self.reports.get(id).map(|r| r.value().clone())
    }

    /// Snapshot of emitted learning records
    #[must_use]
    pub fn learning_records(&self) -> Vec<LearningRecord> {
        self.learning.read().clone()
    }

    /// Number of stored reports
    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    /// True when no reports are stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

fn recency(report: &FailureReport) -> Option<DateTime<Utc>> {
    report.created_at.or(report.detected_at)
}

#[async_trait::async_trait]
impl ReportSource for MemoryStore {
    async fn get_failure_report(&self, id: &ReportId) -> Result<FailureReport, StoreError> {
        self.report(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn get_linked_summary(&self, link: &LinkRef) -> Result<Option<LinkedSummary>, StoreError> {
        Ok(self.links.get(link).map(|s| s.value().clone()))
    }

    async fn get_historical_reports(&self, query: &HistoryQuery) -> Result<Vec<FailureReport>, StoreError> {
        let mut history: Vec<FailureReport> = self
            .reports
            .iter()
            .filter(|e| e.key() != &query.exclude_id && e.value().scope_type == query.scope_type)
            .map(|e| e.value().clone())
            .collect();
        // newest first, undated last, id breaks ties
        history.sort_by(|a, b| recency(b).cmp(&recency(a)).then_with(|| a.id.cmp(&b.id)));
        history.truncate(query.limit);
        Ok(history)
    }
}

#[async_trait::async_trait]
impl FindingsSink for MemoryStore {
    async fn update_failure_report(&self, id: &ReportId, update: &ReportUpdate) -> Result<(), StoreError> {
        let mut entry = self
            .reports
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        update.apply_to(entry.value_mut());
        Ok(())
    }

    async fn emit_learning_record(&self, record: &LearningRecord) -> Result<(), StoreError> {
        let key = record.dedup_key();
        let mut learning = self.learning.write();
        match learning.iter_mut().find(|r| r.dedup_key() == key) {
            Some(existing) => *existing = record.clone(),
            None => learning.push(record.clone()),
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl GateSource for MemoryStore {
    async fn get_gate_reports(&self, sd_id: &str) -> Result<Vec<FailureReport>, StoreError> {
        let mut reports: Vec<FailureReport> = self
            .reports
            .iter()
            .filter(|e| {
                let r = e.value();
                r.sd_id.as_deref() == Some(sd_id)
                    && r.status != ReportStatus::WontFix
                    && r.severity_priority.is_some()
            })
            .map(|e| e.value().clone())
            .collect();
        reports.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SeverityPriority, TriggerSource};
    use chrono::TimeZone;

    fn dated(id: &str, scope: ScopeType, hour: u32) -> FailureReport {
        let mut report = FailureReport::new(id, "p", TriggerSource::Runtime, scope, 2);
        report.created_at = Utc.with_ymd_and_hms(2025, 10, 28, hour, 0, 0).single();
        report
    }

    #[tokio::test]
    async fn missing_report_is_not_found() {
        let store = MemoryStore::new();
        let err = store.get_failure_report(&ReportId::new("nope")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn history_filters_scope_excludes_self_and_orders_by_recency() {
        let store = MemoryStore::new();
        store.insert_report(dated("cur", ScopeType::Runtime, 12));
        store.insert_report(dated("old", ScopeType::Runtime, 1));
        store.insert_report(dated("new", ScopeType::Runtime, 10));
        store.insert_report(dated("other", ScopeType::Prd, 11));
        store.insert_report(FailureReport::new("undated", "p", TriggerSource::Runtime, ScopeType::Runtime, 2));

        let query = HistoryQuery {
            scope_type: ScopeType::Runtime,
            exclude_id: ReportId::new("cur"),
            limit: 10,
        };
        let history = store.get_historical_reports(&query).await.unwrap();
        let ids: Vec<_> = history.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old", "undated"]);

        let limited = store
            .get_historical_reports(&HistoryQuery { limit: 1, ..query })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn linked_summary_lookup_by_kind() {
        let store = MemoryStore::new();
        store.insert_link(LinkKind::Requirements, LinkedSummary::new("x").with_phase("draft"));

        assert!(store.get_linked_summary(&LinkRef::requirements("x")).await.unwrap().is_some());
        assert!(store.get_linked_summary(&LinkRef::strategic("x")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn gate_reports_skip_dismissed_and_unrated() {
        let store = MemoryStore::new();
        store.insert_report(
            FailureReport::new("a", "p", TriggerSource::Runtime, ScopeType::Sd, 1)
                .with_sd("SD-1")
                .with_severity(SeverityPriority::P0),
        );
        store.insert_report(
            FailureReport::new("b", "p", TriggerSource::Runtime, ScopeType::Sd, 1)
                .with_sd("SD-1")
                .with_severity(SeverityPriority::P1)
                .with_status(ReportStatus::WontFix),
        );
        store.insert_report(FailureReport::new("c", "p", TriggerSource::Runtime, ScopeType::Sd, 1).with_sd("SD-1"));
        store.insert_report(
            FailureReport::new("d", "p", TriggerSource::Runtime, ScopeType::Sd, 1)
                .with_sd("SD-2")
                .with_severity(SeverityPriority::P0),
        );

        let reports = store.get_gate_reports("SD-1").await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].id.as_str(), "a");
    }

    #[test]
    fn bundle_round_trip_through_file() {
        let store = MemoryStore::new();
        store.insert_report(dated("r1", ScopeType::Sd, 3).with_sd("SD-1"));
        store.insert_link(LinkKind::Strategic, LinkedSummary::new("SD-1").with_status("active"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        store.save_bundle(&path).unwrap();

        let loaded = MemoryStore::load_bundle(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.to_bundle().strategic.len(), 1);
        assert_eq!(loaded.report(&ReportId::new("r1")), store.report(&ReportId::new("r1")));
    }

    #[test]
    fn malformed_bundle_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            MemoryStore::load_bundle(&path),
            Err(StoreError::Serialization(_))
        ));
    }
}
