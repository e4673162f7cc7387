//! Testing utilities for the RCA workspace
//!
//! Shared report fixtures and a recording sink with injectable failures.

#![allow(missing_docs)]

use parking_lot::Mutex;
use rca_core::{
    FailureReport, FindingsSink, LearningRecord, LinkKind, LinkedSummary, MemoryStore, ReportId,
    ReportUpdate, RootCauseCategory, ScopeType, StoreError, TriggerSource,
};
use serde_json::json;

/// Report with the given trigger metadata and an id derived from them
pub fn report(source: TriggerSource, scope: ScopeType, tier: u8) -> FailureReport {
    let id = format!("rcr-{}-{}", source.as_str().to_lowercase(), scope.as_str().to_lowercase());
    FailureReport::new(id, "Checkout flow returned HTTP 500", source, scope, tier).with_snapshots(
        json!({"status": 500, "body": "internal error"}),
        json!({"status": 200}),
    )
}

/// Test-failure report on a requirements item, all signals absent
pub fn test_failure_report() -> FailureReport {
    report(TriggerSource::TestFailure, ScopeType::Prd, 2)
}

/// Same as `test_failure_report` with every signal at its maximum
pub fn high_signal_report() -> FailureReport {
    test_failure_report().with_signals(20, 20, 15, 5)
}

/// Historical report with a stored category and signature
pub fn historical(id: &str, category: RootCauseCategory, scope: ScopeType, signature: &str) -> FailureReport {
    FailureReport::new(id, "earlier failure", TriggerSource::Runtime, scope, 2)
        .with_signature(signature)
        .with_category(category)
}

pub fn approved_prd(id: &str) -> LinkedSummary {
    LinkedSummary::new(id).with_status("approved").with_phase("exec")
}

pub fn draft_prd(id: &str) -> LinkedSummary {
    LinkedSummary::new(id).with_status("in_progress").with_phase("draft")
}

pub fn active_sd(id: &str) -> LinkedSummary {
    LinkedSummary::new(id).with_status("active").with_title("Strategic item")
}

/// Memory store seeded with reports and linked summaries
pub fn seeded_store(
    reports: impl IntoIterator<Item = FailureReport>,
    strategic: impl IntoIterator<Item = LinkedSummary>,
    requirements: impl IntoIterator<Item = LinkedSummary>,
) -> MemoryStore {
    let store = MemoryStore::new();
    for r in reports {
        store.insert_report(r);
    }
    for s in strategic {
        store.insert_link(LinkKind::Strategic, s);
    }
    for s in requirements {
        store.insert_link(LinkKind::Requirements, s);
    }
    store
}

/// Sink that records every write and can be told to fail
#[derive(Debug, Default)]
pub struct RecordingSink {
    updates: Mutex<Vec<(ReportId, ReportUpdate)>>,
    learning: Mutex<Vec<LearningRecord>>,
    update_failure: Mutex<Option<StoreError>>,
    learning_failure: Mutex<Option<StoreError>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every report update with `err`
    pub fn fail_updates(self, err: StoreError) -> Self {
        *self.update_failure.lock() = Some(err);
        self
    }

    /// Fail every learning record write with `err`
    pub fn fail_learning(self, err: StoreError) -> Self {
        *self.learning_failure.lock() = Some(err);
        self
    }

    pub fn updates(&self) -> Vec<(ReportId, ReportUpdate)> {
        self.updates.lock().clone()
    }

    pub fn learning_records(&self) -> Vec<LearningRecord> {
        self.learning.lock().clone()
    }

    pub fn last_update(&self) -> Option<ReportUpdate> {
        self.updates.lock().last().map(|(_, u)| u.clone())
    }
}

#[async_trait::async_trait]
impl FindingsSink for RecordingSink {
    async fn update_failure_report(&self, id: &ReportId, update: &ReportUpdate) -> Result<(), StoreError> {
        if let Some(err) = self.update_failure.lock().clone() {
            return Err(err);
        }
        self.updates.lock().push((id.clone(), update.clone()));
        Ok(())
    }

    async fn emit_learning_record(&self, record: &LearningRecord) -> Result<(), StoreError> {
        if let Some(err) = self.learning_failure.lock().clone() {
            return Err(err);
        }
        self.learning.lock().push(record.clone());
        Ok(())
    }
}
