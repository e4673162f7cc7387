use mockall::mock;
use pretty_assertions::assert_eq;
use rca_core::prelude::*;
use rca_core::{
    FactorKind, HistoryQuery, LearningRecord, LinkRef, LinkedSummary, RecommendationType,
    ReportUpdate, StoreError,
};
use rca_test_utils::{
    active_sd, approved_prd, draft_prd, high_signal_report, historical, report, seeded_store,
    test_failure_report, RecordingSink,
};
use std::sync::Arc;

mock! {
    pub Source {}

    #[async_trait::async_trait]
    impl ReportSource for Source {
        async fn get_failure_report(&self, id: &ReportId) -> Result<FailureReport, StoreError>;
        async fn get_linked_summary(&self, link: &LinkRef) -> Result<Option<LinkedSummary>, StoreError>;
        async fn get_historical_reports(&self, query: &HistoryQuery) -> Result<Vec<FailureReport>, StoreError>;
    }
}

mock! {
    pub Sink {}

    #[async_trait::async_trait]
    impl FindingsSink for Sink {
        async fn update_failure_report(&self, id: &ReportId, update: &ReportUpdate) -> Result<(), StoreError>;
        async fn emit_learning_record(&self, record: &LearningRecord) -> Result<(), StoreError>;
    }
}

async fn analyze_in_memory(report: FailureReport) -> (AnalysisResult, Arc<MemoryStore>) {
    let id = report.id.clone();
    let store = Arc::new(seeded_store([report], [], []));
    let engine = RcaEngine::new(store.clone(), store.clone());
    (engine.analyze(&id, AnalyzeOptions::default()).await, store)
}

#[tokio::test]
async fn test_failure_with_default_signals_passes_with_warning() {
    let report = test_failure_report();
    let id = report.id.clone();
    let (result, store) = analyze_in_memory(report).await;

    assert_eq!(result.verdict, Verdict::Pass);
    assert_eq!(result.confidence, 65);
    assert_eq!(result.warnings, vec!["Moderate confidence — consider additional evidence".to_string()]);

    let analysis = result.analysis.unwrap();
    assert_eq!(analysis.root_cause_category, RootCauseCategory::TestCoverageGap);
    assert_eq!(analysis.causal_chain.len(), 5);
    assert_eq!(store.report(&id).unwrap().status, ReportStatus::InReview);
}

#[tokio::test]
async fn full_signals_clamp_and_start_capa() {
    let report = high_signal_report();
    let id = report.id.clone();
    let (result, store) = analyze_in_memory(report).await;

    assert_eq!(result.verdict, Verdict::Pass);
    assert_eq!(result.confidence, 100);
    assert!(result.warnings.is_empty());

    let stored = store.report(&id).unwrap();
    assert_eq!(stored.status, ReportStatus::CapaPending);
    assert_eq!(stored.confidence, Some(100));
    assert_eq!(stored.analysis_attempts, 1);

    let records = store.learning_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].confidence_level, rca_core::ConfidenceLevel::High);
    assert!(records[0].lesson_summary.starts_with("Root cause: "));
}

#[tokio::test]
async fn quality_gate_on_prd_is_requirements_ambiguity() {
    let (result, _) = analyze_in_memory(report(TriggerSource::QualityGate, ScopeType::Prd, 2)).await;
    assert_eq!(
        result.analysis.unwrap().root_cause_category,
        RootCauseCategory::RequirementsAmbiguity
    );
}

#[tokio::test]
async fn similar_historical_failure_ranks_first() {
    let current = report(TriggerSource::Runtime, ScopeType::Runtime, 2)
        .with_signature("timeout connecting to database pool");
    let id = current.id.clone();
    let store = Arc::new(seeded_store(
        [
            current,
            historical("hist-weak", RootCauseCategory::CodeDefect, ScopeType::Runtime, "null pointer"),
            historical(
                "hist-db-0001",
                RootCauseCategory::Environmental,
                ScopeType::Runtime,
                "timeout connecting to database",
            ),
        ],
        [],
        [],
    ));
    let engine = RcaEngine::new(store.clone(), store.clone());
    let result = engine.analyze(&id, AnalyzeOptions::default()).await;

    let matches = result.analysis.unwrap().pattern_matches;
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].report_id.as_str(), "hist-db-0001");
    assert_eq!(matches[0].similarity, 92);

    let stored = store.report(&id).unwrap();
    assert_eq!(stored.pattern_id.as_deref(), Some("PAT-ENVIRONMENTAL-hist-db-"));
    assert_eq!(stored.related_rcr_ids, vec![ReportId::new("hist-db-0001")]);
    assert!(result
        .recommendations
        .iter()
        .any(|r| r.kind == RecommendationType::PatternAlert));
}

#[tokio::test]
async fn not_found_is_error_without_writes() {
    let mut source = MockSource::new();
    source
        .expect_get_failure_report()
        .returning(|id| Err(StoreError::NotFound(id.to_string())));
    source.expect_get_linked_summary().times(0);
    source.expect_get_historical_reports().times(0);

    let mut sink = MockSink::new();
    sink.expect_update_failure_report().times(0);
    sink.expect_emit_learning_record().times(0);

    let engine = RcaEngine::new(Arc::new(source), Arc::new(sink));
    let result = engine.analyze(&ReportId::new("rcr-missing"), AnalyzeOptions::default()).await;

    assert_eq!(result.verdict, Verdict::Error);
    assert_eq!(result.confidence, 0);
    assert_eq!(result.critical_issues.len(), 1);
    assert!(result.critical_issues[0].issue.contains("rcr-missing"));
    assert!(result.analysis.is_none());
}

#[tokio::test]
async fn linked_summary_failure_is_fatal() {
    let mut source = MockSource::new();
    source
        .expect_get_failure_report()
        .returning(|_| Ok(test_failure_report().with_prd("PRD-1")));
    source
        .expect_get_linked_summary()
        .returning(|_| Err(StoreError::Unavailable("connection reset".into())));
    source.expect_get_historical_reports().times(0);

    let mut sink = MockSink::new();
    sink.expect_update_failure_report().times(0);
    sink.expect_emit_learning_record().times(0);

    let engine = RcaEngine::new(Arc::new(source), Arc::new(sink));
    let result = engine.analyze(&ReportId::new("x"), AnalyzeOptions::default()).await;
    assert!(result.is_error());
    assert!(result.critical_issues[0].issue.contains("connection reset"));
}

#[tokio::test]
async fn history_load_failure_is_fatal() {
    let mut source = MockSource::new();
    source
        .expect_get_failure_report()
        .returning(|_| Ok(test_failure_report()));
    source
        .expect_get_historical_reports()
        .times(1)
        .returning(|_| Err(StoreError::Unavailable("replica lagging".into())));

    let mut sink = MockSink::new();
    sink.expect_update_failure_report().times(0);
    sink.expect_emit_learning_record().times(0);

    let engine = RcaEngine::new(Arc::new(source), Arc::new(sink));
    let result = engine.analyze(&ReportId::new("rcr-test_failure-prd"), AnalyzeOptions::default()).await;

    assert_eq!(result.verdict, Verdict::Error);
    assert_eq!(result.confidence, 0);
    assert_eq!(result.critical_issues.len(), 1);
    assert!(result.critical_issues[0].issue.contains("replica lagging"));
    assert!(result.analysis.is_none());
}

#[tokio::test]
async fn history_query_uses_scope_exclusion_and_limit() {
    let mut source = MockSource::new();
    source
        .expect_get_failure_report()
        .returning(|_| Ok(test_failure_report()));
    source
        .expect_get_historical_reports()
        .withf(|q: &HistoryQuery| {
            q.scope_type == ScopeType::Prd && q.exclude_id.as_str() == "rcr-test_failure-prd" && q.limit == 4
        })
        .times(1)
        .returning(|_| Ok(Vec::new()));

    let sink = Arc::new(RecordingSink::new());
    let engine = RcaEngine::new(Arc::new(source), sink.clone())
        .with_config(RcaConfig::default().with_history_limit(4));
    let result = engine.analyze(&ReportId::new("rcr-test_failure-prd"), AnalyzeOptions::default()).await;

    assert_eq!(result.verdict, Verdict::Pass);
    assert_eq!(sink.updates().len(), 1);
}

#[tokio::test]
async fn critical_recurring_failure_orders_factors() {
    let report = report(TriggerSource::Runtime, ScopeType::Runtime, 1)
        .with_prd("PRD-1")
        .with_counters(0, 3);
    let id = report.id.clone();
    let store = Arc::new(seeded_store([report], [], [approved_prd("PRD-1")]));
    let engine = RcaEngine::new(store.clone(), store.clone());
    let result = engine.analyze(&id, AnalyzeOptions::default()).await;

    let factors = result.analysis.unwrap().contributing_factors;
    assert_eq!(factors[0].name, "Critical severity classification");
    assert_eq!(factors[0].weight, 25);
    assert_eq!(factors[1].name, "Recurring issue");
    assert_eq!(factors[1].weight, 20);
    assert!(result
        .recommendations
        .iter()
        .any(|r| r.kind == RecommendationType::RegressionPrevention));
}

#[tokio::test]
async fn active_strategic_item_shapes_the_chain() {
    let report = report(TriggerSource::SubAgent, ScopeType::Sd, 1)
        .with_sd("SD-7")
        .with_prd("PRD-7");
    let id = report.id.clone();
    let store = Arc::new(seeded_store([report], [active_sd("SD-7")], [approved_prd("PRD-7")]));
    let engine = RcaEngine::new(store.clone(), store.clone());
    let result = engine.analyze(&id, AnalyzeOptions::default()).await;

    let chain = result.analysis.unwrap().causal_chain;
    assert!(chain[2].answer.starts_with("Critical issue in active SD"));
}

#[tokio::test]
async fn draft_prd_is_loaded_and_weighed() {
    let report = test_failure_report().with_prd("PRD-9");
    let id = report.id.clone();
    let store = Arc::new(seeded_store([report], [], [draft_prd("PRD-9")]));
    let engine = RcaEngine::new(store.clone(), store.clone());
    let result = engine.analyze(&id, AnalyzeOptions::default()).await;

    let kinds: Vec<_> = result
        .analysis
        .unwrap()
        .contributing_factors
        .iter()
        .map(|f| f.kind)
        .collect();
    assert!(kinds.contains(&FactorKind::IncompleteRequirements));
    assert!(!kinds.contains(&FactorKind::MissingRequirements));
}

#[tokio::test]
async fn persistence_failures_become_warnings() {
    let report = high_signal_report();
    let id = report.id.clone();
    let source = Arc::new(seeded_store([report], [], []));
    let sink = Arc::new(
        RecordingSink::new()
            .fail_updates(StoreError::Rejected("row locked".into()))
            .fail_learning(StoreError::Unavailable("queue down".into())),
    );
    let engine = RcaEngine::new(source, sink.clone());
    let result = engine.analyze(&id, AnalyzeOptions::default()).await;

    assert_eq!(result.verdict, Verdict::Pass);
    assert_eq!(result.confidence, 100);
    assert!(result.analysis.is_some());
    assert_eq!(
        result.warnings,
        vec![
            "Failed to update RCR: write rejected: row locked".to_string(),
            "Failed to create learning record: store unavailable: queue down".to_string(),
        ]
    );
    assert!(!result.metadata.learning_record_emitted);
    assert_eq!(result.metadata.persisted_status, None);
    assert!(sink.updates().is_empty());
}

#[tokio::test]
async fn successful_update_reports_persisted_status() {
    let (result, _) = analyze_in_memory(high_signal_report()).await;
    assert_eq!(result.metadata.persisted_status, Some(ReportStatus::CapaPending));
}

#[tokio::test]
async fn low_confidence_needs_review_and_skips_learning() {
    let report = test_failure_report().with_signals(0, 0, 0, 0);
    let id = report.id.clone();
    let source = Arc::new(seeded_store([report], [], []));
    let sink = Arc::new(RecordingSink::new());
    let engine = RcaEngine::new(source, sink.clone());
    let result = engine.analyze(&id, AnalyzeOptions::default()).await;

    assert_eq!(result.confidence, 40);
    assert_eq!(result.verdict, Verdict::NeedsReview);
    assert_eq!(result.warnings, vec!["Low confidence analysis — manual review recommended".to_string()]);
    assert!(sink.learning_records().is_empty());
    assert_eq!(sink.last_update().unwrap().status, ReportStatus::InReview);
}

#[tokio::test]
async fn repeated_runs_are_idempotent_except_attempts() {
    let report = high_signal_report();
    let id = report.id.clone();
    let store = Arc::new(seeded_store([report], [], []));
    let engine = RcaEngine::new(store.clone(), store.clone());

    let first = engine.analyze(&id, AnalyzeOptions::default()).await;
    let second = engine.analyze(&id, AnalyzeOptions::default()).await;

    assert_eq!(first.analysis, second.analysis);
    assert_eq!(first.confidence, second.confidence);
    assert_eq!(first.metadata.analysis_attempt, Some(1));
    assert_eq!(second.metadata.analysis_attempt, Some(2));
    assert_eq!(store.report(&id).unwrap().analysis_attempts, 2);

    // one record per attempt
    let keys: Vec<_> = store.learning_records().iter().map(LearningRecord::dedup_key).collect();
    assert_eq!(keys.len(), 2);
    assert_ne!(keys[0], keys[1]);
}
