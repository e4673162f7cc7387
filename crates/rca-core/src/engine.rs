//! Analysis engine
//!
//! `run_pipeline` is the pure part: chain, classification, patterns,
//! factors, recommendations and verdict, computed from a loaded context.
//! `RcaEngine` wraps it with the two I/O boundaries (context load and
//! findings persist) and always returns a well-formed `AnalysisResult`.

use crate::chain::{build_causal_chain, CausalChain};
use crate::classifier::{classify, Classification};
use crate::config::{AnalyzeOptions, RcaConfig};
use crate::error::RcaError;
use crate::factors::{identify_contributing_factors, ContributingFactor};
use crate::learning::{build_learning_record, should_emit, LessonInput};
use crate::lifecycle::resolve_status;
use crate::pattern::{find_pattern_matches, PatternMatch};
use crate::recommendations::{synthesize_recommendations, Recommendation};
use crate::report::{AnalysisContext, LinkRef, LinkedSummary};
use crate::result::{Analysis, AnalysisResult, ResultMetadata};
use crate::store::{FindingsSink, HistoryQuery, ReportSource, ReportUpdate};
use crate::types::ReportId;
use crate::verdict::{resolve_verdict, VerdictDecision};
use chrono::Utc;
use std::sync::Arc;

/// Everything the pure pipeline derives from a context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Findings {
    /// 5-Whys chain
    pub chain: CausalChain,
    /// Root cause, category and confidence
    pub classification: Classification,
    /// Similar historical reports, best first
    pub pattern_matches: Vec<PatternMatch>,
    /// Weighted factors, heaviest first
    pub contributing_factors: Vec<ContributingFactor>,
    /// Ordered recommendations
    pub recommendations: Vec<Recommendation>,
    /// Verdict and target status
    pub decision: VerdictDecision,
}

impl Findings {
    /// Pattern id of the best match
    #[must_use]
    pub fn pattern_id(&self) -> Option<&str> {
        self.pattern_matches.first().map(|m| m.pattern_id.as_str())
    }

    /// Ids of the best `limit` matches
    #[must_use]
    pub fn related_ids(&self, limit: usize) -> Vec<ReportId> {
        self.pattern_matches
            .iter()
            .take(limit)
            .map(|m| m.report_id.clone())
            .collect()
    }

    /// Stage outputs for the caller
    #[must_use]
    pub fn analysis(&self) -> Analysis {
        Analysis {
            root_cause: self.classification.root_cause.clone(),
            root_cause_category: self.classification.category.clone(),
            causal_chain: self.chain.to_vec(),
            contributing_factors: self.contributing_factors.clone(),
            pattern_matches: self.pattern_matches.clone(),
        }
    }
}

/// Run stages 2 to 7 over a loaded context
#[must_use]
pub fn run_pipeline(ctx: &AnalysisContext, config: &RcaConfig) -> Findings {
    let report = &ctx.report;

    let chain = build_causal_chain(report, ctx.strategic.as_ref(), ctx.requirements.as_ref());
    let classification = classify(report, &chain);
    tracing::info!(
        category = %classification.category,
        confidence = classification.confidence,
        "root cause classified"
    );

    let pattern_matches = find_pattern_matches(report, &ctx.history, config.similarity_threshold);
    tracing::info!(
        candidates = ctx.history.len(),
        matches = pattern_matches.len(),
        "pattern matching complete"
    );

    let contributing_factors = identify_contributing_factors(report, ctx.requirements.as_ref(), &chain);
    let recommendations = synthesize_recommendations(
        &classification.category,
        &pattern_matches,
        &contributing_factors,
    );
    let decision = resolve_verdict(classification.confidence, config);

    Findings {
        chain,
        classification,
        pattern_matches,
        contributing_factors,
        recommendations,
        decision,
    }
}

/// Engine binding the pipeline to a store
pub struct RcaEngine {
    config: RcaConfig,
    source: Arc<dyn ReportSource>,
    sink: Arc<dyn FindingsSink>,
}

impl std::fmt::Debug for RcaEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RcaEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RcaEngine {
    /// Create an engine with the default configuration
    #[must_use]
    pub fn new(source: Arc<dyn ReportSource>, sink: Arc<dyn FindingsSink>) -> Self {
        Self {
            config: RcaConfig::default(),
            source,
            sink,
        }
    }

    /// With configuration
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: RcaConfig) -> Self {
        self.config = config;
        self
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RcaConfig {
        &self.config
    }

    async fn linked(&self, link: Option<LinkRef>) -> Result<Option<LinkedSummary>, RcaError> {
        let Some(link) = link else {
            return Ok(None);
        };
        self.source
            .get_linked_summary(&link)
            .await
            .map_err(|e| RcaError::ContextLoad(format!("{:?} {}: {e}", link.kind, link.id)))
    }

    /// Load the report, its linked summaries and historical candidates
    pub async fn load_context(&self, id: &ReportId) -> Result<AnalysisContext, RcaError> {
        let report = self
            .source
            .get_failure_report(id)
            .await
            .map_err(|e| RcaError::from_report_fetch(id.as_str(), e))?;

        let strategic = self.linked(report.sd_id.clone().map(LinkRef::strategic)).await?;
        let requirements = self.linked(report.prd_id.clone().map(LinkRef::requirements)).await?;

        let query = HistoryQuery {
            scope_type: report.scope_type.clone(),
            exclude_id: id.clone(),
            limit: self.config.history_limit,
        };
        let history = self
            .source
            .get_historical_reports(&query)
            .await
            .map_err(|e| RcaError::ContextLoad(format!("historical reports: {e}")))?;

        tracing::debug!(
            strategic = strategic.is_some(),
            requirements = requirements.is_some(),
            history = history.len(),
            "context loaded"
        );

        Ok(AnalysisContext {
            report,
            strategic,
            requirements,
            history,
        })
    }

    /// Analyze one report
    ///
    /// Never fails: an invalid configuration or a load error becomes an
    /// `ERROR` verdict and persistence errors become warnings.
    #[tracing::instrument(skip_all, fields(report_id = %id))]
    pub async fn analyze(&self, id: &ReportId, options: AnalyzeOptions) -> AnalysisResult {
        let timestamp = Utc::now();

        let loaded = match self.config.validate() {
            Ok(()) => self.load_context(id).await,
            Err(e) => Err(e),
        };
        let ctx = match loaded {
            Ok(ctx) => ctx,
            Err(e) => {
                tracing::error!(error = %e, retryable = e.is_retryable(), "analysis aborted");
                metrics::counter!("rca_analyses_total", "verdict" => "ERROR").increment(1);
                return AnalysisResult::failed(id.clone(), timestamp, &e);
            }
        };

        let findings = run_pipeline(&ctx, &self.config);
        let report = &ctx.report;
        let confidence = findings.classification.confidence;
        let attempt = report.analysis_attempts.saturating_add(1);
        let mut warnings = Vec::new();

        let resolution = resolve_status(report.status, findings.decision.target_status);
        if let Some(warning) = resolution.warning() {
            tracing::warn!(current = %report.status, target = %resolution.target, "status retained");
            warnings.push(warning);
        }

        let update = ReportUpdate {
            root_cause: findings.classification.root_cause.clone(),
            root_cause_category: findings.classification.category.clone(),
            causal_chain: findings.chain.to_vec(),
            contributing_factors: findings.contributing_factors.clone(),
            confidence,
            pattern_id: findings.pattern_id().map(str::to_string),
            related_rcr_ids: findings.related_ids(self.config.related_ids_limit),
            status: resolution.status,
            analysis_attempts: attempt,
            updated_at: Utc::now(),
        };
        let persisted_status = match self.sink.update_failure_report(id, &update).await {
            Ok(()) => Some(resolution.status),
            Err(e) => {
                let err = RcaError::persistence("update RCR", e);
                tracing::warn!(error = %err, retryable = err.is_retryable(), "report update failed");
                metrics::counter!("rca_persistence_warnings_total").increment(1);
                warnings.push(err.to_string());
                None
            }
        };

        let mut learning_record_emitted = false;
        if should_emit(confidence, options.skip_learning, &self.config) {
            let record = build_learning_record(
                &LessonInput {
                    report_id: id,
                    attempt,
                    root_cause: &findings.classification.root_cause,
                    category: &findings.classification.category,
                    confidence,
                    recommendations: &findings.recommendations,
                    pattern_id: findings.pattern_id(),
                    factor_count: findings.contributing_factors.len(),
                    pattern_match_count: findings.pattern_matches.len(),
                },
                &self.config,
            );
            match self.sink.emit_learning_record(&record).await {
                Ok(()) => {
                    learning_record_emitted = true;
                    metrics::counter!("rca_learning_records_total").increment(1);
                }
                Err(e) => {
                    let err = RcaError::persistence("create learning record", e);
                    tracing::warn!(error = %err, retryable = err.is_retryable(), "learning record failed");
                    metrics::counter!("rca_persistence_warnings_total").increment(1);
                    warnings.push(err.to_string());
                }
            }
        }

        if let Some(warning) = findings.decision.warning {
            warnings.push(warning.to_string());
        }

        let verdict = findings.decision.verdict;
        metrics::counter!("rca_analyses_total", "verdict" => verdict.as_str()).increment(1);
        metrics::histogram!("rca_confidence").record(f64::from(confidence));
        tracing::info!(%verdict, confidence, status = %resolution.status, "analysis complete");

        AnalysisResult {
            report_id: id.clone(),
            timestamp,
            verdict,
            confidence,
            critical_issues: Vec::new(),
            warnings,
            recommendations: findings.recommendations.clone(),
            analysis: Some(findings.analysis()),
            metadata: ResultMetadata {
                rcr_status: Some(report.status),
                trigger_tier: Some(report.trigger_tier),
                scope_type: Some(report.scope_type.clone()),
                persisted_status,
                analysis_attempt: Some(attempt),
                learning_record_emitted,
            },
        }
    }
}
