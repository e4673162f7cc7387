//! RCA Core - Root-cause forensic analysis engine
//!
//! Given a recorded failure report, the engine:
//! - Reconstructs a fixed 5-level causal chain
//! - Classifies a root cause with a 0-100 confidence score
//! - Matches the failure against historical failures by similarity
//! - Weighs contributing factors
//! - Synthesizes remediation recommendations and a verdict
//!
//! Every stage is a pure function of its inputs. Only context loading and
//! findings persistence go through the store traits in [`store`].
//!
//! # Example
//!
//! ```rust,ignore
//! use rca_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let store = Arc::new(MemoryStore::load_bundle("store.json").unwrap());
//! let engine = RcaEngine::new(store.clone(), store);
//!
//! let result = engine.analyze(&ReportId::new("rcr-1"), AnalyzeOptions::default()).await;
//! println!("{} ({}%)", result.verdict, result.confidence);
//! # }
//! ```

#![warn(unreachable_pub)]

// Data model
pub mod error;
pub mod report;
pub mod types;

// Pipeline stages
pub mod chain;
pub mod classifier;
pub mod factors;
pub mod pattern;
pub mod recommendations;
pub mod verdict;

// Orchestration and outputs
pub mod config;
pub mod engine;
pub mod learning;
pub mod lifecycle;
pub mod result;
pub mod store;

// Companion checks
pub mod gate;
pub mod ingest;

// Re-exports for convenience
pub use chain::{build_causal_chain, CausalChain, CausalStep, EvidenceTag, CHAIN_DEPTH};
pub use classifier::{classify, Classification, ConfidenceSignals};
pub use config::{AnalyzeOptions, RcaConfig};
pub use engine::{run_pipeline, Findings, RcaEngine};
pub use error::{RcaError, StoreError};
pub use factors::{identify_contributing_factors, ContributingFactor, FactorKind};
pub use gate::{evaluate_gate, run_gate_check, GateResult, GateStatus};
pub use ingest::{build_training_record, TrainingRecord};
pub use learning::{ConfidenceLevel, LearningRecord, LearningRecordId, LessonType};
pub use lifecycle::{allowed_transitions, status_for_capa, validate_transition, CapaStatus};
pub use pattern::{find_pattern_matches, PatternMatch};
pub use recommendations::{synthesize_recommendations, Priority, Recommendation, RecommendationType};
pub use report::{AnalysisContext, FailureReport, LinkKind, LinkRef, LinkedSummary, RemediationManifest};
pub use result::{Analysis, AnalysisResult, CriticalIssue};
pub use store::{FindingsSink, GateSource, HistoryQuery, MemoryStore, ReportSource, ReportUpdate};
pub use types::{ReportId, ReportStatus, RootCauseCategory, ScopeType, SeverityPriority, TriggerSource};
pub use verdict::{resolve_verdict, Verdict};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with RCA Core
    pub use crate::{
        AnalysisResult, AnalyzeOptions, FailureReport, FindingsSink, MemoryStore, RcaConfig,
        RcaEngine, RcaError, ReportId, ReportSource, ReportStatus, RootCauseCategory, ScopeType,
        TriggerSource, Verdict,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
