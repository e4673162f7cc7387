//! Verdict resolver
//!
//! Two cut-offs act on the same confidence: the review threshold decides
//! the verdict, the CAPA threshold decides whether corrective-action
//! tracking starts.

use crate::config::RcaConfig;
use crate::types::ReportStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Warning attached below the review threshold
pub const LOW_CONFIDENCE_WARNING: &str = "Low confidence analysis — manual review recommended";

/// Warning attached between the review and CAPA thresholds
pub const MODERATE_CONFIDENCE_WARNING: &str = "Moderate confidence — consider additional evidence";

/// Pipeline verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// Analysis usable
    Pass,
    /// Confidence too low, a human should look
    NeedsReview,
    /// Context could not be loaded
    Error,
}

impl Verdict {
    /// Wire representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::NeedsReview => "NEEDS_REVIEW",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict plus the status the analysis asks to persist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictDecision {
    /// Verdict returned to the caller
    pub verdict: Verdict,
    /// Quality warning, if any
    pub warning: Option<&'static str>,
    /// Target report status
    pub target_status: ReportStatus,
}

/// Map confidence to a verdict and target status
#[must_use]
pub fn resolve_verdict(confidence: u8, config: &RcaConfig) -> VerdictDecision {
    let target_status = if confidence >= config.capa_threshold {
        ReportStatus::CapaPending
    } else {
        ReportStatus::InReview
    };

    let (verdict, warning) = if confidence < config.review_threshold {
        (Verdict::NeedsReview, Some(LOW_CONFIDENCE_WARNING))
    } else if confidence < config.capa_threshold {
        (Verdict::Pass, Some(MODERATE_CONFIDENCE_WARNING))
    } else {
        (Verdict::Pass, None)
    };

    VerdictDecision {
        verdict,
        warning,
        target_status,
    }
}
