//! Report status lifecycle
//!
//! Statuses only move forward. The two analysis-driven statuses may be
//! re-entered so a report can be re-analyzed without leaving its stage.

use crate::error::RcaError;
use crate::types::ReportStatus;
use serde::{Deserialize, Serialize};

/// Progress of a corrective/preventive action plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CapaStatus {
    /// Proposed
    Pending,
    /// Approved for implementation
    Approved,
    /// Being implemented
    InProgress,
    /// Implemented, awaiting verification
    Implemented,
    /// Verified effective
    Verified,
    /// Rejected by reviewer
    Rejected,
}

impl CapaStatus {
    /// Wire representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::InProgress => "IN_PROGRESS",
            Self::Implemented => "IMPLEMENTED",
            Self::Verified => "VERIFIED",
            Self::Rejected => "REJECTED",
        }
    }
}

/// Statuses reachable from `from`
#[must_use]
pub fn allowed_transitions(from: ReportStatus) -> Vec<ReportStatus> {
    use ReportStatus::*;
    match from {
        Open => vec![InReview, CapaPending, WontFix],
        InReview => vec![InReview, CapaPending, WontFix],
        CapaPending => vec![CapaPending, CapaApproved, WontFix],
        CapaApproved => vec![FixInProgress, WontFix],
        FixInProgress => vec![Resolved, WontFix],
        Resolved | WontFix => vec![],
    }
}

/// Validate a single transition
pub fn validate_transition(from: ReportStatus, to: ReportStatus) -> Result<(), RcaError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(RcaError::IllegalTransition { from, to })
    }
}

/// Outcome of applying an analysis target status to a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResolution {
    /// Status to persist
    pub status: ReportStatus,
    /// Target the analysis asked for
    pub target: ReportStatus,
    /// True when the current status was kept to avoid a regression
    pub retained: bool,
}

impl StatusResolution {
    /// Warning text when the target was not applied
    #[must_use]
    pub fn warning(&self) -> Option<String> {
        self.retained.then(|| {
            format!(
                "Status {} retained; analysis target {} would regress lifecycle",
                self.status, self.target
            )
        })
    }
}

/// Apply the analysis target unless that would move the report backwards
#[must_use]
pub fn resolve_status(current: ReportStatus, target: ReportStatus) -> StatusResolution {
    match validate_transition(current, target) {
        Ok(()) => StatusResolution {
            status: target,
            target,
            retained: false,
        },
        Err(_) => StatusResolution {
            status: current,
            target,
            retained: true,
        },
    }
}

/// Report status implied by CAPA progress; `None` for a rejected CAPA
#[must_use]
pub fn status_for_capa(capa: CapaStatus) -> Option<ReportStatus> {
    match capa {
        CapaStatus::Pending => Some(ReportStatus::CapaPending),
        CapaStatus::Approved => Some(ReportStatus::CapaApproved),
        CapaStatus::InProgress | CapaStatus::Implemented => Some(ReportStatus::FixInProgress),
        CapaStatus::Verified => Some(ReportStatus::Resolved),
        CapaStatus::Rejected => None,
    }
}

/// Advance a report in response to CAPA progress
///
/// A rejected CAPA leaves the status unchanged.
pub fn advance_for_capa(current: ReportStatus, capa: CapaStatus) -> Result<ReportStatus, RcaError> {
    let Some(next) = status_for_capa(capa) else {
        return Ok(current);
    };
    if next == current {
        return Ok(current);
    }
    validate_transition(current, next)?;
    Ok(next)
}
