//! Error types for the RCA engine
//!
//! Only the boundary calls can fail. The analysis stages themselves are
//! total functions, so everything here describes either a context load
//! problem, a persistence problem, or a lifecycle/configuration misuse.

use crate::types::ReportStatus;

/// Main RCA error type
#[derive(Debug, thiserror::Error)]
pub enum RcaError {
    /// The failure report does not exist in the store
    #[error("failure report not found: {0}")]
    ReportNotFound(String),

    /// Linked summaries or historical candidates could not be loaded
    #[error("context load failed: {0}")]
    ContextLoad(String),

    /// Writing the report update or learning record failed
    #[error("Failed to {action}: {source}")]
    Persistence {
        /// What was being written
        action: &'static str,
        /// Store failure
        #[source]
        source: StoreError,
    },

    /// Configuration is invalid or unreadable
    #[error("configuration error: {0}")]
    Config(String),

    /// Attempted to move a report backwards through its lifecycle
    #[error("illegal status transition: {from} -> {to}")]
    IllegalTransition {
        /// Current status
        from: ReportStatus,
        /// Requested status
        to: ReportStatus,
    },

    /// Raw store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl RcaError {
    /// Failed write of analysis output
    #[inline]
    #[must_use]
    pub fn persistence(action: &'static str, source: StoreError) -> Self {
        Self::Persistence { action, source }
    }

    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ContextLoad(_) => true,
            Self::Persistence { source, .. } => source.is_retryable(),
            Self::Store(e) => e.is_retryable(),
            Self::ReportNotFound(_) | Self::Config(_) | Self::IllegalTransition { .. } => false,
        }
    }

    /// Lift a store error raised while fetching the report itself
    #[must_use]
    pub fn from_report_fetch(id: &str, err: StoreError) -> Self {
        if err.is_not_found() {
            Self::ReportNotFound(id.to_string())
        } else {
            Self::Store(err)
        }
    }
}

/// Errors raised by store implementations at the boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Record does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Store could not be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Store refused the write
    #[error("write rejected: {0}")]
    Rejected(String),

    /// Payload could not be encoded or decoded
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Check if this is a missing-record error
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Transient failures may succeed on retry
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value.to_string())
    }
}
