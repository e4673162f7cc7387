//! Core identifiers and classification enums
//!
//! `TriggerSource`, `ScopeType` and `RootCauseCategory` are open enums: a
//! value the tables do not know is kept verbatim in an `Other` variant
//! instead of failing deserialization. Every lookup keyed on them carries a
//! default arm.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure report identifier (assigned by the external store)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub String);

impl ReportId {
    /// Create a report id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as str
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First `n` characters, used when synthesizing pattern ids
    #[must_use]
    pub fn prefix(&self, n: usize) -> String {
        self.0.chars().take(n).collect()
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReportId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ReportId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Declares an enum with a fixed wire table plus an `Other` fallback.
macro_rules! open_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// Value outside the known table, kept verbatim
            Other(String),
        }

        impl $name {
            /// Wire representation
            #[must_use]
            pub fn as_str(&self) -> &str {
                match self {
                    $( Self::$variant => $wire, )+
                    Self::Other(raw) => raw.as_str(),
                }
            }

            /// False for values that fell through to `Other`
            #[inline]
            #[must_use]
            pub fn is_known(&self) -> bool {
                !matches!(self, Self::Other(_))
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                match value.as_str() {
                    $( $wire => Self::$variant, )+
                    _ => Self::Other(value),
                }
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::from(value.to_string())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                match value {
                    $name::Other(raw) => raw,
                    known => known.as_str().to_string(),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

open_enum! {
    /// Where a failure was detected
    TriggerSource {
        /// Automated test run
        TestFailure => "TEST_FAILURE",
        /// CI/CD pipeline
        CiPipeline => "CI_PIPELINE",
        /// Quality gate validation
        QualityGate => "QUALITY_GATE",
        /// Production runtime monitoring
        Runtime => "RUNTIME",
        /// Manual report
        Manual => "MANUAL",
        /// Sub-agent verdict
        SubAgent => "SUB_AGENT",
        /// Phase handoff rejection
        HandoffRejection => "HANDOFF_REJECTION",
    }
}

open_enum! {
    /// What the failure affects
    ScopeType {
        /// Strategic directive
        Sd => "SD",
        /// Product requirements
        Prd => "PRD",
        /// CI/CD pipeline
        Pipeline => "PIPELINE",
        /// Production runtime
        Runtime => "RUNTIME",
        /// Sub-agent
        SubAgent => "SUB_AGENT",
    }
}

open_enum! {
    /// Root-cause classification
    RootCauseCategory {
        /// Defect in application code
        CodeDefect => "CODE_DEFECT",
        /// Wrong configuration value
        ConfigError => "CONFIG_ERROR",
        /// Build or hosting infrastructure
        Infrastructure => "INFRASTRUCTURE",
        /// Missing or weak process step
        ProcessGap => "PROCESS_GAP",
        /// Unclear or contradictory requirements
        RequirementsAmbiguity => "REQUIREMENTS_AMBIGUITY",
        /// Scenario not covered by tests
        TestCoverageGap => "TEST_COVERAGE_GAP",
        /// Third-party dependency problem
        DependencyIssue => "DEPENDENCY_ISSUE",
        /// Environment drift or outage
        Environmental => "ENVIRONMENTAL",
        /// Database schema out of sync with code
        SchemaMismatch => "SCHEMA_MISMATCH",
        /// Exploitable weakness
        SecurityVulnerability => "SECURITY_VULNERABILITY",
        /// Latency or throughput regression
        PerformanceRegression => "PERFORMANCE_REGRESSION",
        /// Workflow protocol not followed
        ProtocolViolation => "PROTOCOL_VIOLATION",
        /// Not yet determined
        Unknown => "UNKNOWN",
    }
}

impl RootCauseCategory {
    /// Lower-case phrase used in narratives ("test coverage gap")
    #[must_use]
    pub fn phrase(&self) -> String {
        self.as_str().to_lowercase().replace('_', " ")
    }
}

/// Persisted lifecycle status of a failure report
///
/// Declaration order is lifecycle order; `WontFix` is a terminal side exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    /// Created by a trigger, not analyzed yet
    #[default]
    Open,
    /// Analyzed with insufficient confidence for CAPA tracking
    InReview,
    /// Awaiting a corrective/preventive action plan
    CapaPending,
    /// CAPA approved
    CapaApproved,
    /// Fix being implemented
    FixInProgress,
    /// CAPA verified
    Resolved,
    /// Closed without a fix
    WontFix,
}

impl ReportStatus {
    /// Wire representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::InReview => "IN_REVIEW",
            Self::CapaPending => "CAPA_PENDING",
            Self::CapaApproved => "CAPA_APPROVED",
            Self::FixInProgress => "FIX_IN_PROGRESS",
            Self::Resolved => "RESOLVED",
            Self::WontFix => "WONT_FIX",
        }
    }

    /// Terminal statuses accept no further transitions
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::WontFix)
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity priority derived by the store from impact and likelihood
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SeverityPriority {
    /// Critical
    P0,
    /// High
    P1,
    /// Medium
    P2,
    /// Low
    P3,
    /// Trivial
    P4,
}

impl SeverityPriority {
    /// P0 and P1 block handoffs until their CAPA is verified
    #[inline]
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::P0 | Self::P1)
    }
}

impl fmt::Display for SeverityPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
