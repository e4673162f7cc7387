//! Engine configuration

use crate::error::RcaError;
use crate::pattern::DEFAULT_SIMILARITY_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunable thresholds and limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RcaConfig {
    /// Max historical candidates requested from the store
    pub history_limit: usize,
    /// Min similarity for a pattern match to be surfaced
    pub similarity_threshold: u8,
    /// Max related report ids persisted
    pub related_ids_limit: usize,
    /// Below this the verdict is `NEEDS_REVIEW`
    pub review_threshold: u8,
    /// At or above this the report moves to `CAPA_PENDING`
    pub capa_threshold: u8,
    /// Min confidence to emit a learning record
    pub learning_threshold: u8,
    /// Learning confidence level HIGH cut-off
    pub high_confidence_level: u8,
    /// Root-cause characters kept in the lesson summary
    pub lesson_summary_chars: usize,
    /// Recommendations joined into prevention guidance
    pub prevention_guidance_actions: usize,
    /// Suppress learning records entirely
    pub skip_learning: bool,
}

impl Default for RcaConfig {
    fn default() -> Self {
        Self {
            history_limit: 10,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            related_ids_limit: 5,
            review_threshold: 60,
            capa_threshold: 70,
            learning_threshold: 60,
            high_confidence_level: 80,
            lesson_summary_chars: 200,
            prevention_guidance_actions: 3,
            skip_learning: false,
        }
    }
}

impl RcaConfig {
    /// Parse from TOML text and validate
    pub fn from_toml_str(text: &str) -> Result<Self, RcaError> {
        let config: Self = toml::from_str(text).map_err(|e| RcaError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file and validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RcaError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| RcaError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Check threshold ordering and ranges
    pub fn validate(&self) -> Result<(), RcaError> {
        let thresholds = [
            ("similarity_threshold", self.similarity_threshold),
            ("review_threshold", self.review_threshold),
            ("capa_threshold", self.capa_threshold),
            ("learning_threshold", self.learning_threshold),
            ("high_confidence_level", self.high_confidence_level),
        ];
        if let Some((name, value)) = thresholds.iter().find(|(_, v)| *v > 100) {
            return Err(RcaError::Config(format!("{name} must be <= 100, got {value}")));
        }
        if self.review_threshold > self.capa_threshold {
            return Err(RcaError::Config(format!(
                "review_threshold ({}) exceeds capa_threshold ({})",
                self.review_threshold, self.capa_threshold
            )));
        }
        if self.history_limit == 0 {
            return Err(RcaError::Config("history_limit must be positive".into()));
        }
        Ok(())
    }

    /// With history limit
    #[inline]
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// With similarity threshold
    #[inline]
    #[must_use]
    pub fn with_similarity_threshold(mut self, threshold: u8) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// With review threshold
    #[inline]
    #[must_use]
    pub fn with_review_threshold(mut self, threshold: u8) -> Self {
        self.review_threshold = threshold;
        self
    }

    /// With CAPA threshold
    #[inline]
    #[must_use]
    pub fn with_capa_threshold(mut self, threshold: u8) -> Self {
        self.capa_threshold = threshold;
        self
    }

    /// With learning threshold
    #[inline]
    #[must_use]
    pub fn with_learning_threshold(mut self, threshold: u8) -> Self {
        self.learning_threshold = threshold;
        self
    }

    /// With learning suppressed
    #[inline]
    #[must_use]
    pub fn with_skip_learning(mut self, skip: bool) -> Self {
        self.skip_learning = skip;
        self
    }
}

/// Per-invocation overrides
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeOptions {
    /// Suppress the learning record for this run
    pub skip_learning: bool,
}

impl AnalyzeOptions {
    /// Options with learning suppressed
    #[inline]
    #[must_use]
    pub fn skip_learning() -> Self {
        Self {
            skip_learning: true,
        }
    }
}
