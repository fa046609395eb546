//! Match policy: tolerance, duration threshold, top-result boost,
//! special keywords and the scoring weights.
//!
//! A `MatchConfig` is built once per session and only read afterwards, so it
//! can be shared freely between threads.

use std::path::Path;

use anyhow::{Context, Result};
use rustc_hash::FxHashSet;
use serde::Deserialize;

use crate::error::{MatchError, MatchResult};

// ============================================================================
// Defaults
// ============================================================================

/// Minimum combined score to accept a match
pub const DEFAULT_TOLERANCE: f64 = 0.3;

/// Duration difference (seconds) beyond which duration similarity is 0
pub const DEFAULT_DURATION_THRESHOLD_SECS: u32 = 3;

/// Multiplier for candidates flagged as the search service's top result
pub const DEFAULT_TOP_RESULT_BOOST: f64 = 1.2;

/// Variant markers protected during title cleaning
pub const DEFAULT_SPECIAL_KEYWORDS: [&str; 4] = ["instrumental", "remix", "live", "cover"];

// ============================================================================
// Scoring Weights
// ============================================================================

/// Field weights and similarity constants used by the scorer.
///
/// The defaults were tuned by hand against real playlists. Album is the most
/// discriminating field once present, duration the noisiest.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub title: f64,
    pub artist: f64,
    pub album: f64,
    pub duration: f64,
    /// Divisor of the weighted sum (number of fields)
    pub divisor: f64,
    /// Multiplier when both titles carry a special keyword
    pub keyword_boost: f64,
    /// Base similarities below this are forced to exactly 0.0
    pub similarity_floor: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            title: 1.1,
            artist: 1.0,
            album: 1.5,
            duration: 0.8,
            divisor: 4.0,
            keyword_boost: 1.5,
            similarity_floor: 0.3,
        }
    }
}

// ============================================================================
// Match Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct MatchConfig {
    tolerance: f64,
    duration_threshold_secs: u32,
    top_result_boost: f64,
    special_keywords: Vec<String>,
    weights: ScoringWeights,
}

impl MatchConfig {
    /// Build a validated configuration.
    ///
    /// Keywords are lower-cased, trimmed and de-duplicated; empty entries are
    /// dropped since an empty keyword would match every title.
    pub fn new<I, S>(
        tolerance: f64,
        duration_threshold_secs: u32,
        top_result_boost: f64,
        special_keywords: I,
    ) -> MatchResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !(0.0..=1.0).contains(&tolerance) {
            return Err(MatchError::InvalidConfiguration(format!(
                "tolerance must be within [0, 1], got {}",
                tolerance
            )));
        }
        if duration_threshold_secs == 0 {
            return Err(MatchError::InvalidConfiguration(
                "duration threshold must be a positive number of seconds".to_string(),
            ));
        }
        if !top_result_boost.is_finite() || top_result_boost < 1.0 {
            return Err(MatchError::InvalidConfiguration(format!(
                "top result boost must be >= 1.0, got {}",
                top_result_boost
            )));
        }

        let mut seen = FxHashSet::default();
        let special_keywords = special_keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty() && seen.insert(k.clone()))
            .collect();

        Ok(Self {
            tolerance,
            duration_threshold_secs,
            top_result_boost,
            special_keywords,
            weights: ScoringWeights::default(),
        })
    }

    /// Replace the scoring weights.
    pub fn with_weights(mut self, weights: ScoringWeights) -> MatchResult<Self> {
        let fields = [
            weights.title,
            weights.artist,
            weights.album,
            weights.duration,
            weights.keyword_boost,
            weights.similarity_floor,
        ];
        if fields.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(MatchError::InvalidConfiguration(
                "scoring weights must be finite and non-negative".to_string(),
            ));
        }
        if !weights.divisor.is_finite() || weights.divisor <= 0.0 {
            return Err(MatchError::InvalidConfiguration(format!(
                "weight divisor must be positive, got {}",
                weights.divisor
            )));
        }
        self.weights = weights;
        Ok(self)
    }

    /// Load a configuration from a JSON file. Every field is optional.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        Ok(ConfigFile::from_json_file(path)?.into_config()?)
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn duration_threshold_secs(&self) -> u32 {
        self.duration_threshold_secs
    }

    pub fn top_result_boost(&self) -> f64 {
        self.top_result_boost
    }

    pub fn special_keywords(&self) -> &[String] {
        &self.special_keywords
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            duration_threshold_secs: DEFAULT_DURATION_THRESHOLD_SECS,
            top_result_boost: DEFAULT_TOP_RESULT_BOOST,
            special_keywords: DEFAULT_SPECIAL_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            weights: ScoringWeights::default(),
        }
    }
}

// ============================================================================
// Config File
// ============================================================================

/// On-disk shape of a configuration file. Missing fields fall back to defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub tolerance: Option<f64>,
    pub duration_threshold_secs: Option<u32>,
    pub top_result_boost: Option<f64>,
    pub special_keywords: Option<Vec<String>>,
    pub weights: Option<ScoringWeights>,
}

impl ConfigFile {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn into_config(self) -> MatchResult<MatchConfig> {
        let keywords = self.special_keywords.unwrap_or_else(|| {
            DEFAULT_SPECIAL_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect()
        });
        let config = MatchConfig::new(
            self.tolerance.unwrap_or(DEFAULT_TOLERANCE),
            self.duration_threshold_secs
                .unwrap_or(DEFAULT_DURATION_THRESHOLD_SECS),
            self.top_result_boost.unwrap_or(DEFAULT_TOP_RESULT_BOOST),
            keywords,
        )?;
        match self.weights {
            Some(weights) => config.with_weights(weights),
            None => Ok(config),
        }
    }
}
