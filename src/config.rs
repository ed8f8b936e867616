// src/config.rs

use log::info;
use std::env;
use std::str::FromStr;

use crate::error::{DedupeError, DedupeResult};
use crate::matching::geospatial::validate_resolution;
use crate::matching::similarity::SimilarityWeights;

// Field weights for the similarity score; must sum to 1.0
pub const NAME_WEIGHT: f64 = 0.4;
pub const ADDRESS_WEIGHT: f64 = 0.3;
pub const CITY_WEIGHT: f64 = 0.2;
pub const CATEGORY_WEIGHT: f64 = 0.1;

// Grid resolution used when none is configured (~1.5 km² cells)
pub const DEFAULT_RESOLUTION: i64 = 14;

// Minimum representative-to-member score for two records to be clustered
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

// Environment variable names
pub const RESOLUTION_ENV: &str = "DEDUPE_RESOLUTION";
pub const SIMILARITY_THRESHOLD_ENV: &str = "DEDUPE_SIMILARITY_THRESHOLD";
pub const MAX_WORKERS_ENV: &str = "DEDUPE_MAX_WORKERS";
pub const REPORT_BOUNDARY_PAIRS_ENV: &str = "DEDUPE_REPORT_BOUNDARY_PAIRS";

/// Parameters for one deduplication run.
#[derive(Debug, Clone)]
pub struct DedupeConfig {
    pub resolution: i64,
    pub similarity_threshold: f64,
    /// Upper bound on cells processed at once by the concurrent pipeline
    pub max_workers: usize,
    pub weights: SimilarityWeights,
    /// Also report likely duplicates split across adjacent cells
    pub report_boundary_pairs: bool,
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_workers: default_workers(),
            weights: SimilarityWeights::default(),
            report_boundary_pairs: false,
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn parse_env<T: FromStr>(key: &str) -> DedupeResult<Option<T>> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| DedupeError::Config(format!("{} has an unparseable value '{}'", key, raw))),
        _ => Ok(None),
    }
}

// Unset and blank values both mean "keep the default", as in `parse_env`
fn parse_flag_env(key: &str) -> DedupeResult<Option<bool>> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => parse_bool(&raw).map(Some).ok_or_else(|| {
            DedupeError::Config(format!("{} must be a boolean, got '{}'", key, raw))
        }),
        _ => Ok(None),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl DedupeConfig {
    /// Reads overrides from the environment; unset variables keep their defaults.
    pub fn from_env() -> DedupeResult<Self> {
        let mut config = Self::default();

        if let Some(resolution) = parse_env::<i64>(RESOLUTION_ENV)? {
            config.resolution = resolution;
        }
        if let Some(threshold) = parse_env::<f64>(SIMILARITY_THRESHOLD_ENV)? {
            config.similarity_threshold = threshold;
        }
        if let Some(workers) = parse_env::<usize>(MAX_WORKERS_ENV)? {
            config.max_workers = workers;
        }
        if let Some(enabled) = parse_flag_env(REPORT_BOUNDARY_PAIRS_ENV)? {
            config.report_boundary_pairs = enabled;
        }

        config.validate()?;
        info!(
            "Dedupe config: resolution={}, threshold={}, max_workers={}, boundary_pairs={}",
            config.resolution,
            config.similarity_threshold,
            config.max_workers,
            config.report_boundary_pairs
        );
        Ok(config)
    }

    /// Applies the same checks as a pipeline run, plus worker and weight sanity.
    pub fn validate(&self) -> DedupeResult<()> {
        validate_resolution(self.resolution)?;
        validate_threshold(self.similarity_threshold)?;
        if self.max_workers == 0 {
            return Err(DedupeError::invalid_parameter(
                "max_workers",
                self.max_workers,
                "must be at least 1",
            ));
        }
        self.weights.validate()
    }
}

/// The threshold must lie in (0, 1].
pub fn validate_threshold(threshold: f64) -> DedupeResult<f64> {
    if !threshold.is_finite() || threshold <= 0.0 || threshold > 1.0 {
        return Err(DedupeError::invalid_parameter(
            "similarity_threshold",
            threshold,
            "must be in (0, 1]",
        ));
    }
    Ok(threshold)
}
