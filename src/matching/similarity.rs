// src/matching/similarity.rs

use log::trace;
use serde::{Deserialize, Serialize};
use strsim::jaro;

use super::address::normalize_address;
use super::name::normalize_name;
use crate::config::{ADDRESS_WEIGHT, CATEGORY_WEIGHT, CITY_WEIGHT, NAME_WEIGHT};
use crate::error::{DedupeError, DedupeResult};
use crate::models::{present, EntityRecord};
use crate::utils::eq_ignore_case;

const WINKLER_SCALING: f64 = 0.1;
const WINKLER_MAX_PREFIX: usize = 4;

/// Relative importance of each compared field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityWeights {
    pub name: f64,
    pub address: f64,
    pub city: f64,
    pub category: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            name: NAME_WEIGHT,
            address: ADDRESS_WEIGHT,
            city: CITY_WEIGHT,
            category: CATEGORY_WEIGHT,
        }
    }
}

impl SimilarityWeights {
    pub fn validate(&self) -> DedupeResult<()> {
        let all = [self.name, self.address, self.city, self.category];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(DedupeError::invalid_parameter(
                "weights",
                format!("{:?}", all),
                "weights must be finite and non-negative",
            ));
        }
        let sum: f64 = all.iter().sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(DedupeError::invalid_parameter(
                "weights",
                format!("{:?}", all),
                format!("weights must sum to 1.0, got {}", sum),
            ));
        }
        Ok(())
    }
}

/// Per-field sub-scores behind a similarity score. `None` means the field was
/// missing on at least one side and did not take part.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityBreakdown {
    pub name: Option<f64>,
    pub address: Option<f64>,
    pub city: Option<f64>,
    pub category: Option<f64>,
    pub score: f64,
}

/// Weighted field-by-field similarity between two records.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarityScorer {
    weights: SimilarityWeights,
}

impl SimilarityScorer {
    pub fn new(weights: SimilarityWeights) -> DedupeResult<Self> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &SimilarityWeights {
        &self.weights
    }

    /// Score in [0, 1]; `score(a, b) == score(b, a)` exactly.
    pub fn score(&self, a: &EntityRecord, b: &EntityRecord) -> f64 {
        self.breakdown(a, b).score
    }

    pub fn breakdown(&self, a: &EntityRecord, b: &EntityRecord) -> SimilarityBreakdown {
        let name = both_present(Some(a.name.as_str()), Some(b.name.as_str()))
            .map(|(x, y)| string_similarity(&normalize_name(x), &normalize_name(y)));
        let address = both_present(present(&a.address), present(&b.address))
            .map(|(x, y)| string_similarity(&normalize_address(x), &normalize_address(y)));
        let city = both_present(present(&a.city), present(&b.city)).map(|(x, y)| exact_match(x, y));
        let category = both_present(present(&a.category), present(&b.category))
            .map(|(x, y)| exact_match(x, y));

        let terms = [
            (name, self.weights.name),
            (address, self.weights.address),
            (city, self.weights.city),
            (category, self.weights.category),
        ];

        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        for (sub_score, weight) in terms {
            if let Some(s) = sub_score {
                weighted_sum += weight * s;
                weight_total += weight;
            }
        }

        let score = if weight_total > 0.0 {
            (weighted_sum / weight_total).clamp(0.0, 1.0)
        } else {
            0.0
        };

        trace!(
            "Similarity {} <-> {}: name={:?} address={:?} city={:?} category={:?} => {:.4}",
            a.id,
            b.id,
            name,
            address,
            city,
            category,
            score
        );

        SimilarityBreakdown {
            name,
            address,
            city,
            category,
            score,
        }
    }
}

fn both_present<'a>(x: Option<&'a str>, y: Option<&'a str>) -> Option<(&'a str, &'a str)> {
    match (x.map(str::trim), y.map(str::trim)) {
        (Some(x), Some(y)) if !x.is_empty() && !y.is_empty() => Some((x, y)),
        _ => None,
    }
}

/// Jaro-Winkler similarity with the arguments in a fixed order, so the result
/// does not depend on which record is passed first.
pub fn string_similarity(x: &str, y: &str) -> f64 {
    if x <= y {
        jaro_winkler(x, y)
    } else {
        jaro_winkler(y, x)
    }
}

/// Standard Jaro-Winkler: the common-prefix boost counts at most
/// `WINKLER_MAX_PREFIX` characters with scaling factor `WINKLER_SCALING`.
fn jaro_winkler(x: &str, y: &str) -> f64 {
    let jaro_similarity = jaro(x, y);
    let prefix_length = x
        .chars()
        .zip(y.chars())
        .take_while(|(a, b)| a == b)
        .take(WINKLER_MAX_PREFIX)
        .count();
    (jaro_similarity + WINKLER_SCALING * prefix_length as f64 * (1.0 - jaro_similarity)).min(1.0)
}

fn exact_match(x: &str, y: &str) -> f64 {
    if eq_ignore_case(x, y) {
        1.0
    } else {
        0.0
    }
}
