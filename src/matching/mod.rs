// src/matching/mod.rs
pub mod address;
pub mod geospatial;
pub mod name;
pub mod similarity;

pub use similarity::{SimilarityBreakdown, SimilarityScorer, SimilarityWeights};
