// src/lib.rs
pub mod boundary;
pub mod clustering;
pub mod config;
pub mod error;
pub mod matching;
pub mod merge;
pub mod models;
pub mod pipeline;
pub mod results;
pub mod store;
pub mod utils;

// Re-export common types for easier access
pub use config::DedupeConfig;
pub use error::{DedupeError, DedupeResult};
pub use matching::geospatial::{CellId, GeoIndexer};
pub use matching::{SimilarityScorer, SimilarityWeights};
pub use models::{
    BoundaryPair, Coordinates, DuplicateGroup, EntityId, EntityRecord, MergeDecision,
    SpatialCell, UnindexableReason, UnindexableRecord,
};
pub use pipeline::{accept_merge, DeduplicationPipeline};
pub use results::{DedupeReport, RunStats};
pub use store::{apply_delete, apply_merge, InMemoryStore, RecordStore};

// Cancellation handle accepted by the pipeline
pub use tokio_util::sync::CancellationToken;
