// src/error.rs
//
// Error taxonomy for the deduplication engine. Per-record problems are
// recovered by the pipeline (the record is excluded and reported); parameter
// problems abort the whole run before any cell is processed.

use thiserror::Error;

use crate::models::EntityId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DedupeError {
    #[error("Coordinates ({latitude}, {longitude}) are outside the valid range")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("Invalid parameter '{name}' = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Deduplication run was cancelled")]
    Cancelled,

    #[error("Cell worker failed: {0}")]
    WorkerFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Record not found: {0}")]
    RecordNotFound(EntityId),
}

impl DedupeError {
    pub(crate) fn invalid_parameter(
        name: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        DedupeError::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors that only affect a single record.
    pub fn is_record_level(&self) -> bool {
        matches!(self, DedupeError::InvalidCoordinates { .. })
    }
}

pub type DedupeResult<T> = std::result::Result<T, DedupeError>;
