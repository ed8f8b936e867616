// src/results.rs

use chrono::{NaiveDateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::models::{BoundaryPair, DuplicateGroup, UnindexableRecord};

/// Statistics for one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub run_id: String,
    pub run_timestamp: NaiveDateTime,

    pub resolution: u8,
    pub similarity_threshold: f64,

    pub total_records: usize,
    pub indexed_records: usize,
    pub unindexable_records: usize,
    /// Distinct cells holding at least one indexed record
    pub cells: usize,
    /// Cells that had at least two records and were clustered
    pub multi_record_cells: usize,

    pub groups: usize,
    /// Records that ended up in some duplicate group
    pub records_in_groups: usize,
    pub avg_group_size: f64,
    pub avg_similarity: f64,

    pub processing_time_secs: f64,
}

/// Counts gathered while indexing, before any cell is clustered.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct IndexCounts {
    pub total_records: usize,
    pub indexed_records: usize,
    pub cells: usize,
    pub multi_record_cells: usize,
}

impl RunStats {
    pub(crate) fn new(
        resolution: u8,
        similarity_threshold: f64,
        counts: IndexCounts,
        groups: &[DuplicateGroup],
        unindexable: &[UnindexableRecord],
        elapsed: Duration,
    ) -> Self {
        let records_in_groups: usize = groups.iter().map(|g| g.len()).sum();
        let (avg_group_size, avg_similarity) = if groups.is_empty() {
            (0.0, 0.0)
        } else {
            (
                records_in_groups as f64 / groups.len() as f64,
                groups.iter().map(|g| g.similarity_score).sum::<f64>() / groups.len() as f64,
            )
        };

        Self {
            run_id: Uuid::new_v4().to_string(),
            run_timestamp: Utc::now().naive_utc(),
            resolution,
            similarity_threshold,
            total_records: counts.total_records,
            indexed_records: counts.indexed_records,
            unindexable_records: unindexable.len(),
            cells: counts.cells,
            multi_record_cells: counts.multi_record_cells,
            groups: groups.len(),
            records_in_groups,
            avg_group_size,
            avg_similarity,
            processing_time_secs: elapsed.as_secs_f64(),
        }
    }

    pub fn log_summary(&self) {
        info!(
            "Run {} complete in {:.3}s: {} records ({} indexed, {} unindexable) in {} cells ({} clustered)",
            self.run_id,
            self.processing_time_secs,
            self.total_records,
            self.indexed_records,
            self.unindexable_records,
            self.cells,
            self.multi_record_cells
        );
        info!(
            "Found {} duplicate groups covering {} records (avg size {:.2}, avg similarity {:.4})",
            self.groups, self.records_in_groups, self.avg_group_size, self.avg_similarity
        );
    }
}

/// Everything a run produces. Nothing here has been applied to any store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupeReport {
    pub groups: Vec<DuplicateGroup>,
    pub unindexable: Vec<UnindexableRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub boundary_pairs: Vec<BoundaryPair>,
    pub stats: RunStats,
}

impl DedupeReport {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
