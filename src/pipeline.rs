// src/pipeline.rs
//
// Orchestrates one deduplication run:
//   validate parameters -> index records into cells -> cluster each cell that
//   holds two or more records -> attach merge suggestions -> report.
//
// The pipeline holds no state between runs. Cells share nothing, so the
// concurrent variant farms them out to blocking workers; within a cell the
// work stays sequential to keep clustering order-sensitive and reproducible.

use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::boundary::boundary_candidates;
use crate::clustering::build_clusters;
use crate::config::{validate_threshold, DedupeConfig};
use crate::error::{DedupeError, DedupeResult};
use crate::matching::geospatial::{approx_cell_area_km2, validate_resolution, GeoIndexer};
use crate::matching::SimilarityScorer;
use crate::merge::suggest_merge;
use crate::models::{
    BoundaryPair, DuplicateGroup, EntityId, EntityRecord, MergeDecision, SpatialCell,
    UnindexableReason, UnindexableRecord,
};
use crate::results::{DedupeReport, IndexCounts, RunStats};

#[derive(Debug, Clone)]
pub struct DeduplicationPipeline {
    scorer: SimilarityScorer,
    max_workers: usize,
    report_boundary_pairs: bool,
}

impl Default for DeduplicationPipeline {
    fn default() -> Self {
        let config = DedupeConfig::default();
        Self {
            scorer: SimilarityScorer::default(),
            max_workers: config.max_workers,
            report_boundary_pairs: config.report_boundary_pairs,
        }
    }
}

/// Cells in order of first appearance, plus the records that could not be indexed.
struct IndexedRecords {
    cells: Vec<SpatialCell>,
    unindexable: Vec<UnindexableRecord>,
    counts: IndexCounts,
}

impl DeduplicationPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &DedupeConfig) -> DedupeResult<Self> {
        config.validate()?;
        Ok(Self {
            scorer: SimilarityScorer::new(config.weights)?,
            max_workers: config.max_workers,
            report_boundary_pairs: config.report_boundary_pairs,
        })
    }

    pub fn with_scorer(mut self, scorer: SimilarityScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn with_boundary_pairs(mut self, enabled: bool) -> Self {
        self.report_boundary_pairs = enabled;
        self
    }

    pub fn scorer(&self) -> &SimilarityScorer {
        &self.scorer
    }

    /// Runs the whole pipeline on the calling thread.
    pub fn run(
        &self,
        records: &[EntityRecord],
        resolution: i64,
        threshold: f64,
    ) -> DedupeResult<DedupeReport> {
        self.run_cancellable(records, resolution, threshold, &CancellationToken::new())
    }

    /// Like `run`, checking `cancel` before each cell. A cancelled run
    /// returns `DedupeError::Cancelled` and no partial result.
    pub fn run_cancellable(
        &self,
        records: &[EntityRecord],
        resolution: i64,
        threshold: f64,
        cancel: &CancellationToken,
    ) -> DedupeResult<DedupeReport> {
        let (resolution, threshold) = validate_parameters(resolution, threshold)?;
        let start = Instant::now();
        info!(
            "Starting deduplication of {} records (resolution {}, ~{:.3} km² cells, threshold {})",
            records.len(),
            resolution,
            approx_cell_area_km2(resolution),
            threshold
        );

        let (indexed, boundary_pairs) = prepare_cells(
            records,
            resolution,
            threshold,
            &self.scorer,
            self.report_boundary_pairs,
            cancel,
        )?;

        let mut groups = Vec::new();
        for cell in indexed.cells.iter().filter(|c| c.records.len() >= 2) {
            if cancel.is_cancelled() {
                warn!("Deduplication cancelled after {} groups", groups.len());
                return Err(DedupeError::Cancelled);
            }
            groups.extend(build_clusters(
                &cell.records,
                cell.cell_id,
                threshold,
                &self.scorer,
            )?);
        }

        Ok(finish(
            resolution,
            threshold,
            indexed.counts,
            groups,
            indexed.unindexable,
            boundary_pairs,
            start,
        ))
    }

    /// Clusters cells on tokio's blocking pool, at most `max_workers` at a
    /// time. Produces the same groups, in the same order, as `run`.
    pub async fn run_concurrent(
        &self,
        records: &[EntityRecord],
        resolution: i64,
        threshold: f64,
        cancel: &CancellationToken,
    ) -> DedupeResult<DedupeReport> {
        let (resolution, threshold) = validate_parameters(resolution, threshold)?;
        let start = Instant::now();
        info!(
            "Starting concurrent deduplication of {} records (resolution {}, threshold {}, {} workers)",
            records.len(),
            resolution,
            threshold,
            self.max_workers
        );

        // Indexing and the boundary pass are CPU-bound too; keep them off the executor
        let scorer = self.scorer;
        let report_boundary_pairs = self.report_boundary_pairs;
        let owned_records = records.to_vec();
        let prepare_cancel = cancel.clone();
        let (
            IndexedRecords {
                cells,
                unindexable,
                counts,
            },
            boundary_pairs,
        ) = tokio::task::spawn_blocking(move || {
            prepare_cells(
                &owned_records,
                resolution,
                threshold,
                &scorer,
                report_boundary_pairs,
                &prepare_cancel,
            )
        })
        .await
        .map_err(|e| DedupeError::WorkerFailed(e.to_string()))??;

        let per_cell: Vec<Vec<DuplicateGroup>> = stream::iter(
            cells
                .into_iter()
                .filter(|c| c.records.len() >= 2)
                .map(|cell| {
                    let cancel = cancel.clone();
                    async move {
                        if cancel.is_cancelled() {
                            return Err(DedupeError::Cancelled);
                        }
                        tokio::task::spawn_blocking(move || {
                            build_clusters(&cell.records, cell.cell_id, threshold, &scorer)
                        })
                        .await
                        .map_err(|e| DedupeError::WorkerFailed(e.to_string()))?
                    }
                }),
        )
        .buffered(self.max_workers.max(1))
        .try_collect()
        .await
        .map_err(|e| {
            if e == DedupeError::Cancelled {
                warn!("Concurrent deduplication cancelled");
            }
            e
        })?;

        let groups = per_cell.into_iter().flatten().collect();
        Ok(finish(
            resolution,
            threshold,
            counts,
            groups,
            unindexable,
            boundary_pairs,
            start,
        ))
    }

    /// What the caller's store must do to accept `group`: keep the suggested
    /// record under the surviving id and retire every other member.
    pub fn accept_merge(&self, group: &DuplicateGroup) -> MergeDecision {
        accept_merge(group)
    }

    /// Drops `id` from every group. Groups left with fewer than two members
    /// are invalidated; the rest get a fresh merge suggestion and score.
    pub fn delete_record(&self, groups: &[DuplicateGroup], id: &EntityId) -> Vec<DuplicateGroup> {
        let mut remaining = Vec::with_capacity(groups.len());
        for group in groups {
            if !group.contains(id) {
                remaining.push(group.clone());
                continue;
            }

            let members: Vec<EntityRecord> = group
                .members
                .iter()
                .filter(|m| &m.id != id)
                .cloned()
                .collect();
            if members.len() < 2 {
                debug!("Group in cell {} invalidated by deleting {}", group.cell_id, id);
                continue;
            }

            let representative = &members[0];
            let similarity_score = members[1..]
                .iter()
                .map(|m| self.scorer.score(representative, m))
                .fold(1.0, f64::min);

            if let Some(suggested_merge) = suggest_merge(&members) {
                remaining.push(DuplicateGroup {
                    members,
                    similarity_score,
                    cell_id: group.cell_id,
                    suggested_merge,
                });
            }
        }
        remaining
    }
}

/// The retired ids are every member except the one the suggestion keeps.
pub fn accept_merge(group: &DuplicateGroup) -> MergeDecision {
    let canonical = group.suggested_merge.clone();
    let retired_ids = group
        .members
        .iter()
        .map(|m| m.id.clone())
        .filter(|id| id != &canonical.id)
        .collect();
    MergeDecision {
        canonical,
        retired_ids,
    }
}

fn validate_parameters(resolution: i64, threshold: f64) -> DedupeResult<(u8, f64)> {
    let resolution = validate_resolution(resolution)?;
    let threshold = validate_threshold(threshold)?;
    Ok((resolution, threshold))
}

/// Indexes the records and, when enabled, runs the cross-cell boundary pass.
fn prepare_cells(
    records: &[EntityRecord],
    resolution: u8,
    threshold: f64,
    scorer: &SimilarityScorer,
    report_boundary_pairs: bool,
    cancel: &CancellationToken,
) -> DedupeResult<(IndexedRecords, Vec<BoundaryPair>)> {
    let indexed = index_records(records, resolution)?;
    let boundary_pairs = if report_boundary_pairs {
        boundary_candidates(&indexed.cells, threshold, scorer, cancel)?
    } else {
        Vec::new()
    };
    Ok((indexed, boundary_pairs))
}

fn index_records(records: &[EntityRecord], resolution: u8) -> DedupeResult<IndexedRecords> {
    let indexer = GeoIndexer::new(resolution as i64)?;
    let mut cells: Vec<SpatialCell> = Vec::new();
    let mut cell_positions = HashMap::new();
    let mut unindexable = Vec::new();

    for record in records {
        if !record.has_name() {
            warn!("Record {} has no name; excluded from deduplication", record.id);
            unindexable.push(UnindexableRecord {
                id: record.id.clone(),
                reason: UnindexableReason::MissingName,
            });
            continue;
        }

        let cell_id = match indexer.cell_id(&record.coordinates) {
            Ok(cell_id) => cell_id,
            Err(DedupeError::InvalidCoordinates {
                latitude,
                longitude,
            }) => {
                warn!(
                    "Record {} has invalid coordinates ({}, {}); excluded from deduplication",
                    record.id, latitude, longitude
                );
                unindexable.push(UnindexableRecord {
                    id: record.id.clone(),
                    reason: UnindexableReason::InvalidCoordinates {
                        latitude,
                        longitude,
                    },
                });
                continue;
            }
            Err(e) => return Err(e),
        };

        let position = *cell_positions.entry(cell_id).or_insert_with(|| {
            cells.push(SpatialCell {
                cell_id,
                resolution,
                records: Vec::new(),
            });
            cells.len() - 1
        });
        cells[position].records.push(record.clone());
    }

    let counts = IndexCounts {
        total_records: records.len(),
        indexed_records: records.len() - unindexable.len(),
        cells: cells.len(),
        multi_record_cells: cells.iter().filter(|c| c.records.len() >= 2).count(),
    };
    debug!(
        "Indexed {} records into {} cells ({} with two or more records)",
        counts.indexed_records, counts.cells, counts.multi_record_cells
    );

    Ok(IndexedRecords {
        cells,
        unindexable,
        counts,
    })
}

fn finish(
    resolution: u8,
    threshold: f64,
    counts: IndexCounts,
    groups: Vec<DuplicateGroup>,
    unindexable: Vec<UnindexableRecord>,
    boundary_pairs: Vec<BoundaryPair>,
    start: Instant,
) -> DedupeReport {
    let stats = RunStats::new(
        resolution,
        threshold,
        counts,
        &groups,
        &unindexable,
        start.elapsed(),
    );
    stats.log_summary();
    DedupeReport {
        groups,
        unindexable,
        boundary_pairs,
        stats,
    }
}
