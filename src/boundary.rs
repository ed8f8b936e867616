// src/boundary.rs
//
// Clustering never looks past a cell, so two listings of one church that
// straddle a cell edge are never grouped. This pass compares records in
// adjacent cells and reports the pairs that would have qualified. The pairs
// are informational; they are never folded into duplicate groups.

use log::{debug, warn};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

use crate::error::{DedupeError, DedupeResult};
use crate::matching::geospatial::{distance_m, CellId};
use crate::matching::SimilarityScorer;
use crate::models::{BoundaryPair, SpatialCell};

/// Pairs of records in 1-ring neighboring cells scoring at least `threshold`.
/// Each pair of adjacent cells is visited once; output order follows `cells`.
/// `cancel` is checked before each cell.
pub fn boundary_candidates(
    cells: &[SpatialCell],
    threshold: f64,
    scorer: &SimilarityScorer,
    cancel: &CancellationToken,
) -> DedupeResult<Vec<BoundaryPair>> {
    let by_id: HashMap<CellId, &SpatialCell> = cells.iter().map(|c| (c.cell_id, c)).collect();
    let mut pairs = Vec::new();

    for cell in cells {
        if cancel.is_cancelled() {
            warn!("Boundary pass cancelled after {} pairs", pairs.len());
            return Err(DedupeError::Cancelled);
        }
        for neighbor_id in cell.cell_id.neighbors() {
            if neighbor_id <= cell.cell_id {
                continue;
            }
            let Some(neighbor) = by_id.get(&neighbor_id) else {
                continue;
            };
            for a in &cell.records {
                for b in &neighbor.records {
                    let score = scorer.score(a, b);
                    if score >= threshold {
                        pairs.push(BoundaryPair {
                            entity_id_1: a.id.clone(),
                            cell_id_1: cell.cell_id,
                            entity_id_2: b.id.clone(),
                            cell_id_2: neighbor.cell_id,
                            score,
                            distance_m: distance_m(&a.coordinates, &b.coordinates),
                        });
                    }
                }
            }
        }
    }

    debug!("Found {} cross-cell candidate pairs", pairs.len());
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::geospatial::{cell_id, cell_size_degrees};
    use crate::models::{Coordinates, EntityRecord};

    fn cell_of(record: EntityRecord, resolution: u8) -> SpatialCell {
        SpatialCell {
            cell_id: cell_id(&record.coordinates, resolution).unwrap(),
            resolution,
            records: vec![record],
        }
    }

    #[test]
    fn test_pair_across_cell_edge() {
        let resolution = 14;
        let size = cell_size_degrees(resolution);
        // Put two points a few meters apart on either side of a cell edge
        let origin = cell_id(&Coordinates::new(-23.5505, -46.6333), resolution).unwrap();
        let (_, _, _, max_lon) = origin.bounds();
        let lat = origin.center().latitude;

        let a = EntityRecord::new("a", "Igreja Adventista Central", lat, max_lon - size * 0.01);
        let b = EntityRecord::new("b", "Igreja Adventista Central", lat, max_lon + size * 0.01);
        let far = EntityRecord::new("c", "Igreja Adventista Central", lat, max_lon + size * 5.5);

        let cells = vec![
            cell_of(a, resolution),
            cell_of(b, resolution),
            cell_of(far, resolution),
        ];
        assert_ne!(cells[0].cell_id, cells[1].cell_id);

        let pairs =
            boundary_candidates(&cells, 0.9, &SimilarityScorer::default(), &CancellationToken::new())
                .unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].entity_id_1.0, "a");
        assert_eq!(pairs[0].entity_id_2.0, "b");
        assert!(pairs[0].distance_m < 100.0);
    }

    #[test]
    fn test_dissimilar_neighbors_not_reported() {
        let resolution = 14;
        let origin = cell_id(&Coordinates::new(-23.5505, -46.6333), resolution).unwrap();
        let (_, _, _, max_lon) = origin.bounds();
        let lat = origin.center().latitude;
        let size = cell_size_degrees(resolution);

        let a = EntityRecord::new("a", "Igreja Adventista Central", lat, max_lon - size * 0.01);
        let b = EntityRecord::new("b", "Mesquita Brasil", lat, max_lon + size * 0.01);
        let cells = vec![cell_of(a, resolution), cell_of(b, resolution)];
        let pairs =
            boundary_candidates(&cells, 0.9, &SimilarityScorer::default(), &CancellationToken::new())
                .unwrap();
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_cancelled_before_first_cell() {
        let resolution = 14;
        let origin = cell_id(&Coordinates::new(-23.5505, -46.6333), resolution).unwrap();
        let (_, _, _, max_lon) = origin.bounds();
        let lat = origin.center().latitude;
        let size = cell_size_degrees(resolution);

        let a = EntityRecord::new("a", "Igreja Adventista Central", lat, max_lon - size * 0.01);
        let b = EntityRecord::new("b", "Igreja Adventista Central", lat, max_lon + size * 0.01);
        let cells = vec![cell_of(a, resolution), cell_of(b, resolution)];

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = boundary_candidates(&cells, 0.9, &SimilarityScorer::default(), &cancel);
        assert_eq!(result.unwrap_err(), DedupeError::Cancelled);
    }
}
