// src/clustering.rs
//
// Greedy, representative-based clustering of the records in one spatial cell.
//
// Records are visited in input order. Each record is scored against the first
// member (the representative) of every open cluster, in cluster creation
// order, and joins the first cluster it reaches the threshold with; otherwise
// it opens a new cluster. This is order sensitive and not a transitive
// closure: a record similar only to a non-representative member starts its
// own cluster. Results are reproducible for a fixed input order.

use log::{debug, trace};

use crate::config::validate_threshold;
use crate::error::DedupeResult;
use crate::matching::geospatial::CellId;
use crate::matching::SimilarityScorer;
use crate::merge::suggest_merge;
use crate::models::{DuplicateGroup, EntityRecord};

struct OpenCluster {
    /// Indices into the cell's record slice; the first is the representative
    members: Vec<usize>,
    /// Lowest score that admitted a member
    min_score: f64,
}

/// Partitions one cell's records into duplicate groups. Singleton clusters are
/// dropped; every returned group has at least two members.
pub fn build_clusters(
    records: &[EntityRecord],
    cell_id: CellId,
    threshold: f64,
    scorer: &SimilarityScorer,
) -> DedupeResult<Vec<DuplicateGroup>> {
    let threshold = validate_threshold(threshold)?;
    let mut clusters: Vec<OpenCluster> = Vec::new();

    for (idx, record) in records.iter().enumerate() {
        let mut placed = false;
        for cluster in clusters.iter_mut() {
            let representative = &records[cluster.members[0]];
            let score = scorer.score(representative, record);
            if score >= threshold {
                trace!(
                    "Cell {}: {} joins cluster of {} (score {:.4})",
                    cell_id,
                    record.id,
                    representative.id,
                    score
                );
                cluster.members.push(idx);
                cluster.min_score = cluster.min_score.min(score);
                placed = true;
                break;
            }
        }
        if !placed {
            clusters.push(OpenCluster {
                members: vec![idx],
                min_score: 1.0,
            });
        }
    }

    let groups: Vec<DuplicateGroup> = clusters
        .into_iter()
        .filter(|cluster| cluster.members.len() >= 2)
        .filter_map(|cluster| {
            let members: Vec<EntityRecord> = cluster
                .members
                .iter()
                .map(|&i| records[i].clone())
                .collect();
            suggest_merge(&members).map(|suggested_merge| DuplicateGroup {
                members,
                similarity_score: cluster.min_score,
                cell_id,
                suggested_merge,
            })
        })
        .collect();

    debug!(
        "Cell {}: {} records -> {} duplicate groups",
        cell_id,
        records.len(),
        groups.len()
    );

    Ok(groups)
}
