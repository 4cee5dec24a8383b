//! Greedy assignment of contigs to reference plasmid clusters
//!
//! Clusters are ranked by the sum of their members' best bitscores and claim contigs in
//! that order, so a contig hitting several reference clusters goes to the strongest one.
//! Contigs left over that carry relaxase or replicon hits become `Novel_k` singletons.

use crate::cluster::{ClusterId, ClusterMap};
use crate::contig::ContigSet;
use crate::error::Result;
use crate::evidence::EvidenceSet;
use crate::hits::HitRecord;
use indexmap::{IndexMap, IndexSet};
use ordered_float::OrderedFloat;

/// Best bitscore per (cluster tag, contig), clusters in order of first hit
fn best_scores(reference_hits: &[HitRecord], contigs: &ContigSet) -> IndexMap<String, IndexMap<String, f64>> {
    let mut best: IndexMap<String, IndexMap<String, f64>> = IndexMap::new();

    for hit in reference_hits {
        if !contigs.contains(&hit.query_id) {
            log::warn!(
                "Skipping reference hit for unknown contig '{}' ({})",
                hit.query_id,
                hit.subject
            );
            continue;
        }
        let score = best
            .entry(hit.subject.tag.clone())
            .or_default()
            .entry(hit.query_id.clone())
            .or_insert(hit.bitscore);
        if hit.bitscore > *score {
            *score = hit.bitscore;
        }
    }

    best
}

/// Clusters ordered by aggregate score, highest first; ties keep the order of their
/// first hit in the table (`resolve_overlaps` preserves table order)
pub fn rank_clusters(scores: &IndexMap<String, IndexMap<String, f64>>) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = scores
        .iter()
        .map(|(tag, members)| (tag.clone(), members.values().sum()))
        .collect();
    ranked.sort_by_key(|(_, total)| std::cmp::Reverse(OrderedFloat(*total)));
    ranked
}

/// Build the initial cluster map from overlap-resolved reference hits and marker evidence
pub fn aggregate(reference_hits: &[HitRecord], evidence: &EvidenceSet, contigs: &ContigSet) -> Result<ClusterMap> {
    let scores = best_scores(reference_hits, contigs);
    let ranked = rank_clusters(&scores);
    let mut map = ClusterMap::new();

    for (tag, total) in &ranked {
        let id = ClusterId::Reference(tag.clone());
        map.open(id.clone());

        // Decide the claims before touching the map
        let claims: Vec<(&str, f64)> = scores[tag]
            .iter()
            .filter(|(contig_id, _)| !map.is_assigned(contig_id))
            .map(|(contig_id, score)| (contig_id.as_str(), *score))
            .collect();

        for (contig_id, score) in claims {
            map.claim(contig_id, &id, score)?;
        }
        log::debug!(
            "Cluster {} (aggregate bitscore {}) holds {} contig(s)",
            id,
            total,
            map.get(&id).map_or(0, |c| c.len())
        );
    }
    map.remove_empty();

    // Relaxase-bearing contigs first, then replicon-bearing ones
    let novel: IndexSet<&str> = evidence
        .relaxase_contigs()
        .chain(evidence.replicon_contigs())
        .filter(|contig_id| contigs.contains(contig_id) && !map.is_assigned(contig_id))
        .collect();

    for contig_id in novel {
        let id = map.open_novel();
        map.claim(contig_id, &id, 0.0)?;
        log::debug!("Contig {contig_id} has marker evidence only, placed in {id}");
    }

    log::info!(
        "Aggregated {} contig(s) into {} cluster(s)",
        map.assigned_count(),
        map.len()
    );
    Ok(map)
}
