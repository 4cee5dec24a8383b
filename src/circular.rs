//! Separation of co-assembled circular plasmids
//!
//! A cluster holding several replicon-bearing contigs, at least one of them circular, most
//! likely merged distinct plasmids because they share reference similarity. Each circular
//! member of such a cluster is moved into its own `Novel_k` singleton.

use crate::cluster::{Cluster, ClusterMap};
use crate::error::Result;
use crate::evidence::EvidenceSet;

fn needs_split(cluster: &Cluster, evidence: &EvidenceSet) -> bool {
    if cluster.len() <= 1 {
        return false;
    }
    let has_circular = cluster.contig_ids().any(|id| evidence.is_circular(id));
    let replicon_contigs = cluster
        .contig_ids()
        .filter(|id| evidence.has_replicon(id))
        .count();
    has_circular && replicon_contigs > 1
}

pub fn split_circular(mut map: ClusterMap, evidence: &EvidenceSet) -> Result<ClusterMap> {
    let to_split: Vec<String> = map
        .iter()
        .filter(|cluster| needs_split(cluster, evidence))
        .flat_map(|cluster| {
            cluster
                .contig_ids()
                .filter(|id| evidence.is_circular(id))
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect();

    for contig_id in &to_split {
        let from = map.cluster_of(contig_id).cloned();
        let novel = map.split_out(contig_id)?;
        if let Some(from) = from {
            log::debug!("Circular contig {contig_id} split from {from} into {novel}");
        }
    }
    map.remove_empty();

    if !to_split.is_empty() {
        log::info!("Split {} circular contig(s) into their own clusters", to_split.len());
    }
    Ok(map)
}
