//! Nearest-neighbour naming of retained clusters
//!
//! A cluster within `max_distance` of a reference plasmid takes that reference's cluster
//! tag; clusters sharing a tag are merged into one plasmid group and the merged group is
//! queried again. Distant clusters become `novel_N`, unless none of their contigs carries
//! a replicon, a relaxase or a circularity flag, in which case they are dropped.

use crate::cluster::{ClusterId, ClusterMap};
use crate::contig::{Contig, ContigSet};
use crate::error::{ReconError, Result};
use crate::evidence::EvidenceSet;
use crate::mash::{MashHit, NearestNeighbor};
use indexmap::IndexMap;

/// Below this mash distance a cluster is considered the same plasmid as the reference
pub const DEFAULT_MAX_MASH_DISTANCE: f64 = 0.05;

/// Distance assumed when the distance collaborator has no answer
pub const NO_HIT_DISTANCE: f64 = 1.0;

pub const NOVEL_PLASMID_PREFIX: &str = "novel_";

#[derive(Debug, Clone, PartialEq)]
pub struct NamerConfig {
    pub max_distance: f64,
}

impl Default for NamerConfig {
    fn default() -> Self {
        Self {
            max_distance: DEFAULT_MAX_MASH_DISTANCE,
        }
    }
}

/// A named plasmid: one or more clusters that share an identity
#[derive(Debug, Clone, PartialEq)]
pub struct PlasmidGroup {
    pub name: String,
    pub contigs: Vec<String>,
    /// Result of the most recent nearest-neighbour query for this group
    pub nearest: Option<MashHit>,
    pub sources: Vec<ClusterId>,
}

impl PlasmidGroup {
    pub fn distance(&self) -> f64 {
        self.nearest.as_ref().map_or(NO_HIT_DISTANCE, |hit| hit.distance)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Naming {
    pub groups: Vec<PlasmidGroup>,
    /// Distant clusters without marker support, with their contigs
    pub dropped: Vec<(ClusterId, Vec<String>)>,
}

fn resolve<'a>(contigs: &'a ContigSet, ids: &[String]) -> Result<Vec<&'a Contig>> {
    ids.iter()
        .map(|id| {
            contigs
                .get(id)
                .ok_or_else(|| ReconError::UnknownContig(id.clone()))
        })
        .collect()
}

pub fn name_clusters<N: NearestNeighbor + ?Sized>(
    retained: ClusterMap,
    evidence: &EvidenceSet,
    contigs: &ContigSet,
    oracle: &N,
    config: &NamerConfig,
) -> Result<Naming> {
    let mut groups: IndexMap<String, PlasmidGroup> = IndexMap::new();
    let mut dropped = Vec::new();
    let mut novel_counter = 0usize;

    for cluster in retained.into_clusters() {
        let ids: Vec<String> = cluster.contig_ids().map(str::to_string).collect();
        let members = resolve(contigs, &ids)?;
        let hit = oracle.nearest(&members)?;
        let distance = hit.as_ref().map_or(NO_HIT_DISTANCE, |h| h.distance);

        if distance > config.max_distance
            && !ids.iter().any(|id| evidence.get(id).has_plasmid_support())
        {
            log::debug!(
                "Dropping cluster {} (distance {distance}) without marker support",
                cluster.id()
            );
            dropped.push((cluster.id().clone(), ids));
            continue;
        }

        let name = match hit.as_ref().filter(|h| h.distance < config.max_distance) {
            Some(h) => h.reference.tag.clone(),
            None => {
                let name = format!("{NOVEL_PLASMID_PREFIX}{novel_counter}");
                novel_counter += 1;
                name
            }
        };

        if let Some(group) = groups.get_mut(&name) {
            group.contigs.extend(ids);
            group.sources.push(cluster.id().clone());
            // Merged content can move the nearest neighbour
            let merged = resolve(contigs, &group.contigs)?;
            group.nearest = oracle.nearest(&merged)?;
            log::debug!(
                "Merged cluster {} into {} ({} contigs)",
                cluster.id(),
                name,
                group.contigs.len()
            );
        } else {
            log::debug!("Cluster {} named {}", cluster.id(), name);
            groups.insert(
                name.clone(),
                PlasmidGroup {
                    name,
                    contigs: ids,
                    nearest: hit,
                    sources: vec![cluster.id().clone()],
                },
            );
        }
    }

    log::info!(
        "Named {} plasmid(s), dropped {} unsupported cluster(s)",
        groups.len(),
        dropped.len()
    );
    Ok(Naming {
        groups: groups.into_values().collect(),
        dropped,
    })
}
