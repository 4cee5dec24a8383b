//! Composite classification: retain plasmid candidates, route the rest to the chromosome

use crate::cluster::{Cluster, ClusterId, ClusterMap};
use crate::contig::ContigSet;
use crate::error::{ReconError, Result};
use crate::evidence::EvidenceSet;

/// Members shorter than this count as short fragments
pub const SHORT_FRAGMENT_LENGTH: usize = 3000;

/// Clusters with less total sequence than this are discarded
pub const MIN_PLASMID_LENGTH: usize = 1500;

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    pub short_fragment_length: usize,
    pub min_plasmid_length: usize,
    /// Repetitive share of members above which an all-short cluster is discarded
    pub max_repetitive_fraction: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            short_fragment_length: SHORT_FRAGMENT_LENGTH,
            min_plasmid_length: MIN_PLASMID_LENGTH,
            max_repetitive_fraction: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClusterStats {
    pub members: usize,
    pub repetitive: usize,
    pub total_length: usize,
    pub short: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Retained,
    AllRepetitive,
    RepetitiveFragments,
    TooShort,
}

impl ClassifierConfig {
    pub fn stats(&self, cluster: &Cluster, evidence: &EvidenceSet, contigs: &ContigSet) -> Result<ClusterStats> {
        let mut stats = ClusterStats::default();
        for contig_id in cluster.contig_ids() {
            let length = contigs
                .get(contig_id)
                .ok_or_else(|| ReconError::UnknownContig(contig_id.to_string()))?
                .len();
            stats.members += 1;
            stats.total_length += length;
            if evidence.is_repetitive(contig_id) {
                stats.repetitive += 1;
            }
            if length < self.short_fragment_length {
                stats.short += 1;
            }
        }
        Ok(stats)
    }

    pub fn verdict(&self, stats: &ClusterStats) -> Verdict {
        let repetitive_fraction = if stats.members == 0 {
            0.0
        } else {
            stats.repetitive as f64 / stats.members as f64
        };

        if stats.repetitive == stats.members {
            Verdict::AllRepetitive
        } else if repetitive_fraction > self.max_repetitive_fraction && stats.short == stats.members {
            Verdict::RepetitiveFragments
        } else if stats.total_length < self.min_plasmid_length {
            Verdict::TooShort
        } else {
            Verdict::Retained
        }
    }
}

/// A cluster routed to the chromosome and the reason why
#[derive(Debug, Clone, PartialEq)]
pub struct Discarded {
    pub id: ClusterId,
    pub verdict: Verdict,
    pub contigs: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Classification {
    pub retained: ClusterMap,
    pub discarded: Vec<Discarded>,
}

pub fn classify(
    mut map: ClusterMap,
    evidence: &EvidenceSet,
    contigs: &ContigSet,
    config: &ClassifierConfig,
) -> Result<Classification> {
    let mut rejected = Vec::new();
    for cluster in map.iter() {
        let stats = config.stats(cluster, evidence, contigs)?;
        let verdict = config.verdict(&stats);
        if verdict != Verdict::Retained {
            log::debug!("Discarding cluster {} ({:?}, {:?})", cluster.id(), verdict, stats);
            rejected.push((cluster.id().clone(), verdict));
        }
    }

    let mut discarded = Vec::with_capacity(rejected.len());
    for (id, verdict) in rejected {
        let cluster = map
            .remove(&id)
            .ok_or_else(|| ReconError::MissingCluster(id.to_string()))?;
        discarded.push(Discarded {
            id,
            verdict,
            contigs: cluster.contig_ids().map(str::to_string).collect(),
        });
    }

    log::info!(
        "Classifier retained {} cluster(s), discarded {}",
        map.len(),
        discarded.len()
    );
    Ok(Classification {
        retained: map,
        discarded,
    })
}
