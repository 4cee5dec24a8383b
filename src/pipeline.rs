//! End-to-end reconstruction: filter, resolve overlaps, aggregate, split, classify, name
//!
//! Each stage takes the previous stage's output by value, so a `ClusterMap` that has been
//! handed on cannot be touched again.

use crate::aggregate::aggregate;
use crate::circular::split_circular;
use crate::classify::{classify, Classification, ClassifierConfig, Discarded};
use crate::contig::ContigSet;
use crate::error::Result;
use crate::evidence::EvidenceSet;
use crate::filter::{filter_hits, repeat_matches, FilterThresholds};
use crate::hits::{HitRecord, RepeatKey};
use crate::mash::NearestNeighbor;
use crate::namer::{name_clusters, NamerConfig, Naming, PlasmidGroup};
use crate::overlap::{resolve_overlaps, OverlapLimit};
use indexmap::IndexSet;

/// Every threshold of the reconstruction, one field per stage
#[derive(Debug, Clone, PartialEq)]
pub struct ReconConfig {
    pub reference: FilterThresholds,
    pub replicon: FilterThresholds,
    pub relaxase: FilterThresholds,
    pub repetitive: FilterThresholds,
    pub overlap: OverlapLimit,
    pub classifier: ClassifierConfig,
    pub namer: NamerConfig,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            reference: FilterThresholds::reference_plasmid(),
            replicon: FilterThresholds::replicon(),
            relaxase: FilterThresholds::relaxase(),
            repetitive: FilterThresholds::repetitive(),
            overlap: OverlapLimit::default(),
            classifier: ClassifierConfig::default(),
            namer: NamerConfig::default(),
        }
    }
}

/// Raw hit tables, as read from disk
#[derive(Debug, Clone, Default)]
pub struct EvidenceTables {
    pub reference: Vec<HitRecord>,
    pub replicon: Vec<HitRecord>,
    pub relaxase: Vec<HitRecord>,
    pub repetitive: Vec<HitRecord<RepeatKey>>,
}

#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub naming: Naming,
    pub evidence: EvidenceSet,
    /// Contigs attributed to the chromosome, in assembly order
    pub chromosome: Vec<String>,
    pub discarded: Vec<Discarded>,
}

impl Reconstruction {
    pub fn plasmids(&self) -> &[PlasmidGroup] {
        &self.naming.groups
    }

    /// Name of the plasmid group holding `contig_id`, if any
    pub fn plasmid_of(&self, contig_id: &str) -> Option<&str> {
        self.naming
            .groups
            .iter()
            .find(|group| group.contigs.iter().any(|id| id == contig_id))
            .map(|group| group.name.as_str())
    }
}

pub fn reconstruct<N: NearestNeighbor + ?Sized>(
    contigs: &ContigSet,
    tables: &EvidenceTables,
    oracle: &N,
    config: &ReconConfig,
) -> Result<Reconstruction> {
    let reference = filter_hits(&tables.reference, &config.reference);
    let replicon = filter_hits(&tables.replicon, &config.replicon);
    let relaxase = filter_hits(&tables.relaxase, &config.relaxase);
    let repetitive = filter_hits(&tables.repetitive, &config.repetitive);
    log::info!(
        "Filtered hits: {} reference, {} replicon, {} relaxase, {} repetitive",
        reference.len(),
        replicon.len(),
        relaxase.len(),
        repetitive.len()
    );

    let reference = resolve_overlaps(&reference, config.overlap);
    log::info!("{} reference hit(s) after overlap resolution", reference.len());

    let evidence = EvidenceSet::build(contigs, &replicon, &relaxase, repeat_matches(&repetitive));

    let clusters = aggregate(&reference, &evidence, contigs)?;
    let clusters = split_circular(clusters, &evidence)?;
    let Classification {
        retained,
        discarded,
    } = classify(clusters, &evidence, contigs, &config.classifier)?;
    let naming = name_clusters(retained, &evidence, contigs, oracle, &config.namer)?;

    let in_plasmids: IndexSet<&str> = naming
        .groups
        .iter()
        .flat_map(|group| group.contigs.iter().map(String::as_str))
        .collect();
    let chromosome: Vec<String> = contigs
        .ids()
        .filter(|id| !in_plasmids.contains(id))
        .map(str::to_string)
        .collect();

    log::info!(
        "Reconstructed {} plasmid(s) from {} contig(s); {} contig(s) attributed to the chromosome",
        naming.groups.len(),
        in_plasmids.len(),
        chromosome.len()
    );

    Ok(Reconstruction {
        naming,
        evidence,
        chromosome,
        discarded,
    })
}
