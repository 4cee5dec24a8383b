//! Threshold filtering of raw hit tables
//!
//! Every evidence type (replicon, relaxase, reference plasmid, repetitive element)
//! passes through the same filter with its own thresholds.

use crate::evidence::RepeatMatch;
use crate::hits::{HitRecord, RepeatKey};
use indexmap::map::Entry;
use indexmap::IndexMap;

/// Contigs longer than this are treated as chromosomal and never match plasmid references
pub const DEFAULT_MAX_QUERY_LENGTH: u64 = 400_000;

/// Minimum contig and alignment length for reference plasmid hits
pub const DEFAULT_MIN_LENGTH: u64 = 1000;

pub const DEFAULT_MAX_EVALUE: f64 = 1e-5;

#[derive(Debug, Clone, PartialEq)]
pub struct FilterThresholds {
    pub min_identity: f64,
    /// Minimum `qcovs`, the share of the contig covered by the subject
    pub min_coverage: f64,
    pub max_evalue: f64,
    pub min_length: u64,
    pub max_query_length: u64,
}

impl Default for FilterThresholds {
    fn default() -> Self {
        Self::reference_plasmid()
    }
}

impl FilterThresholds {
    pub fn reference_plasmid() -> Self {
        Self {
            min_identity: 80.0,
            min_coverage: 65.0,
            max_evalue: DEFAULT_MAX_EVALUE,
            min_length: DEFAULT_MIN_LENGTH,
            max_query_length: DEFAULT_MAX_QUERY_LENGTH,
        }
    }

    pub fn replicon() -> Self {
        Self::marker(80.0, 80.0)
    }

    pub fn relaxase() -> Self {
        Self::marker(80.0, 80.0)
    }

    pub fn repetitive() -> Self {
        Self {
            min_identity: 80.0,
            min_coverage: 80.0,
            max_evalue: DEFAULT_MAX_EVALUE,
            min_length: 0,
            max_query_length: u64::MAX,
        }
    }

    fn marker(min_identity: f64, min_coverage: f64) -> Self {
        Self {
            min_identity,
            min_coverage,
            max_evalue: DEFAULT_MAX_EVALUE,
            min_length: 0,
            max_query_length: u64::MAX,
        }
    }

    pub fn passes<S>(&self, hit: &HitRecord<S>) -> bool {
        hit.length >= self.min_length
            && hit.query_len >= self.min_length
            && hit.query_len <= self.max_query_length
            && hit.query_coverage >= self.min_coverage
            && hit.identity >= self.min_identity
            && hit.evalue <= self.max_evalue
    }
}

/// Keep the records that pass `thresholds`, in input order
pub fn filter_hits<S: Clone>(hits: &[HitRecord<S>], thresholds: &FilterThresholds) -> Vec<HitRecord<S>> {
    let kept: Vec<HitRecord<S>> = hits
        .iter()
        .filter(|hit| thresholds.passes(hit))
        .cloned()
        .collect();

    log::debug!(
        "Evidence filter kept {} of {} hits",
        kept.len(),
        hits.len()
    );
    kept
}

/// Reduce filtered repetitive-element hits to the best-scoring match per contig.
/// On equal bitscore the earlier row wins.
pub fn repeat_matches(hits: &[HitRecord<RepeatKey>]) -> IndexMap<String, RepeatMatch> {
    let mut best: IndexMap<String, RepeatMatch> = IndexMap::new();

    for hit in hits {
        let candidate = RepeatMatch {
            element_id: hit.subject.element_id.clone(),
            match_type: hit.subject.match_type.clone(),
            score: hit.bitscore,
            contig_span: hit.contig_span(),
        };
        match best.entry(hit.query_id.clone()) {
            Entry::Occupied(mut slot) => {
                if candidate.score > slot.get().score {
                    slot.insert(candidate);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(candidate);
            }
        }
    }

    best
}
