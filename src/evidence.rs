//! Per-contig evidence collected from the filtered marker tables

use crate::contig::ContigSet;
use crate::hits::{HitRecord, SubjectKey};
use indexmap::{IndexMap, IndexSet};

/// Best repetitive-element match on a contig
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatMatch {
    pub element_id: String,
    pub match_type: String,
    pub score: f64,
    /// Matched interval on the contig, known only when the table carries `qstart qend`
    pub contig_span: Option<(u64, u64)>,
}

impl RepeatMatch {
    /// `contig_match_start` and `contig_match_end` report columns, empty when unknown
    pub fn span_columns(&self) -> (String, String) {
        match self.contig_span {
            Some((start, end)) => (start.to_string(), end.to_string()),
            None => (String::new(), String::new()),
        }
    }
}

/// Evidence view for one contig
#[derive(Debug, Clone, Copy)]
pub struct Evidence<'a> {
    pub replicons: &'a [SubjectKey],
    pub relaxases: &'a [SubjectKey],
    pub repeat: Option<&'a RepeatMatch>,
    pub circular: bool,
}

impl Evidence<'_> {
    /// Direct plasmid support: a marker gene or a closed molecule
    pub fn has_plasmid_support(&self) -> bool {
        !self.replicons.is_empty() || !self.relaxases.is_empty() || self.circular
    }
}

#[derive(Debug, Clone, Default)]
pub struct EvidenceSet {
    replicons: IndexMap<String, Vec<SubjectKey>>,
    relaxases: IndexMap<String, Vec<SubjectKey>>,
    repeats: IndexMap<String, RepeatMatch>,
    circular: IndexSet<String>,
}

fn group_markers(hits: &[HitRecord]) -> IndexMap<String, Vec<SubjectKey>> {
    let mut grouped: IndexMap<String, Vec<SubjectKey>> = IndexMap::new();
    for hit in hits {
        let keys = grouped.entry(hit.query_id.clone()).or_default();
        if !keys.contains(&hit.subject) {
            keys.push(hit.subject.clone());
        }
    }
    grouped
}

impl EvidenceSet {
    /// Assemble evidence from filtered replicon and relaxase tables, the best repeat
    /// match per contig, and the circular flags carried by the contig set.
    pub fn build(
        contigs: &ContigSet,
        replicon_hits: &[HitRecord],
        relaxase_hits: &[HitRecord],
        repeats: IndexMap<String, RepeatMatch>,
    ) -> Self {
        Self {
            replicons: group_markers(replicon_hits),
            relaxases: group_markers(relaxase_hits),
            repeats,
            circular: contigs.circular_ids().map(str::to_string).collect(),
        }
    }

    pub fn get(&self, contig_id: &str) -> Evidence<'_> {
        Evidence {
            replicons: self.replicons.get(contig_id).map(Vec::as_slice).unwrap_or_default(),
            relaxases: self.relaxases.get(contig_id).map(Vec::as_slice).unwrap_or_default(),
            repeat: self.repeats.get(contig_id),
            circular: self.circular.contains(contig_id),
        }
    }

    pub fn has_replicon(&self, contig_id: &str) -> bool {
        self.replicons.contains_key(contig_id)
    }

    pub fn has_relaxase(&self, contig_id: &str) -> bool {
        self.relaxases.contains_key(contig_id)
    }

    pub fn is_repetitive(&self, contig_id: &str) -> bool {
        self.repeats.contains_key(contig_id)
    }

    pub fn is_circular(&self, contig_id: &str) -> bool {
        self.circular.contains(contig_id)
    }

    /// Contigs carrying replicon hits, in order of first hit
    pub fn replicon_contigs(&self) -> impl Iterator<Item = &str> {
        self.replicons.keys().map(String::as_str)
    }

    /// Contigs carrying relaxase hits, in order of first hit
    pub fn relaxase_contigs(&self) -> impl Iterator<Item = &str> {
        self.relaxases.keys().map(String::as_str)
    }

    pub fn repeats(&self) -> impl Iterator<Item = (&str, &RepeatMatch)> {
        self.repeats.iter().map(|(id, m)| (id.as_str(), m))
    }
}
