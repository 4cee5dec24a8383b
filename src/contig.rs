//! Assembly contigs, kept in input order

use crate::error::Result;
use crate::seqio::{open_input, read_fasta, FastaRecord};
use indexmap::IndexMap;
use std::io::BufRead;
use std::path::Path;

/// Header marker written by Unicycler for closed replicons
pub const UNICYCLER_CIRCULAR_TAG: &str = "circular=true";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contig {
    pub id: String,
    pub sequence: Vec<u8>,
    pub circular: bool,
}

impl Contig {
    pub fn new(id: impl Into<String>, sequence: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            sequence: sequence.into(),
            circular: false,
        }
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContigSet {
    contigs: IndexMap<String, Contig>,
}

impl ContigSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from FASTA records. With `unicycler_flags`, headers carrying
    /// `circular=true` mark their contig circular.
    pub fn from_records(records: Vec<FastaRecord>, unicycler_flags: bool) -> Self {
        let mut set = ContigSet::new();
        for record in records {
            let circular = unicycler_flags
                && (record.description.contains(UNICYCLER_CIRCULAR_TAG)
                    || record.id.contains(UNICYCLER_CIRCULAR_TAG));
            let mut contig = Contig::new(record.id, record.sequence);
            contig.circular = circular;
            set.insert(contig);
        }
        set
    }

    pub fn from_fasta<P: AsRef<Path>>(path: P, unicycler_flags: bool) -> Result<Self> {
        Ok(Self::from_records(read_fasta(path)?, unicycler_flags))
    }

    /// Insert a contig; a repeated id replaces the earlier sequence but keeps its position
    pub fn insert(&mut self, contig: Contig) {
        if self.contigs.contains_key(&contig.id) {
            log::warn!("Duplicate contig id '{}', keeping the last sequence", contig.id);
        }
        self.contigs.insert(contig.id.clone(), contig);
    }

    pub fn get(&self, id: &str) -> Option<&Contig> {
        self.contigs.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.contigs.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.contigs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contigs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Contig> {
        self.contigs.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.contigs.keys().map(String::as_str)
    }

    /// Flag a contig circular. Returns false when the id is unknown.
    pub fn mark_circular(&mut self, id: &str) -> bool {
        match self.contigs.get_mut(id) {
            Some(contig) => {
                contig.circular = true;
                true
            }
            None => false,
        }
    }

    pub fn circular_ids(&self) -> impl Iterator<Item = &str> {
        self.contigs
            .values()
            .filter(|c| c.circular)
            .map(|c| c.id.as_str())
    }
}

/// Read a list of circular contig ids (one per line) as produced by a circularization tool
pub fn read_circular_list<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let reader = open_input(path)?;
    let mut ids = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let id = line.trim();
        if !id.is_empty() && !id.starts_with('#') {
            ids.push(id.to_string());
        }
    }
    Ok(ids)
}
