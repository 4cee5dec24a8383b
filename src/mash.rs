//! Mash distance to a reference plasmid collection
//!
//! `KmerSketch` is a MinHash sketch over canonical k-mers. A cluster is sketched as one
//! unit (all member contigs together), the way `mash dist` treats a multi-FASTA query.
//! The namer only sees the `NearestNeighbor` trait, so precomputed distance tables and
//! the built-in sketch index are interchangeable.

use crate::contig::Contig;
use crate::error::{ReconError, Result};
use crate::hits::{Subject, SubjectKey};
use crate::seqio::{open_input, read_fasta};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::io::BufRead;
use std::path::Path;

/// Default k-mer size for mash distance computation
pub const DEFAULT_KMER_SIZE: usize = 21;

/// Default sketch size (number of minimizers to keep)
pub const DEFAULT_SKETCH_SIZE: usize = 1000;

/// A k-mer sketch using MinHash
#[derive(Debug, Clone)]
pub struct KmerSketch {
    /// Smallest distinct hash values, ascending
    pub minimizers: Vec<u64>,
    pub k: usize,
    /// Total length of the sketched sequences
    pub length: usize,
}

impl KmerSketch {
    pub fn from_sequence(sequence: &[u8], k: usize, sketch_size: usize) -> Self {
        Self::from_sequences([sequence], k, sketch_size)
    }

    /// Sketch several sequences as one genome
    pub fn from_sequences<'a, I>(sequences: I, k: usize, sketch_size: usize) -> Self
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut hashes = Vec::new();
        let mut length = 0;
        for sequence in sequences {
            length += sequence.len();
            collect_kmer_hashes(sequence, k, &mut hashes);
        }

        // Sort and take the smallest hashes (MinHash)
        hashes.sort_unstable();
        hashes.dedup();
        hashes.truncate(sketch_size);

        Self {
            minimizers: hashes,
            k,
            length,
        }
    }

    /// Compute Jaccard index with another sketch
    pub fn jaccard(&self, other: &KmerSketch) -> f64 {
        if self.k != other.k {
            return 0.0;
        }

        let set1: HashSet<_> = self.minimizers.iter().collect();
        let set2: HashSet<_> = other.minimizers.iter().collect();

        let intersection_size = set1.intersection(&set2).count();
        let union_size = set1.union(&set2).count();

        if union_size == 0 {
            0.0
        } else {
            intersection_size as f64 / union_size as f64
        }
    }

    /// Mash distance: -1/k * ln(2J / (1 + J)), 1.0 when nothing is shared
    pub fn mash_distance(&self, other: &KmerSketch) -> f64 {
        let jaccard = self.jaccard(other);
        if jaccard <= 0.0 {
            return 1.0;
        }
        if jaccard >= 1.0 {
            return 0.0;
        }
        let k = self.k as f64;
        let ratio = (2.0 * jaccard) / (1.0 + jaccard);
        ((-1.0 / k) * ratio.ln()).max(0.0)
    }
}

fn collect_kmer_hashes(sequence: &[u8], k: usize, hashes: &mut Vec<u64>) {
    if k == 0 || sequence.len() < k {
        return;
    }

    for kmer in sequence.windows(k) {
        // Skip k-mers containing non-ACGT characters
        if kmer.iter().any(|&b| !is_dna_base(b)) {
            continue;
        }

        let hash_fwd = hash_kmer(kmer);
        let hash_rev = hash_kmer(&reverse_complement_kmer(kmer));
        hashes.push(hash_fwd.min(hash_rev));
    }
}

fn hash_kmer(kmer: &[u8]) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    for base in kmer {
        base.to_ascii_uppercase().hash(&mut hasher);
    }
    hasher.finish()
}

fn is_dna_base(b: u8) -> bool {
    matches!(b.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T')
}

fn reverse_complement_kmer(kmer: &[u8]) -> Vec<u8> {
    kmer.iter()
        .rev()
        .map(|&b| match b.to_ascii_uppercase() {
            b'A' => b'T',
            b'T' => b'A',
            b'C' => b'G',
            b'G' => b'C',
            other => other,
        })
        .collect()
}

/// Nearest reference plasmid of a cluster
#[derive(Debug, Clone, PartialEq)]
pub struct MashHit {
    pub reference: SubjectKey,
    pub distance: f64,
}

/// Genomic-distance lookup against a reference collection
pub trait NearestNeighbor {
    /// Nearest reference for the given contigs taken together, `None` when nothing is comparable
    fn nearest(&self, members: &[&Contig]) -> Result<Option<MashHit>>;
}

/// Pick the smallest distance; the first candidate wins ties
fn closest<I: IntoIterator<Item = MashHit>>(candidates: I) -> Option<MashHit> {
    candidates.into_iter().fold(None, |best, hit| match best {
        Some(current) if current.distance <= hit.distance => Some(current),
        _ => Some(hit),
    })
}

/// In-memory MinHash index over reference plasmids whose FASTA ids are `<accession>|<cluster>`
pub struct SketchIndex {
    references: Vec<(SubjectKey, KmerSketch)>,
    k: usize,
    sketch_size: usize,
}

impl SketchIndex {
    pub fn new(references: Vec<(SubjectKey, Vec<u8>)>, k: usize, sketch_size: usize) -> Self {
        use rayon::prelude::*;

        let references = references
            .into_par_iter()
            .map(|(key, sequence)| {
                let sketch = KmerSketch::from_sequence(&sequence, k, sketch_size);
                (key, sketch)
            })
            .collect();

        Self {
            references,
            k,
            sketch_size,
        }
    }

    pub fn from_fasta<P: AsRef<Path>>(path: P, k: usize, sketch_size: usize) -> Result<Self> {
        let mut references = Vec::new();
        for record in read_fasta(path)? {
            let key = SubjectKey::parse(&record.id).map_err(|reason| ReconError::MalformedRecord {
                line: record.line,
                reason,
            })?;
            references.push((key, record.sequence));
        }
        log::info!("Sketching {} reference plasmid(s)", references.len());
        Ok(Self::new(references, k, sketch_size))
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

impl NearestNeighbor for SketchIndex {
    fn nearest(&self, members: &[&Contig]) -> Result<Option<MashHit>> {
        let query = KmerSketch::from_sequences(
            members.iter().map(|contig| contig.sequence.as_slice()),
            self.k,
            self.sketch_size,
        );
        if query.minimizers.is_empty() {
            return Ok(None);
        }

        Ok(closest(self.references.iter().map(|(key, sketch)| MashHit {
            reference: key.clone(),
            distance: query.mash_distance(sketch),
        })))
    }
}

/// Precomputed distances: `contig_id <tab> reference_id <tab> distance` per line
#[derive(Debug, Clone, Default)]
pub struct DistanceTable {
    rows: IndexMap<String, Vec<MashHit>>,
}

impl DistanceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, contig_id: impl Into<String>, hit: MashHit) {
        self.rows.entry(contig_id.into()).or_default().push(hit);
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut table = DistanceTable::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let malformed = |reason: String| ReconError::MalformedRecord {
                line: idx + 1,
                reason,
            };

            let fields: Vec<&str> = trimmed.split('\t').collect();
            if fields.len() < 3 {
                return Err(malformed(format!(
                    "expected 3 tab-separated fields, found {}",
                    fields.len()
                )));
            }
            let reference = SubjectKey::parse(fields[1]).map_err(malformed)?;
            let distance: f64 = fields[2]
                .parse()
                .map_err(|_| malformed(format!("invalid distance '{}'", fields[2])))?;
            table.insert(fields[0], MashHit { reference, distance });
        }
        Ok(table)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(open_input(path)?)
    }
}

impl NearestNeighbor for DistanceTable {
    fn nearest(&self, members: &[&Contig]) -> Result<Option<MashHit>> {
        Ok(closest(
            members
                .iter()
                .filter_map(|contig| self.rows.get(&contig.id))
                .flatten()
                .cloned(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kmer_sketch() {
        let seq = b"ATCGATCGATCG";
        let sketch = KmerSketch::from_sequence(seq, 4, 10);
        assert!(!sketch.minimizers.is_empty());
        assert_eq!(sketch.k, 4);
        assert_eq!(sketch.length, seq.len());
    }

    #[test]
    fn test_mash_distance_identical() {
        let seq = b"ATCGATCGGATTACAGATTACACCGT";
        let sketch1 = KmerSketch::from_sequence(seq, 5, 100);
        let sketch2 = KmerSketch::from_sequence(seq, 5, 100);
        assert!(sketch1.mash_distance(&sketch2) < 1e-10);
    }

    #[test]
    fn test_reverse_complement_is_same_sketch() {
        let seq = b"ATCGGATTACAGGCATTACG";
        let rc = reverse_complement_kmer(seq);
        let a = KmerSketch::from_sequence(seq, 6, 100);
        let b = KmerSketch::from_sequence(&rc, 6, 100);
        assert_eq!(a.minimizers, b.minimizers);
    }

    #[test]
    fn test_disjoint_sequences_max_distance() {
        let a = KmerSketch::from_sequence(b"AAAAAAAAAAAA", 4, 10);
        let b = KmerSketch::from_sequence(b"CACACACACACA", 4, 10);
        assert_eq!(a.mash_distance(&b), 1.0);
    }

    #[test]
    fn test_multi_sequence_sketch_covers_all_members() {
        let a: &[u8] = b"ATCGGATTACAGG";
        let b: &[u8] = b"GGCCTTAAGGCAT";
        let joint = KmerSketch::from_sequences([a, b], 5, 1000);
        let only_a = KmerSketch::from_sequence(a, 5, 1000);
        assert!(joint.minimizers.len() > only_a.minimizers.len());
        assert_eq!(joint.length, a.len() + b.len());
    }

    #[test]
    fn test_sketch_with_ns() {
        let seq = b"ATCGNNNNATCG";
        let sketch = KmerSketch::from_sequence(seq, 4, 10);
        assert!(!sketch.minimizers.is_empty());
    }

    #[test]
    fn test_sketch_index_picks_closest_reference() {
        let reference_a = b"ATGCGTACGTTAGCCGATCGATGGCTAGCTAGGATCCGATCGTAGCTAGCTAGGCT".to_vec();
        let reference_b = b"TTTTGGGGCCCCAAAATTTTGGGGCCCCAAAATGTGTGTGCACACACAGTGTGTAC".to_vec();
        let index = SketchIndex::new(
            vec![
                (SubjectKey::new("CP1", "AA001"), reference_a.clone()),
                (SubjectKey::new("CP2", "AA002"), reference_b),
            ],
            9,
            1000,
        );

        let contig = Contig::new("ctg", reference_a);
        let hit = index.nearest(&[&contig]).unwrap().unwrap();
        assert_eq!(hit.reference.tag, "AA001");
        assert!(hit.distance < 1e-10);
    }

    #[test]
    fn test_distance_table_minimum_over_members() {
        let data = "c1\tCP1|AA001\t0.2\nc2\tCP2|AA002\t0.01\nc2\tCP3|AA003\t0.01\n";
        let table = DistanceTable::from_reader(data.as_bytes()).unwrap();
        let c1 = Contig::new("c1", "A");
        let c2 = Contig::new("c2", "A");
        let c3 = Contig::new("c3", "A");

        let hit = table.nearest(&[&c1, &c2]).unwrap().unwrap();
        assert_eq!(hit.reference, SubjectKey::new("CP2", "AA002"));
        assert!(table.nearest(&[&c3]).unwrap().is_none());
    }

    #[test]
    fn test_distance_table_rejects_bad_reference() {
        let err = DistanceTable::from_reader("c1\tCP1\t0.2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ReconError::MalformedRecord { line: 1, .. }));
    }
}
