//! Contig report, repetitive-element report and FASTA output

use crate::contig::ContigSet;
use crate::error::Result;
use crate::evidence::{EvidenceSet, RepeatMatch};
use crate::hits::SubjectKey;
use crate::pipeline::Reconstruction;
use crate::seqio::write_fasta;
use indexmap::IndexSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const CHROMOSOME_CLUSTER: &str = "chromosome";

pub const CONTIG_REPORT_FILE: &str = "contig_report.txt";
pub const REPETITIVE_REPORT_FILE: &str = "repetitive_blast_report.txt";
pub const CHROMOSOME_FASTA: &str = "chromosome.fasta";

pub const CONTIG_REPORT_HEADER: &str = "file_id\tcluster_id\tcontig_id\tcontig_length\tcircularity_status\t\
rep_type(s)\trep_type_accession(s)\trelaxase_type(s)\trelaxase_type_accession(s)\t\
mash_nearest_neighbor\tmash_neighbor_distance\trepetitive_dna_id\tmatch_type\tscore\t\
contig_match_start\tcontig_match_end";

pub const REPETITIVE_REPORT_HEADER: &str =
    "contig_id\tmatch_id\tmatch_type\tscore\tcontig_match_start\tcontig_match_end";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Circularity {
    Circular,
    Incomplete,
}

impl Circularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Circularity::Circular => "Circular",
            Circularity::Incomplete => "Incomplete",
        }
    }
}

/// One row of the contig report
#[derive(Debug, Clone, PartialEq)]
pub struct ContigReportRow {
    pub file_id: String,
    pub cluster_id: String,
    pub contig_id: String,
    pub contig_length: usize,
    pub circularity: Circularity,
    pub rep_types: String,
    pub rep_accessions: String,
    pub relaxase_types: String,
    pub relaxase_accessions: String,
    pub mash_neighbor: String,
    pub mash_distance: String,
    pub repeat: Option<RepeatMatch>,
}

impl ContigReportRow {
    pub fn to_tsv(&self) -> String {
        let repeat = match &self.repeat {
            Some(m) => {
                let (start, end) = m.span_columns();
                format!(
                    "{}\t{}\t{}\t{}\t{}",
                    m.element_id, m.match_type, m.score, start, end
                )
            }
            None => "\t\t\t\t".to_string(),
        };
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.file_id,
            self.cluster_id,
            self.contig_id,
            self.contig_length,
            self.circularity.as_str(),
            self.rep_types,
            self.rep_accessions,
            self.relaxase_types,
            self.relaxase_accessions,
            self.mash_neighbor,
            self.mash_distance,
            repeat
        )
    }
}

/// Comma-joined distinct types and accessions, in first-seen order
fn join_markers(keys: &[SubjectKey]) -> (String, String) {
    let types: IndexSet<&str> = keys.iter().map(|k| k.tag.as_str()).collect();
    let accessions: IndexSet<&str> = keys.iter().map(|k| k.accession.as_str()).collect();
    (
        types.into_iter().collect::<Vec<_>>().join(","),
        accessions.into_iter().collect::<Vec<_>>().join(","),
    )
}

fn circularity(evidence: &EvidenceSet, contig_id: &str) -> Circularity {
    if evidence.is_circular(contig_id) {
        Circularity::Circular
    } else {
        Circularity::Incomplete
    }
}

/// Plasmid rows in naming order, then chromosome rows in assembly order
pub fn build_contig_report(file_id: &str, recon: &Reconstruction, contigs: &ContigSet) -> Vec<ContigReportRow> {
    let evidence = &recon.evidence;
    let mut rows = Vec::with_capacity(contigs.len());

    for group in &recon.naming.groups {
        let (mash_neighbor, mash_distance) = match &group.nearest {
            Some(hit) => (hit.reference.accession.clone(), hit.distance.to_string()),
            None => (String::new(), String::new()),
        };
        for contig_id in &group.contigs {
            let contig_evidence = evidence.get(contig_id);
            let (rep_types, rep_accessions) = join_markers(contig_evidence.replicons);
            let (relaxase_types, relaxase_accessions) = join_markers(contig_evidence.relaxases);
            rows.push(ContigReportRow {
                file_id: file_id.to_string(),
                cluster_id: group.name.clone(),
                contig_id: contig_id.clone(),
                contig_length: contigs.get(contig_id).map_or(0, |c| c.len()),
                circularity: circularity(evidence, contig_id),
                rep_types,
                rep_accessions,
                relaxase_types,
                relaxase_accessions,
                mash_neighbor: mash_neighbor.clone(),
                mash_distance: mash_distance.clone(),
                repeat: contig_evidence.repeat.cloned(),
            });
        }
    }

    for contig_id in &recon.chromosome {
        rows.push(ContigReportRow {
            file_id: file_id.to_string(),
            cluster_id: CHROMOSOME_CLUSTER.to_string(),
            contig_id: contig_id.clone(),
            contig_length: contigs.get(contig_id).map_or(0, |c| c.len()),
            circularity: circularity(evidence, contig_id),
            rep_types: String::new(),
            rep_accessions: String::new(),
            relaxase_types: String::new(),
            relaxase_accessions: String::new(),
            mash_neighbor: String::new(),
            mash_distance: String::new(),
            repeat: evidence.get(contig_id).repeat.cloned(),
        });
    }

    rows
}

pub fn write_contig_report<W: Write>(mut output: W, rows: &[ContigReportRow]) -> Result<()> {
    writeln!(output, "{CONTIG_REPORT_HEADER}")?;
    for row in rows {
        writeln!(output, "{}", row.to_tsv())?;
    }
    output.flush()?;
    Ok(())
}

pub fn write_repetitive_report<W: Write>(mut output: W, evidence: &EvidenceSet) -> Result<()> {
    writeln!(output, "{REPETITIVE_REPORT_HEADER}")?;
    for (contig_id, m) in evidence.repeats() {
        let (start, end) = m.span_columns();
        writeln!(
            output,
            "{}\t{}\t{}\t{}\t{}\t{}",
            contig_id, m.element_id, m.match_type, m.score, start, end
        )?;
    }
    output.flush()?;
    Ok(())
}

pub fn plasmid_fasta_name(name: &str) -> String {
    format!("plasmid_{name}.fasta")
}

/// Write every report and FASTA file into `outdir`; returns the plasmid FASTA paths
pub fn write_outputs(outdir: &Path, file_id: &str, recon: &Reconstruction, contigs: &ContigSet) -> Result<Vec<PathBuf>> {
    let rows = build_contig_report(file_id, recon, contigs);
    write_contig_report(
        BufWriter::new(File::create(outdir.join(CONTIG_REPORT_FILE))?),
        &rows,
    )?;
    write_repetitive_report(
        BufWriter::new(File::create(outdir.join(REPETITIVE_REPORT_FILE))?),
        &recon.evidence,
    )?;

    let mut plasmid_files = Vec::with_capacity(recon.naming.groups.len());
    for group in &recon.naming.groups {
        let path = outdir.join(plasmid_fasta_name(&group.name));
        let records = group
            .contigs
            .iter()
            .filter_map(|id| contigs.get(id))
            .map(|c| (c.id.as_str(), c.sequence.as_slice()));
        write_fasta(BufWriter::new(File::create(&path)?), records)?;
        plasmid_files.push(path);
    }

    let chromosome = recon
        .chromosome
        .iter()
        .filter_map(|id| contigs.get(id))
        .map(|c| (c.id.as_str(), c.sequence.as_slice()));
    write_fasta(
        BufWriter::new(File::create(outdir.join(CHROMOSOME_FASTA))?),
        chromosome,
    )?;

    log::info!(
        "Wrote {} report rows and {} plasmid FASTA file(s) to {}",
        rows.len(),
        plasmid_files.len(),
        outdir.display()
    );
    Ok(plasmid_files)
}
