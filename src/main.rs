use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use std::path::{Path, PathBuf};

use plasmid_recon::contig::{read_circular_list, ContigSet};
use plasmid_recon::filter::{
    FilterThresholds, DEFAULT_MAX_EVALUE, DEFAULT_MAX_QUERY_LENGTH, DEFAULT_MIN_LENGTH,
};
use plasmid_recon::hits::{read_hit_table, HitRecord, RepeatKey, SubjectKey};
use plasmid_recon::mash::{DistanceTable, NearestNeighbor, SketchIndex, DEFAULT_KMER_SIZE, DEFAULT_SKETCH_SIZE};
use plasmid_recon::namer::NamerConfig;
use plasmid_recon::overlap::OverlapLimit;
use plasmid_recon::pipeline::{reconstruct, EvidenceTables, ReconConfig};
use plasmid_recon::report::write_outputs;

/// Parse a number that may have metric suffix (k/K=1000, m/M=1e6, g/G=1e9)
fn parse_metric_number(s: &str) -> Result<u64, String> {
    if s.is_empty() {
        return Err("Empty string".to_string());
    }

    let (num_part, suffix) = match s.chars().last() {
        Some(c) if c.is_ascii_alphabetic() => (&s[..s.len() - c.len_utf8()], Some(c)),
        _ => (s, None),
    };

    let base: f64 = num_part
        .parse()
        .map_err(|e| format!("Invalid number: {e}"))?;

    let multiplier = match suffix {
        Some('k') | Some('K') => 1000.0,
        Some('m') | Some('M') => 1_000_000.0,
        Some('g') | Some('G') => 1_000_000_000.0,
        Some(c) => {
            return Err(format!(
                "Unknown suffix '{c}'. Use k/K (1000), m/M (1e6), or g/G (1e9)"
            ))
        }
        None => 1.0,
    };

    let result = base * multiplier;

    if result < 0.0 {
        return Err(format!("Value {result} must not be negative"));
    }
    if result > u64::MAX as f64 {
        return Err(format!("Value {result} too large for u64"));
    }

    Ok(result as u64)
}

/// Parse a percentage in [0, 100]
fn parse_percent(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("Invalid number: {e}"))?;
    if !(0.0..=100.0).contains(&value) {
        return Err(format!("Value {value} must be between 0 and 100"));
    }
    Ok(value)
}

/// Parse a fraction in [0, 1]
fn parse_fraction(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("Invalid number: {e}"))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("Value {value} must be between 0 and 1"));
    }
    Ok(value)
}

/// plasmid-recon - Plasmid reconstruction from draft assemblies
///
/// Groups contigs into plasmids using replicon, relaxase, reference plasmid and
/// repetitive element hit tables, and attributes the rest to the chromosome
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
#[clap(group(ArgGroup::new("distance").required(true).args(&["plasmid_db", "mash_table"])))]
struct Args {
    /// Assembly contigs (FASTA, optionally bgzipped)
    #[clap(short = 'i', long = "infile")]
    infile: PathBuf,

    /// Output directory for reports and FASTA files
    #[clap(short = 'o', long = "outdir")]
    outdir: PathBuf,

    /// Hits of contigs against the reference plasmid collection
    #[clap(long = "plasmid-hits")]
    plasmid_hits: PathBuf,

    /// Hits of contigs against the replicon marker database
    #[clap(long = "replicon-hits")]
    replicon_hits: Option<PathBuf>,

    /// Hits of contigs against the relaxase marker database
    #[clap(long = "relaxase-hits")]
    relaxase_hits: Option<PathBuf>,

    /// Hits of contigs against the repetitive element database
    #[clap(long = "repetitive-hits")]
    repetitive_hits: Option<PathBuf>,

    /// Reference plasmid FASTA (ids `<accession>|<cluster>`), sketched for nearest-neighbour naming
    #[clap(long = "plasmid-db")]
    plasmid_db: Option<PathBuf>,

    /// Precomputed distances: contig id, reference id, distance
    #[clap(long = "mash-table", conflicts_with = "plasmid_db")]
    mash_table: Option<PathBuf>,

    /// Minimum identity for reference plasmid hits
    #[clap(long = "min-plasmid-ident", default_value = "80", value_parser = parse_percent)]
    min_plasmid_ident: f64,

    /// Minimum query coverage for reference plasmid hits
    #[clap(long = "min-plasmid-cov", default_value = "65", value_parser = parse_percent)]
    min_plasmid_cov: f64,

    /// Minimum identity for replicon hits
    #[clap(long = "min-rep-ident", default_value = "80", value_parser = parse_percent)]
    min_rep_ident: f64,

    /// Minimum marker coverage for replicon hits
    #[clap(long = "min-rep-cov", default_value = "80", value_parser = parse_percent)]
    min_rep_cov: f64,

    /// Minimum identity for relaxase hits
    #[clap(long = "min-mob-ident", default_value = "80", value_parser = parse_percent)]
    min_mob_ident: f64,

    /// Minimum marker coverage for relaxase hits
    #[clap(long = "min-mob-cov", default_value = "80", value_parser = parse_percent)]
    min_mob_cov: f64,

    /// Minimum identity for repetitive element hits
    #[clap(long = "min-rpp-ident", default_value = "80", value_parser = parse_percent)]
    min_rpp_ident: f64,

    /// Minimum query coverage for repetitive element hits
    #[clap(long = "min-rpp-cov", default_value = "80", value_parser = parse_percent)]
    min_rpp_cov: f64,

    /// Maximum e-value for all hits
    #[clap(long = "max-evalue", default_value_t = DEFAULT_MAX_EVALUE)]
    max_evalue: f64,

    /// Minimum contig and alignment length for reference plasmid hits
    #[clap(long = "min-length", default_value_t = DEFAULT_MIN_LENGTH, value_parser = parse_metric_number)]
    min_length: u64,

    /// Contigs longer than this are never matched to reference plasmids
    #[clap(long = "max-query-length", default_value_t = DEFAULT_MAX_QUERY_LENGTH, value_parser = parse_metric_number)]
    max_query_length: u64,

    /// Overlap (bases) tolerated between hits on the same reference
    #[clap(long = "min-overlap", default_value = "10", value_parser = parse_metric_number)]
    min_overlap: u64,

    /// Measure tolerated overlap as a fraction of the shorter hit instead
    #[clap(long = "overlap-fraction", value_parser = parse_fraction)]
    overlap_fraction: Option<f64>,

    /// Distance below which a cluster takes its nearest reference's name
    #[clap(long = "max-mash-distance", default_value = "0.05", value_parser = parse_fraction)]
    max_mash_distance: f64,

    /// Contigs come from Unicycler; headers with `circular=true` mark circular contigs
    #[clap(short = 'u', long = "unicycler-contigs")]
    unicycler_contigs: bool,

    /// File listing circular contig ids, one per line
    #[clap(long = "circular")]
    circular: Option<PathBuf>,

    /// K-mer size for reference sketches
    #[clap(long = "kmer-size", default_value_t = DEFAULT_KMER_SIZE)]
    kmer_size: usize,

    /// Number of minimizers per sketch
    #[clap(long = "sketch-size", default_value_t = DEFAULT_SKETCH_SIZE)]
    sketch_size: usize,

    /// Sample name written to the first report column (defaults to the input file name)
    #[clap(long = "file-id")]
    file_id: Option<String>,

    /// Quiet mode (warnings and errors only)
    #[clap(long = "quiet", conflicts_with = "debug")]
    quiet: bool,

    /// Log every clustering decision
    #[clap(long = "debug")]
    debug: bool,

    /// Number of threads for parallel processing
    #[clap(short = 't', long = "threads", default_value = "1")]
    threads: usize,
}

impl Args {
    fn config(&self) -> ReconConfig {
        let defaults = ReconConfig::default();
        let overlap = match self.overlap_fraction {
            Some(fraction) => OverlapLimit::Fraction(fraction),
            None => OverlapLimit::Bases(self.min_overlap),
        };

        ReconConfig {
            reference: FilterThresholds {
                min_identity: self.min_plasmid_ident,
                min_coverage: self.min_plasmid_cov,
                max_evalue: self.max_evalue,
                min_length: self.min_length,
                max_query_length: self.max_query_length,
                ..defaults.reference
            },
            replicon: FilterThresholds {
                min_identity: self.min_rep_ident,
                min_coverage: self.min_rep_cov,
                max_evalue: self.max_evalue,
                ..defaults.replicon
            },
            relaxase: FilterThresholds {
                min_identity: self.min_mob_ident,
                min_coverage: self.min_mob_cov,
                max_evalue: self.max_evalue,
                ..defaults.relaxase
            },
            repetitive: FilterThresholds {
                min_identity: self.min_rpp_ident,
                min_coverage: self.min_rpp_cov,
                max_evalue: self.max_evalue,
                ..defaults.repetitive
            },
            overlap,
            classifier: defaults.classifier,
            namer: NamerConfig {
                max_distance: self.max_mash_distance,
            },
        }
    }

    fn file_id(&self) -> String {
        self.file_id.clone().unwrap_or_else(|| {
            self.infile
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
    }
}

fn init_logging(args: &Args) {
    let level = if args.quiet {
        "warn"
    } else if args.debug {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn load_table(path: Option<&Path>, label: &str) -> Result<Vec<HitRecord<SubjectKey>>> {
    match path {
        Some(path) => read_hit_table(path)
            .with_context(|| format!("Failed to read {label} hits from {}", path.display())),
        None => {
            log::warn!("No {label} hit table given, continuing without {label} evidence");
            Ok(Vec::new())
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    // Set up rayon thread pool
    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()?;

    let mut contigs = ContigSet::from_fasta(&args.infile, args.unicycler_contigs)
        .with_context(|| format!("Failed to read contigs from {}", args.infile.display()))?;
    if contigs.is_empty() {
        anyhow::bail!("No contigs found in {}", args.infile.display());
    }

    if let Some(ref path) = args.circular {
        let ids = read_circular_list(path)
            .with_context(|| format!("Failed to read circular contig list {}", path.display()))?;
        for id in &ids {
            if !contigs.mark_circular(id) {
                log::warn!("Circular contig '{id}' is not in the assembly");
            }
        }
    }
    log::info!(
        "Loaded {} contig(s), {} circular",
        contigs.len(),
        contigs.circular_ids().count()
    );

    let tables = EvidenceTables {
        reference: load_table(Some(args.plasmid_hits.as_path()), "reference plasmid")?,
        replicon: load_table(args.replicon_hits.as_deref(), "replicon")?,
        relaxase: load_table(args.relaxase_hits.as_deref(), "relaxase")?,
        repetitive: match args.repetitive_hits {
            Some(ref path) => read_hit_table::<RepeatKey, _>(path).with_context(|| {
                format!("Failed to read repetitive element hits from {}", path.display())
            })?,
            None => Vec::new(),
        },
    };

    let oracle: Box<dyn NearestNeighbor> = match (&args.plasmid_db, &args.mash_table) {
        (_, Some(table)) => Box::new(
            DistanceTable::from_path(table)
                .with_context(|| format!("Failed to read distance table {}", table.display()))?,
        ),
        (Some(db), None) => Box::new(
            SketchIndex::from_fasta(db, args.kmer_size, args.sketch_size)
                .with_context(|| format!("Failed to sketch reference plasmids from {}", db.display()))?,
        ),
        (None, None) => anyhow::bail!("Either --plasmid-db or --mash-table is required"),
    };

    let config = args.config();
    let recon = reconstruct(&contigs, &tables, oracle.as_ref(), &config)?;

    std::fs::create_dir_all(&args.outdir)
        .with_context(|| format!("Failed to create output directory {}", args.outdir.display()))?;
    write_outputs(&args.outdir, &args.file_id(), &recon, &contigs)
        .with_context(|| format!("Failed to write results to {}", args.outdir.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metric_number() {
        assert_eq!(parse_metric_number("1000"), Ok(1000));
        assert_eq!(parse_metric_number("1k"), Ok(1000));
        assert_eq!(parse_metric_number("400K"), Ok(400_000));
        assert_eq!(parse_metric_number("1.5m"), Ok(1_500_000));
        assert!(parse_metric_number("").is_err());
        assert!(parse_metric_number("10x").is_err());
        assert!(parse_metric_number("-5").is_err());
    }

    #[test]
    fn test_parse_percent_bounds() {
        assert_eq!(parse_percent("65"), Ok(65.0));
        assert!(parse_percent("101").is_err());
    }

    #[test]
    fn test_args_map_onto_config() {
        let args = Args::parse_from([
            "plasmid-recon",
            "-i",
            "contigs.fasta",
            "-o",
            "out",
            "--plasmid-hits",
            "plasmids.tsv",
            "--mash-table",
            "dist.tsv",
            "--overlap-fraction",
            "0.5",
        ]);
        let config = args.config();
        assert_eq!(config.overlap, OverlapLimit::Fraction(0.5));
        assert_eq!(config.reference.min_coverage, 65.0);
        assert_eq!(config.replicon.min_coverage, 80.0);
        assert_eq!(config.namer.max_distance, 0.05);
        assert_eq!(args.file_id(), "contigs.fasta");
    }
}
