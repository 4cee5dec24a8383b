/// Performance benchmarks for overlap resolution, aggregation and sketching
///
/// Run with: cargo bench
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use indexmap::IndexMap;
use plasmid_recon::aggregate::aggregate;
use plasmid_recon::contig::{Contig, ContigSet};
use plasmid_recon::evidence::EvidenceSet;
use plasmid_recon::hits::{HitRecord, SubjectKey};
use plasmid_recon::mash::KmerSketch;
use plasmid_recon::overlap::{resolve_overlaps, OverlapLimit};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Synthetic reference hits: contigs spread over a few hundred reference plasmids
fn generate_hits(num_hits: usize, num_contigs: usize) -> Vec<HitRecord> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..num_hits)
        .map(|_| {
            let contig = rng.gen_range(0..num_contigs);
            let reference = rng.gen_range(0..300);
            let start = rng.gen_range(1..150_000u64);
            let span = rng.gen_range(500..20_000u64);
            HitRecord {
                query_id: format!("ctg{contig}"),
                subject: SubjectKey::new(format!("CP{reference:06}"), format!("AA{:03}", reference / 3)),
                identity: 99.0,
                length: span,
                query_len: 50_000,
                subject_len: 200_000,
                query_coverage: 90.0,
                evalue: 0.0,
                bitscore: rng.gen_range(500.0..40_000.0),
                subject_start: start,
                subject_end: start + span,
                query_start: None,
                query_end: None,
            }
        })
        .collect()
}

fn generate_contigs(num_contigs: usize) -> ContigSet {
    let mut contigs = ContigSet::new();
    for i in 0..num_contigs {
        contigs.insert(Contig::new(format!("ctg{i}"), vec![b'A'; 50_000]));
    }
    contigs
}

/// Benchmark: overlap resolution over increasingly large hit tables
fn bench_overlap_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("overlap_resolution");

    for size in [1_000, 10_000, 100_000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.sample_size(10);

        let hits = generate_hits(*size, 500);
        group.bench_with_input(BenchmarkId::from_parameter(size), &hits, |b, hits| {
            b.iter(|| resolve_overlaps(black_box(hits), OverlapLimit::default()));
        });
    }

    group.finish();
}

/// Benchmark: greedy cluster aggregation
fn bench_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation");
    let contigs = generate_contigs(500);
    let evidence = EvidenceSet::build(&contigs, &[], &[], IndexMap::new());

    for size in [1_000, 10_000, 100_000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.sample_size(10);

        let hits = generate_hits(*size, 500);
        group.bench_with_input(BenchmarkId::from_parameter(size), &hits, |b, hits| {
            b.iter(|| aggregate(black_box(hits), &evidence, &contigs).unwrap());
        });
    }

    group.finish();
}

/// Benchmark: MinHash sketch construction
fn bench_sketching(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let sequence: Vec<u8> = (0..200_000)
        .map(|_| b"ACGT"[rng.gen_range(0..4)])
        .collect();

    c.bench_function("sketch_200kb", |b| {
        b.iter(|| KmerSketch::from_sequence(black_box(&sequence), 21, 1000));
    });
}

criterion_group!(benches, bench_overlap_resolution, bench_aggregation, bench_sketching);
criterion_main!(benches);
