
use indexmap::IndexMap;
use plasmid_recon::aggregate::aggregate;
use plasmid_recon::circular::split_circular;
use plasmid_recon::classify::{classify, ClassifierConfig, Verdict};
use plasmid_recon::cluster::{ClusterId, ClusterMap};
use plasmid_recon::evidence::{EvidenceSet, RepeatMatch};
use plasmid_recon::mash::DistanceTable;
use plasmid_recon::namer::{name_clusters, NamerConfig};
use plasmid_recon::pipeline::{reconstruct, EvidenceTables, ReconConfig};
use plasmid_recon::report::{build_contig_report, write_contig_report};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use test_utils::{contig_set, marker_hit, mash_hit, reference_hit};

fn single_cluster(tag: &str, members: &[&str]) -> ClusterMap {
    let mut map = ClusterMap::new();
    let id = ClusterId::Reference(tag.to_string());
    map.open(id.clone());
    for member in members {
        map.claim(member, &id, 500.0).unwrap();
    }
    map
}

fn repeat(element: &str) -> RepeatMatch {
    RepeatMatch {
        element_id: element.to_string(),
        match_type: "ISElement".to_string(),
        score: 800.0,
        contig_span: Some((1, 700)),
    }
}

#[test]
fn test_short_cluster_goes_to_chromosome() {
    let contigs = contig_set(&[("c1", 500), ("c2", 800)]);
    let evidence = EvidenceSet::build(&contigs, &[], &[], IndexMap::new());

    let result = classify(
        single_cluster("AA001", &["c1", "c2"]),
        &evidence,
        &contigs,
        &ClassifierConfig::default(),
    )
    .unwrap();

    assert!(result.retained.is_empty());
    assert_eq!(result.discarded.len(), 1);
    assert_eq!(result.discarded[0].verdict, Verdict::TooShort);
    assert_eq!(result.discarded[0].contigs, vec!["c1".to_string(), "c2".to_string()]);
}

#[test]
fn test_long_mostly_repetitive_cluster_retained() {
    let contigs = contig_set(&[("c1", 4000), ("c2", 5000), ("c3", 6000)]);
    let mut repeats = IndexMap::new();
    repeats.insert("c1".to_string(), repeat("IS26"));
    repeats.insert("c2".to_string(), repeat("IS26"));
    let evidence = EvidenceSet::build(&contigs, &[], &[], repeats);

    let result = classify(
        single_cluster("AA001", &["c1", "c2", "c3"]),
        &evidence,
        &contigs,
        &ClassifierConfig::default(),
    )
    .unwrap();

    assert_eq!(result.retained.len(), 1);
    assert!(result.discarded.is_empty());
}

#[test]
fn test_co_assembled_circular_plasmids_split() {
    let mut contigs = contig_set(&[("A", 40_000), ("B", 60_000)]);
    contigs.mark_circular("A");
    contigs.mark_circular("B");
    let replicons = vec![marker_hit("A", "000101", "rep1"), marker_hit("B", "000202", "rep2")];
    let evidence = EvidenceSet::build(&contigs, &replicons, &[], IndexMap::new());

    let map = split_circular(single_cluster("X", &["A", "B"]), &evidence).unwrap();

    assert_eq!(map.len(), 2);
    assert!(map.get(&ClusterId::Reference("X".to_string())).is_none());
    let a = map.cluster_of("A").unwrap();
    let b = map.cluster_of("B").unwrap();
    assert!(matches!(a, ClusterId::Novel(_)));
    assert!(matches!(b, ClusterId::Novel(_)));
    assert_ne!(a, b);
}

#[test]
fn test_close_neighbour_names_cluster() {
    let contigs = contig_set(&[("p1", 70_000)]);
    let mut oracle = DistanceTable::new();
    oracle.insert("p1", mash_hit("CP000001", "IncFII", 0.02));

    let naming = name_clusters(
        single_cluster("AA001", &["p1"]),
        &EvidenceSet::default(),
        &contigs,
        &oracle,
        &NamerConfig::default(),
    )
    .unwrap();

    assert_eq!(naming.groups.len(), 1);
    assert_eq!(naming.groups[0].name, "IncFII");
}

#[test]
fn test_distant_unsupported_cluster_dropped() {
    let contigs = contig_set(&[("p1", 70_000)]);
    let mut oracle = DistanceTable::new();
    oracle.insert("p1", mash_hit("CP000001", "IncFII", 0.3));

    let naming = name_clusters(
        single_cluster("AA001", &["p1"]),
        &EvidenceSet::default(),
        &contigs,
        &oracle,
        &NamerConfig::default(),
    )
    .unwrap();

    assert!(naming.groups.is_empty());
    assert_eq!(naming.dropped.len(), 1);
}

#[test]
fn test_marker_only_contigs_become_novel_in_order() {
    let contigs = contig_set(&[("ref", 30_000), ("rep", 20_000), ("mob", 15_000)]);
    let replicons = vec![marker_hit("rep", "000101", "IncX")];
    let relaxases = vec![marker_hit("mob", "000303", "MOBP")];
    let evidence = EvidenceSet::build(&contigs, &replicons, &relaxases, IndexMap::new());

    let map = aggregate(
        &[reference_hit("ref", "CP1", "AA001", 30_000, 50_000.0)],
        &evidence,
        &contigs,
    )
    .unwrap();

    assert_eq!(map.cluster_of("ref"), Some(&ClusterId::Reference("AA001".to_string())));
    // relaxase contigs are placed before replicon contigs
    assert_eq!(map.cluster_of("mob"), Some(&ClusterId::Novel(0)));
    assert_eq!(map.cluster_of("rep"), Some(&ClusterId::Novel(1)));
}

#[test]
fn test_full_reconstruction_report() {
    let contigs = contig_set(&[("chr", 200_000), ("p1", 40_000), ("p2", 8000)]);
    let tables = EvidenceTables {
        reference: vec![
            reference_hit("p1", "CP1", "AA001", 40_000, 70_000.0),
            reference_hit("p2", "CP2", "AA002", 8000, 14_000.0),
        ],
        replicon: vec![marker_hit("p1", "000101", "IncFII")],
        ..Default::default()
    };
    let mut oracle = DistanceTable::new();
    oracle.insert("p1", mash_hit("CP1", "AA001", 0.01));
    oracle.insert("p2", mash_hit("CP2", "AA002", 0.2));

    let recon = reconstruct(&contigs, &tables, &oracle, &ReconConfig::default()).unwrap();
    let rows = build_contig_report("sample", &recon, &contigs);
    let summary: Vec<(String, String)> = rows
        .iter()
        .map(|row| (row.contig_id.clone(), row.cluster_id.clone()))
        .collect();

    assert_eq!(
        summary,
        vec![
            ("p1".to_string(), "AA001".to_string()),
            ("chr".to_string(), "chromosome".to_string()),
            ("p2".to_string(), "chromosome".to_string()),
        ]
    );
    assert_eq!(rows[0].rep_types, "IncFII");
    assert_eq!(rows[0].mash_neighbor, "CP1");
}

#[derive(Debug, Clone)]
struct Scenario {
    lengths: Vec<usize>,
    reference: Vec<(usize, u8, u32)>,
    replicon: Vec<usize>,
    relaxase: Vec<usize>,
    circular: Vec<usize>,
    distances: Vec<(usize, u8, u8)>,
}

fn scenario() -> impl Strategy<Value = Scenario> {
    (1usize..12).prop_flat_map(|n| {
        (
            prop::collection::vec(500usize..60_000, n),
            prop::collection::vec((0..n, 0u8..4, 100u32..20_000), 0..20),
            prop::collection::vec(0..n, 0..4),
            prop::collection::vec(0..n, 0..4),
            prop::collection::vec(0..n, 0..4),
            prop::collection::vec((0..n, 0u8..4, 0u8..20), 0..12),
        )
            .prop_map(|(lengths, reference, replicon, relaxase, circular, distances)| Scenario {
                lengths,
                reference,
                replicon,
                relaxase,
                circular,
                distances,
            })
    })
}

fn run(scenario: &Scenario) -> (plasmid_recon::contig::ContigSet, plasmid_recon::pipeline::Reconstruction) {
    let ids: Vec<String> = (0..scenario.lengths.len()).map(|i| format!("ctg{i}")).collect();
    let pairs: Vec<(&str, usize)> = ids
        .iter()
        .map(String::as_str)
        .zip(scenario.lengths.iter().copied())
        .collect();
    let mut contigs = contig_set(&pairs);
    for &c in &scenario.circular {
        contigs.mark_circular(&ids[c]);
    }

    let tables = EvidenceTables {
        reference: scenario
            .reference
            .iter()
            .map(|&(c, tag, score)| {
                reference_hit(
                    &ids[c],
                    &format!("CP{c}"),
                    &format!("AA00{tag}"),
                    scenario.lengths[c] as u64,
                    score as f64,
                )
            })
            .collect(),
        replicon: scenario.replicon.iter().map(|&c| marker_hit(&ids[c], "000101", "IncFII")).collect(),
        relaxase: scenario.relaxase.iter().map(|&c| marker_hit(&ids[c], "000303", "MOBF")).collect(),
        repetitive: Vec::new(),
    };

    let mut oracle = DistanceTable::new();
    for &(c, tag, hundredths) in &scenario.distances {
        oracle.insert(
            ids[c].clone(),
            mash_hit(&format!("CP{c}"), &format!("AA00{tag}"), hundredths as f64 / 100.0),
        );
    }

    let recon = reconstruct(&contigs, &tables, &oracle, &ReconConfig::default()).unwrap();
    (contigs, recon)
}

/// Property: every contig ends up in exactly one plasmid group or in the chromosome
#[test]
fn prop_contigs_are_partitioned() {
    proptest!(|(s in scenario())| {
        let (contigs, recon) = run(&s);
        for id in contigs.ids() {
            let in_groups = recon
                .plasmids()
                .iter()
                .filter(|g| g.contigs.iter().any(|c| c == id))
                .count();
            let in_chromosome = recon.chromosome.iter().filter(|c| *c == id).count();
            prop_assert_eq!(in_groups + in_chromosome, 1, "contig {} placed {} times", id, in_groups + in_chromosome);
        }
    });
}

/// Property: identical inputs give a byte-identical report
#[test]
fn prop_report_is_deterministic() {
    proptest!(|(s in scenario())| {
        let render = |s: &Scenario| {
            let (contigs, recon) = run(s);
            let mut out = Vec::new();
            write_contig_report(&mut out, &build_contig_report("sample", &recon, &contigs)).unwrap();
            out
        };
        prop_assert_eq!(render(&s), render(&s));
    });
}

/// Property: synthetic cluster numbers are never reused
#[test]
fn prop_novel_ids_unique() {
    proptest!(|(s in scenario())| {
        let (_, recon) = run(&s);
        let mut seen = std::collections::HashSet::new();
        for group in recon.plasmids() {
            for source in &group.sources {
                if let ClusterId::Novel(k) = source {
                    prop_assert!(seen.insert(*k), "Novel_{} used twice", k);
                }
            }
        }
        for discarded in &recon.discarded {
            if let ClusterId::Novel(k) = discarded.id {
                prop_assert!(seen.insert(k), "Novel_{} used twice", k);
            }
        }
    });
}
