//! End-to-end mining on small inline datasets.

use std::collections::BTreeSet;

use csv::Reader;

use fragment_miner::{
    canonize::CodeWord,
    config::{ExtensionKinds, MinerConfig, PerfectPruning, RingMode, SupportKind, SupportType, Threshold},
    graph::Graph,
    miner::{CsvSink, Found, Miner, VecSink},
    smiles::{Notation, Smiles},
};

const ACYCLIC: [&str; 8] = [
    "CCO",
    "CCO",
    "CC(=O)O",
    "CCN(CC)CC",
    "OCCO",
    "CC(C)CO",
    "NCC(=O)O",
    "CCOC(=O)C",
];

const RINGS: [&str; 5] = ["C1CCCCC1O", "C1CCCCC1N", "OC1CCCC1", "C1CCCCC1", "NC1CCCCC1O"];

fn config(min: usize) -> MinerConfig {
    MinerConfig {
        min_support: Threshold::Absolute(min),
        max_support: Threshold::Relative(1.0),
        ..Default::default()
    }
}

fn rings(mode: RingMode) -> MinerConfig {
    MinerConfig {
        min_ring: 3,
        max_ring: 6,
        extensions: ExtensionKinds {
            ring: mode,
            chains: false,
        },
        ..config(2)
    }
}

fn mine(config: MinerConfig, data: &[&str]) -> Vec<Found> {
    let mut miner = Miner::new(config).unwrap();
    for (i, smiles) in data.iter().enumerate() {
        miner.add_graph(format!("m{i}"), 1.0, Smiles.parse(smiles).unwrap());
    }
    let mut sink = VecSink::default();
    miner.run(&mut sink).unwrap();
    sink.found
}

/// Reported fragments keyed by canonical code word, so that runs whose
/// search numbers fragments differently can be compared.
fn keyed(found: &[Found]) -> BTreeSet<(CodeWord, [usize; 2])> {
    found
        .iter()
        .map(|f| (parse(&f.description).canonical_word(None), f.support))
        .collect()
}

fn parse(description: &str) -> Graph {
    Smiles.parse(description).unwrap()
}

#[test]
fn ethanol_against_ethylamine() {
    let config = MinerConfig {
        min_support: Threshold::Absolute(1),
        max_support: Threshold::Absolute(1),
        threshold: 0.5,
        ..Default::default()
    };
    let mut miner = Miner::new(config).unwrap();
    miner.add_graph("A", 1.0, Smiles.parse("CCO").unwrap());
    miner.add_graph("B", 0.0, Smiles.parse("CCN").unwrap());

    // Write the report as CSV.
    let mut out = Vec::new();
    {
        let mut sink = CsvSink::new(&mut out).unwrap();
        miner.run(&mut sink).unwrap();
        sink.flush().unwrap();
    }

    // Read it back.
    let mut reader = Reader::from_reader(out.as_slice());
    let records: Vec<Vec<String>> = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();
    let ethyl = records.iter().find(|r| r[1] == "CC").unwrap();
    assert_eq!((ethyl[4].as_str(), ethyl[6].as_str()), ("1", "1"));
    for record in &records {
        if record[2] == "3" {
            assert_eq!(record[6], "0", "{} occurs in both groups", record[1]);
        }
    }
    assert!(records.iter().all(|r| r[1] != "CCN" && r[1] != "NCC"));
}

#[test]
fn packing_is_transparent() {
    let plain = mine(config(2), &ACYCLIC);
    assert!(!plain.is_empty());
    for cap in [1, 2] {
        let packed = mine(
            MinerConfig {
                max_embs: cap,
                ..config(2)
            },
            &ACYCLIC,
        );
        assert_eq!(plain, packed, "cap {cap}");
    }

    let all = MinerConfig {
        closed_only: false,
        perfect_pruning: PerfectPruning::None,
        ..config(2)
    };
    let plain = mine(all.clone(), &ACYCLIC);
    let packed = mine(MinerConfig { max_embs: 1, ..all }, &ACYCLIC);
    assert_eq!(plain, packed);
}

#[test]
fn merging_runs_before_packing() {
    let plain = mine(rings(RingMode::Merge), &RINGS);
    let packed = mine(
        MinerConfig {
            max_embs: 1,
            ..rings(RingMode::Merge)
        },
        &RINGS,
    );
    assert_eq!(plain, packed);
    // the six-ring itself is found, with the whole ring in every graph
    assert!(plain.iter().any(|f| f.nodes == 6 && f.edges == 6 && f.support == [4, 0]));
}

#[test]
fn excluded_hydrogens_match_stripped_input() {
    let explicit = [
        "[H]OC([H])([H])C([H])([H])[H]",
        "[H]N([H])C([H])([H])C(=O)O[H]",
        "[H]C([H])([H])C([H])([H])N([H])[H]",
    ];
    let stripped = ["OCC", "NCC(=O)O", "CCN"];
    let a = mine(config(2), &explicit);
    let b = mine(config(2), &stripped);
    assert!(!a.is_empty());
    assert_eq!(a, b);
}

#[test]
fn closed_fragments_have_no_equal_support_extension() {
    let all = mine(
        MinerConfig {
            closed_only: false,
            perfect_pruning: PerfectPruning::None,
            ..config(2)
        },
        &ACYCLIC,
    );
    let closed = mine(config(2), &ACYCLIC);

    // A fragment is closed if no frequent fragment with one more edge
    // contains it with the same support.
    let graphs: Vec<Graph> = all.iter().map(|f| parse(&f.description)).collect();
    let expected: Vec<&Found> = all
        .iter()
        .zip(&graphs)
        .filter(|(f, g)| {
            !all.iter().zip(&graphs).any(|(h, super_graph)| {
                h.edges == g.edge_count() + 1
                    && h.nodes <= g.node_count() + 1
                    && h.support == f.support
                    && super_graph.contains(g)
            })
        })
        .map(|(f, _)| f)
        .collect();
    let expected: BTreeSet<_> = expected
        .iter()
        .map(|f| (parse(&f.description).canonical_word(None), f.support))
        .collect();
    assert_eq!(keyed(&closed), expected);

    // Known pair: ethyl is closed, the lone oxygen is not.
    let small = mine(config(2), &["CCO", "CCO", "CC"]);
    let small = keyed(&small);
    assert!(small.contains(&(parse("CC").canonical_word(None), [3, 0])));
    assert!(small.contains(&(parse("OCC").canonical_word(None), [2, 0])));
    assert!(!small.iter().any(|(word, _)| *word == parse("O").canonical_word(None)));
}

#[test]
fn support_never_grows() {
    let kinds = [
        SupportKind::Graphs,
        SupportKind::MinImage,
        SupportKind::MisOverlap,
        SupportKind::MisHarmful,
    ];
    for data in [&ACYCLIC[..], &["C=NN=C", "CN=NC=O"][..]] {
        for kind in kinds {
            let found = mine(
                MinerConfig {
                    closed_only: false,
                    perfect_pruning: PerfectPruning::None,
                    support: SupportType { kind, exact: true },
                    ..config(1)
                },
                data,
            );
            let graphs: Vec<Graph> = found.iter().map(|f| parse(&f.description)).collect();
            for (a, ga) in found.iter().zip(&graphs) {
                for (b, gb) in found.iter().zip(&graphs) {
                    if b.edges == a.edges + 1 && gb.contains(ga) {
                        assert!(
                            b.support[0] <= a.support[0],
                            "{kind:?}: {} ({:?}) extends {} ({:?})",
                            b.description,
                            b.support,
                            a.description,
                            a.support
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn harmful_overlap_in_symmetric_host() {
    let support = SupportType {
        kind: SupportKind::MisHarmful,
        exact: true,
    };
    let all = MinerConfig {
        closed_only: false,
        perfect_pruning: PerfectPruning::None,
        support,
        ..config(1)
    };
    let canonical = keyed(&mine(all.clone(), &["C=NN=C"]));
    let repository = keyed(&mine(
        MinerConfig {
            canonic_pruning: false,
            ..all
        },
        &["C=NN=C"],
    ));
    assert_eq!(canonical, repository);
    // N-N and C=N-N are found once each, as are their mirror images
    assert!(canonical.contains(&(parse("NN").canonical_word(None), [1, 0])));
    assert!(canonical.contains(&(parse("C=NN").canonical_word(None), [1, 0])));
}

#[test]
fn pruning_strategies_agree() {
    let reference = keyed(&mine(
        MinerConfig {
            perfect_pruning: PerfectPruning::None,
            ..config(2)
        },
        &ACYCLIC,
    ));
    assert!(!reference.is_empty());

    let variants = [
        MinerConfig {
            perfect_pruning: PerfectPruning::Partial,
            ..config(2)
        },
        MinerConfig {
            perfect_pruning: PerfectPruning::Full,
            ..config(2)
        },
        MinerConfig {
            canonic_pruning: false,
            perfect_pruning: PerfectPruning::None,
            ..config(2)
        },
        MinerConfig {
            equiv_pruning: true,
            ..config(2)
        },
        MinerConfig {
            unembed_siblings: true,
            ..config(2)
        },
    ];
    for variant in variants {
        let label = format!("{:?}", variant.perfect_pruning);
        assert_eq!(keyed(&mine(variant, &ACYCLIC)), reference, "{label}");
    }
}

#[test]
fn ring_modes_agree_on_closed_rings() {
    let merge = keyed(&mine(rings(RingMode::Merge), &RINGS));
    let filter = keyed(&mine(rings(RingMode::Filter), &RINGS));
    assert!(!merge.is_empty());
    assert_eq!(merge, filter);
}

#[test]
fn size_limits() {
    let found = mine(
        MinerConfig {
            closed_only: false,
            min_size: 2,
            max_size: 3,
            ..config(2)
        },
        &ACYCLIC,
    );
    assert!(!found.is_empty());
    assert!(found.iter().all(|f| (2..=3).contains(&f.nodes)));
}

fn chains(config: MinerConfig) -> MinerConfig {
    MinerConfig {
        extensions: ExtensionKinds {
            ring: RingMode::None,
            chains: true,
        },
        closed_only: false,
        ..config
    }
}

#[test]
fn variable_chains() {
    // carbon is the most frequent type, so chains start from the N seed
    let data = ["NCO", "NCCO", "NCCCO", "CC"];
    let expected: BTreeSet<_> = [
        ("N", [3, 0]),
        ("O", [3, 0]),
        ("C", [4, 0]),
        ("NC", [3, 0]),
        ("CO", [3, 0]),
        ("CC", [3, 0]),
        ("NCC", [2, 0]),
        ("CCO", [2, 0]),
        ("N*O", [3, 0]),
    ]
    .into_iter()
    .map(|(smiles, support)| (parse(smiles).canonical_word(None), support))
    .collect();

    let variants = [
        chains(config(2)),
        chains(MinerConfig {
            canonic_pruning: false,
            ..config(2)
        }),
        chains(MinerConfig {
            perfect_pruning: PerfectPruning::None,
            ..config(2)
        }),
        chains(MinerConfig {
            max_embs: 1,
            ..config(2)
        }),
    ];
    for variant in variants {
        let label = format!("{variant:?}");
        assert_eq!(keyed(&mine(variant, &data)), expected, "{label}");
    }
}

#[test]
fn chains_must_vary_in_length() {
    // lengths 2 and 3 only: no chain of length 1
    let found = mine(chains(config(2)), &["NCCO", "NCCCO"]);
    assert!(!found.is_empty());
    assert!(found.iter().all(|f| !f.description.contains('*')));

    // The same chains, reached from either end: from the N seed, or from
    // the O seed when N is no seed.
    let data = ["NCO", "NCCO", "OCCCN", "CC"];
    let with_chains = |found: Vec<Found>| {
        let found: Vec<Found> = found
            .into_iter()
            .filter(|f| f.description.contains('*'))
            .collect();
        keyed(&found)
    };
    let a = with_chains(mine(chains(config(2)), &data));
    let b = with_chains(mine(
        chains(MinerConfig {
            ex_seed: vec!["N".into()],
            ..config(2)
        }),
        &data,
    ));
    assert_eq!(a, b);
    assert!(a.contains(&(parse("O*N").canonical_word(None), [3, 0])));
}

#[test]
fn chain_results_agree_across_modes() {
    let data = ["C(=CO)C", "NC1OCC1", "O1=C(N)N1", "C(OC)CC", "CCCOC", "OCCOC", "NCOC"];
    for min in [1, 2] {
        let reference = keyed(&mine(chains(config(min)), &data));
        for variant in [
            MinerConfig {
                canonic_pruning: false,
                ..config(min)
            },
            MinerConfig {
                perfect_pruning: PerfectPruning::None,
                ..config(min)
            },
            MinerConfig {
                perfect_pruning: PerfectPruning::Partial,
                ..config(min)
            },
        ] {
            assert_eq!(keyed(&mine(chains(variant), &data)), reference, "min {min}");
        }
    }

    // Lowering the threshold only adds fragments.
    let strict = keyed(&mine(chains(config(3)), &data));
    let loose = keyed(&mine(chains(config(2)), &data));
    let words: BTreeSet<_> = loose.iter().map(|(word, _)| word).collect();
    assert!(strict.iter().all(|(word, _)| words.contains(word)));
}
