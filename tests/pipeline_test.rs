use std::collections::BTreeSet;

use neardup::algo::minhash::{build_signatures, HashFamily};
use neardup::{
    find_similar_pairs, BruteForceSearcher, Error, LshConfig, LshSearcher, MemoryCorpus,
    ScoreMode, SimilarPair, SimilarityScorer,
};

fn scenario() -> MemoryCorpus<String> {
    let mut corpus = MemoryCorpus::new(12);
    corpus.push("docA".to_string(), vec![1u32, 2, 3]);
    corpus.push("docB".to_string(), vec![1u32, 2, 3, 4]);
    corpus.push("docC".to_string(), vec![9u32, 10, 11]);
    corpus
}

fn scenario_config() -> LshConfig {
    LshConfig::new(42)
        .with_hashes(20, 5)
        .with_buckets(8)
        .with_threshold(0.6)
}

fn id_pairs(pairs: &[SimilarPair<String>]) -> BTreeSet<(String, String)> {
    pairs
        .iter()
        .map(|p| {
            if p.a <= p.b {
                (p.a.clone(), p.b.clone())
            } else {
                (p.b.clone(), p.a.clone())
            }
        })
        .collect()
}

#[test]
fn scenario_exact_reports_only_a_b() {
    let mut corpus = scenario();
    let outcome = find_similar_pairs(&mut corpus, scenario_config()).unwrap();
    assert_eq!(outcome.pairs.len(), 1);
    let pair = &outcome.pairs[0];
    assert_eq!((pair.a.as_str(), pair.b.as_str()), ("docA", "docB"));
    assert!((pair.similarity - 0.75).abs() < 1e-12);
}

#[test]
fn scenario_estimated_close_to_true_jaccard() {
    let mut corpus = scenario();
    let outcome =
        find_similar_pairs(&mut corpus, scenario_config().with_score(ScoreMode::Estimated))
            .unwrap();
    assert_eq!(outcome.pairs.len(), 1);
    let pair = &outcome.pairs[0];
    assert_eq!((pair.a.as_str(), pair.b.as_str()), ("docA", "docB"));
    assert!(pair.similarity > 0.6);
    assert!((pair.similarity - 0.75).abs() <= 0.15);
    assert!(outcome
        .pairs
        .iter()
        .all(|p| p.a != "docC" && p.b != "docC"));
}

#[test]
fn runs_are_deterministic() {
    let config = scenario_config().with_score(ScoreMode::Estimated);
    let mut c1 = scenario();
    let mut c2 = scenario();
    let s1 = LshSearcher::new(&mut c1, config.clone()).unwrap();
    let s2 = LshSearcher::new(&mut c2, config).unwrap();
    assert_eq!(s1.signatures(), s2.signatures());
    assert_eq!(s1.search().unwrap(), s2.search().unwrap());
}

#[test]
fn parallel_and_sequential_agree() {
    let mut c1 = scenario();
    let mut c2 = scenario();
    let par = find_similar_pairs(&mut c1, scenario_config().with_parallel(true)).unwrap();
    let seq = find_similar_pairs(&mut c2, scenario_config().with_parallel(false)).unwrap();
    assert_eq!(par, seq);
}

#[test]
fn document_and_shingle_order_do_not_change_signatures() {
    let docs: Vec<(String, Vec<u32>)> = vec![
        ("x".into(), vec![5, 1, 9, 3]),
        ("y".into(), vec![2, 8]),
        ("z".into(), vec![0, 7, 1]),
    ];
    let family = HashFamily::new(24, 10, 3).unwrap();

    let mut forward = MemoryCorpus::new(10);
    for (id, set) in &docs {
        forward.push(id.clone(), set.clone());
    }
    let mut permuted = MemoryCorpus::new(10);
    for (id, set) in docs.iter().rev() {
        let mut shuffled = set.clone();
        shuffled.reverse();
        permuted.push(id.clone(), shuffled);
    }

    let m1 = build_signatures(&mut forward, &family).unwrap();
    let m2 = build_signatures(&mut permuted, &family).unwrap();
    for i in 0..docs.len() {
        assert_eq!(m1.column(i), m2.column(docs.len() - 1 - i));
    }

    let config = LshConfig::new(9).with_hashes(24, 6).with_buckets(4).with_threshold(0.0);
    let p1 = find_similar_pairs(&mut forward, config.clone()).unwrap();
    let p2 = find_similar_pairs(&mut permuted, config).unwrap();
    assert_eq!(id_pairs(&p1.pairs), id_pairs(&p2.pairs));
}

#[test]
fn duplicates_score_one_and_never_pair_with_themselves() {
    let mut corpus = MemoryCorpus::new(50);
    corpus.push("a".to_string(), vec![1u32, 2, 3, 4, 5]);
    corpus.push("b".to_string(), vec![1u32, 2, 3, 4, 5]);
    corpus.push("c".to_string(), vec![40u32, 41, 42]);
    let outcome =
        find_similar_pairs(&mut corpus, LshConfig::new(5).with_hashes(16, 4)).unwrap();
    assert_eq!(outcome.pairs.len(), 1);
    assert_eq!(outcome.pairs[0].similarity, 1.0);
    assert!(outcome.pairs.iter().all(|p| p.a != p.b));
}

#[test]
fn pairs_are_unordered_and_unique() {
    // One bucket: every pair collides in every band.
    let mut corpus = MemoryCorpus::new(10);
    for i in 0..5 {
        corpus.push(format!("d{i}"), vec![1u32, 2, 3]);
    }
    let outcome = find_similar_pairs(
        &mut corpus,
        LshConfig::new(1).with_hashes(10, 5).with_buckets(1),
    )
    .unwrap();
    assert_eq!(outcome.pairs.len(), 10);
    assert_eq!(outcome.stats.per_band, vec![10; 5]);
    assert_eq!(id_pairs(&outcome.pairs).len(), 10);
    for p in &outcome.pairs {
        assert!(!outcome.pairs.iter().any(|q| q.a == p.b && q.b == p.a));
    }
}

#[test]
fn threshold_is_strict() {
    // J = 20 / 40 = 0.5
    let mut corpus = MemoryCorpus::new(40);
    corpus.push("a".to_string(), (0u32..30).collect::<Vec<_>>());
    corpus.push("b".to_string(), (10u32..40).collect::<Vec<_>>());
    let config = LshConfig::new(3).with_hashes(10, 5).with_buckets(1);

    let searcher = LshSearcher::new(&mut corpus, config).unwrap();
    assert!(searcher.similar_pairs(0.5).unwrap().is_empty());
    let pairs = searcher.similar_pairs(0.49).unwrap();
    assert_eq!(pairs.len(), 1);
    assert!((pairs[0].similarity - 0.5).abs() < 1e-12);
}

#[test]
fn disjoint_documents_never_reported() {
    let mut corpus = MemoryCorpus::new(20);
    corpus.push("a".to_string(), vec![0u32, 1, 2]);
    corpus.push("b".to_string(), vec![10u32, 11, 12]);
    corpus.push("empty".to_string(), Vec::<u32>::new());
    corpus.push("also-empty".to_string(), Vec::<u32>::new());
    let config = LshConfig::new(2)
        .with_hashes(8, 4)
        .with_buckets(1)
        .with_threshold(0.0);

    // One bucket: only the two non-empty documents become a candidate.
    let exact = find_similar_pairs(&mut corpus, config.clone()).unwrap();
    assert!(exact.pairs.is_empty());
    assert_eq!(exact.stats.candidates, 1);

    let estimated =
        find_similar_pairs(&mut corpus, config.with_score(ScoreMode::Estimated)).unwrap();
    assert!(estimated
        .pairs
        .iter()
        .all(|p| !p.a.contains("empty") && !p.b.contains("empty")));
}

#[test]
fn empty_documents_produce_no_candidates() {
    let mut corpus = MemoryCorpus::new(10);
    for i in 0..200 {
        corpus.push(format!("blank{i}"), Vec::<u32>::new());
    }
    let outcome = find_similar_pairs(&mut corpus, LshConfig::new(1)).unwrap();
    assert_eq!(outcome.stats.num_docs, 200);
    assert_eq!(outcome.stats.candidates, 0);
    assert!(outcome.stats.per_band.iter().all(|&n| n == 0));
    assert!(outcome.pairs.is_empty());
}

#[test]
fn more_bands_raise_recall() {
    // 60 pairs with true Jaccard 0.5, spread far apart in shingle space.
    let mut corpus = MemoryCorpus::new(6000);
    for k in 0..60u32 {
        let base = k * 100;
        corpus.push(2 * k as usize, (base..base + 30).collect::<Vec<_>>());
        corpus.push(2 * k as usize + 1, (base + 10..base + 40).collect::<Vec<_>>());
    }
    let recall = |bands: usize, corpus: &mut MemoryCorpus<usize>| {
        let config = LshConfig::new(7)
            .with_hashes(20, bands)
            .with_buckets(1 << 20)
            .with_threshold(0.0);
        let searcher = LshSearcher::new(corpus, config).unwrap();
        let candidates = searcher.candidates().unwrap().pairs;
        (0..60)
            .filter(|k| candidates.contains(&(2 * k, 2 * k + 1)))
            .count()
    };
    let few = recall(2, &mut corpus);
    let many = recall(10, &mut corpus);
    assert!(many > few, "10 bands found {many}, 2 bands found {few}");
    assert!(many >= 40, "10 bands found only {many} of 60");
}

#[test]
fn lsh_results_are_subset_of_exact_baseline() {
    let mut corpus = MemoryCorpus::new(100);
    for i in 0..30u32 {
        let start = (i * 3) % 70;
        corpus.push(format!("doc{i}"), (start..start + 20).collect::<Vec<_>>());
    }
    let exact: BTreeSet<_> = id_pairs(
        &BruteForceSearcher::new(&corpus)
            .unwrap()
            .similar_pairs(0.5)
            .unwrap(),
    );
    let config = LshConfig::new(11).with_hashes(40, 10).with_buckets(64).with_threshold(0.5);
    let lsh = id_pairs(&find_similar_pairs(&mut corpus, config).unwrap().pairs);
    assert!(!exact.is_empty());
    assert!(lsh.is_subset(&exact));
}

#[test]
fn candidate_cap_truncates() {
    let mut corpus = MemoryCorpus::new(10);
    for i in 0..4 {
        corpus.push(format!("d{i}"), vec![1u32, 2]);
    }
    let config = LshConfig::new(1)
        .with_hashes(4, 2)
        .with_buckets(1)
        .with_max_candidates(Some(2));
    let outcome = find_similar_pairs(&mut corpus, config).unwrap();
    assert!(outcome.stats.truncated);
    assert_eq!(outcome.stats.candidates, 2);
    assert_eq!(outcome.pairs.len(), 2);
}

#[test]
fn configuration_errors_surface_eagerly() {
    let mut corpus = scenario();
    for config in [
        scenario_config().with_hashes(20, 6),
        scenario_config().with_buckets(0),
        scenario_config().with_threshold(1.01),
    ] {
        assert!(matches!(
            LshSearcher::new(&mut corpus, config),
            Err(Error::Config(_))
        ));
    }
}

#[test]
fn out_of_range_shingle_fails_fast() {
    let mut corpus = MemoryCorpus::new(4);
    corpus.push("a".to_string(), vec![1u32, 4]);
    let err = find_similar_pairs(&mut corpus, LshConfig::new(1).with_hashes(4, 2)).unwrap_err();
    assert!(matches!(err, Error::ShingleOutOfRange { shingle: 4, .. }));
}
