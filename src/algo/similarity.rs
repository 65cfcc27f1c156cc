//! Scoring and threshold filtering of candidate pairs.

use rayon::prelude::*;
use serde::Serialize;

use super::corpus::{Corpus, ShingleSet};
use super::minhash::{SignatureMatrix, INFINITY};
use crate::config::validate_threshold;
use crate::error::{Error, Result};

/// Exact Jaccard similarity, 0 when both sets are empty.
pub fn jaccard(a: &ShingleSet, b: &ShingleSet) -> f64 {
    let intersection = a.intersection_len(b);
    if intersection == 0 {
        return 0.0;
    }
    intersection as f64 / a.union_len(b) as f64
}

/// Fraction of signature rows on which two documents agree.
///
/// Rows still at infinity (documents without shingles) never count as
/// agreement, so two empty documents score 0 like their exact Jaccard.
pub fn estimated_jaccard(sig_a: &[u32], sig_b: &[u32]) -> f64 {
    debug_assert_eq!(sig_a.len(), sig_b.len());
    if sig_a.is_empty() {
        return 0.0;
    }
    let matches = sig_a
        .iter()
        .zip(sig_b)
        .filter(|(a, b)| a == b && **a != INFINITY)
        .count();
    matches as f64 / sig_a.len() as f64
}

/// A verified pair of documents, reported by external id.
///
/// `a` is always the document with the lower internal index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarPair<Id> {
    pub a: Id,
    pub b: Id,
    pub similarity: f64,
}

/// What candidate pairs are scored against.
#[derive(Debug, Clone, Copy)]
pub enum ScoreSource<'a> {
    Sets(&'a [ShingleSet]),
    Signatures(&'a SignatureMatrix),
}

impl ScoreSource<'_> {
    fn num_docs(&self) -> usize {
        match self {
            Self::Sets(sets) => sets.len(),
            Self::Signatures(matrix) => matrix.num_docs(),
        }
    }

    pub fn score(&self, i: usize, j: usize) -> f64 {
        match self {
            Self::Sets(sets) => jaccard(&sets[i], &sets[j]),
            Self::Signatures(matrix) => estimated_jaccard(matrix.column(i), matrix.column(j)),
        }
    }
}

/// Score `candidates` and keep those strictly above `threshold`.
///
/// Candidates must be `(i, j)` with `i < j`; duplicates are scored once.
/// Output is sorted by pair.
pub fn verify(
    candidates: &[(usize, usize)],
    source: ScoreSource<'_>,
    threshold: f64,
    parallel: bool,
) -> Result<Vec<(usize, usize, f64)>> {
    validate_threshold(threshold)?;
    let num_docs = source.num_docs();
    for &(i, j) in candidates {
        if i >= j {
            return Err(Error::config(format!(
                "candidate pair ({i}, {j}) must satisfy i < j"
            )));
        }
        if j >= num_docs {
            return Err(Error::DocumentOutOfRange {
                index: j,
                max_docs: num_docs,
            });
        }
    }

    let keep = |&(i, j): &(usize, usize)| {
        let score = source.score(i, j);
        (score > threshold).then_some((i, j, score))
    };
    let mut kept: Vec<(usize, usize, f64)> = if parallel {
        candidates.par_iter().filter_map(keep).collect()
    } else {
        candidates.iter().filter_map(keep).collect()
    };
    kept.sort_by(|x, y| (x.0, x.1).cmp(&(y.0, y.1)));
    kept.dedup_by(|x, y| (x.0, x.1) == (y.0, y.1));
    Ok(kept)
}

/// Anything that can report document pairs above a similarity threshold.
pub trait SimilarityScorer {
    type Id;

    /// Pairs with similarity strictly greater than `threshold`, each
    /// unordered pair at most once, never a document with itself.
    fn similar_pairs(&self, threshold: f64) -> Result<Vec<SimilarPair<Self::Id>>>;
}

/// Exact all-pairs baseline. Quadratic; useful for measuring LSH recall.
#[derive(Debug, Clone)]
pub struct BruteForceSearcher<Id> {
    ids: Vec<Id>,
    sets: Vec<ShingleSet>,
    parallel: bool,
}

impl<Id: Clone + Send + Sync> BruteForceSearcher<Id> {
    pub fn new<C: Corpus<Id = Id>>(corpus: &C) -> Result<Self> {
        let sets = corpus.read_all().into_owned();
        let ids = external_ids(corpus, sets.len())?;
        Ok(Self {
            ids,
            sets,
            parallel: true,
        })
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

impl<Id: Clone + Send + Sync> SimilarityScorer for BruteForceSearcher<Id> {
    type Id = Id;

    fn similar_pairs(&self, threshold: f64) -> Result<Vec<SimilarPair<Id>>> {
        let n = self.sets.len();
        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
            .collect();
        let kept = verify(&pairs, ScoreSource::Sets(&self.sets), threshold, self.parallel)?;
        Ok(label_pairs(&self.ids, kept))
    }
}

/// External ids for documents `0..num_docs`.
pub(crate) fn external_ids<C: Corpus>(corpus: &C, num_docs: usize) -> Result<Vec<C::Id>> {
    (0..num_docs)
        .map(|doc| {
            corpus
                .external_id(doc)
                .cloned()
                .ok_or(Error::MissingId { doc })
        })
        .collect()
}

pub(crate) fn label_pairs<Id: Clone>(
    ids: &[Id],
    scored: Vec<(usize, usize, f64)>,
) -> Vec<SimilarPair<Id>> {
    scored
        .into_iter()
        .map(|(i, j, similarity)| SimilarPair {
            a: ids[i].clone(),
            b: ids[j].clone(),
            similarity,
        })
        .collect()
}
