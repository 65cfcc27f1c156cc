//! End-to-end MinHash + LSH near-duplicate search.
//!
//! Stages run strictly in order: hash family, one signature pass over the
//! corpus, banding (bands in parallel when enabled), verification. The
//! signature matrix is immutable once built.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::algo::corpus::{Corpus, ShingleSet};
use crate::algo::lsh::{Banding, Candidates};
use crate::algo::minhash::{build_signatures, HashFamily, SignatureMatrix};
use crate::algo::similarity::{
    external_ids, label_pairs, verify, ScoreSource, SimilarPair, SimilarityScorer,
};
use crate::config::{LshConfig, ScoreMode};
use crate::error::Result;

/// Optional callbacks fired as the pipeline progresses.
///
/// All methods default to no-ops.
pub trait PipelineObserver: Send + Sync {
    fn on_signatures(&self, _num_docs: usize, _num_hashes: usize) {}

    fn on_band(&self, _band: usize, _collisions: usize) {}

    fn on_candidates(&self, _total: usize, _truncated: bool) {}

    fn on_verified(&self, _kept: usize) {}
}

impl<T: PipelineObserver + ?Sized> PipelineObserver for Arc<T> {
    fn on_signatures(&self, num_docs: usize, num_hashes: usize) {
        (**self).on_signatures(num_docs, num_hashes)
    }

    fn on_band(&self, band: usize, collisions: usize) {
        (**self).on_band(band, collisions)
    }

    fn on_candidates(&self, total: usize, truncated: bool) {
        (**self).on_candidates(total, truncated)
    }

    fn on_verified(&self, kept: usize) {
        (**self).on_verified(kept)
    }
}

/// Counters for one search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub num_docs: usize,
    pub num_hashes: usize,
    pub rows_per_band: usize,
    /// Colliding pairs per band, before cross-band deduplication.
    pub per_band: Vec<usize>,
    /// Distinct candidate pairs handed to verification.
    pub candidates: usize,
    pub truncated: bool,
    pub similar: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome<Id> {
    pub pairs: Vec<SimilarPair<Id>>,
    pub stats: RunStats,
}

type Observer = Box<dyn PipelineObserver>;

pub struct LshSearcher<Id> {
    config: LshConfig,
    family: HashFamily,
    banding: Banding,
    signatures: SignatureMatrix,
    sets: Vec<ShingleSet>,
    ids: Vec<Id>,
    observer: Option<Observer>,
}

impl<Id: Clone + Send + Sync> LshSearcher<Id> {
    /// Validate `config`, then build hash family and signature matrix.
    pub fn new<C>(corpus: &mut C, config: LshConfig) -> Result<Self>
    where
        C: Corpus<Id = Id>,
    {
        Self::with_observer(corpus, config, None)
    }

    pub fn with_observer<C>(
        corpus: &mut C,
        config: LshConfig,
        observer: Option<Observer>,
    ) -> Result<Self>
    where
        C: Corpus<Id = Id>,
    {
        config.validate()?;
        let banding = Banding::from_config(&config)?;
        let family = HashFamily::new(config.num_hashes, corpus.num_shingles(), config.seed)?;

        let signatures = build_signatures(corpus, &family)?;
        if let Some(obs) = &observer {
            obs.on_signatures(signatures.num_docs(), signatures.num_hashes());
        }

        let sets = match config.score {
            ScoreMode::Exact => {
                let mut sets = corpus.read_all().into_owned();
                sets.truncate(signatures.num_docs());
                sets
            }
            ScoreMode::Estimated => Vec::new(),
        };
        let ids = external_ids(corpus, signatures.num_docs())?;

        Ok(Self {
            config,
            family,
            banding,
            signatures,
            sets,
            ids,
            observer,
        })
    }

    pub fn config(&self) -> &LshConfig {
        &self.config
    }

    pub fn family(&self) -> &HashFamily {
        &self.family
    }

    pub fn banding(&self) -> &Banding {
        &self.banding
    }

    pub fn signatures(&self) -> &SignatureMatrix {
        &self.signatures
    }

    pub fn ids(&self) -> &[Id] {
        &self.ids
    }

    /// Distinct candidate pairs across all bands, by internal index.
    pub fn candidates(&self) -> Result<Candidates> {
        let candidates = self.banding.candidates(
            &self.signatures,
            self.config.parallel,
            self.config.max_candidates,
        )?;
        if let Some(obs) = &self.observer {
            for (band, &collisions) in candidates.per_band.iter().enumerate() {
                obs.on_band(band, collisions);
            }
            obs.on_candidates(candidates.pairs.len(), candidates.truncated);
        }
        Ok(candidates)
    }

    /// Search with the configured threshold.
    pub fn search(&self) -> Result<SearchOutcome<Id>> {
        self.search_above(self.config.threshold)
    }

    pub fn search_above(&self, threshold: f64) -> Result<SearchOutcome<Id>> {
        let (scored, stats) = self.scored_pairs(threshold)?;
        Ok(SearchOutcome {
            pairs: label_pairs(&self.ids, scored),
            stats,
        })
    }

    /// Verified pairs as `(i, j, similarity)` over internal indices, `i < j`.
    pub fn scored_pairs(&self, threshold: f64) -> Result<(Vec<(usize, usize, f64)>, RunStats)> {
        let candidates = self.candidates()?;
        let source = match self.config.score {
            ScoreMode::Exact => ScoreSource::Sets(&self.sets),
            ScoreMode::Estimated => ScoreSource::Signatures(&self.signatures),
        };
        let kept = verify(&candidates.pairs, source, threshold, self.config.parallel)?;
        if let Some(obs) = &self.observer {
            obs.on_verified(kept.len());
        }

        let stats = RunStats {
            num_docs: self.signatures.num_docs(),
            num_hashes: self.signatures.num_hashes(),
            rows_per_band: self.banding.rows(),
            per_band: candidates.per_band,
            candidates: candidates.pairs.len(),
            truncated: candidates.truncated,
            similar: kept.len(),
        };
        info!(
            docs = stats.num_docs,
            candidates = stats.candidates,
            similar = stats.similar,
            threshold,
            "lsh search complete"
        );
        Ok((kept, stats))
    }
}

impl<Id: Clone + Send + Sync> SimilarityScorer for LshSearcher<Id> {
    type Id = Id;

    fn similar_pairs(&self, threshold: f64) -> Result<Vec<SimilarPair<Id>>> {
        Ok(self.search_above(threshold)?.pairs)
    }
}

/// Build a searcher over `corpus` and run it with `config.threshold`.
pub fn find_similar_pairs<C>(corpus: &mut C, config: LshConfig) -> Result<SearchOutcome<C::Id>>
where
    C: Corpus,
{
    LshSearcher::new(corpus, config)?.search()
}
