//! Near-duplicate detection over shingled documents.
//!
//! Documents are reduced to MinHash signatures in one pass, signatures are
//! banded into LSH buckets, and only pairs that share a bucket in some band
//! are scored against the similarity threshold.

pub mod algo;
pub mod config;
pub mod error;
pub mod ops;
pub mod search;

pub use algo::corpus::{Corpus, MemoryCorpus, ShingleSet};
pub use algo::similarity::{BruteForceSearcher, SimilarPair, SimilarityScorer};
pub use config::{KeyWidth, LshConfig, ScoreMode};
pub use error::{Error, Result};
pub use search::{find_similar_pairs, LshSearcher, PipelineObserver, RunStats, SearchOutcome};
