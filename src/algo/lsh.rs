use std::collections::{BTreeSet, HashMap};

use rayon::prelude::*;
use tracing::{debug, warn};

use super::hashing::{bucket_index, hash32};
use super::minhash::SignatureMatrix;
use crate::config::{KeyWidth, LshConfig};
use crate::error::{Error, Result};

/// Banding over a MinHash signature matrix.
///
/// Splits each signature into `bands` bands of `rows` rows. Every band key is
/// hashed into one of `num_buckets` buckets; documents sharing a bucket in
/// any band become candidate pairs.
///
/// Threshold ≈ (1/bands)^(1/rows) Jaccard at 50% collision probability.
#[derive(Debug, Clone)]
pub struct Banding {
    bands: usize,
    rows: usize,
    num_buckets: usize,
    seed: u64,
    key_width: KeyWidth,
}

/// Candidate pairs merged across bands, `(i, j)` with `i < j`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidates {
    pub pairs: Vec<(usize, usize)>,
    /// Colliding pairs found in each band before deduplication.
    pub per_band: Vec<usize>,
    /// Set when a candidate cap dropped pairs.
    pub truncated: bool,
}

impl Banding {
    pub fn new(
        num_hashes: usize,
        bands: usize,
        num_buckets: usize,
        seed: u64,
        key_width: KeyWidth,
    ) -> Result<Self> {
        if bands == 0 || num_hashes == 0 {
            return Err(Error::config("num_hashes and num_bands must be at least 1"));
        }
        if num_hashes % bands != 0 {
            return Err(Error::config(format!(
                "num_hashes ({num_hashes}) must be divisible by num_bands ({bands})"
            )));
        }
        if num_buckets == 0 {
            return Err(Error::config("num_buckets must be at least 1"));
        }
        Ok(Self {
            bands,
            rows: num_hashes / bands,
            num_buckets,
            seed,
            key_width,
        })
    }

    pub fn from_config(config: &LshConfig) -> Result<Self> {
        Self::new(
            config.num_hashes,
            config.num_bands,
            config.num_buckets,
            config.seed,
            config.key_width,
        )
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn num_buckets(&self) -> usize {
        self.num_buckets
    }

    /// Fixed-width byte encoding of one band's rows.
    pub fn encode_key(&self, band: &[u32], key: &mut Vec<u8>) {
        key.clear();
        match self.key_width {
            KeyWidth::Full => {
                for &v in band {
                    key.extend_from_slice(&v.to_le_bytes());
                }
            }
            KeyWidth::Byte => key.extend(band.iter().map(|&v| v as u8)),
        }
    }

    /// Bucket of one band's rows.
    pub fn bucket(&self, band: &[u32], key: &mut Vec<u8>) -> usize {
        self.encode_key(band, key);
        bucket_index(hash32(key, self.seed), self.num_buckets)
    }

    fn check_shape(&self, matrix: &SignatureMatrix) -> Result<()> {
        let expected = self.bands * self.rows;
        if matrix.num_hashes() != expected {
            return Err(Error::SignatureShape {
                expected,
                got: matrix.num_hashes(),
            });
        }
        Ok(())
    }

    /// Colliding pairs of a single band.
    ///
    /// Each document is paired with everything already in its bucket before
    /// it is appended, which yields every within-bucket pair exactly once.
    /// Buckets are materialised lazily; untouched slots cost nothing.
    /// Documents without shingles never enter a bucket.
    pub fn band_pairs(&self, matrix: &SignatureMatrix, band: usize) -> Result<Vec<(usize, usize)>> {
        self.check_shape(matrix)?;
        if band >= self.bands {
            return Err(Error::config(format!(
                "band {band} out of range (num_bands = {})",
                self.bands
            )));
        }
        Ok(self.collide(matrix, band))
    }

    fn collide(&self, matrix: &SignatureMatrix, band: usize) -> Vec<(usize, usize)> {
        let mut buckets: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut pairs = Vec::new();
        let mut key = Vec::with_capacity(self.rows * self.key_width.bytes_per_row());

        for doc in 0..matrix.num_docs() {
            if matrix.is_unset(doc) {
                continue;
            }
            let bucket = self.bucket(matrix.band(doc, band, self.rows), &mut key);
            let members = buckets.entry(bucket).or_default();
            pairs.extend(members.iter().map(|&other| (other, doc)));
            members.push(doc);
        }
        pairs
    }

    /// All candidate pairs: pairs that collide in at least one band.
    ///
    /// Bands are independent and run in parallel when `parallel` is set; the
    /// merged result is identical either way. `max_candidates` keeps the
    /// lowest pairs in `(i, j)` order.
    pub fn candidates(
        &self,
        matrix: &SignatureMatrix,
        parallel: bool,
        max_candidates: Option<usize>,
    ) -> Result<Candidates> {
        self.check_shape(matrix)?;

        let per_band_pairs: Vec<Vec<(usize, usize)>> = if parallel {
            (0..self.bands)
                .into_par_iter()
                .map(|band| self.collide(matrix, band))
                .collect()
        } else {
            (0..self.bands)
                .map(|band| self.collide(matrix, band))
                .collect()
        };

        let mut merged: BTreeSet<(usize, usize)> = BTreeSet::new();
        let mut per_band = Vec::with_capacity(self.bands);
        for (band, pairs) in per_band_pairs.into_iter().enumerate() {
            debug!(band, collisions = pairs.len(), "band processed");
            per_band.push(pairs.len());
            merged.extend(pairs);
        }

        let mut pairs: Vec<(usize, usize)> = merged.into_iter().collect();
        let mut truncated = false;
        if let Some(cap) = max_candidates {
            if pairs.len() > cap {
                warn!(found = pairs.len(), cap, "candidate cap reached, dropping pairs");
                pairs.truncate(cap);
                truncated = true;
            }
        }

        Ok(Candidates {
            pairs,
            per_band,
            truncated,
        })
    }
}
