//! MinHash signatures over integer shingle ids.
//!
//! Each of the `num_hashes` functions is `h(x) = ((a·x + b) mod p) mod n`
//! where `n` is the shingle universe size and `p` the smallest prime `>= n`.
//! Two documents agree on row `h` with probability close to their Jaccard
//! similarity.

use tracing::{debug, info};

use super::corpus::{Corpus, ShingleSet};
use super::hashing::SeededRng;
use super::primes::smallest_prime_at_least;
use crate::config::validate_universe;
use crate::error::{Error, Result};

/// Initial cell value, larger than any hash output.
pub const INFINITY: u32 = u32::MAX;

/// Reproducible family of linear hash functions over `[0, num_values)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashFamily {
    coefficients: Vec<(u64, u64)>,
    prime: u64,
    num_values: u64,
}

impl HashFamily {
    /// Draw `num_hashes` functions from a stream seeded with `seed`.
    ///
    /// An empty universe is treated as a universe of one value so the
    /// family stays well defined.
    pub fn new(num_hashes: usize, num_values: usize, seed: u64) -> Result<Self> {
        if num_hashes == 0 {
            return Err(Error::config("num_hashes must be at least 1"));
        }
        validate_universe(num_values)?;
        let num_values = num_values.max(1) as u64;
        let prime = smallest_prime_at_least(num_values);

        let mut rng = SeededRng::new(seed);
        let coefficients = (0..num_hashes)
            .map(|_| {
                let a = 1 + rng.below(prime - 1);
                let b = rng.below(prime);
                (a, b)
            })
            .collect();

        Ok(Self {
            coefficients,
            prime,
            num_values,
        })
    }

    /// Value of function `h` at shingle `x`.
    #[inline]
    pub fn apply(&self, h: usize, x: u32) -> u32 {
        let (a, b) = self.coefficients[h];
        (((a * x as u64 + b) % self.prime) % self.num_values) as u32
    }

    /// MinHash signature of a single set.
    pub fn signature(&self, set: &ShingleSet) -> Vec<u32> {
        let mut sig = vec![INFINITY; self.num_hashes()];
        fold_into(&mut sig, self, set);
        sig
    }

    pub fn num_hashes(&self) -> usize {
        self.coefficients.len()
    }

    pub fn prime(&self) -> u64 {
        self.prime
    }

    pub fn num_values(&self) -> u64 {
        self.num_values
    }

    pub fn coefficients(&self) -> &[(u64, u64)] {
        &self.coefficients
    }
}

/// Dense `num_hashes × num_docs` signature matrix.
///
/// Stored document-major: the `num_hashes` values of one document are
/// contiguous. Building writes one whole column per shingle and banding
/// reads a contiguous slice of one column, so both passes stay sequential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureMatrix {
    num_hashes: usize,
    num_docs: usize,
    values: Vec<u32>,
}

impl SignatureMatrix {
    pub fn new(num_hashes: usize, num_docs: usize) -> Self {
        Self {
            num_hashes,
            num_docs,
            values: vec![INFINITY; num_hashes * num_docs],
        }
    }

    /// Assemble a matrix from per-document signatures.
    pub fn from_columns(num_hashes: usize, columns: &[Vec<u32>]) -> Result<Self> {
        let mut values = Vec::with_capacity(num_hashes * columns.len());
        for column in columns {
            if column.len() != num_hashes {
                return Err(Error::SignatureShape {
                    expected: num_hashes,
                    got: column.len(),
                });
            }
            values.extend_from_slice(column);
        }
        Ok(Self {
            num_hashes,
            num_docs: columns.len(),
            values,
        })
    }

    pub fn num_hashes(&self) -> usize {
        self.num_hashes
    }

    pub fn num_docs(&self) -> usize {
        self.num_docs
    }

    pub fn get(&self, h: usize, doc: usize) -> u32 {
        self.values[doc * self.num_hashes + h]
    }

    pub fn column(&self, doc: usize) -> &[u32] {
        let start = doc * self.num_hashes;
        &self.values[start..start + self.num_hashes]
    }

    fn column_mut(&mut self, doc: usize) -> &mut [u32] {
        let start = doc * self.num_hashes;
        &mut self.values[start..start + self.num_hashes]
    }

    /// Rows `[band * rows, (band + 1) * rows)` of document `doc`.
    pub fn band(&self, doc: usize, band: usize, rows: usize) -> &[u32] {
        let start = band * rows;
        &self.column(doc)[start..start + rows]
    }

    /// Drop every column at or past `num_docs`.
    fn truncate(&mut self, num_docs: usize) {
        if num_docs < self.num_docs {
            self.values.truncate(num_docs * self.num_hashes);
            self.num_docs = num_docs;
        }
    }

    /// True when no shingle was ever folded into `doc`.
    pub fn is_unset(&self, doc: usize) -> bool {
        self.column(doc).iter().all(|&v| v == INFINITY)
    }
}

fn fold_into(column: &mut [u32], family: &HashFamily, set: &ShingleSet) {
    for shingle in set.iter() {
        for (h, cell) in column.iter_mut().enumerate() {
            let v = family.apply(h, shingle);
            if v < *cell {
                *cell = v;
            }
        }
    }
}

/// Build the signature matrix in one forward pass over `corpus`.
///
/// The corpus is rewound before and after the pass. Documents past
/// `max_docs` and shingles past `num_shingles` abort the pass. `max_docs` is
/// only an upper bound: the matrix keeps one column per index up to the
/// highest document actually yielded.
pub fn build_signatures<C: Corpus>(corpus: &mut C, family: &HashFamily) -> Result<SignatureMatrix> {
    let max_docs = corpus.max_docs();
    let num_shingles = corpus.num_shingles();
    let mut matrix = SignatureMatrix::new(family.num_hashes(), max_docs);

    corpus.reset();
    let mut docs_seen = 0usize;
    let mut num_docs = 0usize;
    let mut occurrences = 0usize;
    while let Some((doc, set)) = corpus.next_document() {
        if doc >= max_docs {
            return Err(Error::DocumentOutOfRange {
                index: doc,
                max_docs,
            });
        }
        if let Some(max) = set.max_id() {
            if max as usize >= num_shingles {
                return Err(Error::ShingleOutOfRange {
                    doc,
                    shingle: max,
                    num_shingles,
                });
            }
        }
        fold_into(matrix.column_mut(doc), family, set);
        docs_seen += 1;
        num_docs = num_docs.max(doc + 1);
        occurrences += set.len();
    }
    corpus.reset();
    matrix.truncate(num_docs);

    debug!(docs_seen, occurrences, max_docs, "signature pass complete");
    info!(
        num_hashes = family.num_hashes(),
        num_docs,
        prime = family.prime(),
        "built signature matrix"
    );
    Ok(matrix)
}
