//! Run configuration for the MinHash + LSH pipeline.
//!
//! A configuration is validated once, up front. Nothing that can be rejected
//! here is ever discovered halfway through a pass.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest supported shingle universe. Keeps `a * x + b` inside `u64`.
pub const MAX_SHINGLES: usize = 1 << 31;

/// How each signature row is encoded into a band key before hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyWidth {
    /// Full 32-bit little-endian encoding per row.
    #[default]
    Full,
    /// Low byte of each row only. Distinct signature values can alias once
    /// they exceed 255, producing extra candidates.
    Byte,
}

impl KeyWidth {
    pub fn bytes_per_row(self) -> usize {
        match self {
            Self::Full => 4,
            Self::Byte => 1,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "full" => Some(Self::Full),
            "byte" => Some(Self::Byte),
            _ => None,
        }
    }
}

/// How candidate pairs are scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreMode {
    /// Jaccard similarity over the shingle sets.
    #[default]
    Exact,
    /// Fraction of agreeing signature rows.
    Estimated,
}

impl ScoreMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "exact" => Some(Self::Exact),
            "estimated" | "estimate" => Some(Self::Estimated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LshConfig {
    #[serde(default = "default_num_hashes")]
    pub num_hashes: usize,
    #[serde(default = "default_num_bands")]
    pub num_bands: usize,
    #[serde(default = "default_num_buckets")]
    pub num_buckets: usize,
    /// Seeds the hash family and the band hash. Required.
    pub seed: u64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub key_width: KeyWidth,
    #[serde(default)]
    pub score: ScoreMode,
    /// Upper bound on candidate pairs handed to verification.
    #[serde(default)]
    pub max_candidates: Option<usize>,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_num_hashes() -> usize {
    100
}

fn default_num_bands() -> usize {
    20
}

fn default_num_buckets() -> usize {
    1 << 20
}

fn default_threshold() -> f64 {
    0.8
}

fn default_parallel() -> bool {
    true
}

impl LshConfig {
    /// Default parameters (100 hashes, 20 bands of 5 rows) for a given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            num_hashes: default_num_hashes(),
            num_bands: default_num_bands(),
            num_buckets: default_num_buckets(),
            seed,
            threshold: default_threshold(),
            key_width: KeyWidth::default(),
            score: ScoreMode::default(),
            max_candidates: None,
            parallel: default_parallel(),
        }
    }

    pub fn with_hashes(mut self, num_hashes: usize, num_bands: usize) -> Self {
        self.num_hashes = num_hashes;
        self.num_bands = num_bands;
        self
    }

    pub fn with_buckets(mut self, num_buckets: usize) -> Self {
        self.num_buckets = num_buckets;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_key_width(mut self, key_width: KeyWidth) -> Self {
        self.key_width = key_width;
        self
    }

    pub fn with_score(mut self, score: ScoreMode) -> Self {
        self.score = score;
        self
    }

    pub fn with_max_candidates(mut self, max_candidates: Option<usize>) -> Self {
        self.max_candidates = max_candidates;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Rows per band. Only meaningful on a validated config.
    pub fn rows_per_band(&self) -> usize {
        self.num_hashes / self.num_bands.max(1)
    }

    /// Approximate similarity at which a pair has a 50% chance of becoming a
    /// candidate: `(1/b)^(1/r)`.
    pub fn collision_threshold(&self) -> f64 {
        let rows = self.rows_per_band().max(1) as f64;
        (1.0 / self.num_bands.max(1) as f64).powf(1.0 / rows)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_hashes == 0 {
            return Err(Error::config("num_hashes must be at least 1"));
        }
        if self.num_bands == 0 {
            return Err(Error::config("num_bands must be at least 1"));
        }
        if self.num_hashes % self.num_bands != 0 {
            return Err(Error::config(format!(
                "num_hashes ({}) must be divisible by num_bands ({})",
                self.num_hashes, self.num_bands
            )));
        }
        if self.num_buckets == 0 {
            return Err(Error::config("num_buckets must be at least 1"));
        }
        validate_threshold(self.threshold)?;
        if self.max_candidates == Some(0) {
            return Err(Error::config("max_candidates must be at least 1 when set"));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }
}

pub(crate) fn validate_threshold(threshold: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(Error::config(format!(
            "threshold must be within [0, 1], got {threshold}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_universe(num_shingles: usize) -> Result<()> {
    if num_shingles > MAX_SHINGLES {
        return Err(Error::config(format!(
            "shingle universe of {num_shingles} exceeds the supported {MAX_SHINGLES}"
        )));
    }
    Ok(())
}
