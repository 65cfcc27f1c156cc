//! Crate-wide error type.

/// Errors surfaced by the near-duplicate pipeline.
///
/// Every failure is fatal to the run that produced it; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configuration is inconsistent. Raised before any pass starts.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The corpus yielded a document index at or past its declared `max_docs`.
    #[error("document index {index} out of range (corpus declares {max_docs} documents)")]
    DocumentOutOfRange { index: usize, max_docs: usize },

    /// A document contains a shingle id at or past the declared universe size.
    #[error("shingle {shingle} in document {doc} out of range (corpus declares {num_shingles} shingles)")]
    ShingleOutOfRange {
        doc: usize,
        shingle: u32,
        num_shingles: usize,
    },

    /// The corpus yielded a document but has no external id for it.
    #[error("document {doc} has no external id")]
    MissingId { doc: usize },

    /// A signature matrix does not match the shape the operation expects.
    #[error("signature shape mismatch: expected {expected} hashes per document, got {got}")]
    SignatureShape { expected: usize, got: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
