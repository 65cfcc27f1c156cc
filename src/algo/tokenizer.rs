use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use super::corpus::{MemoryCorpus, ShingleSet};
use crate::config::MAX_SHINGLES;
use crate::error::{Error, Result};

/// Tokenize text into lowercase word tokens.
///
/// No stopword filtering: function words are part of what makes two
/// passages near-identical.
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words().map(|w| w.to_lowercase()).collect()
}

/// Character n-grams over lowercased, whitespace-collapsed text.
pub fn shingles(text: &str, n: usize) -> Vec<String> {
    let normalized = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let chars: Vec<char> = normalized.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }
    let n = n.max(1);
    if chars.len() < n {
        return vec![normalized];
    }
    chars.windows(n).map(|w| w.iter().collect()).collect()
}

/// Word n-grams from a token list.
pub fn word_ngrams(tokens: &[String], n: usize) -> Vec<String> {
    if tokens.is_empty() {
        return Vec::new();
    }
    let n = n.max(1);
    if tokens.len() < n {
        return vec![tokens.join(" ")];
    }
    tokens.windows(n).map(|w| w.join(" ")).collect()
}

/// How raw text is cut into shingles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "size", rename_all = "lowercase")]
pub enum Shingling {
    /// Character k-grams.
    Chars(usize),
    /// Word n-grams.
    Words(usize),
}

impl Default for Shingling {
    fn default() -> Self {
        Self::Chars(5)
    }
}

impl Shingling {
    pub fn from_parts(kind: &str, size: usize) -> Option<Self> {
        if size == 0 {
            return None;
        }
        match kind.to_lowercase().as_str() {
            "chars" | "char" | "characters" => Some(Self::Chars(size)),
            "words" | "word" => Some(Self::Words(size)),
            _ => None,
        }
    }

    pub fn shingles(&self, text: &str) -> Vec<String> {
        match *self {
            Self::Chars(k) => shingles(text, k),
            Self::Words(n) => word_ngrams(&tokenize(text), n),
        }
    }
}

/// Interns shingle strings to dense ids in first-seen order.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    ids: HashMap<String, u32>,
    limit: usize,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::with_limit(MAX_SHINGLES)
    }
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Vocabulary that refuses to grow past `limit` distinct shingles.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            ids: HashMap::new(),
            limit: limit.min(MAX_SHINGLES),
        }
    }

    /// Dense id of `shingle`, assigning the next one on first sight.
    pub fn intern(&mut self, shingle: &str) -> Result<u32> {
        if let Some(&id) = self.ids.get(shingle) {
            return Ok(id);
        }
        let next = self.ids.len();
        if next >= self.limit {
            return Err(Error::config(format!(
                "vocabulary is full: {} distinct shingles",
                self.limit
            )));
        }
        let id = u32::try_from(next)
            .map_err(|_| Error::config(format!("shingle id {next} does not fit in 32 bits")))?;
        self.ids.insert(shingle.to_string(), id);
        Ok(id)
    }

    pub fn get(&self, shingle: &str) -> Option<u32> {
        self.ids.get(shingle).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn shingle_set(&mut self, text: &str, shingling: Shingling) -> Result<ShingleSet> {
        shingling
            .shingles(text)
            .iter()
            .map(|s| self.intern(s))
            .collect::<Result<Vec<_>>>()
            .map(ShingleSet::new)
    }
}

/// Shingle `(external id, text)` records into a corpus over a fresh vocabulary.
pub fn build_corpus<Id, I, T>(
    records: I,
    shingling: Shingling,
) -> Result<(MemoryCorpus<Id>, Vocabulary)>
where
    I: IntoIterator<Item = (Id, T)>,
    T: AsRef<str>,
{
    let mut vocab = Vocabulary::new();
    let docs = records
        .into_iter()
        .map(|(id, text)| {
            vocab
                .shingle_set(text.as_ref(), shingling)
                .map(|set| (id, set))
        })
        .collect::<Result<Vec<(Id, ShingleSet)>>>()?;

    let mut corpus = MemoryCorpus::new(vocab.len());
    for (id, set) in docs {
        corpus.push(id, set);
    }
    Ok((corpus, vocab))
}
