//! Set-represented documents and the reader contract the pipeline consumes.

use std::borrow::Cow;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

/// Distinct shingle ids of one document, kept sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<u32>", into = "Vec<u32>")]
pub struct ShingleSet(Vec<u32>);

impl ShingleSet {
    pub fn new(mut ids: Vec<u32>) -> Self {
        ids.sort_unstable();
        ids.dedup();
        Self(ids)
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.0.binary_search(&id).is_ok()
    }

    /// Largest id in the set.
    pub fn max_id(&self) -> Option<u32> {
        self.0.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    /// `|self ∩ other|` by merging the two sorted lists.
    pub fn intersection_len(&self, other: &ShingleSet) -> usize {
        let (a, b) = (&self.0, &other.0);
        let (mut i, mut j, mut n) = (0, 0, 0);
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    n += 1;
                    i += 1;
                    j += 1;
                }
            }
        }
        n
    }

    pub fn union_len(&self, other: &ShingleSet) -> usize {
        self.len() + other.len() - self.intersection_len(other)
    }
}

impl From<Vec<u32>> for ShingleSet {
    fn from(ids: Vec<u32>) -> Self {
        Self::new(ids)
    }
}

impl From<ShingleSet> for Vec<u32> {
    fn from(set: ShingleSet) -> Self {
        set.0
    }
}

impl FromIterator<u32> for ShingleSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Source of shingled documents.
///
/// `next_document` is a single forward pass; `reset` rewinds it. `read_all`
/// gives random access by document index and is only needed for exact
/// verification.
pub trait Corpus {
    type Id: Clone + Debug + PartialEq + Send + Sync;

    /// Size of the shingle universe; every id must be below it.
    fn num_shingles(&self) -> usize;

    /// Upper bound on document indices.
    fn max_docs(&self) -> usize;

    fn next_document(&mut self) -> Option<(usize, &ShingleSet)>;

    fn reset(&mut self);

    fn read_all(&self) -> Cow<'_, [ShingleSet]>;

    fn external_id(&self, doc: usize) -> Option<&Self::Id>;
}

/// Corpus held entirely in memory.
#[derive(Debug, Clone)]
pub struct MemoryCorpus<Id = String> {
    ids: Vec<Id>,
    sets: Vec<ShingleSet>,
    num_shingles: usize,
    cursor: usize,
}

impl<Id> MemoryCorpus<Id> {
    pub fn new(num_shingles: usize) -> Self {
        Self {
            ids: Vec::new(),
            sets: Vec::new(),
            num_shingles,
            cursor: 0,
        }
    }

    /// Build a corpus whose universe is one past the largest shingle id seen.
    pub fn from_documents<I, S>(docs: I) -> Self
    where
        I: IntoIterator<Item = (Id, S)>,
        S: Into<ShingleSet>,
    {
        let mut corpus = Self::new(0);
        for (id, set) in docs {
            let set = set.into();
            if let Some(max) = set.max_id() {
                corpus.num_shingles = corpus.num_shingles.max(max as usize + 1);
            }
            corpus.push(id, set);
        }
        corpus
    }

    /// Append a document and return its dense index. Ids are not checked
    /// against the universe here; the signature pass rejects them.
    pub fn push(&mut self, id: Id, set: impl Into<ShingleSet>) -> usize {
        self.ids.push(id);
        self.sets.push(set.into());
        self.sets.len() - 1
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn ids(&self) -> &[Id] {
        &self.ids
    }

    pub fn sets(&self) -> &[ShingleSet] {
        &self.sets
    }
}

impl<Id> Corpus for MemoryCorpus<Id>
where
    Id: Clone + Debug + PartialEq + Send + Sync,
{
    type Id = Id;

    fn num_shingles(&self) -> usize {
        self.num_shingles
    }

    fn max_docs(&self) -> usize {
        self.sets.len()
    }

    fn next_document(&mut self) -> Option<(usize, &ShingleSet)> {
        let doc = self.cursor;
        let set = self.sets.get(doc)?;
        self.cursor += 1;
        Some((doc, set))
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn read_all(&self) -> Cow<'_, [ShingleSet]> {
        Cow::Borrowed(&self.sets)
    }

    fn external_id(&self, doc: usize) -> Option<&Id> {
        self.ids.get(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shingle_set_sorts_and_dedups() {
        let set = ShingleSet::new(vec![5, 1, 3, 1, 5]);
        assert_eq!(set.as_slice(), &[1, 3, 5]);
        assert_eq!(set.len(), 3);
        assert!(set.contains(3));
        assert!(!set.contains(4));
        assert_eq!(set.max_id(), Some(5));
    }

    #[test]
    fn intersection_and_union() {
        let a: ShingleSet = [1, 2, 3].into_iter().collect();
        let b: ShingleSet = [2, 3, 4, 5].into_iter().collect();
        assert_eq!(a.intersection_len(&b), 2);
        assert_eq!(a.union_len(&b), 5);
        assert_eq!(b.intersection_len(&a), 2);
    }

    #[test]
    fn empty_sets() {
        let empty = ShingleSet::default();
        let a: ShingleSet = [1].into_iter().collect();
        assert_eq!(empty.intersection_len(&a), 0);
        assert_eq!(empty.union_len(&a), 1);
        assert_eq!(empty.union_len(&empty), 0);
        assert_eq!(empty.max_id(), None);
    }

    #[test]
    fn memory_corpus_streams_and_resets() {
        let mut corpus = MemoryCorpus::from_documents(vec![
            ("a".to_string(), vec![1u32, 2]),
            ("b".to_string(), vec![7u32]),
        ]);
        assert_eq!(corpus.num_shingles(), 8);
        assert_eq!(corpus.max_docs(), 2);

        let mut seen = Vec::new();
        while let Some((doc, set)) = corpus.next_document() {
            seen.push((doc, set.len()));
        }
        assert_eq!(seen, vec![(0, 2), (1, 1)]);
        assert!(corpus.next_document().is_none());

        corpus.reset();
        assert_eq!(corpus.next_document().map(|(d, _)| d), Some(0));
        assert_eq!(corpus.external_id(1).map(String::as_str), Some("b"));
        assert_eq!(corpus.external_id(2), None);
        assert_eq!(corpus.read_all().len(), 2);
    }

    #[test]
    fn shingle_set_serde_as_list() {
        let set = ShingleSet::new(vec![3, 1]);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, "[1,3]");
        let back: ShingleSet = serde_json::from_str("[9,2,2]").unwrap();
        assert_eq!(back.as_slice(), &[2, 9]);
    }
}
