//! Operations over JSON records, shared by the CLI and library callers.
//!
//! Each `op_*` function is a synchronous wrapper around the `algo` and
//! `search` modules. Input rows are `serde_json::Value` objects; the text to
//! shingle lives in `field`, the external id in `id_field` (falling back to
//! the row position when absent).

use std::collections::HashMap;

use serde_json::{json, Value};

use crate::algo::minhash::HashFamily;
use crate::algo::similarity::{estimated_jaccard, jaccard, BruteForceSearcher, SimilarityScorer};
use crate::algo::tokenizer::{build_corpus, Shingling, Vocabulary};
use crate::config::{validate_threshold, LshConfig};
use crate::error::Result;
use crate::search::LshSearcher;

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Extract a text field from a JSON object, returning "" if missing.
pub fn get_text(row: &Value, field: &str) -> String {
    row.get(field)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

/// External id of a row: the `id_field` value as a string, else the row index.
pub fn get_id(row: &Value, id_field: &str, index: usize) -> String {
    match row.get(id_field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => index.to_string(),
        Some(other) => other.to_string(),
    }
}

fn records<'a>(
    rows: &'a [Value],
    id_field: &'a str,
    field: &'a str,
) -> impl Iterator<Item = (String, String)> + 'a {
    rows.iter()
        .enumerate()
        .map(move |(i, row)| (get_id(row, id_field, i), get_text(row, field)))
}

/// Union-find with path compression (halving).
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merge the sets of `a` and `b`; the lower root wins.
    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[ra.max(rb)] = ra.min(rb);
        }
    }

    /// `(group, root)` per element. Groups are numbered densely in order of
    /// their lowest member.
    fn groups(&mut self) -> Vec<(usize, usize)> {
        let mut group_of_root: HashMap<usize, usize> = HashMap::new();
        (0..self.parent.len())
            .map(|i| {
                let root = self.find(i);
                let next = group_of_root.len();
                (*group_of_root.entry(root).or_insert(next), root)
            })
            .collect()
    }
}

// ── Operations ───────────────────────────────────────────────────────────────

/// Near-duplicate pairs via MinHash + LSH.
///
/// Returns `{"pairs": [{"a", "b", "similarity"}], "stats": {...}}`.
pub fn op_similar_pairs(
    rows: &[Value],
    id_field: &str,
    field: &str,
    shingling: Shingling,
    config: LshConfig,
) -> Result<Value> {
    let (mut corpus, _) = build_corpus(records(rows, id_field, field), shingling)?;
    let outcome = LshSearcher::new(&mut corpus, config)?.search()?;
    Ok(serde_json::to_value(outcome)?)
}

/// Exact all-pairs Jaccard above `threshold`. Quadratic in the row count.
pub fn op_exact_pairs(
    rows: &[Value],
    id_field: &str,
    field: &str,
    shingling: Shingling,
    threshold: f64,
) -> Result<Value> {
    validate_threshold(threshold)?;
    let (corpus, _) = build_corpus(records(rows, id_field, field), shingling)?;
    let pairs = BruteForceSearcher::new(&corpus)?.similar_pairs(threshold)?;
    Ok(json!({ "pairs": pairs }))
}

/// Group near-duplicates and annotate each row with `_dup_group` and
/// `_is_primary`. The primary is the first row of its group.
pub fn op_dedup(
    rows: &[Value],
    id_field: &str,
    field: &str,
    shingling: Shingling,
    config: LshConfig,
) -> Result<Value> {
    if rows.is_empty() {
        config.validate()?;
        return Ok(Value::Array(vec![]));
    }
    let n = rows.len();

    let (mut corpus, _) = build_corpus(records(rows, id_field, field), shingling)?;
    let threshold = config.threshold;
    let (pairs, _) = LshSearcher::new(&mut corpus, config)?.scored_pairs(threshold)?;

    let mut uf = UnionFind::new(n);
    for &(i, j, _) in &pairs {
        uf.union(i, j);
    }

    let output: Vec<Value> = rows
        .iter()
        .cloned()
        .zip(uf.groups())
        .enumerate()
        .map(|(i, (mut row, (group, root)))| {
            if let Some(obj) = row.as_object_mut() {
                obj.insert("_dup_group".into(), json!(group));
                obj.insert("_is_primary".into(), json!(root == i));
            }
            row
        })
        .collect();

    Ok(Value::Array(output))
}

/// Add a `_signature` column holding each row's MinHash signature.
pub fn op_signatures(
    rows: &[Value],
    id_field: &str,
    field: &str,
    shingling: Shingling,
    num_hashes: usize,
    seed: u64,
) -> Result<Value> {
    let (corpus, vocab) = build_corpus(records(rows, id_field, field), shingling)?;
    let family = HashFamily::new(num_hashes, vocab.len(), seed)?;

    let output: Vec<Value> = rows
        .iter()
        .cloned()
        .zip(corpus.sets())
        .map(|(mut row, set)| {
            if let Some(obj) = row.as_object_mut() {
                obj.insert("_signature".into(), json!(family.signature(set)));
            }
            row
        })
        .collect();

    Ok(Value::Array(output))
}

/// Exact and estimated Jaccard similarity of two strings.
pub fn op_jaccard(
    a: &str,
    b: &str,
    shingling: Shingling,
    num_hashes: usize,
    seed: u64,
) -> Result<Value> {
    let mut vocab = Vocabulary::new();
    let set_a = vocab.shingle_set(a, shingling)?;
    let set_b = vocab.shingle_set(b, shingling)?;
    let family = HashFamily::new(num_hashes, vocab.len(), seed)?;

    let exact = jaccard(&set_a, &set_b);
    let estimated = estimated_jaccard(&family.signature(&set_a), &family.signature(&set_b));

    Ok(json!({
        "a": a,
        "b": b,
        "shingling": shingling,
        "num_hashes": num_hashes,
        "exact": exact,
        "estimated": estimated,
        "error": (exact - estimated).abs(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_id_variants() {
        let row = json!({"id": "x", "n": 7});
        assert_eq!(get_id(&row, "id", 3), "x");
        assert_eq!(get_id(&row, "n", 3), "7");
        assert_eq!(get_id(&row, "missing", 3), "3");
        assert_eq!(get_id(&json!({"id": null}), "id", 4), "4");
    }

    #[test]
    fn union_find_lowest_root() {
        let mut uf = UnionFind::new(4);
        uf.union(3, 1);
        uf.union(1, 2);
        assert_eq!(uf.find(3), 1);
        assert_eq!(uf.find(2), 1);
        assert_eq!(uf.find(0), 0);
    }

    #[test]
    fn union_find_groups_follow_lowest_member() {
        let mut uf = UnionFind::new(5);
        uf.union(4, 1);
        uf.union(3, 0);
        uf.union(2, 4);
        assert_eq!(
            uf.groups(),
            vec![(0, 0), (1, 1), (1, 1), (0, 0), (1, 1)]
        );
    }
}
