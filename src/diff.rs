//! Semantic comparison of two theme documents
//!
//! Values are normalized before comparison: colors canonicalize (so
//! `#FFF` equals `#ffffff`), other strings case-fold. Differences come
//! back as a flat, deterministically-ordered record list: the reference
//! document's key order first (covering dropped and changed keys), then
//! the candidate's exclusive keys (covering additions). A key present
//! only in the reference is reported as `Changed` with an absent `after`;
//! a key present only in the candidate is `Added`.

use serde::Serialize;
use serde_json::Value;

use crate::color::ColorValue;
use crate::path::TemplatePath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Added,
    Removed,
    Changed,
}

/// One difference between the reference and candidate documents. `before`
/// and `after` carry the raw (non-normalized) values for inspection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffRecord {
    pub path: TemplatePath,
    pub kind: DiffKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<Value>,
}

/// All differences plus the leaf count of the compared union, which
/// callers use for similarity percentages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffReport {
    pub records: Vec<DiffRecord>,
    pub total_leaves: usize,
}

impl DiffReport {
    pub fn is_identical(&self) -> bool {
        self.records.is_empty()
    }

    /// Percentage of compared leaves with no difference. An empty
    /// comparison is fully similar.
    pub fn similarity(&self) -> f64 {
        if self.total_leaves == 0 {
            return 100.0;
        }
        let differing: usize = self.records.iter().map(|r| r.leaves()).sum();
        100.0 - 100.0 * differing as f64 / self.total_leaves as f64
    }
}

impl DiffRecord {
    /// Leaves covered by this record; a dropped or added subtree counts
    /// all of its scalars.
    fn leaves(&self) -> usize {
        let before = self.before.as_ref().map_or(0, count_leaves);
        let after = self.after.as_ref().map_or(0, count_leaves);
        before.max(after)
    }
}

/// Compare two well-formed documents. Pure and total: comparison itself
/// never fails; JSON validity is the caller's concern.
pub fn compare(reference: &Value, candidate: &Value) -> DiffReport {
    let mut walker = Walker {
        records: Vec::new(),
        total_leaves: 0,
    };
    let mut stack = Vec::new();
    walker.walk(reference, candidate, &mut stack);

    DiffReport {
        records: walker.records,
        total_leaves: walker.total_leaves,
    }
}

struct Walker {
    records: Vec<DiffRecord>,
    total_leaves: usize,
}

impl Walker {
    fn walk(&mut self, reference: &Value, candidate: &Value, stack: &mut Vec<String>) {
        match (reference, candidate) {
            (Value::Object(ref_map), Value::Object(cand_map)) => {
                for (key, ref_val) in ref_map {
                    stack.push(key.clone());
                    match cand_map.get(key) {
                        Some(cand_val) => self.walk(ref_val, cand_val, stack),
                        None => self.dropped(ref_val, stack),
                    }
                    stack.pop();
                }
                for (key, cand_val) in cand_map {
                    if !ref_map.contains_key(key) {
                        stack.push(key.clone());
                        self.added(cand_val, stack);
                        stack.pop();
                    }
                }
            }
            (Value::Array(ref_items), Value::Array(cand_items)) => {
                for (index, ref_val) in ref_items.iter().enumerate() {
                    stack.push(index.to_string());
                    match cand_items.get(index) {
                        Some(cand_val) => self.walk(ref_val, cand_val, stack),
                        None => self.dropped(ref_val, stack),
                    }
                    stack.pop();
                }
                for (index, cand_val) in cand_items.iter().enumerate().skip(ref_items.len()) {
                    stack.push(index.to_string());
                    self.added(cand_val, stack);
                    stack.pop();
                }
            }
            (reference, candidate) => {
                let leaves = count_leaves(reference).max(count_leaves(candidate));
                self.total_leaves += leaves;
                if !normalized_eq(reference, candidate) {
                    self.records.push(DiffRecord {
                        path: doc_path(stack),
                        kind: DiffKind::Changed,
                        before: Some(reference.clone()),
                        after: Some(candidate.clone()),
                    });
                }
            }
        }
    }

    /// Key present only in the reference: `Changed` with an absent after.
    fn dropped(&mut self, reference: &Value, stack: &[String]) {
        self.total_leaves += count_leaves(reference);
        self.records.push(DiffRecord {
            path: doc_path(stack),
            kind: DiffKind::Changed,
            before: Some(reference.clone()),
            after: None,
        });
    }

    fn added(&mut self, candidate: &Value, stack: &[String]) {
        self.total_leaves += count_leaves(candidate);
        self.records.push(DiffRecord {
            path: doc_path(stack),
            kind: DiffKind::Added,
            before: None,
            after: Some(candidate.clone()),
        });
    }
}

/// Scalar equality after normalization: colors canonicalize, other
/// strings case-fold, everything else compares structurally.
fn normalized_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(a), Value::String(b)) => {
            match (a.parse::<ColorValue>(), b.parse::<ColorValue>()) {
                (Ok(ca), Ok(cb)) => ca == cb,
                _ => a.to_lowercase() == b.to_lowercase(),
            }
        }
        _ => a == b,
    }
}

fn count_leaves(value: &Value) -> usize {
    match value {
        Value::Object(map) => map.values().map(count_leaves).sum(),
        Value::Array(items) => items.iter().map(count_leaves).sum(),
        _ => 1,
    }
}

fn doc_path(stack: &[String]) -> TemplatePath {
    if stack.is_empty() {
        TemplatePath::from_segments(vec!["(root)".to_string()])
    } else {
        TemplatePath::from_segments(stack.to_vec())
    }
}
