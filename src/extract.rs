//! Reverse extraction: template + concrete theme document -> variable store
//!
//! Walks the template tree and the document in lock step. Wherever the
//! template holds a placeholder, the document value underneath it is a
//! discovered variable binding. Discovered colors are clustered: a new
//! color within `threshold` RGB distance of an already-discovered color
//! (with identical alpha) does not create a new variable, it becomes a
//! `$`-reference to the existing one. Non-color scalars cluster by exact
//! equality.
//!
//! Extraction is total: structural mismatches, lossy operation chains and
//! conflicting bindings skip the affected path and keep going, so a partial
//! store plus a skip list always comes back.

use std::fmt;

use serde_json::Value;

use crate::color::{invert_ops, ColorOp, ColorValue};
use crate::error::{EngineError, EngineResult};
use crate::path::TemplatePath;
use crate::template::{FallbackChain, FallbackEntry, Template, TemplateNode};
use crate::vars::{VariableStore, REFERENCE_SIGIL};

/// Result of reverse extraction: the variables recovered plus every
/// document path that could not contribute a binding.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub store: VariableStore,
    pub skipped: Vec<Skipped>,
}

impl Extraction {
    /// True when every placeholder produced a binding.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    /// Strict form for callers that treat coverage gaps as fatal: the
    /// store only when nothing was skipped, otherwise the first skip as
    /// an error.
    pub fn into_store_strict(self) -> EngineResult<VariableStore> {
        match self.skipped.into_iter().next() {
            None => Ok(self.store),
            Some(skipped) => Err(skipped.into_error()),
        }
    }
}

/// A document path extraction had to give up on, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct Skipped {
    pub path: TemplatePath,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Document shape diverges from the template here.
    StructuralMismatch {
        expected: &'static str,
        found: String,
    },
    /// The placeholder's operation chain loses information, so the
    /// underlying variable cannot be recovered from the output color.
    LossyOperation,
    /// Operations are present but the document value is not a color.
    NotAColor,
    /// The variable already holds a value this binding disagrees with.
    ConflictingValue,
    /// The document value collides with the `$`-reference syntax and
    /// cannot be stored without being chased at substitution time.
    ReservedReference,
}

impl Skipped {
    fn into_error(self) -> EngineError {
        match self.reason {
            SkipReason::StructuralMismatch { expected, found } => {
                EngineError::StructuralMismatch {
                    path: self.path,
                    expected,
                    found,
                }
            }
            SkipReason::LossyOperation => EngineError::Parse(format!(
                "{}: operation chain is not invertible",
                self.path
            )),
            SkipReason::NotAColor => EngineError::Parse(format!(
                "{}: operations applied to a non-color value",
                self.path
            )),
            SkipReason::ConflictingValue => EngineError::StructuralMismatch {
                path: self.path,
                expected: "value consistent with the earlier binding",
                found: "conflicting value".to_string(),
            },
            SkipReason::ReservedReference => EngineError::Parse(format!(
                "{}: value collides with the `$` reference syntax",
                self.path
            )),
        }
    }
}

impl fmt::Display for Skipped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            SkipReason::StructuralMismatch { expected, found } => {
                write!(
                    f,
                    "{}: structural mismatch, expected {expected}, found {found}",
                    self.path
                )
            }
            SkipReason::LossyOperation => {
                write!(f, "{}: operation chain is not invertible", self.path)
            }
            SkipReason::NotAColor => {
                write!(f, "{}: operations applied to a non-color value", self.path)
            }
            SkipReason::ConflictingValue => {
                write!(f, "{}: conflicts with an earlier binding", self.path)
            }
            SkipReason::ReservedReference => {
                write!(
                    f,
                    "{}: value collides with the `$` reference syntax",
                    self.path
                )
            }
        }
    }
}

/// Recover a variable store from a concrete document and the template it
/// was (or could have been) generated from. `threshold` is the maximum
/// RGB distance at which two discovered colors collapse into one variable;
/// at `0.0` extraction is exact and round-trips through substitution.
pub fn extract(template: &Template, document: &Value, threshold: f64) -> Extraction {
    let mut extractor = Extractor {
        threshold,
        store: VariableStore::new(),
        colors: Vec::new(),
        scalars: Vec::new(),
        skipped: Vec::new(),
    };

    let mut stack = Vec::new();
    extractor.walk(template.root(), document, &mut stack);

    Extraction {
        store: extractor.store,
        skipped: extractor.skipped,
    }
}

struct Extractor {
    threshold: f64,
    store: VariableStore,
    /// Every observed color in discovery order, each recorded with the
    /// root name of its cluster. Matching against all observed values
    /// (not just cluster roots) keeps the set of comparison points
    /// independent of the threshold, so widening the threshold can only
    /// merge clusters, never strand a value.
    colors: Vec<(TemplatePath, ColorValue)>,
    /// Directly-bound non-color scalars in discovery order.
    scalars: Vec<(TemplatePath, Value)>,
    skipped: Vec<Skipped>,
}

impl Extractor {
    fn walk(&mut self, node: &TemplateNode, value: &Value, stack: &mut Vec<String>) {
        match node {
            // Literal template nodes carry no bindings
            TemplateNode::Literal(_) => {}
            TemplateNode::Placeholder(chain) => self.bind(chain, value, stack),
            TemplateNode::Object(fields) => {
                let Some(map) = value.as_object() else {
                    self.mismatch(stack, "object", found(value));
                    return;
                };
                for (key, child) in fields {
                    stack.push(key.clone());
                    match map.get(key) {
                        Some(doc_child) => self.walk(child, doc_child, stack),
                        None => self.mismatch(stack, "value", "absent key".to_string()),
                    }
                    stack.pop();
                }
            }
            TemplateNode::Array(items) => {
                let Some(doc_items) = value.as_array() else {
                    self.mismatch(stack, "array", found(value));
                    return;
                };
                if doc_items.len() != items.len() {
                    self.mismatch(
                        stack,
                        "array of matching length",
                        format!("array of {} elements", doc_items.len()),
                    );
                }
                for (index, (child, doc_child)) in
                    items.iter().zip(doc_items).enumerate()
                {
                    stack.push(index.to_string());
                    self.walk(child, doc_child, stack);
                    stack.pop();
                }
            }
        }
    }

    fn bind(&mut self, chain: &FallbackChain, value: &Value, stack: &[String]) {
        let entry = chain.entries().iter().find_map(|entry| match entry {
            FallbackEntry::Path { path, ops } => Some((path, ops.as_slice())),
            FallbackEntry::Default(_) => None,
        });

        // Default-only chains name no variable; the document value must
        // simply agree with the default.
        let Some((name, ops)) = entry else {
            let agrees = match chain.entries().last() {
                Some(FallbackEntry::Default(default)) => equivalent(default, value),
                _ => false,
            };
            if !agrees {
                self.skip(stack, SkipReason::ConflictingValue);
            }
            return;
        };

        match value {
            Value::Object(_) | Value::Array(_) => {
                self.mismatch(stack, "scalar", found(value));
            }
            Value::String(s) => match s.parse::<ColorValue>() {
                Ok(color) => self.bind_color(name, ops, color, stack),
                Err(_) if ops.is_empty() => {
                    self.bind_scalar(name, value, stack);
                }
                Err(_) => self.skip(stack, SkipReason::NotAColor),
            },
            _ if ops.is_empty() => self.bind_scalar(name, value, stack),
            _ => self.skip(stack, SkipReason::NotAColor),
        }
    }

    fn bind_color(
        &mut self,
        name: &TemplatePath,
        ops: &[ColorOp],
        observed: ColorValue,
        stack: &[String],
    ) {
        let Some(base) = invert_ops(&observed, ops) else {
            self.skip(stack, SkipReason::LossyOperation);
            return;
        };

        if let Some(existing) = self.resolve_binding(name) {
            let matches = existing
                .as_str()
                .and_then(|s| s.parse::<ColorValue>().ok())
                .is_some_and(|prev| {
                    prev.alpha() == base.alpha()
                        && prev.distance(&base) <= self.threshold
                });
            if !matches {
                self.skip(stack, SkipReason::ConflictingValue);
            }
            return;
        }

        // Nearest observed color with identical alpha, within threshold;
        // a match binds this name to that value's cluster root.
        let nearest_root = self
            .colors
            .iter()
            .filter(|(_, c)| c.alpha() == base.alpha())
            .map(|(root, c)| (root, c.distance(&base)))
            .filter(|(_, d)| *d <= self.threshold)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(root, _)| root.clone());

        match nearest_root {
            Some(root) => {
                self.store
                    .insert(name, Value::String(format!("{REFERENCE_SIGIL}{root}")));
                self.colors.push((root, base));
            }
            None => {
                self.store.insert(name, Value::String(base.to_string()));
                self.colors.push((name.clone(), base));
            }
        }
    }

    fn bind_scalar(&mut self, name: &TemplatePath, value: &Value, stack: &[String]) {
        // A string the substitution engine would chase as a reference
        // cannot be stored verbatim; other `$`-strings are plain values.
        if let Value::String(s) = value {
            if s.starts_with(REFERENCE_SIGIL) && TemplatePath::is_valid_token(&s[1..]) {
                self.skip(stack, SkipReason::ReservedReference);
                return;
            }
        }

        if let Some(existing) = self.resolve_binding(name) {
            if existing != *value {
                self.skip(stack, SkipReason::ConflictingValue);
            }
            return;
        }

        let representative = self
            .scalars
            .iter()
            .find(|(_, v)| v == value)
            .map(|(p, _)| p.clone());

        match representative {
            Some(rep) => {
                self.store
                    .insert(name, Value::String(format!("{REFERENCE_SIGIL}{rep}")));
            }
            None => {
                self.store.insert(name, value.clone());
                self.scalars.push((name.clone(), value.clone()));
            }
        }
    }

    /// Current value bound under `name`, with references followed. Only
    /// references produced by this extraction exist, so one hop suffices;
    /// the loop guards against hand-edited inputs all the same.
    fn resolve_binding(&self, name: &TemplatePath) -> Option<Value> {
        let mut current = self.store.lookup(name)?;
        for _ in 0..8 {
            match current {
                Value::String(s)
                    if s.starts_with(REFERENCE_SIGIL)
                        && TemplatePath::is_valid_token(&s[1..]) =>
                {
                    let target: TemplatePath = s[1..].parse().ok()?;
                    current = self.store.lookup(&target)?;
                }
                _ => return Some(current.clone()),
            }
        }
        None
    }

    fn mismatch(&mut self, stack: &[String], expected: &'static str, found: String) {
        self.skip(stack, SkipReason::StructuralMismatch { expected, found });
    }

    fn skip(&mut self, stack: &[String], reason: SkipReason) {
        self.skipped.push(Skipped {
            path: doc_path(stack),
            reason,
        });
    }
}

fn doc_path(stack: &[String]) -> TemplatePath {
    if stack.is_empty() {
        TemplatePath::from_segments(vec!["(root)".to_string()])
    } else {
        TemplatePath::from_segments(stack.to_vec())
    }
}

/// Scalar equality with colors compared in normalized form.
fn equivalent(a: &Value, b: &Value) -> bool {
    if let (Value::String(a), Value::String(b)) = (a, b) {
        if let (Ok(ca), Ok(cb)) = (a.parse::<ColorValue>(), b.parse::<ColorValue>()) {
            return ca == cb;
        }
    }
    a == b
}

fn found(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "bool".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "object".to_string(),
    }
}
