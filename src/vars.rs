//! The variable store: a nested, dotted-path addressable mapping
//!
//! Loaded read-only for forward generation, built up incrementally by
//! reverse extraction. Sections are JSON objects; leaves are color hex
//! strings or plain scalars. Insertion order is preserved (serde_json's
//! `preserve_order` map) so serialized variable files are deterministic.
//!
//! A leaf string starting with `$` is a reference to another variable by
//! dotted path (`"$color.background"`). References are produced by
//! reverse extraction when several placeholders collapse into one named
//! variable; the substitution engine chases them with a fixed depth cap.

use serde_json::{Map, Value};

use crate::error::{EngineError, EngineResult};
use crate::path::TemplatePath;

/// Prefix marking a leaf value as a reference to another variable.
///
/// A leaf is only treated as a reference when the text after the sigil is
/// a valid dotted path; other `$`-strings (e.g. `"$1,000"`) are ordinary
/// values. Reverse extraction refuses to store a document string that
/// would pass the reference test, so the ambiguity never reaches a store.
pub const REFERENCE_SIGIL: char = '$';

/// Nested mapping of named sections with scalar leaves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableStore {
    root: Map<String, Value>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a parsed variable document. The document root
    /// must be an object.
    pub fn from_value(value: Value) -> EngineResult<Self> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(EngineError::Parse(format!(
                "variable document root must be an object, found {}",
                type_name(&other)
            ))),
        }
    }

    /// Parse a variable document from JSON text.
    pub fn from_json(text: &str) -> EngineResult<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| EngineError::Parse(format!("invalid variable JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Look up a value by dotted path. Misses return `None`; this never
    /// errors, so fallback handling stays explicit at the call site.
    pub fn lookup(&self, path: &TemplatePath) -> Option<&Value> {
        let mut current = self.root.get(&path.segments()[0])?;
        for segment in &path.segments()[1..] {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Insert a value at a dotted path, creating intermediate sections as
    /// needed. An existing leaf at the target path is overwritten; an
    /// existing leaf blocking an intermediate segment is replaced by a
    /// section.
    pub fn insert(&mut self, path: &TemplatePath, value: Value) {
        let (last, rest) = path
            .segments()
            .split_last()
            .expect("TemplatePath is never empty");

        let mut current = &mut self.root;
        for segment in rest {
            let entry = current
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            current = entry.as_object_mut().expect("just ensured object");
        }
        current.insert(last.clone(), value);
    }

    /// Number of scalar leaves, excluding reference aliases. This is the
    /// count of distinct variables the store defines.
    pub fn distinct_variables(&self) -> usize {
        fn count(map: &Map<String, Value>) -> usize {
            map.values()
                .map(|v| match v {
                    Value::Object(section) => count(section),
                    Value::String(s) if s.starts_with(REFERENCE_SIGIL) => 0,
                    _ => 1,
                })
                .sum()
        }
        count(&self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// The store as a plain JSON document (section order preserved).
    pub fn to_value(&self) -> Value {
        Value::Object(self.root.clone())
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
