//! Forward generation: template + variable store -> theme document
//!
//! Walks the template depth-first, copying literal nodes verbatim and
//! resolving each placeholder's fallback chain against the store. Color
//! strings are emitted in canonical lowercase form so identical inputs
//! always produce byte-identical output. Substitution is all-or-nothing
//! per document; batch callers decide whether sibling documents continue
//! after a failure.

use std::str::FromStr;

use serde_json::{Map, Value};

use crate::color::{apply_ops, ColorOp, ColorValue};
use crate::error::{EngineError, EngineResult};
use crate::path::TemplatePath;
use crate::template::{FallbackChain, FallbackEntry, Template, TemplateNode};
use crate::vars::{VariableStore, REFERENCE_SIGIL};

/// Reference chains longer than this are treated as cycles.
const MAX_REFERENCE_DEPTH: usize = 8;

/// Produce a concrete theme document from a template and a variable
/// store.
pub fn substitute(template: &Template, store: &VariableStore) -> EngineResult<Value> {
    render(template.root(), store)
}

/// Entry point for watch-mode orchestration: same contract as
/// [`substitute`], re-invoked on every detected input change.
pub fn regenerate(template: &Template, store: &VariableStore) -> EngineResult<Value> {
    substitute(template, store)
}

fn render(node: &TemplateNode, store: &VariableStore) -> EngineResult<Value> {
    match node {
        TemplateNode::Literal(value) => Ok(value.clone()),
        TemplateNode::Placeholder(chain) => resolve_chain(chain, store),
        TemplateNode::Object(fields) => {
            let mut map = Map::with_capacity(fields.len());
            for (key, child) in fields {
                map.insert(key.clone(), render(child, store)?);
            }
            Ok(Value::Object(map))
        }
        TemplateNode::Array(items) => {
            let values = items
                .iter()
                .map(|item| render(item, store))
                .collect::<EngineResult<Vec<_>>>()?;
            Ok(Value::Array(values))
        }
    }
}

fn resolve_chain(chain: &FallbackChain, store: &VariableStore) -> EngineResult<Value> {
    let mut first_missed: Option<&TemplatePath> = None;

    for entry in chain.entries() {
        match entry {
            FallbackEntry::Path { path, ops } => {
                first_missed.get_or_insert(path);
                let Some(value) = resolve_path(store, path)? else {
                    continue;
                };
                match finish_value(value, ops) {
                    Some(resolved) => return Ok(resolved),
                    None => {
                        tracing::debug!(
                            path = %path,
                            "color operation on non-color value, trying next fallback"
                        );
                        continue;
                    }
                }
            }
            FallbackEntry::Default(value) => return Ok(canonicalize(value)),
        }
    }

    match first_missed {
        Some(path) => Err(EngineError::UnresolvedVariable(path.clone())),
        // Chains are non-empty and defaults always resolve
        None => Err(EngineError::Parse("empty fallback chain".to_string())),
    }
}

/// Follow the path through the store, chasing `$`-reference leaves up to
/// the depth cap. A missing path or dangling reference is a miss (the
/// chain falls through); a reference cycle is an error.
fn resolve_path<'a>(
    store: &'a VariableStore,
    path: &TemplatePath,
) -> EngineResult<Option<&'a Value>> {
    let Some(mut current) = store.lookup(path) else {
        return Ok(None);
    };

    for _ in 0..MAX_REFERENCE_DEPTH {
        match current {
            Value::String(s) if s.starts_with(REFERENCE_SIGIL) => {
                // Only chase when the remainder is a real path; other
                // `$`-strings are ordinary values.
                let Ok(target) = TemplatePath::from_str(&s[1..]) else {
                    return Ok(Some(current));
                };
                if !TemplatePath::is_valid_token(&s[1..]) {
                    return Ok(Some(current));
                }
                match store.lookup(&target) {
                    Some(next) => current = next,
                    None => return Ok(None),
                }
            }
            _ => return Ok(Some(current)),
        }
    }

    Err(EngineError::UnresolvedVariable(path.clone()))
}

/// Apply inline ops and canonicalize. Returns `None` when ops are present
/// but the resolved value is not a color, which sends resolution to the
/// next fallback entry.
fn finish_value(value: &Value, ops: &[ColorOp]) -> Option<Value> {
    if ops.is_empty() {
        return Some(canonicalize(value));
    }

    match value {
        Value::String(s) => s
            .parse::<ColorValue>()
            .ok()
            .map(|color| Value::String(apply_ops(&color, ops).to_string())),
        _ => None,
    }
}

/// Color-looking strings are emitted in canonical lowercase form; other
/// values pass through untouched.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::String(s) => match s.parse::<ColorValue>() {
            Ok(color) => Value::String(color.to_string()),
            Err(_) => value.clone(),
        },
        _ => value.clone(),
    }
}
