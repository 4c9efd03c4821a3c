//! Template parsing: JSON-shaped text with `{{ ... }}` placeholders
//!
//! A template is syntactically valid JSON once placeholder tokens are
//! treated as opaque strings, so parsing is two phases: parse the JSON
//! skeleton with serde_json, then rebuild the tree classifying each
//! string as a literal or a placeholder. The resulting [`Template`] is
//! immutable and shared read-only by the substitution and extraction
//! engines.
//!
//! Placeholder grammar:
//!
//! ```text
//! {{ path }}
//! {{ path|other.path|"literal default" }}
//! {{ color.accent.alpha(cc)|color.accent }}
//! ```
//!
//! Trailing `name(arg)` segments on a path are inline color operations.
//! A final chain entry that is not a valid path token is a literal
//! default; quoted strings, numbers, booleans and `null` are parsed as
//! JSON, anything else (e.g. a bare `#rrggbb`) is kept as a raw string.

use std::str::FromStr;

use serde_json::Value;

use crate::color::ColorOp;
use crate::error::{EngineError, EngineResult};
use crate::path::TemplatePath;

/// One alternative in a placeholder's fallback chain.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackEntry {
    /// A variable lookup, with inline color operations applied after
    /// resolution.
    Path {
        path: TemplatePath,
        ops: Vec<ColorOp>,
    },
    /// A literal value used when every preceding path misses.
    Default(Value),
}

/// Ordered, non-empty list of alternatives; the first resolvable entry
/// wins. Chains without a default can fail to resolve, which is an error
/// at substitution time, never a silent empty value.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackChain {
    entries: Vec<FallbackEntry>,
}

impl FallbackChain {
    pub fn entries(&self) -> &[FallbackEntry] {
        &self.entries
    }

    /// The first path in the chain. Used for error reporting and as the
    /// deterministic name for variables discovered by reverse extraction.
    pub fn first_path(&self) -> Option<&TemplatePath> {
        self.entries.iter().find_map(|entry| match entry {
            FallbackEntry::Path { path, .. } => Some(path),
            FallbackEntry::Default(_) => None,
        })
    }

    fn parse(body: &str) -> EngineResult<Self> {
        let parts: Vec<&str> = body.split('|').map(str::trim).collect();
        let entries = parts
            .iter()
            .enumerate()
            .map(|(i, part)| parse_entry(part, i + 1 == parts.len()))
            .collect::<EngineResult<Vec<_>>>()?;

        Ok(Self { entries })
    }
}

fn parse_entry(entry: &str, is_last: bool) -> EngineResult<FallbackEntry> {
    if entry.is_empty() {
        return Err(EngineError::Parse("empty fallback entry".to_string()));
    }

    // Quoted strings, numbers, booleans and null parse as JSON literals
    if let Ok(value) = serde_json::from_str::<Value>(entry) {
        return if is_last {
            Ok(FallbackEntry::Default(value))
        } else {
            Err(EngineError::Parse(format!(
                "literal default {entry:?} must be the final fallback entry"
            )))
        };
    }

    // Split off trailing color operations
    let segments: Vec<&str> = entry.split('.').collect();
    let first_op = segments
        .iter()
        .position(|seg| ColorOp::parse(seg).is_some())
        .unwrap_or(segments.len());

    let ops = segments[first_op..]
        .iter()
        .map(|seg| {
            ColorOp::parse(seg).unwrap_or_else(|| {
                Err(EngineError::Parse(format!(
                    "path segment {seg:?} after color operation in {entry:?}"
                )))
            })
        })
        .collect::<EngineResult<Vec<_>>>()?;

    let path_token = segments[..first_op].join(".");
    if path_token.is_empty() {
        return Err(EngineError::Parse(format!(
            "color operation without a path in {entry:?}"
        )));
    }

    if !TemplatePath::is_valid_token(&path_token) {
        // Bare non-path tokens (e.g. `#2e3440`) are literal defaults, but
        // only in final position.
        return if is_last && ops.is_empty() {
            Ok(FallbackEntry::Default(Value::String(entry.to_string())))
        } else {
            Err(EngineError::Parse(format!(
                "invalid path token {path_token:?} in placeholder"
            )))
        };
    }

    Ok(FallbackEntry::Path {
        path: TemplatePath::from_str(&path_token)?,
        ops,
    })
}

/// One node of the parsed template tree. The tree mirrors the eventual
/// theme document exactly except where placeholders stand in for values.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    /// A scalar copied verbatim into the output.
    Literal(Value),
    /// A placeholder resolved against the variable store.
    Placeholder(FallbackChain),
    /// An object skeleton; key order is preserved.
    Object(Vec<(String, TemplateNode)>),
    /// An array skeleton.
    Array(Vec<TemplateNode>),
}

/// A parsed theme template. Built once per template source, immutable for
/// the remainder of a run, and safely shareable across threads.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    root: TemplateNode,
}

impl Template {
    /// Parse raw template text into an AST.
    pub fn parse(source: &str) -> EngineResult<Self> {
        let skeleton: Value = serde_json::from_str(source)
            .map_err(|e| EngineError::Parse(format!("invalid template JSON: {e}")))?;

        Ok(Self {
            root: build_node(&skeleton)?,
        })
    }

    pub fn root(&self) -> &TemplateNode {
        &self.root
    }
}

fn build_node(value: &Value) -> EngineResult<TemplateNode> {
    match value {
        Value::String(s) => classify_string(s),
        Value::Object(map) => {
            let mut fields = Vec::with_capacity(map.len());
            for (key, val) in map {
                if key.contains("{{") || key.contains("}}") {
                    return Err(EngineError::Parse(format!(
                        "placeholder used as object key: {key:?}"
                    )));
                }
                fields.push((key.clone(), build_node(val)?));
            }
            Ok(TemplateNode::Object(fields))
        }
        Value::Array(items) => {
            let nodes = items
                .iter()
                .map(build_node)
                .collect::<EngineResult<Vec<_>>>()?;
            Ok(TemplateNode::Array(nodes))
        }
        other => Ok(TemplateNode::Literal(other.clone())),
    }
}

fn classify_string(s: &str) -> EngineResult<TemplateNode> {
    let trimmed = s.trim();

    if let Some(body) = trimmed
        .strip_prefix("{{")
        .and_then(|rest| rest.strip_suffix("}}"))
    {
        if body.contains("{{") || body.contains("}}") {
            return Err(EngineError::Parse(format!(
                "placeholder nested inside placeholder: {s:?}"
            )));
        }
        return Ok(TemplateNode::Placeholder(FallbackChain::parse(
            body.trim(),
        )?));
    }

    if trimmed.contains("{{") || trimmed.contains("}}") {
        return Err(EngineError::Parse(format!(
            "unbalanced placeholder delimiters: {s:?}"
        )));
    }

    Ok(TemplateNode::Literal(Value::String(s.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placeholder(template: &Template) -> &FallbackChain {
        fn find(node: &TemplateNode) -> Option<&FallbackChain> {
            match node {
                TemplateNode::Placeholder(chain) => Some(chain),
                TemplateNode::Object(fields) => fields.iter().find_map(|(_, n)| find(n)),
                TemplateNode::Array(items) => items.iter().find_map(find),
                TemplateNode::Literal(_) => None,
            }
        }
        find(template.root()).expect("template has no placeholder")
    }

    #[test]
    fn parses_simple_placeholder() {
        let template = Template::parse(r#"{"bg": "{{ color.background }}"}"#).unwrap();
        let chain = placeholder(&template);
        assert_eq!(chain.entries().len(), 1);
        assert_eq!(
            chain.first_path().unwrap().to_string(),
            "color.background"
        );
    }

    #[test]
    fn parses_fallback_chain_with_default() {
        let template =
            Template::parse(r##"{"fg": "{{ a.b|a.c|\"#000000\" }}"}"##).unwrap();
        let chain = placeholder(&template);
        assert_eq!(chain.entries().len(), 3);
        assert!(matches!(
            chain.entries()[2],
            FallbackEntry::Default(Value::String(ref s)) if s == "#000000"
        ));
    }

    #[test]
    fn parses_bare_hex_default() {
        let template = Template::parse(r#"{"fg": "{{ a.b|#fff }}"}"#).unwrap();
        let chain = placeholder(&template);
        assert!(matches!(
            chain.entries()[1],
            FallbackEntry::Default(Value::String(ref s)) if s == "#fff"
        ));
    }

    #[test]
    fn parses_inline_operations() {
        let template =
            Template::parse(r#"{"sel": "{{ color.accent.alpha(80)|color.accent }}"}"#).unwrap();
        let chain = placeholder(&template);
        match &chain.entries()[0] {
            FallbackEntry::Path { path, ops } => {
                assert_eq!(path.to_string(), "color.accent");
                assert_eq!(ops, &[ColorOp::Alpha(0x80)]);
            }
            other => panic!("expected path entry, got {other:?}"),
        }
    }

    #[test]
    fn chained_operations() {
        let template =
            Template::parse(r#"{"x": "{{ color.bg.lighten(10).alpha(cc) }}"}"#).unwrap();
        match &placeholder(&template).entries()[0] {
            FallbackEntry::Path { ops, .. } => {
                assert_eq!(ops, &[ColorOp::Lighten(10), ColorOp::Alpha(0xcc)]);
            }
            other => panic!("expected path entry, got {other:?}"),
        }
    }

    #[test]
    fn literal_structure_is_preserved() {
        let template = Template::parse(
            r#"{"name": "Night", "tokenColors": [{"scope": "comment"}], "version": 2}"#,
        )
        .unwrap();
        match template.root() {
            TemplateNode::Object(fields) => {
                let keys: Vec<_> = fields.iter().map(|(k, _)| k.as_str()).collect();
                assert_eq!(keys, ["name", "tokenColors", "version"]);
            }
            other => panic!("expected object root, got {other:?}"),
        }
    }

    #[test]
    fn rejects_invalid_json_skeleton() {
        assert!(matches!(
            Template::parse(r##"{"bg": "#fff""##),
            Err(EngineError::Parse(_))
        ));
    }

    #[test]
    fn rejects_unbalanced_delimiters() {
        assert!(Template::parse(r#"{"bg": "{{ color.bg"}"#).is_err());
        assert!(Template::parse(r#"{"bg": "color.bg }}"}"#).is_err());
        assert!(Template::parse(r#"{"bg": "x{{ color.bg }}"}"#).is_err());
    }

    #[test]
    fn rejects_nested_placeholder() {
        assert!(Template::parse(r#"{"bg": "{{ a.{{ b }} }}"}"#).is_err());
    }

    #[test]
    fn rejects_placeholder_as_key() {
        assert!(Template::parse(r##"{"{{ key }}": "#fff"}"##).is_err());
    }

    #[test]
    fn rejects_empty_path() {
        assert!(Template::parse(r#"{"bg": "{{  }}"}"#).is_err());
        assert!(Template::parse(r#"{"bg": "{{ a.b| }}"}"#).is_err());
    }

    #[test]
    fn rejects_default_before_end_of_chain() {
        assert!(Template::parse(r##"{"bg": "{{ \"#fff\"|a.b }}"}"##).is_err());
    }

    #[test]
    fn rejects_unknown_operation() {
        assert!(matches!(
            Template::parse(r#"{"bg": "{{ color.bg.blend(50) }}"}"#),
            Err(EngineError::UnknownOperation(_))
        ));
    }
}
