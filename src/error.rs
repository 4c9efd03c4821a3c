//! Error types shared by the template engine
//!
//! The library reports failures through [`EngineError`]; the binary wraps
//! them in `anyhow` at the I/O edge.

use std::fmt;

use crate::path::TemplatePath;

pub type EngineResult<T> = Result<T, EngineError>;

/// Failures raised by the template/variable engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed template text (bad JSON skeleton or bad placeholder token)
    Parse(String),
    /// A placeholder's fallback chain was exhausted without a match or default
    UnresolvedVariable(TemplatePath),
    /// An inline color operation with an unrecognized name or argument
    UnknownOperation(String),
    /// Document shape disagrees with the template shape
    StructuralMismatch {
        path: TemplatePath,
        expected: &'static str,
        found: String,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "template parse error: {}", msg),
            Self::UnresolvedVariable(path) => {
                write!(f, "unresolved variable: {}", path)
            }
            Self::UnknownOperation(op) => write!(f, "unknown color operation: {}", op),
            Self::StructuralMismatch {
                path,
                expected,
                found,
            } => write!(
                f,
                "structural mismatch at {}: expected {}, found {}",
                path, expected, found
            ),
        }
    }
}

impl std::error::Error for EngineError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn display_includes_path() {
        let err = EngineError::UnresolvedVariable(TemplatePath::from_str("color.bg").unwrap());
        assert_eq!(err.to_string(), "unresolved variable: color.bg");
    }

    #[test]
    fn display_structural_mismatch() {
        let err = EngineError::StructuralMismatch {
            path: TemplatePath::from_str("tokenColors.0").unwrap(),
            expected: "string",
            found: "object".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("tokenColors.0"));
        assert!(msg.contains("expected string"));
    }
}
