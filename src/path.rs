//! Dotted paths addressing locations in a nested document
//!
//! A [`TemplatePath`] is an ordered, non-empty list of segments parsed from
//! dotted notation (`color.primary`). The same type addresses variable
//! store sections and positions inside theme documents (where numeric
//! segments index into arrays).

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::EngineError;

/// An ordered sequence of string segments identifying a location in a
/// nested document. Empty paths are invalid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplatePath(Vec<String>);

impl TemplatePath {
    /// Build a path directly from segments.
    ///
    /// Used by document walkers that synthesize paths (array indices and
    /// keys pulled straight from JSON); segment validation only applies to
    /// authored dotted notation via `FromStr`.
    pub fn from_segments(segments: Vec<String>) -> Self {
        debug_assert!(!segments.is_empty());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// New path with one more segment appended.
    pub fn child(&self, segment: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.to_string());
        Self(segments)
    }

    /// True when `s` is usable as a dotted path token: non-empty segments
    /// of alphanumerics, `_` and `-`. Quoted strings, numbers and hex
    /// colors fail this check and are treated as literal defaults by the
    /// fallback-chain parser.
    pub fn is_valid_token(s: &str) -> bool {
        !s.is_empty()
            && s.split('.').all(|seg| {
                !seg.is_empty()
                    && seg
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            })
            && s.split('.').any(|seg| !seg.chars().all(|c| c.is_ascii_digit()))
    }
}

impl FromStr for TemplatePath {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EngineError::Parse("empty path".to_string()));
        }

        let segments: Vec<String> = s.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(EngineError::Parse(format!("empty segment in path: {s:?}")));
        }

        Ok(Self(segments))
    }
}

impl fmt::Display for TemplatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl Serialize for TemplatePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dotted_path() {
        let path = TemplatePath::from_str("color.primary").unwrap();
        assert_eq!(path.segments(), ["color", "primary"]);
        assert_eq!(path.to_string(), "color.primary");
    }

    #[test]
    fn parses_single_segment() {
        let path = TemplatePath::from_str("background").unwrap();
        assert_eq!(path.segments(), ["background"]);
    }

    #[test]
    fn rejects_empty_path() {
        assert!(TemplatePath::from_str("").is_err());
        assert!(TemplatePath::from_str("   ").is_err());
    }

    #[test]
    fn rejects_empty_segments() {
        assert!(TemplatePath::from_str("color..primary").is_err());
        assert!(TemplatePath::from_str(".color").is_err());
        assert!(TemplatePath::from_str("color.").is_err());
    }

    #[test]
    fn equality_is_segment_wise() {
        let a = TemplatePath::from_str("a.b").unwrap();
        let b = TemplatePath::from_str("a.b").unwrap();
        let c = TemplatePath::from_str("a.c").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn child_appends_segment() {
        let path = TemplatePath::from_str("ui").unwrap();
        assert_eq!(path.child("editor").to_string(), "ui.editor");
    }

    #[test]
    fn token_validation() {
        assert!(TemplatePath::is_valid_token("color.primary"));
        assert!(TemplatePath::is_valid_token("status_bar.fg-active"));
        assert!(!TemplatePath::is_valid_token("#000000"));
        assert!(!TemplatePath::is_valid_token("\"literal\""));
        assert!(!TemplatePath::is_valid_token("12"));
        assert!(!TemplatePath::is_valid_token(""));
        assert!(!TemplatePath::is_valid_token("a..b"));
    }

    #[test]
    fn serializes_as_dotted_string() {
        let path = TemplatePath::from_str("a.b.c").unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"a.b.c\"");
    }
}
