//! themeweave - template-driven editor theme tooling
//!
//! This crate provides the core engine for converting between a
//! human-authored variable set and concrete editor-theme JSON documents:
//! forward generation (template + variables), reverse extraction
//! (template + theme), and a semantic comparator.
//!
//! The core modules are pure: they consume raw template text, a variable
//! mapping, and theme documents, and never touch the filesystem or the
//! terminal. File I/O, argument parsing, and the watch loop live in the
//! binary.

pub mod cli;
pub mod color;
pub mod diff;
pub mod error;
pub mod extract;
pub mod logging;
pub mod path;
pub mod substitute;
pub mod template;
pub mod vars;
pub mod watcher;

// Re-export commonly used types
pub use color::ColorValue;
pub use diff::{compare, DiffKind, DiffRecord, DiffReport};
pub use error::{EngineError, EngineResult};
pub use extract::{extract, Extraction};
pub use path::TemplatePath;
pub use substitute::{regenerate, substitute};
pub use template::Template;
pub use vars::VariableStore;
