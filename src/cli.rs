//! Command-line argument parsing
//!
//! Four subcommands:
//! - `gen` - forward generation, one template driving one or more
//!   variable files
//! - `rev` - reverse extraction from an existing theme
//! - `diff` - semantic comparison of two theme documents
//! - `watch` - regenerate whenever the template or variables change

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "themeweave",
    version,
    about = "Generate, extract and compare editor theme files"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate theme files from a template and variable files
    Gen {
        /// Template file
        template: PathBuf,
        /// One or more variable files, each producing a theme
        #[arg(value_name = "VARS", required = true)]
        variables: Vec<PathBuf>,
        /// Directory generated themes are written to
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,
    },
    /// Extract a variable file from an existing theme
    Rev {
        /// Template file describing the theme's structure
        template: PathBuf,
        /// Concrete theme file to extract variables from
        theme: PathBuf,
        /// Variable file to write; stdout when omitted
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Maximum RGB distance at which two colors share a variable
        #[arg(
            short,
            long,
            value_name = "DIST",
            default_value_t = 0.0,
            allow_negative_numbers = true
        )]
        threshold: f64,
        /// Verify the extracted variables regenerate the input theme
        #[arg(long)]
        check: bool,
    },
    /// Compare two theme files semantically
    Diff {
        /// Reference theme
        reference: PathBuf,
        /// Candidate theme
        candidate: PathBuf,
        /// Emit the difference records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Regenerate themes whenever the template or variables change
    Watch {
        /// Template file
        template: PathBuf,
        /// One or more variable files, each producing a theme
        #[arg(value_name = "VARS", required = true)]
        variables: Vec<PathBuf>,
        /// Directory generated themes are written to
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,
    },
}

impl Command {
    /// Validate argument values clap's types cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if let Command::Rev { threshold, .. } = self {
            if !threshold.is_finite() || *threshold < 0.0 {
                return Err(format!(
                    "threshold must be a non-negative number, got {threshold}"
                ));
            }
        }
        Ok(())
    }
}

/// File name for a generated theme: the document's top-level `name` key
/// when it has one, otherwise the variable file's stem.
pub fn theme_file_name(document: &Value, variables: &Path) -> String {
    let name = document
        .get("name")
        .and_then(Value::as_str)
        .map(slugify)
        .filter(|s| !s.is_empty());

    let stem = name.unwrap_or_else(|| {
        variables
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "theme".to_string())
    });

    format!("{stem}.json")
}

fn slugify(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_gen_with_multiple_variable_files() {
        let args =
            CliArgs::try_parse_from(["themeweave", "gen", "t.json", "dark.json", "light.json"])
                .unwrap();
        match args.command {
            Command::Gen {
                template,
                variables,
                out_dir,
            } => {
                assert_eq!(template, PathBuf::from("t.json"));
                assert_eq!(variables.len(), 2);
                assert_eq!(out_dir, PathBuf::from("."));
            }
            other => panic!("expected gen, got {other:?}"),
        }
    }

    #[test]
    fn gen_requires_at_least_one_variable_file() {
        assert!(CliArgs::try_parse_from(["themeweave", "gen", "t.json"]).is_err());
    }

    #[test]
    fn rev_threshold_defaults_to_zero() {
        let args =
            CliArgs::try_parse_from(["themeweave", "rev", "t.json", "theme.json"]).unwrap();
        match args.command {
            Command::Rev {
                threshold, check, ..
            } => {
                assert_eq!(threshold, 0.0);
                assert!(!check);
            }
            other => panic!("expected rev, got {other:?}"),
        }
    }

    #[test]
    fn negative_threshold_parses_but_fails_validation() {
        let args = CliArgs::try_parse_from([
            "themeweave",
            "rev",
            "t.json",
            "theme.json",
            "--threshold",
            "-3",
        ])
        .unwrap();
        match &args.command {
            Command::Rev { threshold, .. } => assert_eq!(*threshold, -3.0),
            other => panic!("expected rev, got {other:?}"),
        }
        assert!(args.command.validate().is_err());
    }

    #[test]
    fn nan_threshold_fails_validation() {
        let args = CliArgs::try_parse_from([
            "themeweave",
            "rev",
            "t.json",
            "theme.json",
            "--threshold",
            "NaN",
        ])
        .unwrap();
        assert!(args.command.validate().is_err());
    }

    #[test]
    fn file_name_prefers_document_name() {
        let doc = json!({"name": "Nord Dark", "colors": {}});
        assert_eq!(
            theme_file_name(&doc, Path::new("vars/base.json")),
            "nord-dark.json"
        );
    }

    #[test]
    fn file_name_falls_back_to_variable_stem() {
        let doc = json!({"colors": {}});
        assert_eq!(
            theme_file_name(&doc, Path::new("vars/dark.json")),
            "dark.json"
        );
    }

    #[test]
    fn slug_collapses_punctuation() {
        assert_eq!(slugify("Ayu (Mirage) -- v2!"), "ayu-mirage-v2");
    }
}
