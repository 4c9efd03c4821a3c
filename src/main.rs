use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use themeweave::cli::{theme_file_name, CliArgs, Command};
use themeweave::watcher::{InputChange, InputWatcher};
use themeweave::{compare, extract, substitute, DiffKind, DiffRecord, Template, VariableStore};

fn main() -> Result<()> {
    themeweave::logging::init();

    let args = CliArgs::parse();
    if let Err(message) = args.command.validate() {
        bail!(message);
    }

    match args.command {
        Command::Gen {
            template,
            variables,
            out_dir,
        } => run_gen(&template, &variables, &out_dir),
        Command::Rev {
            template,
            theme,
            output,
            threshold,
            check,
        } => run_rev(&template, &theme, output.as_deref(), threshold, check),
        Command::Diff {
            reference,
            candidate,
            json,
        } => run_diff(&reference, &candidate, json),
        Command::Watch {
            template,
            variables,
            out_dir,
        } => run_watch(&template, &variables, &out_dir),
    }
}

fn run_gen(template_path: &Path, variables: &[PathBuf], out_dir: &Path) -> Result<()> {
    let template = load_template(template_path)?;
    let failures = generate_all(&template, variables, out_dir);
    if failures > 0 {
        bail!("{failures} of {} generation(s) failed", variables.len());
    }
    Ok(())
}

/// Generate one theme per variable file. A failing document does not
/// abort its siblings; the number of failures comes back to the caller.
fn generate_all(template: &Template, variables: &[PathBuf], out_dir: &Path) -> usize {
    let mut failures = 0;
    for vars_path in variables {
        match generate_one(template, vars_path, out_dir) {
            Ok(written) => println!("wrote {}", written.display()),
            Err(e) => {
                failures += 1;
                tracing::error!("{}: {:#}", vars_path.display(), e);
                eprintln!("error: {}: {e:#}", vars_path.display());
            }
        }
    }
    failures
}

fn generate_one(template: &Template, vars_path: &Path, out_dir: &Path) -> Result<PathBuf> {
    let store = load_store(vars_path)?;
    let document = substitute(template, &store)?;

    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;
    let out_path = out_dir.join(theme_file_name(&document, vars_path));
    write_json(&out_path, &document)?;
    Ok(out_path)
}

fn run_rev(
    template_path: &Path,
    theme_path: &Path,
    output: Option<&Path>,
    threshold: f64,
    check: bool,
) -> Result<()> {
    let template = load_template(template_path)?;
    let document = load_document(theme_path)?;

    let extraction = extract(&template, &document, threshold);
    for skipped in &extraction.skipped {
        tracing::warn!("skipped {skipped}");
        eprintln!("warning: skipped {skipped}");
    }

    let store_json = serde_json::to_string_pretty(&extraction.store.to_value())?;
    match output {
        Some(path) => {
            fs::write(path, format!("{store_json}\n"))
                .with_context(|| format!("writing {}", path.display()))?;
            println!(
                "extracted {} variable(s) to {}",
                extraction.store.distinct_variables(),
                path.display()
            );
        }
        None => println!("{store_json}"),
    }

    if check {
        verify_round_trip(&template, &extraction.store, &document)?;
    }
    Ok(())
}

/// Regenerate from the extracted variables and compare against the input
/// theme, so a lossy extraction is visible immediately.
fn verify_round_trip(
    template: &Template,
    store: &VariableStore,
    original: &Value,
) -> Result<()> {
    let regenerated =
        substitute(template, store).context("regenerating from extracted variables")?;
    let report = compare(original, &regenerated);
    if report.is_identical() {
        println!("round-trip check passed: regeneration matches the input theme");
        Ok(())
    } else {
        eprintln!(
            "round-trip similarity {:.1}% ({} difference(s))",
            report.similarity(),
            report.records.len()
        );
        for record in &report.records {
            eprintln!("  {}", render_record(record));
        }
        bail!("round-trip check failed");
    }
}

fn run_diff(reference_path: &Path, candidate_path: &Path, json: bool) -> Result<()> {
    let reference = load_document(reference_path)?;
    let candidate = load_document(candidate_path)?;
    let report = compare(&reference, &candidate);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for record in &report.records {
        println!("{}", render_record(record));
    }
    if report.is_identical() {
        println!("themes match ({} value(s) compared)", report.total_leaves);
    } else {
        println!(
            "{} difference(s) across {} value(s), similarity {:.1}%",
            report.records.len(),
            report.total_leaves,
            report.similarity()
        );
    }
    Ok(())
}

fn render_record(record: &DiffRecord) -> String {
    match (record.kind, &record.before, &record.after) {
        (DiffKind::Added, _, Some(after)) => format!("+ {}: {after}", record.path),
        (_, Some(before), None) => format!("- {}: {before}", record.path),
        (_, Some(before), Some(after)) => {
            format!("~ {}: {before} -> {after}", record.path)
        }
        _ => format!("~ {}", record.path),
    }
}

fn run_watch(template_path: &Path, variables: &[PathBuf], out_dir: &Path) -> Result<()> {
    let mut template = load_template(template_path)?;
    generate_all(&template, variables, out_dir);

    let watcher = InputWatcher::new(template_path.to_path_buf(), variables.to_vec())
        .context("starting file watcher")?;
    println!("watching for changes, press Ctrl-C to stop");

    loop {
        let changes = watcher.poll_changes();
        if changes.is_empty() {
            thread::sleep(Duration::from_millis(200));
            continue;
        }

        if changes.contains(&InputChange::Template) {
            // Keep the previous AST while the template is mid-edit
            match load_template(template_path) {
                Ok(reparsed) => template = reparsed,
                Err(e) => {
                    tracing::error!("template reload failed: {e:#}");
                    eprintln!("error: template reload failed: {e:#}");
                    continue;
                }
            }
        }

        generate_all(&template, variables, out_dir);
    }
}

fn load_template(path: &Path) -> Result<Template> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("reading template {}", path.display()))?;
    Template::parse(&source).with_context(|| format!("parsing template {}", path.display()))
}

fn load_store(path: &Path) -> Result<VariableStore> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("reading variables {}", path.display()))?;
    VariableStore::from_json(&source)
        .with_context(|| format!("parsing variables {}", path.display()))
}

fn load_document(path: &Path) -> Result<Value> {
    let source =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&source).with_context(|| format!("parsing {}", path.display()))
}

fn write_json(path: &Path, value: &Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, format!("{text}\n")).with_context(|| format!("writing {}", path.display()))
}
