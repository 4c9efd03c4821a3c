//! File system watching for the regeneration loop
//!
//! Uses the `notify` crate with debouncing to detect changes to the
//! template and variable files. The watcher only reports *which kind* of
//! input changed; the watch loop decides whether that means a template
//! re-parse or just a variable re-resolution.

use notify_debouncer_mini::{new_debouncer, DebouncedEventKind, Debouncer};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

/// Which regeneration input changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputChange {
    /// The template file changed; the AST must be re-parsed.
    Template,
    /// A variable file changed; only re-resolution is needed.
    Variables,
}

/// Debounced watcher over one template file and its variable files.
pub struct InputWatcher {
    _debouncer: Debouncer<notify::RecommendedWatcher>,
    rx: Receiver<Result<Vec<notify_debouncer_mini::DebouncedEvent>, notify::Error>>,
    template: PathBuf,
    variables: Vec<PathBuf>,
}

impl InputWatcher {
    /// Watch a template and a set of variable files. Events are debounced
    /// with a 500ms delay to coalesce editor save bursts.
    pub fn new(template: PathBuf, variables: Vec<PathBuf>) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();
        let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;

        // Watch parent directories, not the files themselves: editors
        // replace files on save, which would drop a direct file watch.
        let mut watched_dirs: Vec<PathBuf> = Vec::new();
        for input in std::iter::once(&template).chain(variables.iter()) {
            let dir = input
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf();
            if !watched_dirs.contains(&dir) {
                debouncer
                    .watcher()
                    .watch(&dir, notify::RecursiveMode::NonRecursive)?;
                watched_dirs.push(dir);
            }
        }

        tracing::info!(
            "watching {} and {} variable file(s)",
            template.display(),
            variables.len()
        );

        Ok(Self {
            _debouncer: debouncer,
            rx,
            template: canonical(&template),
            variables: variables.iter().map(|p| canonical(p)).collect(),
        })
    }

    /// Poll for pending input changes (non-blocking, deduplicated).
    pub fn poll_changes(&self) -> Vec<InputChange> {
        let mut changes = Vec::new();

        while let Ok(result) = self.rx.try_recv() {
            match result {
                Ok(events) => {
                    for event in events {
                        if matches!(event.kind, DebouncedEventKind::AnyContinuous) {
                            // Mid-burst events; the final Any will follow
                            continue;
                        }
                        let Some(change) = self.classify(&event.path) else {
                            continue;
                        };
                        if !changes.contains(&change) {
                            changes.push(change);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("file watcher error: {:?}", e);
                }
            }
        }

        if !changes.is_empty() {
            tracing::debug!("detected input changes: {:?}", changes);
        }

        changes
    }

    /// Map an event path onto a watched input, ignoring unrelated files
    /// in the watched directories.
    fn classify(&self, path: &Path) -> Option<InputChange> {
        let path = canonical(path);
        if path == self.template {
            return Some(InputChange::Template);
        }
        if self.variables.contains(&path) {
            return Some(InputChange::Variables);
        }
        None
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn watcher_creation_for_existing_files() {
        let dir = tempdir().expect("failed to create temp dir");
        let template = dir.path().join("template.json");
        let vars = dir.path().join("vars.json");
        fs::write(&template, "{}").expect("write template");
        fs::write(&vars, "{}").expect("write vars");

        let watcher = InputWatcher::new(template, vec![vars]);
        assert!(watcher.is_ok(), "watcher should start for a valid directory");
    }

    #[test]
    fn poll_is_empty_without_changes() {
        let dir = tempdir().expect("failed to create temp dir");
        let template = dir.path().join("template.json");
        fs::write(&template, "{}").expect("write template");

        if let Ok(watcher) = InputWatcher::new(template, vec![]) {
            assert!(watcher.poll_changes().is_empty());
        }
    }

    #[test]
    fn classify_ignores_unrelated_files() {
        let dir = tempdir().expect("failed to create temp dir");
        let template = dir.path().join("template.json");
        let vars = dir.path().join("vars.json");
        fs::write(&template, "{}").expect("write template");
        fs::write(&vars, "{}").expect("write vars");

        let watcher = InputWatcher::new(template.clone(), vec![vars.clone()])
            .expect("failed to create watcher");
        assert_eq!(watcher.classify(&template), Some(InputChange::Template));
        assert_eq!(watcher.classify(&vars), Some(InputChange::Variables));
        assert_eq!(watcher.classify(&dir.path().join("other.json")), None);
    }

    #[test]
    #[ignore] // Flaky in CI - file system event timing varies by platform
    fn detects_variable_file_change() {
        let dir = tempdir().expect("failed to create temp dir");
        let template = dir.path().join("template.json");
        let vars = dir.path().join("vars.json");
        fs::write(&template, "{}").expect("write template");
        fs::write(&vars, "{}").expect("write vars");

        let watcher = InputWatcher::new(template, vec![vars.clone()])
            .expect("failed to create watcher");

        fs::write(&vars, r#"{"color": {}}"#).expect("rewrite vars");
        thread::sleep(Duration::from_millis(1000));

        let changes = watcher.poll_changes();
        assert_eq!(changes, vec![InputChange::Variables]);
    }

    #[test]
    #[ignore] // Flaky in CI - file system event timing varies by platform
    fn template_change_requests_reparse() {
        let dir = tempdir().expect("failed to create temp dir");
        let template = dir.path().join("template.json");
        fs::write(&template, "{}").expect("write template");

        let watcher =
            InputWatcher::new(template.clone(), vec![]).expect("failed to create watcher");

        fs::write(&template, r#"{"bg": "{{ c.bg }}"}"#).expect("rewrite template");
        thread::sleep(Duration::from_millis(1000));

        let changes = watcher.poll_changes();
        assert!(changes.contains(&InputChange::Template));
    }
}
