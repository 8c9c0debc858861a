use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc::{Receiver, channel};
use std::time::{Duration, Instant};

/// directories whose churn never affects the change view
const IGNORE_DIRS: &[&str] = &["node_modules", "target", "__pycache__", ".venv"];

/// git internals that do affect the change view
const GIT_STATE_FILES: &[&str] = &["index", "HEAD"];

/// active subscription to repository and group changes; dropping it stops watching
pub struct Subscription {
    _debouncer: Debouncer<RecommendedWatcher>,
    events: Receiver<DebounceEventResult>,
    scope: WatchScope,
}

/// the locations whose changes can alter the rendered view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchScope {
    pub workdir: PathBuf,
    pub git_dir: PathBuf,
    /// file the group mapping is persisted in
    pub store: PathBuf,
}

/// resolve symlinks in the parent so event paths compare equal; the file itself
/// may not exist yet
fn canonical_file(path: &Path) -> PathBuf {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .map(|parent| parent.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

/// start watching the working tree, the git directory if it lives elsewhere, and
/// the group store if it lives outside both
pub fn subscribe(
    workdir: &Path,
    git_dir: &Path,
    store: &Path,
    debounce: Duration,
) -> Result<Subscription> {
    let (tx, events) = channel();

    let mut debouncer = new_debouncer(debounce, tx).context("failed to create file watcher")?;
    debouncer
        .watcher()
        .watch(workdir, RecursiveMode::Recursive)
        .with_context(|| format!("failed to watch {}", workdir.display()))?;

    let git_dir = git_dir.canonicalize().unwrap_or_else(|_| git_dir.to_path_buf());
    if !git_dir.starts_with(workdir) {
        debouncer
            .watcher()
            .watch(&git_dir, RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch {}", git_dir.display()))?;
    }

    // the store is replaced by rename, so watch its directory rather than the file
    let store = canonical_file(store);
    if !store.starts_with(workdir)
        && !store.starts_with(&git_dir)
        && let Some(store_dir) = store.parent()
    {
        debouncer
            .watcher()
            .watch(store_dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", store_dir.display()))?;
    }

    Ok(Subscription {
        _debouncer: debouncer,
        events,
        scope: WatchScope {
            workdir: workdir.to_path_buf(),
            git_dir,
            store,
        },
    })
}

impl Subscription {
    /// block until a batch of relevant changes arrives; `None` once the watcher stops
    pub fn next_change(&self) -> Option<Vec<PathBuf>> {
        self.wait_for_change(None)
    }

    /// like `next_change`, giving up with `None` after `timeout` when one is given
    fn wait_for_change(&self, timeout: Option<Duration>) -> Option<Vec<PathBuf>> {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        loop {
            let received = match deadline {
                Some(deadline) => self
                    .events
                    .recv_timeout(deadline.saturating_duration_since(Instant::now()))
                    .ok(),
                None => self.events.recv().ok(),
            };
            match received? {
                Ok(events) => {
                    let paths: Vec<PathBuf> = events
                        .into_iter()
                        .map(|event| event.path)
                        .filter(|path| is_relevant(&self.scope, path))
                        .collect();
                    if !paths.is_empty() {
                        return Some(paths);
                    }
                }
                Err(e) => {
                    crate::warning!("watch error: {}", e);
                }
            }
        }
    }
}

/// whether a file system event at `path` could change what the view shows
pub fn is_relevant(scope: &WatchScope, path: &Path) -> bool {
    if path == scope.store {
        return true;
    }

    if let Ok(inside_git) = path.strip_prefix(&scope.git_dir) {
        return is_git_state(inside_git);
    }

    let Ok(relative) = path.strip_prefix(&scope.workdir) else {
        return false;
    };

    !relative.components().any(|component| match component {
        Component::Normal(name) => name
            .to_str()
            .is_some_and(|name| IGNORE_DIRS.contains(&name) || name == ".git"),
        _ => false,
    })
}

/// index, HEAD and refs track staging and branch switches; objects, logs and
/// lock/temp files only churn
fn is_git_state(inside_git: &Path) -> bool {
    let mut components = inside_git.components();
    match components.next() {
        Some(Component::Normal(first)) => {
            let Some(first) = first.to_str() else {
                return false;
            };
            if first == "refs" {
                return !inside_git.to_string_lossy().ends_with(".lock");
            }
            components.next().is_none() && GIT_STATE_FILES.contains(&first)
        }
        _ => false,
    }
}
