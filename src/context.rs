use crate::config::Config;
use crate::constants::STORE_FILE_NAME;
use crate::git::{GitRepo, VcsService};
use crate::groups::GroupStore;
use crate::reconcile::Reconciler;
use crate::settings::JsonFileSettings;
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

/// everything a command needs for one repository, built once per invocation
pub struct Session {
    pub config: Config,
    pub vcs: GitRepo,
    pub store: GroupStore,
    /// directory relative command-line paths are resolved against
    base: PathBuf,
    store_path: PathBuf,
}

impl Session {
    pub fn open(base: &Path, config: Config) -> Result<Self> {
        let base = base
            .canonicalize()
            .with_context(|| format!("failed to resolve {}", base.display()))?;
        let vcs = GitRepo::open(&base)?;

        let store_path = match &config.store_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => vcs.workdir().join(path),
            None => vcs.git_dir().join(STORE_FILE_NAME),
        };
        let store = GroupStore::new(Box::new(JsonFileSettings::new(&store_path)));

        Ok(Self {
            config,
            vcs,
            store,
            base,
            store_path,
        })
    }

    pub fn reconciler(&self) -> Reconciler<'_> {
        Reconciler::new(&self.store, &self.vcs)
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// turn a command-line path into the absolute form used as a membership key
    pub fn resolve_path(&self, input: &str) -> Result<String> {
        resolve_path(&self.base, self.vcs.workdir(), input)
    }

    pub fn resolve_paths(&self, inputs: &[String]) -> Result<Vec<String>> {
        inputs.iter().map(|input| self.resolve_path(input)).collect()
    }
}

/// resolve `input` against `base`, following symlinks where the path exists so it
/// matches the canonical working tree; deleted files resolve through their parent
pub fn resolve_path(base: &Path, workdir: &Path, input: &str) -> Result<String> {
    let joined = base.join(input);

    let resolved = match joined.canonicalize() {
        Ok(path) => path,
        Err(_) => match (joined.parent(), joined.file_name()) {
            (Some(parent), Some(name)) => parent
                .canonicalize()
                .map(|parent| parent.join(name))
                .unwrap_or_else(|_| joined.clone()),
            _ => joined.clone(),
        },
    };

    if !resolved.starts_with(workdir) || resolved == workdir {
        bail!("{} is not a file inside the repository", input);
    }
    if resolved.is_dir() {
        bail!("{} is not a file", input);
    }

    Ok(resolved.to_string_lossy().to_string())
}
