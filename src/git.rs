use crate::changeset::{Change, ChangeStatus};
use anyhow::{Context, Result, bail};
use git2::build::CheckoutBuilder;
use git2::{
    BranchType, Delta, DiffFindOptions, DiffOptions, ErrorCode, ObjectType, Repository,
    RepositoryState, Status,
};
use std::fs;
use std::path::{Path, PathBuf};

/// the version-control operations the change groups are built on
///
/// paths are absolute strings throughout, matching group membership records
pub trait VcsService {
    /// root of the working tree
    fn workdir(&self) -> &Path;

    /// unstaged changes, including untracked files
    fn working_tree_changes(&self) -> Result<Vec<Change>>;

    /// changes recorded in the index
    fn staged_changes(&self) -> Result<Vec<Change>>;

    fn stage(&self, paths: &[String]) -> Result<()>;

    fn unstage(&self, paths: &[String]) -> Result<()>;

    /// revert working tree changes; untracked files are deleted
    fn discard(&self, paths: &[String]) -> Result<()>;

    fn commit(&self, message: &str) -> Result<()>;

    /// `None` when HEAD is detached
    fn current_branch(&self) -> Result<Option<String>>;

    fn list_branches(&self) -> Result<Vec<String>>;

    fn checkout(&self, branch: &str) -> Result<()>;
}

/// `VcsService` backed by a local git repository
pub struct GitRepo {
    repo: Repository,
    workdir: PathBuf,
}

impl GitRepo {
    /// discover the repository containing `path`
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path).context("not in a git repository")?;
        let workdir = repo
            .workdir()
            .context("repository has no working tree (bare repositories are not supported)")?
            .canonicalize()
            .context("failed to resolve repository working tree")?;
        Ok(Self { repo, workdir })
    }

    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    /// refuse operations while a merge, rebase, etc. is in progress
    fn ensure_clean_state(&self) -> Result<()> {
        if self.repo.state() != RepositoryState::Clean {
            bail!("repository is in the middle of an operation (merge, rebase, etc)");
        }
        Ok(())
    }

    /// convert an absolute path into one relative to the working tree
    fn relative(&self, path: &str) -> Result<PathBuf> {
        Path::new(path)
            .strip_prefix(&self.workdir)
            .map(Path::to_path_buf)
            .map_err(|_| anyhow::anyhow!("{path} is outside the repository"))
    }

    fn relative_all(&self, paths: &[String]) -> Result<Vec<PathBuf>> {
        paths.iter().map(|path| self.relative(path)).collect()
    }

    fn absolute(&self, relative: &Path) -> String {
        self.workdir.join(relative).to_string_lossy().to_string()
    }

    /// extract changes from a `git2::Diff`
    fn changes_from_diff(&self, diff: &git2::Diff) -> Vec<Change> {
        let mut changes = Vec::new();

        for delta in diff.deltas() {
            let status = match delta.status() {
                Delta::Added => ChangeStatus::Added,
                Delta::Untracked => ChangeStatus::Untracked,
                Delta::Modified | Delta::Typechange => ChangeStatus::Modified,
                Delta::Deleted => ChangeStatus::Deleted,
                Delta::Renamed => ChangeStatus::Renamed,
                Delta::Unmodified | Delta::Ignored => continue,
                _ => ChangeStatus::Changed,
            };

            // deletions only have a meaningful old path
            let path = if delta.status() == Delta::Deleted {
                delta.old_file().path()
            } else {
                delta.new_file().path()
            };
            let Some(path) = path else {
                continue;
            };

            let original_path = if delta.status() == Delta::Renamed {
                delta.old_file().path().map(|p| self.absolute(p))
            } else {
                None
            };

            changes.push(Change {
                path: self.absolute(path),
                status,
                original_path,
            });
        }

        changes
    }

    /// create a diff object for staged changes
    fn create_staged_diff(&self) -> Result<git2::Diff<'_>> {
        // handle unborn branch (no commits yet) - compare against empty tree
        let tree = match self.repo.head() {
            Ok(head) => Some(head.peel_to_tree().context("failed to get tree")?),
            Err(e) if e.code() == ErrorCode::UnbornBranch => None,
            Err(e) => return Err(e).context("failed to get HEAD"),
        };

        let mut diff = self
            .repo
            .diff_tree_to_index(tree.as_ref(), None, None)
            .context("failed to create diff")?;
        find_renames(&mut diff)?;

        Ok(diff)
    }

    /// create a diff object for unstaged changes
    fn create_unstaged_diff(&self) -> Result<git2::Diff<'_>> {
        let mut opts = DiffOptions::new();
        opts.include_untracked(true);
        opts.recurse_untracked_dirs(true);
        let mut diff = self
            .repo
            .diff_index_to_workdir(None, Some(&mut opts))
            .context("failed to create diff")?;
        find_renames(&mut diff)?;

        Ok(diff)
    }
}

/// enable rename detection at git's default similarity threshold
fn find_renames(diff: &mut git2::Diff) -> Result<()> {
    let mut find_opts = DiffFindOptions::new();
    find_opts.renames(true);
    find_opts.rename_threshold(50);
    diff.find_similar(Some(&mut find_opts))
        .context("failed to detect renames")
}

impl VcsService for GitRepo {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn working_tree_changes(&self) -> Result<Vec<Change>> {
        let diff = self.create_unstaged_diff()?;
        Ok(self.changes_from_diff(&diff))
    }

    fn staged_changes(&self) -> Result<Vec<Change>> {
        let diff = self.create_staged_diff()?;
        Ok(self.changes_from_diff(&diff))
    }

    fn stage(&self, paths: &[String]) -> Result<()> {
        let relative = self.relative_all(paths)?;
        let mut index = self.repo.index().context("failed to get git index")?;

        // collect all errors before writing index
        let mut errors = Vec::new();

        for path in &relative {
            // anything missing from the working tree is staged as a deletion
            if self.workdir.join(path).symlink_metadata().is_ok() {
                if let Err(e) = index.add_path(path) {
                    errors.push(format!("failed to stage {}: {e}", path.display()));
                }
            } else if let Err(e) = index.remove_path(path) {
                errors.push(format!("failed to stage deletion of {}: {e}", path.display()));
            }
        }

        // if there were any errors, reload index to rollback and report errors
        if !errors.is_empty() {
            if let Err(e) = index.read(true) {
                errors.push(format!("failed to reload index during rollback: {e}"));
            }
            bail!(errors.join("\n"));
        }

        index.write().context("failed to write git index")
    }

    fn unstage(&self, paths: &[String]) -> Result<()> {
        let relative = self.relative_all(paths)?;

        match self.repo.head() {
            Ok(head) => {
                let target = head
                    .peel(ObjectType::Commit)
                    .context("failed to resolve HEAD commit")?;
                self.repo
                    .reset_default(Some(&target), relative.iter().map(PathBuf::as_path))
                    .context("failed to unstage files")
            }
            Err(e) if e.code() == ErrorCode::UnbornBranch => {
                // nothing committed yet, so unstaging means dropping the entries
                let mut index = self.repo.index().context("failed to get git index")?;
                for path in &relative {
                    index
                        .remove_path(path)
                        .with_context(|| format!("failed to unstage {}", path.display()))?;
                }
                index.write().context("failed to write git index")
            }
            Err(e) => Err(e).context("failed to get HEAD"),
        }
    }

    fn discard(&self, paths: &[String]) -> Result<()> {
        let relative = self.relative_all(paths)?;

        let mut tracked = Vec::new();
        for path in &relative {
            let status = self
                .repo
                .status_file(path)
                .with_context(|| format!("failed to get status of {}", path.display()))?;
            if status.contains(Status::WT_NEW) {
                let absolute = self.workdir.join(path);
                fs::remove_file(&absolute)
                    .with_context(|| format!("failed to delete {}", absolute.display()))?;
            } else {
                tracked.push(path);
            }
        }

        if tracked.is_empty() {
            return Ok(());
        }

        let mut checkout = CheckoutBuilder::new();
        checkout.force().disable_pathspec_match(true);
        for path in tracked {
            checkout.path(path.as_path());
        }
        self.repo
            .checkout_index(None, Some(&mut checkout))
            .context("failed to discard changes")
    }

    /// uses the git binary rather than git2 to ensure commit signing (gpg/ssh)
    /// and git hooks (pre-commit, commit-msg, etc.) work as expected
    fn commit(&self, message: &str) -> Result<()> {
        let status = std::process::Command::new("git")
            .arg("commit")
            .arg("--message")
            .arg(message)
            .current_dir(&self.workdir)
            .status()
            .context("failed to run git commit")?;

        if !status.success() {
            bail!("git commit failed with exit code: {status}");
        }
        Ok(())
    }

    fn current_branch(&self) -> Result<Option<String>> {
        match self.repo.head() {
            Ok(head) if head.is_branch() => Ok(head.shorthand().map(str::to_string)),
            Ok(_) => Ok(None),
            Err(e) if e.code() == ErrorCode::UnbornBranch => {
                // HEAD points at a branch that has no commits yet
                let head = self
                    .repo
                    .find_reference("HEAD")
                    .context("failed to read HEAD")?;
                Ok(head
                    .symbolic_target()
                    .map(|target| target.trim_start_matches("refs/heads/").to_string()))
            }
            Err(e) => Err(e).context("failed to get HEAD"),
        }
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for branch in self
            .repo
            .branches(Some(BranchType::Local))
            .context("failed to list branches")?
        {
            let (branch, _) = branch.context("failed to read branch")?;
            if let Some(name) = branch.name().context("failed to read branch name")? {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        self.ensure_clean_state()?;

        let reference = self
            .repo
            .find_branch(branch, BranchType::Local)
            .with_context(|| format!("no local branch named {branch}"))?
            .into_reference();
        let refname = reference
            .name()
            .context("branch name is not valid utf-8")?
            .to_string();
        let tree = reference
            .peel_to_tree()
            .with_context(|| format!("failed to resolve {branch}"))?;

        let mut checkout = CheckoutBuilder::new();
        checkout.safe();
        self.repo
            .checkout_tree(tree.as_object(), Some(&mut checkout))
            .with_context(|| format!("failed to check out {branch}"))?;
        self.repo
            .set_head(&refname)
            .with_context(|| format!("failed to switch HEAD to {branch}"))
    }
}

#[cfg(test)]
mod tests;
