use crate::changeset::Change;
use crate::git::VcsService;
use crate::groups::{Group, GroupId, GroupStore};
use anyhow::Result;
use std::collections::{HashMap, HashSet};

/// a live change shown under a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedChange {
    pub change: Change,
    pub is_local: bool,
}

/// one group's share of the working tree changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupView {
    pub id: GroupId,
    pub name: String,
    /// members that currently have unstaged changes, in membership order
    pub changes: Vec<GroupedChange>,
    /// members with no unstaged change right now (staged, reverted, committed)
    pub stale: Vec<String>,
}

/// render-ready split of the repository's changes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Partition {
    pub staged: Vec<Change>,
    /// in persisted group order
    pub groups: Vec<GroupView>,
    pub ungrouped: Vec<Change>,
}

impl Partition {
    pub fn group(&self, id: &GroupId) -> Option<&GroupView> {
        self.groups.iter().find(|g| &g.id == id)
    }
}

/// result of a group-level repository operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// the operation was issued for these paths
    Applied(Vec<String>),
    /// nothing eligible, the version-control service was not called
    Nothing,
    NoSuchGroup,
}

/// join persisted group membership against live changes
///
/// each path is claimed by the first group (in persisted order) that lists it, so
/// a change shows up in at most one place even if stored membership overlaps
pub fn partition(groups: &[Group], unstaged: Vec<Change>, staged: Vec<Change>) -> Partition {
    let live: HashMap<&str, &Change> = unstaged.iter().map(|c| (c.path.as_str(), c)).collect();
    let mut claimed: HashSet<&str> = HashSet::new();

    let views: Vec<GroupView> = groups
        .iter()
        .map(|group| {
            let mut changes = Vec::new();
            let mut stale = Vec::new();
            for file in &group.files {
                if !claimed.insert(file.path.as_str()) {
                    continue;
                }
                match live.get(file.path.as_str()) {
                    Some(change) => changes.push(GroupedChange {
                        change: (*change).clone(),
                        is_local: file.is_local,
                    }),
                    None => stale.push(file.path.clone()),
                }
            }
            GroupView {
                id: group.id.clone(),
                name: group.name.clone(),
                changes,
                stale,
            }
        })
        .collect();

    let ungrouped = unstaged
        .iter()
        .filter(|c| !claimed.contains(c.path.as_str()))
        .cloned()
        .collect();

    Partition {
        staged,
        groups: views,
        ungrouped,
    }
}

/// paths to hand to the version-control service for `changes`; renames carry
/// their original path so the old side is staged/unstaged along with the new
pub fn paths_with_origins<'a>(changes: impl IntoIterator<Item = &'a Change>) -> Vec<String> {
    let mut paths = Vec::new();
    for change in changes {
        if let Some(original) = &change.original_path
            && !paths.contains(original)
        {
            paths.push(original.clone());
        }
        if !paths.contains(&change.path) {
            paths.push(change.path.clone());
        }
    }
    paths
}

/// `paths` plus the original side of any rename among `changes`
pub fn expand_renames(paths: &[String], changes: &[Change]) -> Vec<String> {
    let mut expanded = Vec::new();
    for path in paths {
        match changes.iter().find(|c| &c.path == path) {
            Some(change) => {
                for path in paths_with_origins([change]) {
                    if !expanded.contains(&path) {
                        expanded.push(path);
                    }
                }
            }
            None if !expanded.contains(path) => expanded.push(path.clone()),
            None => {}
        }
    }
    expanded
}

/// group-aware view and staging over a group store and a repository
///
/// holds no state of its own; every call reads both collaborators afresh
pub struct Reconciler<'a> {
    store: &'a GroupStore,
    vcs: &'a dyn VcsService,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a GroupStore, vcs: &'a dyn VcsService) -> Self {
        Self { store, vcs }
    }

    pub fn compute_partition(&self) -> Result<Partition> {
        let groups = self.store.list_groups();
        let unstaged = self.vcs.working_tree_changes()?;
        let staged = self.vcs.staged_changes()?;
        Ok(partition(&groups, unstaged, staged))
    }

    /// non-local members of the group that currently have unstaged changes
    fn eligible_changes(&self, id: &GroupId) -> Result<Option<Vec<Change>>> {
        if self.store.group(id).is_none() {
            return Ok(None);
        }
        let partition = self.compute_partition()?;
        let changes: Vec<Change> = partition
            .group(id)
            .map(|view| {
                view.changes
                    .iter()
                    .filter(|grouped| !grouped.is_local)
                    .map(|grouped| grouped.change.clone())
                    .collect()
            })
            .unwrap_or_default();
        Ok(Some(changes))
    }

    /// stage every non-local changed file of a group
    pub fn stage_group(&self, id: &GroupId) -> Result<Outcome> {
        let Some(changes) = self.eligible_changes(id)? else {
            return Ok(Outcome::NoSuchGroup);
        };
        if changes.is_empty() {
            return Ok(Outcome::Nothing);
        }
        let paths = paths_with_origins(&changes);
        self.vcs.stage(&paths)?;
        Ok(Outcome::Applied(paths))
    }

    /// stage every change that belongs to no group
    pub fn stage_ungrouped(&self) -> Result<Outcome> {
        let partition = self.compute_partition()?;
        if partition.ungrouped.is_empty() {
            return Ok(Outcome::Nothing);
        }
        let paths = paths_with_origins(&partition.ungrouped);
        self.vcs.stage(&paths)?;
        Ok(Outcome::Applied(paths))
    }

    /// discard working tree changes of every non-local changed file of a group
    pub fn discard_group(&self, id: &GroupId) -> Result<Outcome> {
        let Some(changes) = self.eligible_changes(id)? else {
            return Ok(Outcome::NoSuchGroup);
        };
        if changes.is_empty() {
            return Ok(Outcome::Nothing);
        }
        let paths: Vec<String> = changes.into_iter().map(|c| c.path).collect();
        self.vcs.discard(&paths)?;
        Ok(Outcome::Applied(paths))
    }

    /// move `path` out of `from` (or from ungrouped) into `to`
    pub fn move_file(&self, path: &str, from: Option<&GroupId>, to: &GroupId) -> Result<bool> {
        self.store.move_file(path, from, to)
    }

    /// put `path` into `to`, taking it out of whichever group held it before;
    /// returns the previous group when the file was moved
    pub fn assign_file(&self, path: &str, to: &GroupId) -> Result<Assignment> {
        let previous = self.store.find_group_of(path);
        if previous.as_ref().is_some_and(|g| &g.id == to) {
            return Ok(Assignment::AlreadyMember);
        }
        if !self.move_file(path, previous.as_ref().map(|g| &g.id), to)? {
            return Ok(Assignment::NoSuchGroup);
        }
        Ok(match previous {
            Some(group) => Assignment::Moved(group),
            None => Assignment::Added,
        })
    }

    /// take `path` out of whichever group holds it
    pub fn unassign_file(&self, path: &str) -> Result<Option<Group>> {
        let Some(group) = self.store.find_group_of(path) else {
            return Ok(None);
        };
        self.store.remove_file(&group.id, path)?;
        Ok(Some(group))
    }

    /// flip the local-only flag of `path` in whichever group holds it
    pub fn set_local(&self, path: &str, is_local: bool) -> Result<Option<Group>> {
        let Some(group) = self.store.find_group_of(path) else {
            return Ok(None);
        };
        self.store.set_file_local(&group.id, path, is_local)?;
        Ok(Some(group))
    }
}

/// result of putting a file into a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    Added,
    Moved(Group),
    AlreadyMember,
    NoSuchGroup,
}
