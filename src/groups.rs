use crate::constants::{GROUPS_KEY, MIN_ID_PREFIX_LENGTH, SHORT_ID_LENGTH, STORE_VERSION};
use crate::settings::SettingsStore;
use crate::warning;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// opaque, stable group identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    #[cfg(test)]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// abbreviated form for display
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(SHORT_ID_LENGTH) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// hunk/line selection reserved for partial staging; carried through untouched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HunkSelection {
    pub hunk_index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_lines: Option<Vec<u32>>,
}

/// membership of a single file in a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub path: String,
    /// excluded from group-level stage/commit/discard
    #[serde(default)]
    pub is_local: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hunks: Option<Vec<HunkSelection>>,
}

impl FileEntry {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_local: false,
            hunks: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    /// insertion order is display order
    #[serde(default)]
    pub files: Vec<FileEntry>,
}

impl Group {
    pub fn contains(&self, path: &str) -> bool {
        self.file(path).is_some()
    }

    pub fn file(&self, path: &str) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.path == path)
    }

    fn file_mut(&mut self, path: &str) -> Option<&mut FileEntry> {
        self.files.iter_mut().find(|f| f.path == path)
    }

    /// returns false if the path was already a member
    fn insert(&mut self, path: &str) -> bool {
        if self.contains(path) {
            return false;
        }
        self.files.push(FileEntry::new(path));
        true
    }

    /// returns false if the path was not a member
    fn remove(&mut self, path: &str) -> bool {
        let before = self.files.len();
        self.files.retain(|f| f.path != path);
        self.files.len() != before
    }
}

/// on-disk shape of the group list
#[derive(Serialize, Deserialize)]
struct StoredGroups {
    version: u32,
    groups: Vec<Group>,
}

/// accepted input shapes; the bare array predates the version field
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredForm {
    Versioned(StoredGroups),
    Legacy(Vec<Group>),
}

/// durable CRUD over the workspace's group list
///
/// every mutation reads the full list, changes it in memory and writes the full
/// list back before returning; nothing is cached between calls
pub struct GroupStore {
    settings: Box<dyn SettingsStore>,
}

impl GroupStore {
    pub fn new(settings: Box<dyn SettingsStore>) -> Self {
        Self { settings }
    }

    /// groups in persisted order; unreadable storage reads as empty
    pub fn list_groups(&self) -> Vec<Group> {
        match self.load() {
            Ok(groups) => groups,
            Err(e) => {
                warning!("ignoring unreadable change groups: {:#}", e);
                Vec::new()
            }
        }
    }

    /// strict read used by mutations, so a corrupt store is never overwritten
    pub fn load(&self) -> Result<Vec<Group>> {
        let value = match self.settings.get(GROUPS_KEY)? {
            Some(value) if !value.is_null() => value,
            _ => return Ok(Vec::new()),
        };

        let stored: StoredForm =
            serde_json::from_value(value).context("stored change groups are malformed")?;

        match stored {
            StoredForm::Versioned(stored) if stored.version > STORE_VERSION => bail!(
                "stored change groups use format version {} (this build understands up to {})",
                stored.version,
                STORE_VERSION
            ),
            StoredForm::Versioned(stored) => Ok(stored.groups),
            StoredForm::Legacy(groups) => Ok(groups),
        }
    }

    fn save(&self, groups: Vec<Group>) -> Result<()> {
        let stored = StoredGroups {
            version: STORE_VERSION,
            groups,
        };
        let value = serde_json::to_value(&stored).context("failed to serialise change groups")?;
        self.settings
            .set(GROUPS_KEY, value)
            .context("failed to persist change groups")
    }

    /// apply `change` to one group and persist if it reports a modification
    fn modify(&self, id: &GroupId, change: impl FnOnce(&mut Group) -> bool) -> Result<bool> {
        let mut groups = self.load()?;
        let Some(group) = groups.iter_mut().find(|g| &g.id == id) else {
            return Ok(false);
        };
        if !change(group) {
            return Ok(false);
        }
        self.save(groups)?;
        Ok(true)
    }

    pub fn group(&self, id: &GroupId) -> Option<Group> {
        self.list_groups().into_iter().find(|g| &g.id == id)
    }

    /// first group, in persisted order, holding `path`
    pub fn find_group_of(&self, path: &str) -> Option<Group> {
        self.list_groups().into_iter().find(|g| g.contains(path))
    }

    /// look a group up by id, display name, or unambiguous id prefix
    pub fn resolve(&self, query: &str) -> Result<Group> {
        let groups = self.list_groups();

        if let Some(group) = groups.iter().find(|g| g.id.as_str() == query) {
            return Ok(group.clone());
        }

        let named: Vec<&Group> = groups.iter().filter(|g| g.name == query).collect();
        match named.as_slice() {
            [group] => return Ok((*group).clone()),
            [] => {}
            _ => {
                let ids: Vec<&str> = named.iter().map(|g| g.id.short()).collect();
                bail!(
                    "{} groups are named \"{}\", use an id instead ({})",
                    named.len(),
                    query,
                    ids.join(", ")
                );
            }
        }

        if query.len() >= MIN_ID_PREFIX_LENGTH {
            let prefixed: Vec<&Group> = groups
                .iter()
                .filter(|g| g.id.as_str().starts_with(query))
                .collect();
            if let [group] = prefixed.as_slice() {
                return Ok((*group).clone());
            }
        }

        bail!("no group matches \"{}\"", query)
    }

    pub fn create_group(&self, name: &str) -> Result<GroupId> {
        let mut groups = self.load()?;

        let mut id = GroupId::generate();
        while groups.iter().any(|g| g.id == id) {
            id = GroupId::generate();
        }

        groups.push(Group {
            id: id.clone(),
            name: name.to_string(),
            files: Vec::new(),
        });
        self.save(groups)?;
        Ok(id)
    }

    pub fn delete_group(&self, id: &GroupId) -> Result<bool> {
        let mut groups = self.load()?;
        let before = groups.len();
        groups.retain(|g| &g.id != id);
        if groups.len() == before {
            return Ok(false);
        }
        self.save(groups)?;
        Ok(true)
    }

    pub fn rename_group(&self, id: &GroupId, new_name: &str) -> Result<bool> {
        self.modify(id, |group| {
            if group.name == new_name {
                return false;
            }
            group.name = new_name.to_string();
            true
        })
    }

    /// idempotent; does not touch other groups
    pub fn add_file(&self, id: &GroupId, path: &str) -> Result<bool> {
        self.modify(id, |group| group.insert(path))
    }

    pub fn remove_file(&self, id: &GroupId, path: &str) -> Result<bool> {
        self.modify(id, |group| group.remove(path))
    }

    pub fn set_file_local(&self, id: &GroupId, path: &str, is_local: bool) -> Result<bool> {
        self.modify(id, |group| match group.file_mut(path) {
            Some(file) if file.is_local != is_local => {
                file.is_local = is_local;
                true
            }
            _ => false,
        })
    }

    /// remove `path` from `from` (if given) and add it to `to` in a single write
    ///
    /// the file lands as a fresh, non-local member of `to`. nothing changes if `to`
    /// does not exist, so a failed move never strands the file outside both groups
    pub fn move_file(&self, path: &str, from: Option<&GroupId>, to: &GroupId) -> Result<bool> {
        let Some(from) = from.filter(|from| *from != to) else {
            return self.add_file(to, path);
        };

        let mut groups = self.load()?;
        if !groups.iter().any(|g| &g.id == to) {
            return Ok(false);
        }

        let mut changed = false;
        if let Some(source) = groups.iter_mut().find(|g| &g.id == from) {
            changed |= source.remove(path);
        }
        if let Some(target) = groups.iter_mut().find(|g| &g.id == to) {
            changed |= target.insert(path);
        }

        if changed {
            self.save(groups)?;
        }
        Ok(changed)
    }
}
