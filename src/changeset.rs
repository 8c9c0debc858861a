/// version-control status of a changed file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
    Untracked,
    /// anything git reports that doesn't map onto the above (copies, conflicts, etc.)
    Changed,
}

impl ChangeStatus {
    /// single-character marker used in listings
    pub fn marker(self) -> char {
        match self {
            Self::Added => 'A',
            Self::Modified => 'M',
            Self::Deleted => 'D',
            Self::Renamed => 'R',
            Self::Untracked => 'U',
            Self::Changed => 'C',
        }
    }
}

/// a single live change as reported by the version-control service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// absolute path, the join key against group membership
    pub path: String,
    pub status: ChangeStatus,
    /// set for renames
    pub original_path: Option<String>,
}

impl Change {
    #[cfg(test)]
    pub fn new(path: impl Into<String>, status: ChangeStatus) -> Self {
        Self {
            path: path.into(),
            status,
            original_path: None,
        }
    }

    #[cfg(test)]
    pub fn renamed(path: impl Into<String>, original_path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            status: ChangeStatus::Renamed,
            original_path: Some(original_path.into()),
        }
    }

    /// final path component, used for display and message generation
    pub fn file_name(&self) -> &str {
        self.path
            .rsplit(['/', '\\'])
            .find(|part| !part.is_empty())
            .unwrap_or(&self.path)
    }
}
