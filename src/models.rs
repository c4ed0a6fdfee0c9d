// Data shapes exchanged with the contents endpoint. Only the fields the
// client relies on are modelled; everything else in the responses is ignored.

use serde::{Deserialize, Serialize};

/// Kind of entry as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Dir,
    Symlink,
    Submodule,
    #[serde(other)]
    Other,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::File => "file",
            EntryType::Dir => "dir",
            EntryType::Symlink => "symlink",
            EntryType::Submodule => "submodule",
            EntryType::Other => "other",
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata of a single entry. `sha` is the version token that authorizes
/// overwriting or deleting the entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMeta {
    pub name: String,
    pub path: String,
    pub sha: String,
    #[serde(rename = "type")]
    pub kind: EntryType,
    #[serde(default)]
    pub size: Option<u64>,
}

/// `GET` on a file path.
#[derive(Debug, Clone, Deserialize)]
pub struct FileContent {
    #[serde(flatten)]
    pub meta: EntryMeta,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub encoding: Option<String>,
}

/// One element of a directory listing, in store order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryType,
}

impl DirEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryType::Dir
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub sha: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body returned by `PUT` and `DELETE`. `content` is null after a delete.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitResponse {
    pub content: Option<EntryMeta>,
    pub commit: CommitInfo,
}

/// Result of a successful create-or-update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// `true` when the file did not exist and was created.
    pub created: bool,
    pub entry: EntryMeta,
    pub commit: CommitInfo,
}

impl WriteOutcome {
    /// The new version token of the written file.
    pub fn version(&self) -> &str {
        &self.entry.sha
    }
}

/// Result of `delete_directory`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryRemoval {
    /// The marker file was deleted in this commit.
    Removed(CommitInfo),
    /// There was no marker. The directory may already be gone or may still
    /// hold other files; nothing was changed.
    MarkerAbsent,
}
