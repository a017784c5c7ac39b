use serde::{Deserialize, Serialize};

/// How a file was touched by a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// File present in a root commit
    Initial,
    /// File added or changed relative to the first parent
    Modify,
    /// File removed relative to the first parent
    Deleted,
}

impl ChangeType {
    /// Wire name of the change type
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Initial => "initial",
            ChangeType::Modify => "modify",
            ChangeType::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-file change summary inside a [`CommitRecord`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChangeRecord {
    /// Destination path, or the source path for deletions
    pub file: String,
    #[serde(rename = "changetype")]
    pub change_type: ChangeType,
    /// Number of contiguous added regions
    #[serde(rename = "chunksadded")]
    pub chunks_added: usize,
    /// Number of contiguous removed regions
    #[serde(rename = "chunksremoved")]
    pub chunks_removed: usize,
    /// Newline-delimited segments across added regions
    #[serde(rename = "linesadded")]
    pub lines_added: usize,
    /// Newline-delimited segments across removed regions
    #[serde(rename = "linesremoved")]
    pub lines_removed: usize,
}

impl FileChangeRecord {
    /// Record for a file that exists in a root commit
    pub fn initial(file: impl Into<String>, line_count: usize) -> Self {
        Self {
            file: file.into(),
            change_type: ChangeType::Initial,
            chunks_added: 1,
            chunks_removed: 0,
            lines_added: line_count,
            lines_removed: 0,
        }
    }

    /// Record for a removed file; deletions carry no counts
    pub fn deleted(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            change_type: ChangeType::Deleted,
            chunks_added: 0,
            chunks_removed: 0,
            lines_added: 0,
            lines_removed: 0,
        }
    }

    /// Empty modification record, counts are accumulated by the summarizer
    pub fn modify(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            change_type: ChangeType::Modify,
            chunks_added: 0,
            chunks_removed: 0,
            lines_added: 0,
            lines_removed: 0,
        }
    }
}

/// Normalized description of one commit, the unit that gets published
///
/// Field order is part of the wire format: the serialized payload must be
/// identical every time the same commit is summarized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Repository name from configuration
    pub repo: String,
    /// Tracked branch name from configuration
    pub branch: String,
    /// Full commit hash
    pub hash: String,
    /// Author time, seconds since epoch
    pub timestamp: i64,
    /// Author e-mail address
    pub author: String,
    /// Commit message with newlines removed
    pub message: String,
    /// Files touched, in diff order
    pub files: Vec<FileChangeRecord>,
}

impl CommitRecord {
    /// Total lines added across all files
    pub fn lines_added(&self) -> usize {
        self.files.iter().map(|f| f.lines_added).sum()
    }

    /// Total lines removed across all files
    pub fn lines_removed(&self) -> usize {
        self.files.iter().map(|f| f.lines_removed).sum()
    }
}
