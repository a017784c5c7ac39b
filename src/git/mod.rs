//! Git access for the commit feed
//!
//! [`VersionControl`] is the seam between the sync logic and the actual
//! repository. [`GitRepository`] implements it on top of libgit2; tests use an
//! in-memory fake.

/// Diff line grouping into added/removed/unchanged chunks
pub mod chunker;
/// SSH key material and remote callbacks
pub mod credentials;
/// libgit2-backed working copy
pub mod repository;

#[cfg(test)]
pub(crate) mod fake;

pub use chunker::ChunkBuilder;
pub use credentials::SshCredentials;
pub use repository::GitRepository;

use crate::error::GitError;

/// Metadata of a single commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// Full commit SHA hash (40 characters)
    pub hash: String,
    /// SHA hashes of parent commits, first parent first
    pub parent_hashes: Vec<String>,
    /// Author's email address
    pub author_email: String,
    /// Author timestamp (Unix epoch seconds)
    pub author_time: i64,
    /// Raw commit message
    pub message: String,
}

impl CommitInfo {
    /// First recorded parent, `None` for a root commit
    pub fn first_parent(&self) -> Option<&str> {
        self.parent_hashes.first().map(String::as_str)
    }
}

/// Classification of a diff chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    Added,
    Removed,
    Unchanged,
}

/// Contiguous span of a file diff sharing one classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub kind: ChunkKind,
    /// Text of the span, lines keep their trailing newline
    pub content: String,
}

impl Chunk {
    pub fn new(kind: ChunkKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }

    pub fn added(content: impl Into<String>) -> Self {
        Self::new(ChunkKind::Added, content)
    }

    pub fn removed(content: impl Into<String>) -> Self {
        Self::new(ChunkKind::Removed, content)
    }

    pub fn unchanged(content: impl Into<String>) -> Self {
        Self::new(ChunkKind::Unchanged, content)
    }
}

/// Changes to one file between a parent and a commit
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilePatch {
    /// Path on the parent side, `None` when the file was added
    pub from: Option<String>,
    /// Path on the commit side, `None` when the file was deleted
    pub to: Option<String>,
    /// Ordered chunks; empty for binary files
    pub chunks: Vec<Chunk>,
}

/// A file in a commit's full tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeFile {
    pub path: String,
    pub line_count: usize,
}

/// Result of pulling the tracked branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// Remote branch matches the local one
    UpToDate,
    /// Local branch now points at `head`
    Advanced { head: String },
}

/// Newest-first stream of commit hashes
pub type CommitLog<'a> = Box<dyn Iterator<Item = Result<String, GitError>> + 'a>;

/// Operations the feed needs from a version-control working copy
pub trait VersionControl {
    /// Fetch the tracked branch and move the local branch to the fetched head
    fn pull(&mut self) -> Result<PullOutcome, GitError>;

    /// Hash of the commit the tracked branch currently points at
    fn resolve_head(&self) -> Result<String, GitError>;

    /// Commits reachable from `from`, newest first
    fn log(&self, from: &str) -> Result<CommitLog<'_>, GitError>;

    /// Look up a commit by hash
    fn commit(&self, hash: &str) -> Result<CommitInfo, GitError>;

    /// Whether `candidate` is reachable from `commit`; a commit is its own ancestor
    fn is_ancestor(&self, candidate: &str, commit: &str) -> Result<bool, GitError>;

    /// Per-file patches turning `parent`'s tree into `commit`'s tree
    fn diff(&self, parent: &str, commit: &str) -> Result<Vec<FilePatch>, GitError>;

    /// Every file in `commit`'s tree with its line count
    fn tree_files(&self, commit: &str) -> Result<Vec<TreeFile>, GitError>;
}

/// Strip an optional `refs/heads/` prefix from a configured branch name
pub fn short_branch_name(branch: &str) -> &str {
    branch.strip_prefix("refs/heads/").unwrap_or(branch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_branch_name() {
        assert_eq!(short_branch_name("main"), "main");
        assert_eq!(short_branch_name("refs/heads/main"), "main");
        assert_eq!(short_branch_name("refs/heads/feature/x"), "feature/x");
    }

    #[test]
    fn test_first_parent() {
        let mut commit = CommitInfo {
            hash: "c".to_string(),
            parent_hashes: vec![],
            author_email: String::new(),
            author_time: 0,
            message: String::new(),
        };
        assert_eq!(commit.first_parent(), None);

        commit.parent_hashes = vec!["p1".to_string(), "p2".to_string()];
        assert_eq!(commit.first_parent(), Some("p1"));
    }
}
