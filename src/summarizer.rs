//! Commit → per-file change records
//!
//! Everything here is pure. Fetching the tree or the patch of a commit happens
//! in [`crate::pipeline::load_changes`]; this module only turns those into
//! [`FileChangeRecord`]s.

use crate::git::{ChunkKind, CommitInfo, FilePatch, TreeFile};
use crate::types::{CommitRecord, FileChangeRecord};

/// What a commit changed, as seen from its first parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitChanges {
    /// Commit without parents and its full tree
    Root(Vec<TreeFile>),
    /// Patches from the first parent to the commit
    Patch(Vec<FilePatch>),
    /// The first parent is not reachable from the commit (rewritten history)
    ParentNotAncestor { parent: String },
}

/// Summarize a commit into file change records, in tree or diff order
pub fn summarize(changes: &CommitChanges) -> Vec<FileChangeRecord> {
    match changes {
        CommitChanges::Root(files) => files
            .iter()
            .map(|file| FileChangeRecord::initial(&file.path, file.line_count))
            .collect(),
        CommitChanges::Patch(patches) => patches.iter().filter_map(summarize_patch).collect(),
        CommitChanges::ParentNotAncestor { .. } => Vec::new(),
    }
}

/// Summarize one file patch
///
/// Returns `None` for a patch with neither a source nor a destination path.
pub fn summarize_patch(patch: &FilePatch) -> Option<FileChangeRecord> {
    let to = match (&patch.from, &patch.to) {
        (None, None) => {
            tracing::warn!("File patch without source or destination path, ignoring");
            return None;
        }
        (Some(from), None) => return Some(FileChangeRecord::deleted(from)),
        (_, Some(to)) => to,
    };

    let mut record = FileChangeRecord::modify(to);
    for chunk in &patch.chunks {
        match chunk.kind {
            ChunkKind::Added => {
                record.chunks_added += 1;
                record.lines_added += segment_count(&chunk.content);
            }
            ChunkKind::Removed => {
                record.chunks_removed += 1;
                record.lines_removed += segment_count(&chunk.content);
            }
            ChunkKind::Unchanged => {}
        }
    }
    Some(record)
}

/// Number of newline-delimited segments in chunk text
///
/// Text ending in a newline counts one more segment than it has lines. Published
/// numbers depend on this, so it must stay as is.
pub fn segment_count(content: &str) -> usize {
    content.split('\n').count()
}

/// Number of lines in a file blob
///
/// A trailing newline does not start a new line and empty content has no lines.
pub fn count_file_lines(content: &[u8]) -> usize {
    let segments = content.split(|b| *b == b'\n').count();
    if content.is_empty() || content.ends_with(b"\n") {
        segments - 1
    } else {
        segments
    }
}

/// Collapse a commit message onto one line by dropping every newline
pub fn normalize_message(message: &str) -> String {
    message.replace('\n', "")
}

/// Assemble the publishable record for a summarized commit
pub fn build_record(
    repo: &str,
    branch: &str,
    commit: &CommitInfo,
    files: Vec<FileChangeRecord>,
) -> CommitRecord {
    CommitRecord {
        repo: repo.to_string(),
        branch: branch.to_string(),
        hash: commit.hash.clone(),
        timestamp: commit.author_time,
        author: commit.author_email.clone(),
        message: normalize_message(&commit.message),
        files,
    }
}
