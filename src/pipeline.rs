//! Per-commit processing: load changes, summarize, publish
//!
//! Shared by the backfill walker and the incremental sync so both produce
//! identical records for the same commit.

use crate::error::{FeedError, GitError};
use crate::git::{CommitInfo, VersionControl};
use crate::publisher::Publisher;
use crate::summarizer::{self, CommitChanges};

/// What happened to one commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Record written under `key`
    Published { key: String, files: usize },
    /// First parent is not an ancestor; nothing was published
    Skipped { parent: String },
}

/// Fetch what `commit` changed relative to its first parent
///
/// Other parents of a merge commit are ignored.
pub fn load_changes<V>(vcs: &V, commit: &CommitInfo) -> Result<CommitChanges, GitError>
where
    V: VersionControl + ?Sized,
{
    let Some(parent) = commit.first_parent() else {
        return Ok(CommitChanges::Root(vcs.tree_files(&commit.hash)?));
    };

    if !vcs.is_ancestor(parent, &commit.hash)? {
        return Ok(CommitChanges::ParentNotAncestor {
            parent: parent.to_string(),
        });
    }

    Ok(CommitChanges::Patch(vcs.diff(parent, &commit.hash)?))
}

/// Summarizes commits of one repository/branch and publishes the records
#[derive(Clone)]
pub struct CommitPipeline {
    repo: String,
    branch: String,
    publisher: Publisher,
}

impl CommitPipeline {
    pub fn new(repo: impl Into<String>, branch: impl Into<String>, publisher: Publisher) -> Self {
        Self {
            repo: repo.into(),
            branch: branch.into(),
            publisher,
        }
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Summarize and publish the commit `hash`
    pub fn process<V>(&self, vcs: &V, hash: &str) -> Result<CommitOutcome, FeedError>
    where
        V: VersionControl + ?Sized,
    {
        let commit = vcs.commit(hash)?;
        let message = summarizer::normalize_message(&commit.message);
        let date = chrono::DateTime::from_timestamp(commit.author_time, 0)
            .map(|d| d.to_rfc3339())
            .unwrap_or_else(|| commit.author_time.to_string());
        tracing::info!(
            hash = %commit.hash,
            author = %commit.author_email,
            date = %date,
            parents = commit.parent_hashes.len(),
            "Processing commit: {}",
            message
        );

        let changes = load_changes(vcs, &commit)?;
        if let CommitChanges::ParentNotAncestor { parent } = changes {
            tracing::warn!(
                "Skipping {}: parent {} is not an ancestor",
                commit.hash,
                parent
            );
            return Ok(CommitOutcome::Skipped { parent });
        }

        let files = summarizer::summarize(&changes);
        for file in &files {
            tracing::debug!(
                "  {} {}: +{} -{} lines, +{} -{} chunks",
                file.change_type,
                file.file,
                file.lines_added,
                file.lines_removed,
                file.chunks_added,
                file.chunks_removed
            );
        }

        let record = summarizer::build_record(&self.repo, &self.branch, &commit, files);
        let key = self.publisher.publish(&record)?;
        Ok(CommitOutcome::Published {
            key,
            files: record.files.len(),
        })
    }
}
