//! In-memory [`VersionControl`] for unit tests

use crate::error::GitError;
use crate::git::{CommitInfo, CommitLog, FilePatch, PullOutcome, TreeFile, VersionControl};
use std::collections::{HashMap, HashSet, VecDeque};

/// One scripted pull result
pub(crate) enum ScriptedPull {
    UpToDate,
    /// Branch moves to this history (newest first)
    Advance(Vec<String>),
    Fail(&'static str),
}

#[derive(Default)]
pub(crate) struct FakeRepo {
    commits: HashMap<String, CommitInfo>,
    trees: HashMap<String, Vec<TreeFile>>,
    patches: HashMap<String, Vec<FilePatch>>,
    not_ancestor: HashSet<String>,
    /// Current branch history, newest first
    history: Vec<String>,
    pulls: VecDeque<ScriptedPull>,
    pub(crate) pull_count: usize,
}

impl FakeRepo {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn root(&mut self, hash: &str, files: Vec<TreeFile>) -> &mut Self {
        self.insert(hash, vec![]);
        self.trees.insert(hash.to_string(), files);
        self
    }

    pub(crate) fn child(&mut self, hash: &str, parent: &str, patches: Vec<FilePatch>) -> &mut Self {
        self.insert(hash, vec![parent.to_string()]);
        self.patches.insert(hash.to_string(), patches);
        self
    }

    /// Mark `hash`'s first parent as unreachable from it
    pub(crate) fn orphan_parent(&mut self, hash: &str) -> &mut Self {
        self.not_ancestor.insert(hash.to_string());
        self
    }

    pub(crate) fn set_history(&mut self, newest_first: &[&str]) -> &mut Self {
        self.history = newest_first.iter().map(|h| h.to_string()).collect();
        self
    }

    pub(crate) fn script_pull(&mut self, pull: ScriptedPull) -> &mut Self {
        self.pulls.push_back(pull);
        self
    }

    fn insert(&mut self, hash: &str, parents: Vec<String>) {
        self.commits.insert(
            hash.to_string(),
            CommitInfo {
                hash: hash.to_string(),
                parent_hashes: parents,
                author_email: format!("{hash}@example.com"),
                author_time: 1_000 + self.commits.len() as i64,
                message: format!("commit {hash}\n"),
            },
        );
    }
}

impl VersionControl for FakeRepo {
    fn pull(&mut self) -> Result<PullOutcome, GitError> {
        self.pull_count += 1;
        match self.pulls.pop_front() {
            None | Some(ScriptedPull::UpToDate) => Ok(PullOutcome::UpToDate),
            Some(ScriptedPull::Advance(history)) => {
                self.history = history;
                Ok(PullOutcome::Advanced {
                    head: self.resolve_head()?,
                })
            }
            Some(ScriptedPull::Fail(reason)) => Err(GitError::PullFailed {
                branch: "main".to_string(),
                reason: reason.to_string(),
            }),
        }
    }

    fn resolve_head(&self) -> Result<String, GitError> {
        self.history
            .first()
            .cloned()
            .ok_or_else(|| GitError::HeadNotFound("empty history".to_string()))
    }

    fn log(&self, from: &str) -> Result<CommitLog<'_>, GitError> {
        let start = self
            .history
            .iter()
            .position(|h| h == from)
            .ok_or_else(|| GitError::IterFailed(from.to_string()))?;
        Ok(Box::new(self.history[start..].iter().cloned().map(Ok)))
    }

    fn commit(&self, hash: &str) -> Result<CommitInfo, GitError> {
        self.commits
            .get(hash)
            .cloned()
            .ok_or_else(|| GitError::CommitNotFound(hash.to_string()))
    }

    fn is_ancestor(&self, _candidate: &str, commit: &str) -> Result<bool, GitError> {
        Ok(!self.not_ancestor.contains(commit))
    }

    fn diff(&self, _parent: &str, commit: &str) -> Result<Vec<FilePatch>, GitError> {
        self.patches
            .get(commit)
            .cloned()
            .ok_or_else(|| GitError::DiffFailed {
                parent: String::new(),
                commit: commit.to_string(),
                reason: "no scripted patch".to_string(),
            })
    }

    fn tree_files(&self, commit: &str) -> Result<Vec<TreeFile>, GitError> {
        self.trees
            .get(commit)
            .cloned()
            .ok_or_else(|| GitError::TreeFailed {
                commit: commit.to_string(),
                reason: "no scripted tree".to_string(),
            })
    }
}
