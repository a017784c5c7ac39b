use crate::error::GitError;
use crate::git::{
    ChunkBuilder, CommitInfo, CommitLog, FilePatch, PullOutcome, SshCredentials, TreeFile,
    VersionControl, short_branch_name,
};
use crate::summarizer::count_file_lines;
use git2::{
    Delta, DiffOptions, ObjectType, Oid, Patch, Repository, ResetType, Sort, TreeWalkMode,
    TreeWalkResult,
};
use std::path::{Path, PathBuf};

/// Working copy of the tracked branch backed by libgit2
pub struct GitRepository {
    repo: Repository,
    repo_path: PathBuf,
    branch: String,
    credentials: SshCredentials,
}

impl GitRepository {
    /// Clone `url` into `path` with `branch` checked out
    pub fn clone_into(
        url: &str,
        path: &Path,
        branch: &str,
        credentials: SshCredentials,
    ) -> Result<Self, GitError> {
        let branch = short_branch_name(branch).to_string();
        tracing::info!("Cloning {} ({}) into {}", url, branch, path.display());

        let repo = {
            let mut builder = git2::build::RepoBuilder::new();
            builder
                .branch(&branch)
                .fetch_options(credentials.fetch_options());
            builder.clone(url, path).map_err(|e| GitError::CloneFailed {
                url: url.to_string(),
                reason: e.message().to_string(),
            })?
        };

        Ok(Self {
            repo,
            repo_path: path.to_path_buf(),
            branch,
            credentials,
        })
    }

    /// Open an existing working copy
    pub fn open(path: &Path, branch: &str, credentials: SshCredentials) -> Result<Self, GitError> {
        let repo = Repository::open(path).map_err(|e| GitError::OpenFailed(e.to_string()))?;
        tracing::info!("Opened git repository at: {}", path.display());

        Ok(Self {
            repo,
            repo_path: path.to_path_buf(),
            branch: short_branch_name(branch).to_string(),
            credentials,
        })
    }

    /// Get the repository root path
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Short name of the tracked branch
    pub fn branch(&self) -> &str {
        &self.branch
    }

    fn local_ref(&self) -> String {
        format!("refs/heads/{}", self.branch)
    }

    fn remote_ref(&self) -> String {
        format!("refs/remotes/origin/{}", self.branch)
    }

    fn head_oid(&self) -> Result<Oid, GitError> {
        self.repo
            .refname_to_id(&self.local_ref())
            .map_err(|e| GitError::HeadNotFound(format!("{}: {}", self.local_ref(), e.message())))
    }

    fn find_commit(&self, hash: &str) -> Result<git2::Commit<'_>, GitError> {
        let oid = parse_oid(hash)?;
        self.repo
            .find_commit(oid)
            .map_err(|_| GitError::CommitNotFound(hash.to_string()))
    }
}

fn parse_oid(hash: &str) -> Result<Oid, GitError> {
    Oid::from_str(hash).map_err(|_| GitError::InvalidCommitHash(hash.to_string()))
}

fn path_string(path: Option<&Path>) -> Option<String> {
    path.map(|p| p.to_string_lossy().into_owned())
}

impl VersionControl for GitRepository {
    fn pull(&mut self) -> Result<PullOutcome, GitError> {
        let pull_err = |e: git2::Error| GitError::PullFailed {
            branch: self.branch.clone(),
            reason: e.message().to_string(),
        };

        let mut remote = self.repo.find_remote("origin").map_err(pull_err)?;
        let refspec = format!("+{}:{}", self.local_ref(), self.remote_ref());
        remote
            .fetch(&[refspec.as_str()], Some(&mut self.credentials.fetch_options()), None)
            .map_err(pull_err)?;

        let fetched = self
            .repo
            .refname_to_id(&self.remote_ref())
            .map_err(|e| GitError::RefNotFound(format!("{}: {}", self.remote_ref(), e.message())))?;
        let local = self.head_oid()?;

        if fetched == local {
            return Ok(PullOutcome::UpToDate);
        }

        if !self.repo.graph_descendant_of(fetched, local)? {
            tracing::warn!(
                "History of {} was rewritten: {} is not a descendant of {}",
                self.branch,
                fetched,
                local
            );
        }

        // HEAD is attached to the tracked branch, so this moves the branch too
        let target = self.repo.find_object(fetched, Some(ObjectType::Commit))?;
        self.repo
            .reset(&target, ResetType::Hard, None)
            .map_err(pull_err)?;

        tracing::debug!("Moved {} from {} to {}", self.branch, local, fetched);
        Ok(PullOutcome::Advanced {
            head: fetched.to_string(),
        })
    }

    fn resolve_head(&self) -> Result<String, GitError> {
        Ok(self.head_oid()?.to_string())
    }

    fn log(&self, from: &str) -> Result<CommitLog<'_>, GitError> {
        let oid = parse_oid(from)?;
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk
            .push(oid)
            .map_err(|e| GitError::IterFailed(format!("{}: {}", from, e.message())))?;

        Ok(Box::new(revwalk.map(|oid| {
            oid.map(|oid| oid.to_string())
                .map_err(|e| GitError::IterFailed(e.message().to_string()))
        })))
    }

    fn commit(&self, hash: &str) -> Result<CommitInfo, GitError> {
        let commit = self.find_commit(hash)?;
        let author = commit.author();

        Ok(CommitInfo {
            hash: commit.id().to_string(),
            parent_hashes: commit.parent_ids().map(|id| id.to_string()).collect(),
            author_email: String::from_utf8_lossy(author.email_bytes()).into_owned(),
            author_time: author.when().seconds(),
            message: String::from_utf8_lossy(commit.message_raw_bytes()).into_owned(),
        })
    }

    fn is_ancestor(&self, candidate: &str, commit: &str) -> Result<bool, GitError> {
        let candidate = parse_oid(candidate)?;
        let commit = parse_oid(commit)?;
        if candidate == commit {
            return Ok(true);
        }
        Ok(self.repo.graph_descendant_of(commit, candidate)?)
    }

    fn diff(&self, parent: &str, commit: &str) -> Result<Vec<FilePatch>, GitError> {
        let diff_err = |e: git2::Error| GitError::DiffFailed {
            parent: parent.to_string(),
            commit: commit.to_string(),
            reason: e.message().to_string(),
        };

        let parent_tree = self.find_commit(parent)?.tree().map_err(diff_err)?;
        let tree = self.find_commit(commit)?.tree().map_err(diff_err)?;

        let mut diff_opts = DiffOptions::new();
        diff_opts
            .context_lines(3)
            .interhunk_lines(0)
            .ignore_whitespace(false);

        let diff = self
            .repo
            .diff_tree_to_tree(Some(&parent_tree), Some(&tree), Some(&mut diff_opts))
            .map_err(diff_err)?;

        let mut patches = Vec::with_capacity(diff.deltas().len());
        for (idx, delta) in diff.deltas().enumerate() {
            let from = match delta.status() {
                Delta::Added | Delta::Untracked => None,
                _ => path_string(delta.old_file().path()),
            };
            let to = match delta.status() {
                Delta::Deleted => None,
                _ => path_string(delta.new_file().path()),
            };

            let mut builder = ChunkBuilder::new();
            // Binary deltas have no text patch
            if let Some(patch) = Patch::from_diff(&diff, idx).map_err(diff_err)? {
                for hunk_idx in 0..patch.num_hunks() {
                    builder.begin_hunk();
                    let lines = patch.num_lines_in_hunk(hunk_idx).map_err(diff_err)?;
                    for line_idx in 0..lines {
                        let line = patch.line_in_hunk(hunk_idx, line_idx).map_err(diff_err)?;
                        builder.push_line(line.origin(), &String::from_utf8_lossy(line.content()));
                    }
                }
            }

            patches.push(FilePatch {
                from,
                to,
                chunks: builder.finish(),
            });
        }

        Ok(patches)
    }

    fn tree_files(&self, commit: &str) -> Result<Vec<TreeFile>, GitError> {
        let tree_err = |reason: String| GitError::TreeFailed {
            commit: commit.to_string(),
            reason,
        };
        let tree = self
            .find_commit(commit)?
            .tree()
            .map_err(|e| tree_err(e.message().to_string()))?;

        let mut files = Vec::new();
        let mut failure = None;
        let walked = tree.walk(TreeWalkMode::PreOrder, |root, entry| {
            if entry.kind() != Some(ObjectType::Blob) {
                return TreeWalkResult::Ok;
            }
            let path = format!("{}{}", root, String::from_utf8_lossy(entry.name_bytes()));
            match self.repo.find_blob(entry.id()) {
                Ok(blob) => {
                    files.push(TreeFile {
                        path,
                        line_count: count_file_lines(blob.content()),
                    });
                    TreeWalkResult::Ok
                }
                Err(e) => {
                    failure = Some(format!("{}: {}", path, e.message()));
                    TreeWalkResult::Abort
                }
            }
        });

        // An aborted walk reports a generic error; prefer the blob failure behind it
        if let Some(reason) = failure {
            return Err(tree_err(reason));
        }
        walked.map_err(|e| tree_err(e.message().to_string()))?;
        Ok(files)
    }
}
