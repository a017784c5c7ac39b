//! Working copy placement and cross-process locking
//!
//! Each repository/branch pair gets its own directory under the work root. A
//! flock()-based lock keeps two daemons from sharing a working copy; the OS
//! releases it if the process dies.

use crate::error::FeedError;
use fs2::FileExt;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

const LOCK_DIR: &str = ".locks";

/// Directory name used for `branch`
fn branch_dir_name(branch: &str) -> String {
    branch.replace('/', "_")
}

/// Lock file path for a repository/branch pair
fn lock_file_path(root: &Path, repo: &str, branch: &str) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(repo.as_bytes());
    hasher.update(b"/");
    hasher.update(branch.as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    root.join(LOCK_DIR).join(format!("{}.lock", &hash[..16]))
}

/// Path of the working copy for `repo`/`branch`
pub fn workdir_path(root: &Path, repo: &str, branch: &str) -> PathBuf {
    root.join(repo).join(branch_dir_name(branch))
}

/// Exclusive lock on one repository/branch working copy
///
/// Released when dropped.
#[derive(Debug)]
pub struct WorkdirLock {
    _file: File,
    path: PathBuf,
}

impl WorkdirLock {
    /// Take the lock without blocking
    ///
    /// Fails with [`FeedError::WorkdirLocked`] when another holder exists.
    pub fn try_acquire(root: &Path, repo: &str, branch: &str) -> Result<Self, FeedError> {
        let lock_path = lock_file_path(root, repo, branch);
        tracing::debug!(
            "Acquiring working copy lock for {}/{} (lock_file={:?})",
            repo,
            branch,
            lock_path
        );

        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&lock_path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!("Acquired working copy lock {:?}", lock_path);
                Ok(Self {
                    _file: file,
                    path: lock_path,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(
                FeedError::WorkdirLocked(format!("{}/{} ({})", repo, branch, lock_path.display())),
            ),
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkdirLock {
    fn drop(&mut self) {
        tracing::debug!("Releasing working copy lock {:?}", self.path);
    }
}

/// Empty the working copy directory for `repo`/`branch` and return its path
///
/// Previous contents are deleted. On unix the directory is owner-only.
pub fn prepare_workdir(root: &Path, repo: &str, branch: &str) -> Result<PathBuf, FeedError> {
    let path = workdir_path(root, repo, branch);
    if path.exists() {
        tracing::info!("Removing previous working copy at {}", path.display());
        fs::remove_dir_all(&path)?;
    }
    fs::create_dir_all(&path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o700))?;
    }

    Ok(path)
}
