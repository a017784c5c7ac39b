//! Shared fixtures for integration tests: a local "remote" repository and a
//! dummy SSH key
#![allow(dead_code)]

use commit_feed::git::SshCredentials;
use git2::{Oid, Repository, RepositoryInitOptions, Signature, Time};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const BRANCH: &str = "main";

/// Repository playing the remote, living in its own temp dir
pub struct Origin {
    pub dir: TempDir,
    pub repo: Repository,
}

impl Origin {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head(BRANCH);
        let repo = Repository::init_opts(dir.path().join("origin"), &opts).unwrap();
        Self { dir, repo }
    }

    /// Clone URL of the origin (a plain local path)
    pub fn url(&self) -> String {
        self.dir.path().join("origin").to_string_lossy().into_owned()
    }

    /// Path of the origin directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().join("origin")
    }

    pub fn head(&self) -> Option<String> {
        self.repo
            .refname_to_id(&format!("refs/heads/{BRANCH}"))
            .ok()
            .map(|oid| oid.to_string())
    }

    /// Commit `files` on top of the branch tip and advance the branch
    ///
    /// `None` content deletes the file.
    pub fn commit(&self, files: &[(&str, Option<&str>)], message: &str, time: i64) -> String {
        let head = self.head();
        let hash = self.commit_on(head.as_deref(), files, message, time);
        self.force_branch(&hash);
        hash
    }

    /// Create a commit on top of `parent` without moving the branch
    pub fn commit_on(
        &self,
        parent: Option<&str>,
        files: &[(&str, Option<&str>)],
        message: &str,
        time: i64,
    ) -> String {
        let parent = parent.map(|p| self.repo.find_commit(Oid::from_str(p).unwrap()).unwrap());
        let base_tree = parent.as_ref().map(|p| p.tree().unwrap());
        let mut builder = self.repo.treebuilder(base_tree.as_ref()).unwrap();
        for (path, content) in files {
            match content {
                Some(content) => {
                    let blob = self.repo.blob(content.as_bytes()).unwrap();
                    builder.insert(*path, blob, 0o100644).unwrap();
                }
                None => builder.remove(*path).unwrap(),
            }
        }
        let tree = self.repo.find_tree(builder.write().unwrap()).unwrap();
        let sig = Signature::new("Dev", "dev@example.com", &Time::new(time, 0)).unwrap();
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        self.repo
            .commit(None, &sig, &sig, message, &tree, &parents)
            .unwrap()
            .to_string()
    }

    /// Point the branch at `hash`, as a force push would
    pub fn force_branch(&self, hash: &str) {
        self.repo
            .reference(
                &format!("refs/heads/{BRANCH}"),
                Oid::from_str(hash).unwrap(),
                true,
                "test update",
            )
            .unwrap();
    }
}

/// Write a placeholder private key; local clones never use it
pub fn dummy_key(dir: &Path) -> PathBuf {
    let key = dir.join("id_test");
    fs::write(&key, "not a real key").unwrap();
    key
}

pub fn credentials(dir: &Path) -> SshCredentials {
    SshCredentials::load("git", dummy_key(dir), None).unwrap()
}
