//! Incremental sync of the tracked branch
//!
//! [`SyncMachine`] owns the cursor (the last observed head) and moves through
//! `Idle → Pulling → NoChange | HeadAdvanced → Idle` one [`SyncMachine::step`] at
//! a time. Waiting between steps is the supervisor's job.

/// One-time full history replay
pub mod backfill;

pub use backfill::{BackfillReport, backfill};

use crate::error::{FeedError, GitError};
use crate::git::{PullOutcome, VersionControl};
use crate::pipeline::{CommitOutcome, CommitPipeline};

/// Default cap on commits walked while looking for the previous head
pub const DEFAULT_FRONTIER_WALK_LIMIT: usize = 10_000;

/// Last observed head of a repository/branch, kept in memory only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCursor {
    pub repo: String,
    pub branch: String,
    pub head: String,
}

/// Phase of the sync machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Pulling,
}

/// Result of one [`SyncMachine::step`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Branch unchanged, nothing published
    NoChange,
    /// Branch moved and the new commits were processed newest-first
    HeadAdvanced {
        old_head: String,
        new_head: String,
        published: usize,
        skipped: usize,
        /// False when the walk hit the limit before reaching `old_head`
        frontier_found: bool,
    },
}

/// Commits between a new head and the previous one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierWalk {
    /// Newest first, the previous head excluded
    pub commits: Vec<String>,
    pub frontier_found: bool,
}

/// Take commits from `log` until `old_head` (exclusive) or `limit` commits
pub fn frontier_walk<I>(log: I, old_head: &str, limit: usize) -> Result<FrontierWalk, GitError>
where
    I: IntoIterator<Item = Result<String, GitError>>,
{
    let mut commits = Vec::new();
    for hash in log {
        let hash = hash?;
        if hash == old_head {
            return Ok(FrontierWalk {
                commits,
                frontier_found: true,
            });
        }
        if commits.len() >= limit {
            break;
        }
        commits.push(hash);
    }
    Ok(FrontierWalk {
        commits,
        frontier_found: false,
    })
}

/// Sync state machine for one repository/branch
#[derive(Debug)]
pub struct SyncMachine {
    cursor: SyncCursor,
    state: SyncState,
    walk_limit: usize,
}

impl SyncMachine {
    pub fn new(cursor: SyncCursor, walk_limit: usize) -> Self {
        Self {
            cursor,
            state: SyncState::Idle,
            walk_limit,
        }
    }

    pub fn cursor(&self) -> &SyncCursor {
        &self.cursor
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Pull once and process every commit introduced since the cursor
    ///
    /// The cursor only moves once all new commits went through `pipeline`. On
    /// error the machine is back in `Idle` with the cursor unchanged.
    pub fn step<V>(
        &mut self,
        vcs: &mut V,
        pipeline: &CommitPipeline,
    ) -> Result<StepOutcome, FeedError>
    where
        V: VersionControl + ?Sized,
    {
        self.state = SyncState::Pulling;
        let result = self.pull_and_process(vcs, pipeline);
        self.state = SyncState::Idle;
        result
    }

    fn pull_and_process<V>(
        &mut self,
        vcs: &mut V,
        pipeline: &CommitPipeline,
    ) -> Result<StepOutcome, FeedError>
    where
        V: VersionControl + ?Sized,
    {
        let new_head = match vcs.pull()? {
            PullOutcome::UpToDate => return Ok(StepOutcome::NoChange),
            PullOutcome::Advanced { head } if head == self.cursor.head => {
                return Ok(StepOutcome::NoChange);
            }
            PullOutcome::Advanced { head } => head,
        };
        let old_head = self.cursor.head.clone();
        tracing::info!("New head is {}, old head is {}", new_head, old_head);

        let walk = frontier_walk(vcs.log(&new_head)?, &old_head, self.walk_limit)?;
        if !walk.frontier_found {
            tracing::warn!(
                "Previous head {} not found within {} commits of {}; processing {} commits",
                old_head,
                self.walk_limit,
                new_head,
                walk.commits.len()
            );
        }

        let mut published = 0;
        let mut skipped = 0;
        for hash in &walk.commits {
            match pipeline.process(&*vcs, hash)? {
                CommitOutcome::Published { .. } => published += 1,
                CommitOutcome::Skipped { .. } => skipped += 1,
            }
        }

        self.cursor.head = new_head.clone();
        Ok(StepOutcome::HeadAdvanced {
            old_head,
            new_head,
            published,
            skipped,
            frontier_found: walk.frontier_found,
        })
    }
}
