use crate::error::FeedError;
use crate::git::VersionControl;
use crate::pipeline::{CommitOutcome, CommitPipeline};
use crate::sync::SyncCursor;

/// Summary of a backfill walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillReport {
    /// Head the walk started from
    pub head: String,
    pub published: usize,
    pub skipped: usize,
}

/// Process every commit reachable from the current head, newest first
///
/// Runs without a lower bound. The returned cursor points at the head the walk
/// started from.
pub fn backfill<V>(
    vcs: &V,
    pipeline: &CommitPipeline,
) -> Result<(SyncCursor, BackfillReport), FeedError>
where
    V: VersionControl + ?Sized,
{
    let head = vcs.resolve_head()?;
    tracing::info!(
        "Backfilling {}/{} from {}",
        pipeline.repo(),
        pipeline.branch(),
        head
    );

    let mut report = BackfillReport {
        head: head.clone(),
        published: 0,
        skipped: 0,
    };
    for hash in vcs.log(&head)? {
        let hash = hash?;
        match pipeline.process(vcs, &hash)? {
            CommitOutcome::Published { .. } => report.published += 1,
            CommitOutcome::Skipped { .. } => report.skipped += 1,
        }
        let seen = report.published + report.skipped;
        if seen % 100 == 0 {
            tracing::debug!("Backfilled {} commits", seen);
        }
    }

    tracing::info!(
        "Backfill complete: {} published, {} skipped",
        report.published,
        report.skipped
    );

    let cursor = SyncCursor {
        repo: pipeline.repo().to_string(),
        branch: pipeline.branch().to_string(),
        head,
    };
    Ok((cursor, report))
}
