/// Backfill against real git repositories cloned from a local origin
mod common;

use anyhow::Result;
use commit_feed::config::Config;
use commit_feed::git::{GitRepository, VersionControl};
use commit_feed::pipeline::CommitPipeline;
use commit_feed::publisher::Publisher;
use commit_feed::sink::MemorySink;
use commit_feed::supervisor::Supervisor;
use commit_feed::sync::backfill;
use commit_feed::types::{ChangeType, CommitRecord, FileChangeRecord};
use common::{BRANCH, Origin, credentials, dummy_key};
use std::sync::Arc;
use tempfile::TempDir;

/// Root commit with a.txt (2 lines) and b.txt (1 line), then b.txt deleted and
/// one line appended to a.txt
fn two_commit_origin() -> (Origin, String, String) {
    let origin = Origin::new();
    let first = origin.commit(
        &[("a.txt", Some("one\ntwo\n")), ("b.txt", Some("bee\n"))],
        "Initial import\n",
        1_700_000_000,
    );
    let second = origin.commit(
        &[("a.txt", Some("one\ntwo\nthree\n")), ("b.txt", None)],
        "Drop b\n\nand extend a\n",
        1_700_000_100,
    );
    (origin, first, second)
}

fn clone(origin: &Origin, work: &TempDir) -> GitRepository {
    GitRepository::clone_into(
        &origin.url(),
        &work.path().join("clone"),
        BRANCH,
        credentials(work.path()),
    )
    .unwrap()
}

fn record(sink: &MemorySink, key: &str) -> CommitRecord {
    serde_json::from_slice(&sink.get(key).unwrap()).unwrap()
}

#[test]
fn test_backfill_two_commit_history() -> Result<()> {
    let (origin, first, second) = two_commit_origin();
    let work = TempDir::new()?;
    let repo = clone(&origin, &work);

    let sink = Arc::new(MemorySink::new());
    let pipeline = CommitPipeline::new("service", BRANCH, Publisher::new(sink.clone()));
    let (cursor, report) = backfill(&repo, &pipeline)?;

    assert_eq!(cursor.head, second);
    assert_eq!(report.published, 2);
    assert_eq!(report.skipped, 0);
    assert_eq!(
        sink.keys(),
        vec![
            format!("service/main/{second}.json"),
            format!("service/main/{first}.json"),
        ]
    );

    let root = record(&sink, &format!("service/main/{first}.json"));
    assert_eq!(root.message, "Initial import");
    assert_eq!(root.author, "dev@example.com");
    assert_eq!(root.timestamp, 1_700_000_000);
    assert_eq!(
        root.files,
        vec![
            FileChangeRecord::initial("a.txt", 2),
            FileChangeRecord::initial("b.txt", 1),
        ]
    );

    let child = record(&sink, &format!("service/main/{second}.json"));
    assert_eq!(child.message, "Drop band extend a");
    assert_eq!(child.files.len(), 2);

    let a = &child.files[0];
    assert_eq!(a.file, "a.txt");
    assert_eq!(a.change_type, ChangeType::Modify);
    assert_eq!(a.chunks_added, 1);
    assert_eq!(a.chunks_removed, 0);
    assert_eq!(a.lines_removed, 0);
    // The added chunk is "three\n"; the trailing newline counts as a segment
    assert_eq!(a.lines_added, 2);

    assert_eq!(child.files[1], FileChangeRecord::deleted("b.txt"));
    Ok(())
}

#[test]
fn test_backfill_appended_line_without_newline() -> Result<()> {
    let origin = Origin::new();
    origin.commit(
        &[("a.txt", Some("one\ntwo\n")), ("b.txt", Some("bee\n"))],
        "Initial import\n",
        1_700_000_000,
    );
    let second = origin.commit(
        &[("a.txt", Some("one\ntwo\nthree")), ("b.txt", None)],
        "Drop b\n",
        1_700_000_100,
    );
    let work = TempDir::new()?;
    let repo = clone(&origin, &work);

    let sink = Arc::new(MemorySink::new());
    let pipeline = CommitPipeline::new("service", BRANCH, Publisher::new(sink.clone()));
    backfill(&repo, &pipeline)?;

    let child = record(&sink, &format!("service/main/{second}.json"));
    let mut extended = FileChangeRecord::modify("a.txt");
    extended.chunks_added = 1;
    extended.lines_added = 1;
    assert_eq!(
        child.files,
        vec![extended, FileChangeRecord::deleted("b.txt")]
    );
    Ok(())
}

#[test]
fn test_backfill_replay_is_byte_identical() -> Result<()> {
    let (origin, _, _) = two_commit_origin();

    let first_run = Arc::new(MemorySink::new());
    let work = TempDir::new()?;
    let repo = clone(&origin, &work);
    backfill(
        &repo,
        &CommitPipeline::new("service", BRANCH, Publisher::new(first_run.clone())),
    )?;

    // Fresh clone, as after a restart
    let second_run = Arc::new(MemorySink::new());
    let work = TempDir::new()?;
    let repo = clone(&origin, &work);
    backfill(
        &repo,
        &CommitPipeline::new("service", BRANCH, Publisher::new(second_run.clone())),
    )?;

    assert_eq!(first_run.writes(), second_run.writes());
    Ok(())
}

#[test]
fn test_merge_commit_is_diffed_against_first_parent() -> Result<()> {
    let origin = Origin::new();
    let base = origin.commit(&[("a.txt", Some("a\n"))], "base", 1);
    let side = origin.commit_on(Some(base.as_str()), &[("side.txt", Some("s\n"))], "side", 2);
    let main = origin.commit(&[("main.txt", Some("m\n"))], "main", 3);

    // Merge tree holds all three files; first parent is `main`
    let merge_tree = {
        let mut builder = origin
            .repo
            .treebuilder(Some(&origin.repo.find_commit(main.parse()?)?.tree()?))?;
        let side_tree = origin.repo.find_commit(side.parse()?)?.tree()?;
        let entry = side_tree.get_name("side.txt").unwrap();
        builder.insert("side.txt", entry.id(), 0o100644)?;
        origin.repo.find_tree(builder.write()?)?
    };
    let sig = git2::Signature::new("Dev", "dev@example.com", &git2::Time::new(4, 0))?;
    let main_commit = origin.repo.find_commit(main.parse()?)?;
    let side_commit = origin.repo.find_commit(side.parse()?)?;
    let merge = origin
        .repo
        .commit(None, &sig, &sig, "merge", &merge_tree, &[&main_commit, &side_commit])?
        .to_string();
    origin.force_branch(&merge);

    let work = TempDir::new()?;
    let repo = clone(&origin, &work);
    let sink = Arc::new(MemorySink::new());
    let pipeline = CommitPipeline::new("service", BRANCH, Publisher::new(sink.clone()));
    let (_, report) = backfill(&repo, &pipeline)?;
    assert_eq!(report.published, 4);

    let merged = record(&sink, &format!("service/main/{merge}.json"));
    let files: Vec<&str> = merged.files.iter().map(|f| f.file.as_str()).collect();
    assert_eq!(files, vec!["side.txt"]);
    Ok(())
}

#[tokio::test]
async fn test_supervisor_start_publishes_to_directory() -> Result<()> {
    let (origin, first, second) = two_commit_origin();
    let dir = TempDir::new()?;

    let mut config = Config::default();
    config.repo.name = "origin".to_string();
    config.repo.branch = BRANCH.to_string();
    config.repo.remote_url_template = format!("{}/{{repo}}", origin.dir.path().display());
    config.repo.work_root = dir.path().join("work");
    config.sink.root = dir.path().join("records");
    config.ssh.key_path = dummy_key(dir.path());
    assert_eq!(config.remote_url(), origin.url());

    let supervisor = Supervisor::new(config)?;
    let started = supervisor.start().await?;

    assert_eq!(started.report.head, second);
    assert_eq!(started.worker.cursor().head, second);
    assert_eq!(started.worker.vcs().resolve_head()?, second);
    for hash in [&first, &second] {
        let path = dir.path().join("records/origin/main").join(format!("{hash}.json"));
        let parsed: CommitRecord = serde_json::from_slice(&std::fs::read(path)?)?;
        assert_eq!(&parsed.hash, hash);
    }
    assert!(dir.path().join("work/origin/main/.git").exists());

    // A second daemon for the same pair is refused while the first runs
    let again = Supervisor::new(supervisor.config().clone())?;
    assert!(matches!(
        again.start().await,
        Err(commit_feed::error::FeedError::WorkdirLocked(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_supervisor_start_reports_clone_failure() -> Result<()> {
    let dir = TempDir::new()?;
    let mut config = Config::default();
    config.repo.name = "missing".to_string();
    config.repo.branch = BRANCH.to_string();
    config.repo.remote_url_template = format!("{}/{{repo}}", dir.path().display());
    config.repo.work_root = dir.path().join("work");
    config.sink.root = dir.path().join("records");
    config.ssh.key_path = dummy_key(dir.path());

    let result = Supervisor::new(config)?.start().await;
    assert!(matches!(
        result,
        Err(commit_feed::error::FeedError::Git(
            commit_feed::error::GitError::CloneFailed { .. }
        ))
    ));
    Ok(())
}
