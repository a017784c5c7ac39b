//! Process lifecycle: startup, backfill, then poll forever
//!
//! Git and sink work is blocking, so the [`Worker`] (working copy, pipeline and
//! sync machine) is moved into `spawn_blocking` for each step and handed back
//! afterwards. Only one step is ever in flight.

use crate::config::Config;
use crate::error::FeedError;
use crate::git::{GitRepository, SshCredentials, VersionControl};
use crate::pipeline::CommitPipeline;
use crate::publisher::Publisher;
use crate::sink::DirectorySink;
use crate::sync::{BackfillReport, StepOutcome, SyncCursor, SyncMachine, backfill};
use crate::workdir::{WorkdirLock, prepare_workdir};
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Source of poll ticks
pub trait Ticker: Send {
    /// Resolve when the next poll is due
    fn tick(&mut self) -> impl Future<Output = ()> + Send;
}

/// Fixed-period ticker; the first tick fires one period after creation
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

/// Everything one sync step needs, owned together
pub struct Worker<V> {
    vcs: V,
    pipeline: CommitPipeline,
    machine: SyncMachine,
}

impl<V> Worker<V>
where
    V: VersionControl + Send + 'static,
{
    pub fn new(vcs: V, pipeline: CommitPipeline, machine: SyncMachine) -> Self {
        Self {
            vcs,
            pipeline,
            machine,
        }
    }

    pub fn cursor(&self) -> &SyncCursor {
        self.machine.cursor()
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    /// Run one sync step on the current thread
    pub fn step(&mut self) -> Result<StepOutcome, FeedError> {
        self.machine.step(&mut self.vcs, &self.pipeline)
    }

    /// Run one sync step on the blocking pool
    pub async fn step_blocking(self) -> Result<(Self, StepOutcome), FeedError> {
        let (worker, outcome) = tokio::task::spawn_blocking(move || {
            let mut worker = self;
            let outcome = worker.step();
            (worker, outcome)
        })
        .await
        .map_err(|e| FeedError::other(format!("Sync task failed: {}", e)))?;
        Ok((worker, outcome?))
    }
}

/// Step `worker` on every tick until a step fails
pub async fn poll_forever<V, T>(mut worker: Worker<V>, ticker: &mut T) -> Result<Infallible, FeedError>
where
    V: VersionControl + Send + 'static,
    T: Ticker,
{
    loop {
        ticker.tick().await;
        tracing::debug!("Polling {}", worker.cursor().branch);

        let (next, outcome) = worker.step_blocking().await?;
        worker = next;

        match outcome {
            StepOutcome::NoChange => tracing::debug!("No new commits"),
            StepOutcome::HeadAdvanced {
                old_head,
                new_head,
                published,
                skipped,
                frontier_found,
            } => tracing::info!(
                old_head = %old_head,
                new_head = %new_head,
                frontier_found,
                "Published {} commits, skipped {}",
                published,
                skipped
            ),
        }
    }
}

/// A cloned, backfilled working copy ready for polling
pub struct Started {
    pub worker: Worker<GitRepository>,
    pub report: BackfillReport,
    _lock: WorkdirLock,
}

/// Drives one repository/branch from startup to failure
pub struct Supervisor {
    config: Config,
}

impl Supervisor {
    /// Validates `config` up front
    pub fn new(config: Config) -> Result<Self, FeedError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load credentials, clone into a fresh working copy and backfill
    pub async fn start(&self) -> Result<Started, FeedError> {
        let config = &self.config;
        let repo = config.repo.name.clone();
        let branch = config.repo.branch.clone();

        let credentials = SshCredentials::load(
            config.ssh.user.as_str(),
            &config.ssh.key_path,
            config.ssh.passphrase.clone(),
        )?;

        let lock = WorkdirLock::try_acquire(&config.repo.work_root, &repo, &branch)?;
        let path = prepare_workdir(&config.repo.work_root, &repo, &branch)?;

        let publisher = Publisher::new(Arc::new(DirectorySink::new(&config.sink.root)?));
        tracing::info!("Publishing {}/{} to {}", repo, branch, publisher.destination());
        let pipeline = CommitPipeline::new(&repo, &branch, publisher);
        let url = config.remote_url();
        let walk_limit = config.schedule.frontier_walk_limit;

        let backfill_pipeline = pipeline.clone();
        let (vcs, cursor, report) = tokio::task::spawn_blocking(move || {
            let vcs = GitRepository::clone_into(&url, &path, &branch, credentials)?;
            let (cursor, report) = backfill(&vcs, &backfill_pipeline)?;
            Ok::<_, FeedError>((vcs, cursor, report))
        })
        .await
        .map_err(|e| FeedError::other(format!("Backfill task failed: {}", e)))??;

        Ok(Started {
            worker: Worker::new(vcs, pipeline, SyncMachine::new(cursor, walk_limit)),
            report,
            _lock: lock,
        })
    }

    /// Start, then poll until something fails
    pub async fn run(self) -> Result<Infallible, FeedError> {
        let delay = self.config.startup_delay();
        if !delay.is_zero() {
            tracing::info!("Waiting {:?} before starting", delay);
            tokio::time::sleep(delay).await;
        }

        let started = self.start().await?;
        tracing::info!(
            "Backfilled {}/{} at {}, polling every {:?}",
            self.config.repo.name,
            self.config.repo.branch,
            started.report.head,
            self.config.poll_interval()
        );

        let mut ticker = IntervalTicker::new(self.config.poll_interval());
        let Started {
            worker, _lock: lock, ..
        } = started;
        let result = poll_forever(worker, &mut ticker).await;
        drop(lock);
        result
    }
}
