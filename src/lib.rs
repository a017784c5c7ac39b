//! # commit-feed - per-commit change records for one git branch
//!
//! A long-running worker that keeps a working copy of one repository/branch,
//! replays its full history once at startup, then polls the remote and emits a
//! JSON [`types::CommitRecord`] for every commit the branch gains.
//!
//! ## Overview
//!
//! Each record lists, per file, whether the file was created, modified or
//! deleted plus added/removed line and chunk counts relative to the commit's
//! first parent. Records are written to an [`sink::ObjectSink`] under
//! `{repo}/{branch}/{hash}.json`; rewriting the same commit produces the same
//! bytes, so replays are harmless.
//!
//! ## Architecture
//!
//! ```text
//!  ┌────────────┐   tick   ┌────────────┐  hashes  ┌──────────────┐
//!  │ Supervisor ├─────────►│ SyncMachine├─────────►│CommitPipeline│
//!  └─────┬──────┘          └─────┬──────┘          └──────┬───────┘
//!        │ clone, backfill       │ pull, log              │ summarize
//!  ┌─────▼──────┐          ┌─────▼──────┐          ┌──────▼───────┐
//!  │  workdir   │          │    git     │          │  Publisher   │
//!  └────────────┘          └────────────┘          └──────┬───────┘
//!                                                         │ put
//!                                                  ┌──────▼───────┐
//!                                                  │  ObjectSink  │
//!                                                  └──────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`supervisor`]: startup sequence, backfill and the poll loop
//! - [`sync`]: cursor-owning state machine and the backfill walker
//! - [`pipeline`]: per-commit load, summarize, publish
//! - [`summarizer`]: diff chunks to per-file counts
//! - [`publisher`]: record serialization and object keys
//! - [`sink`]: durable object sinks (directory, in-memory)
//! - [`git`]: the [`git::VersionControl`] seam and its libgit2 implementation
//! - [`workdir`]: working copy placement and cross-process lock
//! - [`config`]: configuration with file and environment layering
//! - [`types`]: wire format
//! - [`error`]: error taxonomy
//!
//! ## Usage Example
//!
//! ```no_run
//! use commit_feed::config::Config;
//! use commit_feed::supervisor::Supervisor;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let supervisor = Supervisor::new(config)?;
//!
//!     // Only returns on failure
//!     let Err(err) = supervisor.run().await;
//!     Err(err.into())
//! }
//! ```

/// Configuration management with environment variable overrides
pub mod config;

/// Error types and utilities
pub mod error;

/// Version-control access and diff extraction
pub mod git;

/// Per-commit processing shared by backfill and sync
pub mod pipeline;

/// Commit record serialization and publishing
pub mod publisher;

/// Durable object sinks
pub mod sink;

/// Diff summarization into per-file change records
pub mod summarizer;

/// Process lifecycle and poll loop
pub mod supervisor;

/// Incremental sync and history backfill
pub mod sync;

/// Wire-format record types
pub mod types;

/// Working copy directories and locking
pub mod workdir;
