/// Centralized error types for commit-feed using thiserror
///
/// Every pipeline stage returns one of these; only the binary decides whether an
/// error terminates the process. A parent commit that is not an ancestor is not an
/// error at all, see [`crate::pipeline::CommitOutcome::Skipped`].
use thiserror::Error;

/// Main error type for the commit feed
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    #[error("Working copy is locked by another process: {0}")]
    WorkdirLocked(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

/// Errors related to SSH key material
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("SSH key not found: {0}")]
    KeyNotFound(String),

    #[error("Failed to read SSH key '{path}': {reason}")]
    KeyUnreadable { path: String, reason: String },
}

/// Errors related to git operations
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Failed to clone '{url}': {reason}")]
    CloneFailed { url: String, reason: String },

    #[error("Failed to open git repository: {0}")]
    OpenFailed(String),

    #[error("Failed to pull branch '{branch}': {reason}")]
    PullFailed { branch: String, reason: String },

    #[error("Failed to resolve HEAD: {0}")]
    HeadNotFound(String),

    #[error("Failed to get git reference: {0}")]
    RefNotFound(String),

    #[error("Invalid commit hash: {0}")]
    InvalidCommitHash(String),

    #[error("Commit not found: {0}")]
    CommitNotFound(String),

    #[error("Failed to iterate commits: {0}")]
    IterFailed(String),

    #[error("Failed to diff {parent}..{commit}: {reason}")]
    DiffFailed {
        parent: String,
        commit: String,
        reason: String,
    },

    #[error("Failed to read tree of {commit}: {reason}")]
    TreeFailed { commit: String, reason: String },

    #[error(transparent)]
    Backend(#[from] git2::Error),
}

/// Errors related to writing records to the durable sink
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Failed to serialize record '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid object key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Failed to write '{key}': {reason}")]
    WriteFailed { key: String, reason: String },
}

impl FeedError {
    /// Create a new error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        FeedError::Other(msg.into())
    }

    /// Short stable label used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            FeedError::Config(_) => "configuration",
            FeedError::Credential(_) => "credential",
            FeedError::Git(_) => "transport",
            FeedError::Publish(_) => "publish",
            FeedError::WorkdirLocked(_) => "workdir",
            FeedError::Io(_) => "io",
            FeedError::Other(_) => "other",
        }
    }

    /// Whether the process should linger for the failure grace period before exiting.
    ///
    /// Configuration mistakes exit immediately; everything else leaves operators a
    /// window to read the logs before the supervisor restarts the pipeline.
    pub fn applies_grace_period(&self) -> bool {
        !matches!(self, FeedError::Config(_))
    }
}
