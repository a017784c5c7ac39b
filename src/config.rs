/// Configuration system for commit-feed
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
use crate::error::{ConfigError, FeedError};
use crate::sync::DEFAULT_FRONTIER_WALK_LIMIT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Tracked repository and branch
    #[serde(default)]
    pub repo: RepoConfig,

    /// SSH credentials for the remote
    #[serde(default)]
    pub ssh: SshConfig,

    /// Where commit records are written
    #[serde(default)]
    pub sink: SinkConfig,

    /// Timers and walk bounds
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Repository name, substituted into the remote URL template
    #[serde(default)]
    pub name: String,

    /// Branch to track
    #[serde(default)]
    pub branch: String,

    /// Remote URL with a `{repo}` placeholder
    #[serde(default = "default_remote_url_template")]
    pub remote_url_template: String,

    /// Parent directory of working copies
    #[serde(default = "default_work_root")]
    pub work_root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshConfig {
    /// Fallback user when the URL carries none
    #[serde(default = "default_ssh_user")]
    pub user: String,

    /// Private key file
    #[serde(default = "default_ssh_key_path")]
    pub key_path: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Directory (or mounted bucket) receiving `{repo}/{branch}/{hash}.json`
    #[serde(default = "default_sink_root")]
    pub root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Wait before the first clone
    #[serde(default = "default_startup_delay")]
    pub startup_delay_secs: u64,

    /// Wait before exiting after a non-configuration failure
    #[serde(default = "default_failure_grace")]
    pub failure_grace_secs: u64,

    /// Max commits walked while looking for the previous head
    #[serde(default = "default_frontier_walk_limit")]
    pub frontier_walk_limit: usize,
}

// Default value functions
fn default_remote_url_template() -> String {
    "git@bitbucket.org:synthesis_admin/{repo}.git".to_string()
}

fn default_work_root() -> PathBuf {
    PathBuf::from("/tmp/repo")
}

fn default_ssh_user() -> String {
    "git".to_string()
}

fn default_ssh_key_path() -> PathBuf {
    PathBuf::from("./temp")
}

fn default_sink_root() -> PathBuf {
    PathBuf::from("./commit-records")
}

fn default_poll_interval() -> u64 {
    300
}

fn default_startup_delay() -> u64 {
    30
}

fn default_failure_grace() -> u64 {
    300
}

fn default_frontier_walk_limit() -> usize {
    DEFAULT_FRONTIER_WALK_LIMIT
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            branch: String::new(),
            remote_url_template: default_remote_url_template(),
            work_root: default_work_root(),
        }
    }
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            user: default_ssh_user(),
            key_path: default_ssh_key_path(),
            passphrase: None,
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            root: default_sink_root(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            startup_delay_secs: default_startup_delay(),
            failure_grace_secs: default_failure_grace(),
            frontier_walk_limit: default_frontier_walk_limit(),
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        reason: format!("expected a non-negative integer, got '{}'", value),
    })
}

impl Config {
    /// Load configuration from file
    ///
    /// Not validated: `repo.name` and `repo.branch` usually come from the
    /// environment.
    pub fn from_file(path: &Path) -> Result<Self, FeedError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        Ok(config)
    }

    /// Defaults, then `path` if given, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, FeedError> {
        let mut config = match path {
            Some(path) => {
                tracing::info!("Loading config from: {}", path.display());
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides looked up by environment variable name
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("REPO") {
            self.repo.name = name;
        }
        if let Some(branch) = lookup("BRANCH") {
            self.repo.branch = branch;
        }
        if let Some(template) = lookup("COMMIT_FEED_REMOTE_URL") {
            self.repo.remote_url_template = template;
        }
        if let Some(root) = lookup("COMMIT_FEED_WORK_ROOT") {
            self.repo.work_root = PathBuf::from(root);
        }

        if let Some(user) = lookup("COMMIT_FEED_SSH_USER") {
            self.ssh.user = user;
        }
        if let Some(key) = lookup("COMMIT_FEED_SSH_KEY") {
            self.ssh.key_path = PathBuf::from(key);
        }
        if let Some(passphrase) = lookup("COMMIT_FEED_SSH_PASSPHRASE") {
            self.ssh.passphrase = Some(passphrase).filter(|p| !p.is_empty());
        }

        if let Some(root) = lookup("COMMIT_FEED_SINK_ROOT") {
            self.sink.root = PathBuf::from(root);
        }

        if let Some(secs) = lookup("COMMIT_FEED_POLL_INTERVAL_SECS") {
            self.schedule.poll_interval_secs =
                parse_number("COMMIT_FEED_POLL_INTERVAL_SECS", &secs)?;
        }
        if let Some(secs) = lookup("COMMIT_FEED_STARTUP_DELAY_SECS") {
            self.schedule.startup_delay_secs =
                parse_number("COMMIT_FEED_STARTUP_DELAY_SECS", &secs)?;
        }
        if let Some(secs) = lookup("COMMIT_FEED_FAILURE_GRACE_SECS") {
            self.schedule.failure_grace_secs =
                parse_number("COMMIT_FEED_FAILURE_GRACE_SECS", &secs)?;
        }
        if let Some(limit) = lookup("COMMIT_FEED_FRONTIER_WALK_LIMIT") {
            self.schedule.frontier_walk_limit =
                parse_number("COMMIT_FEED_FRONTIER_WALK_LIMIT", &limit)?;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), FeedError> {
        if self.repo.name.trim().is_empty() {
            return Err(ConfigError::MissingRequired("repo.name (REPO)".to_string()).into());
        }

        if self.repo.branch.trim().is_empty() {
            return Err(ConfigError::MissingRequired("repo.branch (BRANCH)".to_string()).into());
        }

        if self.repo.name.contains('/') || self.repo.name == "." || self.repo.name == ".." {
            return Err(ConfigError::InvalidValue {
                key: "repo.name".to_string(),
                reason: format!("must be a single path segment, got '{}'", self.repo.name),
            }
            .into());
        }

        if !self.repo.remote_url_template.contains("{repo}") {
            return Err(ConfigError::InvalidValue {
                key: "repo.remote_url_template".to_string(),
                reason: "must contain the {repo} placeholder".to_string(),
            }
            .into());
        }

        if self.schedule.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "schedule.poll_interval_secs".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.schedule.frontier_walk_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "schedule.frontier_walk_limit".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Remote URL for the configured repository
    pub fn remote_url(&self) -> String {
        self.repo
            .remote_url_template
            .replace("{repo}", &self.repo.name)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.schedule.poll_interval_secs)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.schedule.startup_delay_secs)
    }

    pub fn failure_grace(&self) -> Duration {
        Duration::from_secs(self.schedule.failure_grace_secs)
    }
}
