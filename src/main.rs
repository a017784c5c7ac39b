use clap::Parser;
use commit_feed::config::Config;
use commit_feed::error::FeedError;
use commit_feed::supervisor::Supervisor;
use std::path::PathBuf;
use std::process::ExitCode;

/// Publish a change record for every commit of one git branch
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML configuration file
    #[arg(long, env = "COMMIT_FEED_CONFIG")]
    config: Option<PathBuf>,

    /// Repository name
    #[arg(long, env = "REPO")]
    repo: Option<String>,

    /// Branch to track
    #[arg(long, env = "BRANCH")]
    branch: Option<String>,

    /// Directory receiving commit records
    #[arg(long)]
    sink_root: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Result<Config, FeedError> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(repo) = self.repo {
            config.repo.name = repo;
        }
        if let Some(branch) = self.branch {
            config.repo.branch = branch;
        }
        if let Some(root) = self.sink_root {
            config.sink.root = root;
        }
        Ok(config)
    }
}

async fn run(args: Args) -> Result<(), (FeedError, std::time::Duration)> {
    let config = args.into_config().map_err(|e| (e, std::time::Duration::ZERO))?;
    let grace = config.failure_grace();
    let supervisor = Supervisor::new(config).map_err(|e| (e, grace))?;

    tracing::info!(
        "Tracking {}/{} into {}",
        supervisor.config().repo.name,
        supervisor.config().repo.branch,
        supervisor.config().sink.root.display()
    );

    let Err(err) = supervisor.run().await;
    Err((err, grace))
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    tracing::info!(
        "commit-feed {} (built {}, commit {})",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIMESTAMP"),
        env!("GIT_COMMIT_HASH")
    );

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err((err, grace)) => {
            tracing::error!(kind = err.kind(), "{}", err);
            if err.applies_grace_period() && !grace.is_zero() {
                tracing::info!("Exiting in {:?}", grace);
                tokio::time::sleep(grace).await;
            }
            ExitCode::FAILURE
        }
    }
}
