use anyhow::{Context, Result};
use bizscout::{cache::Client, cli::Cli, commands, runlog::RunLog};
use std::sync::Arc;
use tracing::{debug, error};

#[tokio::main]
async fn main() -> Result<()> {
    // a missing .env file is fine, the keys may just as well be set in the environment
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse_args();
    cli.init_logger()?;
    if let Ok(path) = dotenv {
        debug!(path = %path.display(), "Loaded environment from file");
    }

    std::fs::create_dir_all(&cli.log_dir)
        .with_context(|| format!("failed to create log dir {}", cli.log_dir.display()))?;
    let run_log = Arc::new(RunLog::new(&cli.log_dir));

    let client = Client::build(cli.cache_opts())
        .await
        .context("failed to build HTTP client")?;

    let res = commands::run(cli.command, client.clone(), run_log).await;

    if let Err(err) = client.save().await {
        error!(%err, "Failed to save cache");
    }
    res
}
