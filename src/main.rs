use anyhow::{Context, Result};
use clap::Parser;

use tokio::runtime::Builder;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use orca_query::cli::Cli;
use orca_query::core::{QueryExecutor, QueryOutcome};

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.default_log_filter())),
        )
        .init();

    // One query per run, awaited step by step; no worker pool needed
    debug!("Configuring single-threaded Tokio runtime");
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;

    runtime.block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    let invocation = cli.invocation()?;
    let executor = QueryExecutor::new(cli.client_config())?;

    info!("Running {} query against {}", invocation.query_type, executor.client().base_url());

    match executor.execute(&invocation).await? {
        QueryOutcome::Written { path, records } => {
            info!("Saved {} records to {}", records, path.display());
        }
        QueryOutcome::DownloadLink(location) => {
            println!("{}", location);
        }
    }

    Ok(())
}
