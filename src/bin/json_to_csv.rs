use anyhow::{Context, Result};
use clap::Parser;

use tracing_subscriber::EnvFilter;

use orca_query::cli::FlattenCli;
use orca_query::flatten::convert_file;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = FlattenCli::parse();
    let table = convert_file(&cli.input, &cli.output, cli.separator)
        .with_context(|| format!("Failed to convert {}", cli.input.display()))?;

    println!("{}", table.columns.join(", "));
    Ok(())
}
