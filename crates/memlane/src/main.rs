use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use memlane::cli::{Cli, run};
use memlane::core::Assistant;

#[tokio::main]
async fn main() -> Result<()> {
    memlane::init_logging();
    let cli = Cli::parse();
    let config = cli.load_config()?;
    info!("opening memory store (data_dir={})", config.data_dir().display());
    let assistant = Assistant::open(config).context("failed to open memory store")?;

    let output = run(&assistant, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
