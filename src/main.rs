mod cli;
mod config;
mod download;
mod fetch;
mod logging;
mod regularize;
mod series;
mod station;

use anyhow::{Error, Result};
use clap::Parser;
use cli::{command, Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let cli = Cli::parse();

    let summary = match &cli.command {
        Commands::Run {} => command::run().await?,
        Commands::Stations {} => command::stations().await?,
        Commands::Regularize {} => command::regularize().await?,
    };
    println!("{}", summary);

    Ok(())
}
