//! ## smitta-cli
//! **Command-line front end for infection scenarios**
//!
//! - `smitta run`: build the network, attach the traffic controller and
//!   run until the configured time limit, then export results
//! - `smitta check`: validate an infection document without running

use clap::Parser;

mod commands;

use commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    commands::run_command(cli).await
}
