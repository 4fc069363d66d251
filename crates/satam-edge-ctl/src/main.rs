//! satam-edge-ctl: control client for a running satam-edge.

mod args;
mod client;

use clap::Parser;
use serde::Serialize;

use args::{Cli, Commands};
use client::{CliError, Ctx};

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let ctx = Ctx::new(&cli.edge)?;
    run(&ctx, cli.command).await
}

async fn run(ctx: &Ctx, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Version => {
            let version = ctx.version().await?;
            println!("{}", version.version);
        }
        Commands::SkipWaiting => {
            ctx.skip_waiting().await?;
            println!("skip waiting requested");
        }
        Commands::Status => print_json(&ctx.status().await?)?,
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::Server(format!("failed to render output: {e}")))?;
    println!("{out}");
    Ok(())
}
