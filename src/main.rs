//! tarmac binary entry point

mod cli;

use anstream::eprintln;
use clap::{Parser, Subcommand};
use cli::land::LandArgs;
use cli::style::Stylize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tarmac",
    version,
    about = "Land reviewed changes onto an integration branch"
)]
struct Cli {
    /// Path to the working copy
    #[arg(long, global = true, default_value = ".")]
    path: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Land an accepted revision onto the integration ref and publish it
    Land(LandArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Land(args) => cli::land::run_land(&cli.path, args).await,
    };

    if let Err(e) = result {
        eprintln!("{} {e}", "error:".warn());
        std::process::exit(1);
    }
}
