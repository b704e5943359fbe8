// server/src/cli/cli.rs

use anyhow::Result;
use clap::Parser;

use crate::cli::commands::{CliArgs, MedipalCommands};
use crate::cli::handlers::{handle_admin_setup, handle_seed, handle_serve};

/// Parses the command line and runs the chosen command. `.env` is loaded
/// first so clap sees its DATABASE_URL.
pub async fn start_cli() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();
    let database_url = args.database_url.as_deref();

    match args.command {
        MedipalCommands::Serve(serve) => handle_serve(database_url, serve).await,
        MedipalCommands::AdminSetup(setup) => handle_admin_setup(database_url, setup).await,
        MedipalCommands::Seed => handle_seed(database_url).await,
    }
}
