// server/src/cli/commands.rs

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "medipal")]
#[command(version = "0.1.0")]
#[command(about = "Medipal prescription service")]
pub struct CliArgs {
    /// Overrides DATABASE_URL.
    #[arg(long, global = true, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: MedipalCommands,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum MedipalCommands {
    /// Run the HTTP API
    Serve(ServeArgs),
    /// Create the admin account, or reset its password
    AdminSetup(AdminSetupArgs),
    /// Add the starter medicines to the catalog
    Seed,
}

#[derive(Args, Debug, PartialEq)]
pub struct ServeArgs {
    /// Overrides BIND_ADDRESS.
    #[arg(long, short = 'b')]
    pub bind: Option<String>,
}

#[derive(Args, Debug, PartialEq)]
pub struct AdminSetupArgs {
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub password: String,
    /// Defaults to <username>@medipal.com for new accounts.
    #[arg(long)]
    pub email: Option<String>,
}
