// server/src/cli/mod.rs

pub mod cli;
pub mod commands;
pub mod handlers;

pub use cli::start_cli;
pub use commands::{AdminSetupArgs, CliArgs, MedipalCommands, ServeArgs};
pub use handlers::{handle_admin_setup, handle_seed, handle_serve};
