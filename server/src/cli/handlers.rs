// server/src/cli/handlers.rs

use anyhow::{Context, Result};
use models::medical::seed_catalog;
use rest_api::{load_app_config, start_server, AppState};
use storage::Storage;
use tracing::info;

use crate::cli::commands::{AdminSetupArgs, ServeArgs};

async fn open_storage(database_url: Option<&str>) -> Result<Storage> {
    let url = database_url.context("DATABASE_URL is not set")?;
    Storage::connect(url)
        .await
        .with_context(|| format!("Failed to open database {}", url))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl-C, shutting down");
}

pub async fn handle_serve(database_url: Option<&str>, args: ServeArgs) -> Result<()> {
    let config = load_app_config(database_url, args.bind.as_deref())?;
    let state = AppState::from_config(&config).await?;
    start_server(state, &config.bind_address, shutdown_signal()).await
}

pub async fn handle_admin_setup(database_url: Option<&str>, args: AdminSetupArgs) -> Result<()> {
    let storage = open_storage(database_url).await?;
    let (admin, created) = security::setup_admin(&args.username, &args.password, args.email.as_deref(), &storage)
        .await
        .context("Admin setup failed")?;
    if created {
        println!("Admin account '{}' created ({}).", admin.username, admin.email);
    } else {
        println!("Password for admin '{}' updated.", admin.username);
    }
    Ok(())
}

pub async fn handle_seed(database_url: Option<&str>) -> Result<()> {
    let storage = open_storage(database_url).await?;
    let catalog = seed_catalog();
    let added = storage.seed_medicines(&catalog).await.context("Seeding failed")?;
    info!("Seeded {} of {} catalog medicines", added, catalog.len());
    println!("Added {} medicines ({} already present).", added, catalog.len() - added);
    Ok(())
}
