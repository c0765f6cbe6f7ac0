use anyhow::{Context, Result};
use clap::Parser;
use ewallet::bin_utils::{
    Service, StoreBackend, shutdown_signal,
    settings::{Cli, StorageMode},
    telemetry::init_tracing,
};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    let settings = cli.settings().context("Failed to load configuration")?;
    let storage = if cli.migrate_only {
        StorageMode::Postgres
    } else {
        cli.storage
    };
    let backend = StoreBackend::open(storage, &settings).await?;

    if cli.migrate_only {
        info!("--migrate-only flag set, exiting");
        backend.close().await;
        return Ok(());
    }

    let listener = TcpListener::bind(settings.listen_addr())
        .await
        .with_context(|| format!("Failed to bind `{}`", settings.listen_addr()))?;

    let service = Service {
        store: backend.store(),
        settings,
    };
    service.run(listener, shutdown_signal()).await?;

    backend.close().await;
    info!("Shutdown complete");
    Ok(())
}
