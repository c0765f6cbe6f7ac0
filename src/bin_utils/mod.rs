//! Bootstraps [`ewallet`] inside the binary: settings, store selection and
//! the server loop. Lives in the library so integration tests can drive the
//! same code path.

use std::{future::Future, sync::Arc};

use anyhow::{Context, Result, bail};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::{
    http::{self, AppState},
    store::{
        WalletStore, in_memory_store::InMemoryWalletStore, postgres_store::PgWalletStore,
    },
};
use settings::{Settings, StorageMode};
use telemetry::mask_password;

pub mod settings;
pub mod telemetry;

pub enum StoreBackend {
    Memory(InMemoryWalletStore),
    Postgres(PgWalletStore),
}

impl StoreBackend {
    /// Connects to PostgreSQL and applies migrations, or creates an empty
    /// in-memory store.
    pub async fn open(mode: StorageMode, settings: &Settings) -> Result<Self> {
        match mode {
            StorageMode::Memory => {
                info!("Using in-memory wallet store, nothing will be persisted");
                Ok(Self::Memory(InMemoryWalletStore::new()))
            }
            StorageMode::Postgres => {
                let Some(db_config) = settings.database_config() else {
                    bail!("postgres storage requires --database-url, PG_URL or postgres.url");
                };
                info!(url = %mask_password(&db_config.url), "Connecting to database");
                let store = PgWalletStore::connect(&db_config)
                    .await
                    .context("Failed to connect to database")?;
                store.migrate().await.context("Failed to run migrations")?;
                info!("Database ready (migrations applied)");
                Ok(Self::Postgres(store))
            }
        }
    }

    pub fn store(&self) -> Arc<dyn WalletStore> {
        match self {
            Self::Memory(store) => Arc::new(store.clone()),
            Self::Postgres(store) => Arc::new(store.clone()),
        }
    }

    pub async fn close(&self) {
        if let Self::Postgres(store) = self {
            store.close().await;
        }
    }
}

pub struct Service {
    pub settings: Settings,
    pub store: Arc<dyn WalletStore>,
}

impl Service {
    pub fn router(&self) -> Router {
        http::router(
            AppState::new(self.store.clone()),
            self.settings.request_timeout(),
        )
    }

    /// Serves until `shutdown` resolves, then lets in-flight requests finish.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        info!(
            %addr,
            backend = self.store.backend_label(),
            "Wallet service listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .context("HTTP server failed")?;

        info!("Wallet service stopped");
        Ok(())
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
