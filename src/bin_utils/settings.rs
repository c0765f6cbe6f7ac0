use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::store::postgres_store::DatabaseConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageMode {
    Memory,
    Postgres,
}

/// Electronic wallet HTTP service.
#[derive(Parser, Debug)]
#[command(name = "ewallet", version)]
pub struct Cli {
    /// YAML configuration file.
    #[arg(long, env = "EWALLET_CONFIG")]
    pub config: Option<PathBuf>,

    /// PostgreSQL connection URL.
    #[arg(long, env = "PG_URL")]
    pub database_url: Option<String>,

    /// Maximum number of pooled database connections.
    #[arg(long, env = "PG_MAX_POOL_SIZE")]
    pub max_pool_size: Option<u32>,

    /// HTTP listen port.
    #[arg(long, env = "HTTP_SERVER_PORT")]
    pub port: Option<u16>,

    /// Where wallets are kept.
    #[arg(long, value_enum, env = "EWALLET_STORAGE", default_value_t = StorageMode::Postgres)]
    pub storage: StorageMode,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Enable JSON log output.
    #[arg(long, env = "JSON_LOGS")]
    pub json_logs: bool,

    /// Run database migrations and exit.
    #[arg(long)]
    pub migrate_only: bool,
}

impl Cli {
    /// File and `EWALLET_` environment settings, with explicit flags on top.
    pub fn settings(&self) -> Result<Settings, config::ConfigError> {
        let mut settings = Settings::load(self.config.as_deref())?;
        if let Some(url) = &self.database_url {
            settings.postgres.url = Some(url.clone());
        }
        if let Some(max_pool_size) = self.max_pool_size {
            settings.postgres.max_pool_size = max_pool_size;
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub postgres: PostgresSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(alias = "maxConnPoolSize", alias = "maxconnpoolsize")]
    pub max_pool_size: u32,
}

impl Default for PostgresSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_pool_size: DatabaseConfig::default().max_connections,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Settings::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("EWALLET")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    pub fn database_config(&self) -> Option<DatabaseConfig> {
        self.postgres.url.as_ref().map(|url| DatabaseConfig {
            url: url.clone(),
            max_connections: self.postgres.max_pool_size,
            ..Default::default()
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}
