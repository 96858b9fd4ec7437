//! Process settings loaded via OrthoConfig.
//!
//! Values come from `LOGISTICS_*` environment variables, the matching
//! command-line flags or a configuration file. Session cookie settings are
//! read separately by `session_config`.

use std::net::SocketAddr;

use ortho_config::OrthoConfig;
use serde::Deserialize;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_POOL_MAX_SIZE: u32 = 10;

/// Settings failures detected after loading.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("LOGISTICS_DATABASE_URL must be set")]
    MissingDatabaseUrl,
    #[error("invalid bind address {value:?}: expected host:port")]
    InvalidBindAddr { value: String },
    #[error("pool_max_size must be at least 1")]
    EmptyPool,
}

/// Configuration values controlling the server process.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "LOGISTICS")]
pub struct AppSettings {
    /// PostgreSQL connection string.
    pub database_url: Option<String>,
    /// Socket address the HTTP listener binds to.
    pub bind_addr: Option<String>,
    /// Upper bound on pooled connections.
    pub pool_max_size: Option<u32>,
    /// Apply pending migrations before serving.
    pub run_migrations: Option<bool>,
}

impl AppSettings {
    /// The configured database URL.
    pub fn database_url(&self) -> Result<&str, SettingsError> {
        self.database_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(SettingsError::MissingDatabaseUrl)
    }

    /// The configured listener address, defaulting to `0.0.0.0:8080`.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.trim()
            .parse()
            .map_err(|_| SettingsError::InvalidBindAddr {
                value: raw.to_owned(),
            })
    }

    /// Whether to apply pending migrations at startup, defaulting to `true`.
    pub fn run_migrations(&self) -> bool {
        self.run_migrations.unwrap_or(true)
    }

    /// The pool size, defaulting to ten connections.
    pub fn pool_max_size(&self) -> Result<u32, SettingsError> {
        match self.pool_max_size.unwrap_or(DEFAULT_POOL_MAX_SIZE) {
            0 => Err(SettingsError::EmptyPool),
            size => Ok(size),
        }
    }
}
