//! # configs
//!
//! Layered application settings: built-in defaults, then
//! `config/default.toml`, then `config/{APP_ENV}.toml`, then `M2P__*`
//! environment variables. [`load_env_file`] reads a `.env` file into the
//! environment beforehand.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub log: LogSettings,
    pub cors: CorsSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    /// Process-local tables; data is lost on restart.
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub backend: StorageBackend,
    /// Connection string. Never logged.
    pub url: SecretString,
    pub max_connections: u32,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// Default `EnvFilter` directive; `RUST_LOG` takes precedence.
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    pub allow_any_origin: bool,
}

impl Settings {
    /// Loads settings from `./config`, honouring `APP_ENV` (default `development`).
    pub fn load() -> Result<Self, ConfigError> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());

        let config = defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{app_env}")).required(false))
            .add_source(
                Environment::with_prefix("M2P")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Self::from_config(config)
    }

    fn from_config(config: Config) -> Result<Self, ConfigError> {
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Reads `.env` into the process environment. A missing file is fine; any
/// other problem is handed back so the caller can report it once logging is
/// up.
pub fn load_env_file() -> Option<dotenvy::Error> {
    env_file_problem(dotenvy::dotenv().map(|_| ()))
}

fn env_file_problem(result: Result<(), dotenvy::Error>) -> Option<dotenvy::Error> {
    match result {
        Err(e) if !e.not_found() => Some(e),
        _ => None,
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
    Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("database.backend", "postgres")?
        .set_default("database.url", "postgres://localhost:5432/move2play")?
        .set_default("database.max_connections", 10)?
        .set_default("database.run_migrations", true)?
        .set_default("log.level", "info")?
        .set_default("log.format", "pretty")?
        .set_default("cors.allow_any_origin", true)
}
