use std::{net::IpAddr, path::PathBuf, time::Duration};

use crate::store::StoreConfig;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";
const DEFAULT_STATIC_DIR: &str = "client/dist";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Development,
    Production,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub host: IpAddr,
    pub port: u16,
    pub store: StoreConfig,
    pub cors_origin: String,
    pub static_dir: PathBuf,
}

impl Config {
    /// Reads the configuration from the process environment. Outside of
    /// production a local `.env` file is loaded first.
    pub fn load() -> Result<Self, ConfigError> {
        if mode_from(std::env::var("ENV").ok().as_deref()) == Mode::Development {
            match dotenv::dotenv() {
                Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
                Err(err) => tracing::warn!(error = %err, "could not load .env file"),
            }
        }

        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let url = var("DATABASE_URL")
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        Ok(Config {
            mode: mode_from(var("ENV").as_deref()),
            host: parse_or(&var, "HOST", IpAddr::from([0, 0, 0, 0]))?,
            port: parse_or(&var, "PORT", DEFAULT_PORT)?,
            store: StoreConfig {
                url,
                max_connections: parse_or(&var, "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
                timeout: Duration::from_secs(parse_or(
                    &var,
                    "STORE_TIMEOUT_SECS",
                    DEFAULT_STORE_TIMEOUT_SECS,
                )?),
            },
            cors_origin: var("CORS_ORIGIN").unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string()),
            static_dir: var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR)),
        })
    }
}

fn mode_from(env: Option<&str>) -> Mode {
    match env {
        Some("production") => Mode::Production,
        _ => Mode::Development,
    }
}

fn parse_or<F, T>(var: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
    T: std::str::FromStr,
{
    match var(name) {
        None => Ok(default),
        Some(value) if value.is_empty() => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
