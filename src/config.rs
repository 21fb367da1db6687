//! Runtime configuration read from the environment (and `.env` via dotenvy).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::application::order_builder::BuilderSettings;
use crate::infrastructure::catalog_client::DEFAULT_TIMEOUT;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} must be a valid number, got {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct BuilderConfig {
    pub catalog_url: String,
    pub catalog_token: Option<String>,
    pub session_id: String,
    pub draft_dir: PathBuf,
    pub http_timeout: Duration,
    pub host: String,
    pub port: u16,
    pub settings: BuilderSettings,
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn number<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match var(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

impl BuilderConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = BuilderSettings::default();
        let settings = BuilderSettings {
            debounce: Duration::from_millis(number(
                "DEBOUNCE_MS",
                defaults.debounce.as_millis() as u64,
            )?),
            lookup_concurrency: number("LOOKUP_CONCURRENCY", defaults.lookup_concurrency)?.max(1),
            address_restore_timeout: Duration::from_millis(number(
                "ADDRESS_RESTORE_TIMEOUT_MS",
                defaults.address_restore_timeout.as_millis() as u64,
            )?),
            currency: var("CURRENCY").unwrap_or(defaults.currency),
        };

        let host = var("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = number("PORT", 8080)?;
        Ok(Self {
            catalog_url: var("CATALOG_URL").unwrap_or_else(|| format!("http://{host}:{port}")),
            catalog_token: var("CATALOG_TOKEN"),
            session_id: var("SESSION_ID").unwrap_or_else(|| "default".to_string()),
            draft_dir: var("DRAFT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| env::temp_dir().join("order_builder")),
            http_timeout: Duration::from_secs(number(
                "HTTP_TIMEOUT_SECS",
                DEFAULT_TIMEOUT.as_secs(),
            )?),
            host,
            port,
            settings,
        })
    }

    pub fn require_token(&self) -> Result<&str, ConfigError> {
        self.catalog_token
            .as_deref()
            .ok_or(ConfigError::Missing("CATALOG_TOKEN"))
    }
}
