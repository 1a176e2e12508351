//! Run configuration, built once from the command line.
//!
//! Credentials are the only values read from the environment. They come from
//! the optional env file (`TRANSMISSION_USERNAME` / `TRANSMISSION_PASSWORD`)
//! or from variables already set in the process.

use crate::rpc::{Credentials, EnforcementMode};
use crate::usage::LimitConfig;
use crate::Cli;
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid Transmission URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Failed to load env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("RPC timeout must be at least one second")]
    InvalidTimeout,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone)]
pub struct LimiterConfig {
    pub database_path: PathBuf,
    pub transmission_url: Url,
    pub credentials: Option<Credentials>,
    pub limits: LimitConfig,
    pub mode: EnforcementMode,
    pub rpc_timeout: Duration,
    pub clear_old_data: bool,
    /// Purge horizon when no limit is configured
    pub retention: chrono::Duration,
}

impl LimiterConfig {
    pub fn from_cli(cli: &Cli) -> ConfigResult<Self> {
        let transmission_url = parse_url(&cli.transmission_url)?;

        if let Some(path) = &cli.env_file {
            dotenvy::from_path(path).map_err(|source| ConfigError::EnvFile {
                path: path.clone(),
                source,
            })?;
            tracing::debug!("Loaded environment from {}", path.display());
        }

        if cli.timeout == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(Self {
            database_path: cli.sqlite_file.clone(),
            transmission_url,
            credentials: Credentials::from_env(),
            limits: LimitConfig {
                daily: cli.daily_limit,
                weekly: cli.weekly_limit,
                monthly: cli.monthly_limit,
            },
            mode: cli.mode,
            rpc_timeout: Duration::from_secs(cli.timeout),
            clear_old_data: cli.clear_old_data,
            retention: cli.retention,
        })
    }
}

fn parse_url(raw: &str) -> ConfigResult<Url> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        url: raw.to_string(),
        message: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            message: format!("unsupported scheme '{}', expected http or https", other),
        }),
    }
}
