use std::net::SocketAddr;
use std::time::Duration;

use crate::access::Role;
use crate::db::DbConfig;
use crate::jobs::{DelayRange, DEFAULT_RETAINED_JOBS};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("invalid API token entry {0:?}; expected token=ROLE")]
    Token(String),
}

impl ConfigError {
    pub fn invalid(key: &'static str, value: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            value: value.into(),
        }
    }
}

/// A bearer token and the role its holder acts as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiToken {
    pub token: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub max_connections: u32,
    pub run_migrations: bool,
    pub api_tokens: Vec<ApiToken>,
    pub lab_report_attempts: u32,
    pub lab_report_delay: DelayRange,
    pub lab_report_retained_jobs: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = match lookup("DATABASE_URL") {
            Some(url) => url,
            None => DbConfig::from_lookup(&lookup)?.connection_string(),
        };

        let min_delay = parse_or(&lookup, "LAB_REPORT_DELAY_MIN_MS", 2000u64)?;
        let max_delay = parse_or(&lookup, "LAB_REPORT_DELAY_MAX_MS", 5000u64)?;

        let lab_report_attempts = parse_or(&lookup, "LAB_REPORT_ATTEMPTS", 3u32)?;
        if lab_report_attempts == 0 {
            return Err(ConfigError::invalid("LAB_REPORT_ATTEMPTS", "0"));
        }

        Ok(Self {
            bind_addr: parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            database_url,
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10u32)?,
            run_migrations: parse_or(&lookup, "RUN_MIGRATIONS", true)?,
            api_tokens: lookup("EHR_API_TOKENS")
                .map(|raw| parse_api_tokens(&raw))
                .transpose()?
                .unwrap_or_default(),
            lab_report_attempts,
            lab_report_delay: DelayRange::new(
                Duration::from_millis(min_delay),
                Duration::from_millis(max_delay),
            ),
            lab_report_retained_jobs: parse_or(
                &lookup,
                "LAB_REPORT_RETAIN_JOBS",
                DEFAULT_RETAINED_JOBS,
            )?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::invalid(key, raw)),
        None => Ok(default),
    }
}

/// Parse `token=ROLE` pairs separated by commas.
pub fn parse_api_tokens(raw: &str) -> Result<Vec<ApiToken>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (token, role) = entry
                .split_once('=')
                .ok_or_else(|| ConfigError::Token(entry.to_string()))?;
            let token = token.trim();
            if token.is_empty() {
                return Err(ConfigError::Token(entry.to_string()));
            }
            let role = role
                .trim()
                .to_ascii_uppercase()
                .parse::<Role>()
                .map_err(|_| ConfigError::Token(entry.to_string()))?;
            Ok(ApiToken {
                token: token.to_string(),
                role,
            })
        })
        .collect()
}
