use crate::infrastructure::security::RateLimitConfig;
use crate::infrastructure::store::DEFAULT_MAX_TRANSACTION_ATTEMPTS;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Unset selects the in-memory store.
    pub database_url: Option<String>,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub request_timeout: Duration,
    pub max_transaction_attempts: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&std::env::vars().collect())
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let jwt_secret = get("AUTH_JWT_SECRET").ok_or(ConfigError::Missing("AUTH_JWT_SECRET"))?;
        let rate_defaults = RateLimitConfig::default();

        Ok(Self {
            bind_addr: parse_or(get("BIND_ADDR"), "BIND_ADDR", DEFAULT_BIND_ADDR.parse().ok())?,
            database_url: get("DATABASE_URL"),
            auth: AuthConfig {
                jwt_secret,
                issuer: get("AUTH_ISSUER"),
                audience: get("AUTH_AUDIENCE"),
            },
            rate_limit: RateLimitConfig {
                per_minute: parse_or(
                    get("VOTE_RATE_LIMIT_PER_MINUTE"),
                    "VOTE_RATE_LIMIT_PER_MINUTE",
                    Some(rate_defaults.per_minute),
                )?,
                per_hour: parse_or(
                    get("VOTE_RATE_LIMIT_PER_HOUR"),
                    "VOTE_RATE_LIMIT_PER_HOUR",
                    Some(rate_defaults.per_hour),
                )?,
            },
            request_timeout: Duration::from_secs(parse_or(
                get("REQUEST_TIMEOUT_SECS"),
                "REQUEST_TIMEOUT_SECS",
                Some(DEFAULT_REQUEST_TIMEOUT_SECS),
            )?),
            max_transaction_attempts: parse_or(
                get("STORE_MAX_TRANSACTION_ATTEMPTS"),
                "STORE_MAX_TRANSACTION_ATTEMPTS",
                Some(DEFAULT_MAX_TRANSACTION_ATTEMPTS),
            )?,
        })
    }
}

fn parse_or<T: FromStr>(
    value: Option<String>,
    key: &'static str,
    default: Option<T>,
) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => {
            let default = default.ok_or(ConfigError::Missing(key))?;
            tracing::info!("{} not set, using default", key);
            Ok(default)
        }
    }
}
