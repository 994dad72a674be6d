//! Configuration loading and representation.
//!
//! Everything is read once at startup from environment variables. The rest of
//! the process receives plain values (notably the [`DisclosurePolicy`]) and
//! never consults the environment again.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_BIND_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 3000);
const DEFAULT_RATE_LIMIT_MAX: u32 = 100;
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 15 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be set")]
    Missing { var: &'static str },

    #[error("invalid {var}={value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            _ => Err("expected development, production or test".to_string()),
        }
    }
}

/// How much fault detail reaches clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisclosurePolicy {
    /// Real status code and real message.
    #[default]
    Verbose,
    /// Real status code, generic message.
    Generic,
    /// Always 200 with a generic message.
    Masked,
}

impl DisclosurePolicy {
    /// Policy used when none is configured explicitly.
    pub fn default_for(environment: Environment) -> Self {
        match environment {
            Environment::Production => Self::Masked,
            Environment::Development | Environment::Test => Self::Verbose,
        }
    }
}

impl FromStr for DisclosurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "verbose" => Ok(Self::Verbose),
            "generic" => Ok(Self::Generic),
            "masked" => Ok(Self::Masked),
            _ => Err("expected verbose, generic or masked".to_string()),
        }
    }
}

/// Which [`UserStore`](crate::UserStore) backend to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres { database_url: String },
}

/// Fixed-window request limit per client address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_RATE_LIMIT_MAX,
            window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub environment: Environment,
    pub disclosure: DisclosurePolicy,
    pub bind_addr: SocketAddr,
    pub store: StoreBackend,
    /// `None` disables rate limiting.
    pub rate_limit: Option<RateLimitConfig>,
    /// JSON log lines instead of human-readable ones.
    pub json_logs: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            disclosure: DisclosurePolicy::Verbose,
            bind_addr: DEFAULT_BIND_ADDR,
            store: StoreBackend::Memory,
            rate_limit: None,
            json_logs: false,
        }
    }
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &'static str| lookup(var).filter(|v| !v.trim().is_empty());

        let environment: Environment = parse_or(get("APP_ENV"), "APP_ENV", Environment::default())?;

        let disclosure = parse_or(
            get("DISCLOSURE_POLICY"),
            "DISCLOSURE_POLICY",
            DisclosurePolicy::default_for(environment),
        )?;

        let bind_addr = parse_or(
            get("BIND_ADDR"),
            "BIND_ADDR",
            DEFAULT_BIND_ADDR,
        )?;

        let store = match get("USER_STORE").as_deref().map(str::trim) {
            None | Some("memory") => StoreBackend::Memory,
            Some("postgres") => StoreBackend::Postgres {
                database_url: get("DATABASE_URL").ok_or(ConfigError::Missing {
                    var: "DATABASE_URL",
                })?,
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "USER_STORE",
                    value: other.to_string(),
                    reason: "expected memory or postgres".to_string(),
                });
            }
        };

        let enabled = parse_or(
            get("RATE_LIMIT_ENABLED"),
            "RATE_LIMIT_ENABLED",
            environment == Environment::Production,
        )?;
        let rate_limit = if enabled {
            Some(RateLimitConfig {
                max_requests: parse_or(get("RATE_LIMIT_MAX"), "RATE_LIMIT_MAX", DEFAULT_RATE_LIMIT_MAX)?,
                window: Duration::from_secs(parse_or(
                    get("RATE_LIMIT_WINDOW_SECS"),
                    "RATE_LIMIT_WINDOW_SECS",
                    DEFAULT_RATE_LIMIT_WINDOW_SECS,
                )?),
            })
        } else {
            None
        };

        let json_logs = match get("LOG_FORMAT").as_deref().map(str::trim) {
            None => environment == Environment::Production,
            Some("json") => true,
            Some("pretty") => false,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "LOG_FORMAT",
                    value: other.to_string(),
                    reason: "expected json or pretty".to_string(),
                });
            }
        };

        Ok(Self {
            environment,
            disclosure,
            bind_addr,
            store,
            rate_limit,
            json_logs,
        })
    }
}

fn parse_or<T>(raw: Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}
