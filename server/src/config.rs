//! Runtime configuration, read once from the environment at startup.

use crate::db;
use crate::store::{MemoryStore, PgStore, Store, StoreError};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 30;
/// Ten years. Keeps `now + ttl` far from chrono's representable range.
pub const MAX_TOKEN_TTL_DAYS: i64 = 3650;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to open store: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    /// Non-persistent; everything is lost on restart
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown backend {:?}, expected postgres or memory", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub token_ttl: chrono::Duration,
}

fn parse_var<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let backend = parse_var("STORE_BACKEND", lookup("STORE_BACKEND"), StoreBackend::Postgres)?;

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        if backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let default_addr = SocketAddr::from_str(DEFAULT_BIND_ADDR).map_err(|e| {
            ConfigError::Invalid {
                name: "BIND_ADDR",
                value: DEFAULT_BIND_ADDR.to_string(),
                reason: e.to_string(),
            }
        })?;
        let bind_addr = parse_var("BIND_ADDR", lookup("BIND_ADDR"), default_addr)?;

        let ttl_days = parse_var(
            "TOKEN_TTL_DAYS",
            lookup("TOKEN_TTL_DAYS"),
            DEFAULT_TOKEN_TTL_DAYS,
        )?;
        if !(1..=MAX_TOKEN_TTL_DAYS).contains(&ttl_days) {
            return Err(ConfigError::Invalid {
                name: "TOKEN_TTL_DAYS",
                value: ttl_days.to_string(),
                reason: format!("must be between 1 and {}", MAX_TOKEN_TTL_DAYS),
            });
        }

        Ok(Config {
            backend,
            database_url,
            bind_addr,
            token_ttl: chrono::Duration::days(ttl_days),
        })
    }

    /// Open the configured store. For Postgres this builds the pool and runs
    /// pending migrations.
    pub fn open_store(&self) -> Result<Arc<dyn Store>, ConfigError> {
        let store: Arc<dyn Store> = match self.backend {
            StoreBackend::Postgres => {
                let url = self
                    .database_url
                    .as_deref()
                    .ok_or(ConfigError::Missing("DATABASE_URL"))?;
                Arc::new(PgStore::new(db::create_pool(url)?))
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store; data will not survive a restart");
                Arc::new(MemoryStore::new())
            }
        };
        tracing::info!("Opened {} store", store.backend_name());
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_with_database_url() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/recipes")]).unwrap();
        assert_eq!(config.backend, StoreBackend::Postgres);
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.token_ttl, chrono::Duration::days(30));
    }

    #[test]
    fn test_postgres_requires_database_url() {
        assert!(matches!(
            config_from(&[]),
            Err(ConfigError::Missing("DATABASE_URL"))
        ));
    }

    #[test]
    fn test_memory_backend_needs_no_database() {
        let config = config_from(&[("STORE_BACKEND", "memory"), ("TOKEN_TTL_DAYS", "7")]).unwrap();
        assert_eq!(config.backend, StoreBackend::Memory);
        assert_eq!(config.token_ttl, chrono::Duration::days(7));
        assert!(config.open_store().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(config_from(&[("STORE_BACKEND", "sqlite")]).is_err());
        assert!(config_from(&[("STORE_BACKEND", "memory"), ("BIND_ADDR", "nope")]).is_err());
        assert!(config_from(&[("STORE_BACKEND", "memory"), ("TOKEN_TTL_DAYS", "0")]).is_err());
    }

    #[test]
    fn test_token_ttl_is_capped() {
        let memory = ("STORE_BACKEND", "memory");
        let max = MAX_TOKEN_TTL_DAYS.to_string();
        let config = config_from(&[memory, ("TOKEN_TTL_DAYS", max.as_str())]).unwrap();
        assert_eq!(config.token_ttl, chrono::Duration::days(MAX_TOKEN_TTL_DAYS));

        for huge in ["3651", "100000000", "200000000000", "9223372036854775807"] {
            assert!(
                matches!(
                    config_from(&[memory, ("TOKEN_TTL_DAYS", huge)]),
                    Err(ConfigError::Invalid { name: "TOKEN_TTL_DAYS", .. })
                ),
                "{} accepted",
                huge
            );
        }
    }
}
