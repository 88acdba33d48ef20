// src/config.rs

use std::env;
use std::net::SocketAddr;

use dotenvy::dotenv;
use thiserror::Error;

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string. `None` runs the service on the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: SocketAddr,
    pub log_dir: String,
    /// Insert the sample catalog when the store starts out empty.
    pub seed_demo_data: bool,
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let jwt_expiration = match lookup("JWT_EXPIRATION") {
            Some(raw) => raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
                key: "JWT_EXPIRATION",
                value: raw.clone(),
            })?,
            None => 86_400,
        };

        let rust_log = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let bind_addr = match lookup("BIND_ADDR") {
            Some(raw) => raw.parse::<SocketAddr>().map_err(|_| ConfigError::Invalid {
                key: "BIND_ADDR",
                value: raw.clone(),
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 3000)),
        };

        let log_dir = lookup("LOG_DIR").unwrap_or_else(|| "logs".to_string());

        let seed_demo_data = match lookup("SEED_DEMO_DATA").as_deref() {
            None => true,
            Some("1") | Some("true") | Some("yes") => true,
            Some("0") | Some("false") | Some("no") => false,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "SEED_DEMO_DATA",
                    value: other.to_string(),
                });
            }
        };

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            bind_addr,
            log_dir,
            seed_demo_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = Config::from_lookup(lookup_from(&[("JWT_SECRET", "s3cret")])).unwrap();

        assert_eq!(config.database_url, None);
        assert_eq!(config.jwt_expiration, 86_400);
        assert_eq!(config.rust_log, "info");
        assert_eq!(config.bind_addr, SocketAddr::from(([0, 0, 0, 0], 3000)));
        assert!(config.seed_demo_data);
    }

    #[test]
    fn missing_secret_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("JWT_SECRET"));
    }

    #[test]
    fn blank_database_url_means_in_memory() {
        let config = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", "s"),
            ("DATABASE_URL", "  "),
        ]))
        .unwrap();
        assert!(config.database_url.is_none());
    }

    #[test]
    fn malformed_values_are_reported() {
        let err = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", "s"),
            ("JWT_EXPIRATION", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "JWT_EXPIRATION", .. }));

        let err = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", "s"),
            ("SEED_DEMO_DATA", "maybe"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SEED_DEMO_DATA", .. }));
        assert_eq!(err.to_string(), "SEED_DEMO_DATA has an invalid value: maybe");
        assert_eq!(
            ConfigError::Missing("JWT_SECRET").to_string(),
            "JWT_SECRET must be set"
        );
    }
}
