// Runtime configuration loaded from the environment

use std::env;
use std::time::Duration;

use crate::inventory::cache::{DEFAULT_CAPACITY, DEFAULT_TTL};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` runs the service without a store; inventory routes answer 503
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub admin_emails: Vec<String>,
    /// Shared resolver cache; falls back to an in-process cache when unset
    pub redis_url: Option<String>,
    pub resolve_cache_ttl: Duration,
    pub resolve_cache_capacity: usize,
}

impl AppConfig {
    /// Reads configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads configuration through an arbitrary lookup, which keeps tests
    /// independent of the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = non_empty("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let port = match non_empty("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: raw,
            })?,
            None => 8080,
        };

        let resolve_cache_ttl = match non_empty("RESOLVE_CACHE_TTL_SECS") {
            Some(raw) => Duration::from_secs(raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
                name: "RESOLVE_CACHE_TTL_SECS",
                value: raw,
            })?),
            None => DEFAULT_TTL,
        };

        let resolve_cache_capacity = match non_empty("RESOLVE_CACHE_CAPACITY") {
            Some(raw) => raw.parse::<usize>().map_err(|_| ConfigError::Invalid {
                name: "RESOLVE_CACHE_CAPACITY",
                value: raw,
            })?,
            None => DEFAULT_CAPACITY,
        };

        let admin_emails = non_empty("ADMIN_EMAILS")
            .map(|raw| {
                raw.split(',')
                    .map(|e| e.trim().to_lowercase())
                    .filter(|e| !e.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database_url: non_empty("DATABASE_URL"),
            jwt_secret,
            host: non_empty("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            admin_emails,
            redis_url: non_empty("REDIS_URL"),
            resolve_cache_ttl,
            resolve_cache_capacity,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.database_url, None);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert!(config.admin_emails.is_empty());
        assert_eq!(config.redis_url, None);
        assert_eq!(config.resolve_cache_ttl, DEFAULT_TTL);
        assert_eq!(config.resolve_cache_capacity, DEFAULT_CAPACITY);
    }

    #[test]
    fn test_missing_secret() {
        assert_eq!(config_from(&[]).unwrap_err(), ConfigError::Missing("JWT_SECRET"));
        assert_eq!(
            config_from(&[("JWT_SECRET", "  ")]).unwrap_err(),
            ConfigError::Missing("JWT_SECRET")
        );
    }

    #[test]
    fn test_admin_emails_are_split_and_normalized() {
        let config = config_from(&[
            ("JWT_SECRET", "s3cret"),
            ("ADMIN_EMAILS", " Boss@Example.com, ,ops@example.com"),
            ("DATABASE_URL", "postgres://localhost/inventory"),
            ("PORT", "3000"),
        ])
        .unwrap();
        assert_eq!(config.admin_emails, vec!["boss@example.com", "ops@example.com"]);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/inventory"));
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_invalid_port() {
        let err = config_from(&[("JWT_SECRET", "s3cret"), ("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }
}
