//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;

/// Which record store backs the API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::InvalidValue("STORE")),
        }
    }
}

/// Page window bounds for list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    /// Used when the request gives no limit
    pub default_limit: i64,
    /// Requests asking for more are capped here
    pub max_limit: i64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 1000,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL, required for the Postgres backend
    pub database_url: Option<String>,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    pub store: StoreBackend,

    /// Apply migrations/0001_ledger.sql at startup
    pub auto_migrate: bool,

    pub page_limits: PageLimits,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store: StoreBackend = lookup("STORE")
            .unwrap_or_else(|| "postgres".to_string())
            .parse()?;

        let database_url = lookup("DATABASE_URL");
        if store == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnv("DATABASE_URL"));
        }

        let database_max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        let auto_migrate = lookup("AUTO_MIGRATE")
            .unwrap_or_else(|| "false".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("AUTO_MIGRATE"))?;

        let default_limit: i64 = lookup("DEFAULT_PAGE_LIMIT")
            .unwrap_or_else(|| "50".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DEFAULT_PAGE_LIMIT"))?;

        let max_limit: i64 = lookup("MAX_PAGE_LIMIT")
            .unwrap_or_else(|| "1000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("MAX_PAGE_LIMIT"))?;

        if default_limit <= 0 || max_limit < default_limit {
            return Err(ConfigError::InvalidValue("DEFAULT_PAGE_LIMIT"));
        }

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            store,
            auto_migrate,
            page_limits: PageLimits {
                default_limit,
                max_limit,
            },
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_with_memory_store() {
        let config = config(&[("STORE", "memory")]).unwrap();

        assert_eq!(config.store, StoreBackend::Memory);
        assert!(config.database_url.is_none());
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert_eq!(config.database_max_connections, 10);
        assert!(!config.auto_migrate);
        assert_eq!(config.page_limits, PageLimits::default());
        assert!(!config.is_production());
    }

    #[test]
    fn test_postgres_requires_database_url() {
        let err = config(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv("DATABASE_URL")));

        let config = config(&[("DATABASE_URL", "postgres://localhost/ledger")]).unwrap();
        assert_eq!(config.store, StoreBackend::Postgres);
    }

    #[test]
    fn test_invalid_values() {
        let err = config(&[("STORE", "memory"), ("PORT", "not-a-port")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("PORT")));

        let err = config(&[("STORE", "redis")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("STORE")));

        let err = config(&[("STORE", "memory"), ("MAX_PAGE_LIMIT", "10"), ("DEFAULT_PAGE_LIMIT", "20")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("DEFAULT_PAGE_LIMIT")));
    }
}
