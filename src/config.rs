//! Adapter configuration loaded from environment variables.
//!
//! All settings come from environment variables (or a `.env` file via
//! `dotenvy`). Numeric settings fall back to defaults when missing or
//! unparsable; the driver and table name must be valid when present.

use std::time::Duration;

use crate::domain::{Driver, TableName};
use crate::error::AdapterError;

/// Connection string used when `CASBIN_DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";

/// Settings for opening a [`crate::SqlAdapter`].
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Database backend. Inferred from `database_url` when `None`.
    pub driver: Option<Driver>,

    /// Connection string (host, port, credentials, database name).
    pub database_url: String,

    /// Table holding the policy rows.
    pub table_name: TableName,

    /// Maximum number of pooled connections.
    pub max_connections: u32,

    /// Minimum idle connections kept open.
    pub min_connections: u32,

    /// Timeout in seconds for acquiring a connection.
    pub connect_timeout_secs: u64,
}

impl AdapterConfig {
    /// Creates a configuration for `database_url` with default pool
    /// settings and the default table name.
    #[must_use]
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            driver: None,
            database_url: database_url.into(),
            table_name: TableName::default(),
            max_connections: 10,
            min_connections: 0,
            connect_timeout_secs: 5,
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::UnsupportedDriver`] if
    /// `CASBIN_DATABASE_DRIVER` is set to an unknown backend and
    /// [`AdapterError::InvalidTableName`] if `CASBIN_TABLE_NAME` is not a
    /// plain identifier.
    pub fn from_env() -> Result<Self, AdapterError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from a key lookup. Blank values count as
    /// unset.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AdapterError> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let driver = var("CASBIN_DATABASE_DRIVER")
            .map(|v| v.parse::<Driver>())
            .transpose()?;

        let database_url =
            var("CASBIN_DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let table_name = var("CASBIN_TABLE_NAME")
            .map(TableName::new)
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            driver,
            database_url,
            table_name,
            max_connections: parse_or(var("CASBIN_DATABASE_MAX_CONNECTIONS"), 10),
            min_connections: parse_or(var("CASBIN_DATABASE_MIN_CONNECTIONS"), 0),
            connect_timeout_secs: parse_or(var("CASBIN_DATABASE_CONNECT_TIMEOUT_SECS"), 5),
        })
    }

    /// Returns the configured driver, or the one implied by the URL.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::UnsupportedDriver`] if no driver is set and
    /// the URL scheme is unknown, and [`AdapterError::Config`] if the
    /// configured driver disagrees with the URL scheme.
    pub fn resolve_driver(&self) -> Result<Driver, AdapterError> {
        let from_url = Driver::from_url(&self.database_url);
        match (self.driver, from_url) {
            (None, inferred) => inferred,
            (Some(driver), Ok(inferred)) if driver != inferred => Err(AdapterError::Config(
                format!("driver {driver} does not match a {inferred} connection url"),
            )),
            (Some(driver), _) => Ok(driver),
        }
    }

    /// Returns the connection acquire timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Parses a setting as `T`, returning `default` on missing or invalid
/// values.
fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn new_uses_defaults() {
        let config = AdapterConfig::new("postgres://localhost/casbin");
        assert_eq!(config.table_name.as_str(), "casbin_rule");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
        assert!(config.driver.is_none());
    }

    #[test]
    fn driver_is_inferred_from_url() {
        let config = AdapterConfig::new("mysql://root@localhost/casbin");
        assert_eq!(config.resolve_driver().ok(), Some(Driver::MySql));
    }

    #[test]
    fn explicit_driver_must_match_url() {
        let mut config = AdapterConfig::new("postgres://localhost/casbin");
        config.driver = Some(Driver::MySql);
        let Err(err) = config.resolve_driver() else {
            panic!("mismatched driver should fail");
        };
        assert!(matches!(err, AdapterError::Config(_)));
    }

    #[test]
    fn explicit_driver_wins_for_unknown_scheme() {
        let mut config = AdapterConfig::new("custom-dsn");
        assert!(config.resolve_driver().is_err());
        config.driver = Some(Driver::Postgres);
        assert_eq!(config.resolve_driver().ok(), Some(Driver::Postgres));
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn lookup_reads_every_setting() {
        let Ok(config) = AdapterConfig::from_lookup(lookup(&[
            ("CASBIN_DATABASE_DRIVER", "postgresql"),
            ("CASBIN_DATABASE_URL", "postgres://casbin@db/casbin"),
            ("CASBIN_TABLE_NAME", " tenant_rules "),
            ("CASBIN_DATABASE_MAX_CONNECTIONS", "32"),
            ("CASBIN_DATABASE_MIN_CONNECTIONS", "4"),
            ("CASBIN_DATABASE_CONNECT_TIMEOUT_SECS", "9"),
        ])) else {
            panic!("valid configuration");
        };
        assert_eq!(config.driver, Some(Driver::Postgres));
        assert_eq!(config.database_url, "postgres://casbin@db/casbin");
        assert_eq!(config.table_name.as_str(), "tenant_rules");
        assert_eq!(config.max_connections, 32);
        assert_eq!(config.min_connections, 4);
        assert_eq!(config.connect_timeout_secs, 9);
    }

    #[test]
    fn missing_and_blank_settings_use_defaults() {
        let Ok(config) = AdapterConfig::from_lookup(lookup(&[
            ("CASBIN_DATABASE_DRIVER", "  "),
            ("CASBIN_DATABASE_URL", ""),
            ("CASBIN_TABLE_NAME", " "),
            ("CASBIN_DATABASE_MAX_CONNECTIONS", "many"),
        ])) else {
            panic!("valid configuration");
        };
        assert!(config.driver.is_none());
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.table_name.as_str(), "casbin_rule");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 0);
        assert_eq!(config.connect_timeout_secs, 5);
    }

    #[test]
    fn unknown_driver_is_rejected() {
        let result = AdapterConfig::from_lookup(lookup(&[("CASBIN_DATABASE_DRIVER", "oracle")]));
        assert!(matches!(result, Err(AdapterError::UnsupportedDriver(name)) if name == "oracle"));
    }

    #[test]
    fn invalid_table_name_is_rejected() {
        let result =
            AdapterConfig::from_lookup(lookup(&[("CASBIN_TABLE_NAME", "rules; DROP TABLE x")]));
        assert!(matches!(result, Err(AdapterError::InvalidTableName(_))));
    }
}
