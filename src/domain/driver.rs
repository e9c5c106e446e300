//! Database driver identifier.
//!
//! [`Driver`] names the backend behind the `sqlx` `Any` pool and carries
//! the few dialect differences the adapter has to know about: bind
//! placeholder syntax and how to enumerate existing tables.

use std::fmt;
use std::str::FromStr;

use crate::error::AdapterError;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Driver {
    /// PostgreSQL (`postgres://`, `postgresql://`).
    Postgres,
    /// MySQL or MariaDB (`mysql://`).
    MySql,
    /// SQLite (`sqlite:`).
    Sqlite,
}

impl Driver {
    /// Infers the driver from the scheme of a connection URL.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::UnsupportedDriver`] if the scheme is not
    /// recognised.
    pub fn from_url(url: &str) -> Result<Self, AdapterError> {
        let scheme = url.split_once(':').map_or(url, |(scheme, _)| scheme);
        match scheme.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" => Ok(Self::MySql),
            "sqlite" => Ok(Self::Sqlite),
            _ => Err(AdapterError::UnsupportedDriver(scheme.to_string())),
        }
    }

    /// Returns the canonical lowercase name of the driver.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
        }
    }

    /// Returns the bind placeholder for the 1-based parameter `index`.
    #[must_use]
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Self::Postgres => format!("${index}"),
            Self::MySql | Self::Sqlite => "?".to_string(),
        }
    }

    /// Returns a query listing the tables visible in the current
    /// database (or schema, for PostgreSQL). The single column is text.
    #[must_use]
    pub const fn list_tables_sql(&self) -> &'static str {
        match self {
            Self::Postgres => {
                "SELECT tablename::TEXT FROM pg_catalog.pg_tables WHERE schemaname = current_schema()"
            }
            Self::MySql => {
                "SELECT CAST(table_name AS CHAR) FROM information_schema.tables WHERE table_schema = DATABASE()"
            }
            Self::Sqlite => "SELECT name FROM sqlite_master WHERE type = 'table'",
        }
    }

    /// Returns `true` when `url` points to a private in-memory SQLite
    /// database, which only lives as long as its single connection.
    #[must_use]
    pub fn is_in_memory(&self, url: &str) -> bool {
        matches!(self, Self::Sqlite) && (url.contains(":memory:") || url.contains("mode=memory"))
    }
}

impl FromStr for Driver {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pgsql" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::MySql),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            other => Err(AdapterError::UnsupportedDriver(other.to_string())),
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
