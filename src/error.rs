//! Adapter error types.
//!
//! [`AdapterError`] is the central error type of the crate. Every public
//! operation returns it, and it converts into [`casbin::Error`] so the
//! [`casbin::Adapter`] implementation can propagate it with `?`.

/// Convenience alias for results produced by this crate.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Errors raised by the SQL policy adapter.
///
/// Database failures are passed through unmodified inside
/// [`AdapterError::Database`]; the remaining variants are raised by the
/// adapter itself before any statement reaches the database.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// Error returned by the database layer (connect, execute, decode).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The driver identifier is not one of the supported backends.
    #[error("unsupported database driver: {0}")]
    UnsupportedDriver(String),

    /// The table name is not a plain SQL identifier.
    #[error("invalid table name: {0:?}")]
    InvalidTableName(String),

    /// A policy rule cannot be stored (e.g. empty policy type).
    #[error("invalid policy rule: {0}")]
    InvalidRule(String),

    /// A rule or filter supplies values past the last value column.
    #[error("policy rule has {count} values; at most 6 are supported")]
    TooManyValues {
        /// Number of positional values covered by the rule or filter.
        count: usize,
    },

    /// A filtered removal starts past the last value column.
    #[error("field index {0} is out of range; expected 0..6")]
    InvalidFieldIndex(usize),

    /// Configuration could not be assembled.
    #[error("configuration error: {0}")]
    Config(String),
}

impl AdapterError {
    /// Returns `true` when the error originated in the database layer.
    #[must_use]
    pub const fn is_database(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

impl From<AdapterError> for casbin::Error {
    fn from(err: AdapterError) -> Self {
        casbin::Error::from(casbin::error::AdapterError(Box::new(err)))
    }
}
