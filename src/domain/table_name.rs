//! Validated policy table name.
//!
//! The table name is interpolated into DDL and DML text, so it is only
//! accepted when it is a plain SQL identifier.

use std::fmt;
use std::str::FromStr;

use crate::error::AdapterError;

/// Table name used when none is configured.
pub const DEFAULT_TABLE_NAME: &str = "casbin_rule";

const MAX_IDENTIFIER_LEN: usize = 64;

/// Name of the table holding policy rows.
///
/// Must match `[A-Za-z_][A-Za-z0-9_]*` and be at most 64 characters,
/// which is safe to splice into SQL on every supported backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(String);

impl TableName {
    /// Validates and wraps a table name.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidTableName`] if `name` is empty, too
    /// long, or contains characters outside the identifier alphabet.
    pub fn new(name: impl Into<String>) -> Result<Self, AdapterError> {
        let name = name.into();
        let mut chars = name.chars();
        let valid_head = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        let valid_tail = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_head || !valid_tail || name.len() > MAX_IDENTIFIER_LEN {
            return Err(AdapterError::InvalidTableName(name));
        }
        Ok(Self(name))
    }

    /// Returns the table name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TableName {
    fn default() -> Self {
        Self(DEFAULT_TABLE_NAME.to_string())
    }
}

impl FromStr for TableName {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TableName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_casbin_rule() {
        assert_eq!(TableName::default().as_str(), "casbin_rule");
    }

    #[test]
    fn accepts_plain_identifiers() {
        assert!(TableName::new("policies").is_ok());
        assert!(TableName::new("_tenant_42_rules").is_ok());
    }

    #[test]
    fn rejects_injection_and_odd_names() {
        for name in ["", "1rules", "rules; DROP TABLE users", "my-rules", "a.b", "\"q\""] {
            assert!(
                matches!(TableName::new(name), Err(AdapterError::InvalidTableName(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_overlong_names() {
        let name = "t".repeat(65);
        assert!(TableName::new(name).is_err());
        assert!(TableName::new("t".repeat(64)).is_ok());
    }
}
