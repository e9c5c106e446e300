//! Database row model for the policy table.

use crate::domain::CasbinRule;

/// A row scanned from the policy table.
///
/// Columns are nullable in the schema; rows written by other tools may
/// hold `NULL`, which reads back as an empty value.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CasbinRuleRow {
    /// Policy type tag.
    pub ptype: Option<String>,
    /// Value column `v0`.
    pub v0: Option<String>,
    /// Value column `v1`.
    pub v1: Option<String>,
    /// Value column `v2`.
    pub v2: Option<String>,
    /// Value column `v3`.
    pub v3: Option<String>,
    /// Value column `v4`.
    pub v4: Option<String>,
    /// Value column `v5`.
    pub v5: Option<String>,
}

impl From<CasbinRuleRow> for CasbinRule {
    fn from(row: CasbinRuleRow) -> Self {
        Self {
            ptype: row.ptype.unwrap_or_default(),
            values: [
                row.v0.unwrap_or_default(),
                row.v1.unwrap_or_default(),
                row.v2.unwrap_or_default(),
                row.v3.unwrap_or_default(),
                row.v4.unwrap_or_default(),
                row.v5.unwrap_or_default(),
            ],
        }
    }
}
