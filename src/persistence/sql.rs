//! SQL text for the policy table.
//!
//! Statements are rendered per driver so bind placeholders match the
//! backend. The table name is a validated [`TableName`] and is the only
//! value spliced into the text; everything else is bound.

use crate::domain::{CasbinRule, Driver, MAX_VALUES, TableName};

const VALUE_COLUMNS: [&str; MAX_VALUES] = ["v0", "v1", "v2", "v3", "v4", "v5"];

/// Renders statements for one table on one backend.
#[derive(Debug, Clone)]
pub struct Statements {
    driver: Driver,
    table: TableName,
}

/// A parameterized `DELETE` together with its bind values, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteStatement<'a> {
    /// Statement text.
    pub sql: String,
    /// Values to bind, first the policy type, then each constrained column.
    pub binds: Vec<&'a str>,
}

impl Statements {
    /// Creates a renderer for `table` on `driver`.
    #[must_use]
    pub const fn new(driver: Driver, table: TableName) -> Self {
        Self { driver, table }
    }

    /// Returns the driver the statements are rendered for.
    #[must_use]
    pub const fn driver(&self) -> Driver {
        self.driver
    }

    /// Returns the table the statements target.
    #[must_use]
    pub const fn table(&self) -> &TableName {
        &self.table
    }

    /// `CREATE TABLE IF NOT EXISTS` with `ptype` and `v0`..`v5`.
    #[must_use]
    pub fn create_table(&self) -> String {
        let values = VALUE_COLUMNS
            .iter()
            .map(|column| format!("{column} VARCHAR(256)"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "CREATE TABLE IF NOT EXISTS {} (ptype VARCHAR(10), {values})",
            self.table
        )
    }

    /// `DROP TABLE` for the policy table.
    #[must_use]
    pub fn drop_table(&self) -> String {
        format!("DROP TABLE {}", self.table)
    }

    /// Selects every row; no ordering is imposed.
    #[must_use]
    pub fn select_all(&self) -> String {
        format!(
            "SELECT ptype, {} FROM {}",
            VALUE_COLUMNS.join(", "),
            self.table
        )
    }

    /// Inserts one row, binding `ptype` then `v0`..`v5`.
    #[must_use]
    pub fn insert(&self) -> String {
        let placeholders = (1..=MAX_VALUES + 1)
            .map(|index| self.driver.placeholder(index))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {} (ptype, {}) VALUES ({placeholders})",
            self.table,
            VALUE_COLUMNS.join(", ")
        )
    }

    /// Deletes every row, keeping the table.
    #[must_use]
    pub fn delete_all(&self) -> String {
        format!("DELETE FROM {}", self.table)
    }

    /// Deletes rows with the rule's policy type and, for every non-empty
    /// value, an equal value in the same column. Empty values leave their
    /// column unconstrained.
    #[must_use]
    pub fn delete_matching<'a>(&self, rule: &'a CasbinRule) -> DeleteStatement<'a> {
        let mut sql = format!(
            "DELETE FROM {} WHERE ptype = {}",
            self.table,
            self.driver.placeholder(1)
        );
        let mut binds = vec![rule.ptype.as_str()];
        for (index, value) in rule.constraints() {
            let Some(column) = VALUE_COLUMNS.get(index) else {
                continue;
            };
            binds.push(value);
            sql.push_str(" AND ");
            sql.push_str(column);
            sql.push_str(" = ");
            sql.push_str(&self.driver.placeholder(binds.len()));
        }
        DeleteStatement { sql, binds }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn statements(driver: Driver) -> Statements {
        Statements::new(driver, TableName::default())
    }

    #[test]
    fn create_table_has_seven_columns() {
        assert_eq!(
            statements(Driver::Sqlite).create_table(),
            "CREATE TABLE IF NOT EXISTS casbin_rule (ptype VARCHAR(10), v0 VARCHAR(256), \
             v1 VARCHAR(256), v2 VARCHAR(256), v3 VARCHAR(256), v4 VARCHAR(256), v5 VARCHAR(256))"
        );
    }

    #[test]
    fn insert_uses_driver_placeholders() {
        assert_eq!(
            statements(Driver::Postgres).insert(),
            "INSERT INTO casbin_rule (ptype, v0, v1, v2, v3, v4, v5) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)"
        );
        assert_eq!(
            statements(Driver::MySql).insert(),
            "INSERT INTO casbin_rule (ptype, v0, v1, v2, v3, v4, v5) \
             VALUES (?, ?, ?, ?, ?, ?, ?)"
        );
    }

    #[test]
    fn custom_table_name_is_used() {
        let Ok(table) = TableName::new("tenant_rules") else {
            panic!("valid table name");
        };
        let s = Statements::new(Driver::Sqlite, table);
        assert_eq!(s.drop_table(), "DROP TABLE tenant_rules");
        assert_eq!(s.delete_all(), "DELETE FROM tenant_rules");
        assert_eq!(
            s.select_all(),
            "SELECT ptype, v0, v1, v2, v3, v4, v5 FROM tenant_rules"
        );
    }

    #[test]
    fn delete_constrains_only_non_empty_values() {
        let Ok(rule) = CasbinRule::new("p", &["alice", "", "read"]) else {
            panic!("valid rule");
        };
        let delete = statements(Driver::Postgres).delete_matching(&rule);
        assert_eq!(
            delete.sql,
            "DELETE FROM casbin_rule WHERE ptype = $1 AND v0 = $2 AND v2 = $3"
        );
        assert_eq!(delete.binds, vec!["p", "alice", "read"]);
    }

    #[test]
    fn filtered_delete_targets_offset_columns() {
        let Ok(filter) = CasbinRule::filter("p", 1, &["data1"]) else {
            panic!("valid filter");
        };
        let delete = statements(Driver::Sqlite).delete_matching(&filter);
        assert_eq!(
            delete.sql,
            "DELETE FROM casbin_rule WHERE ptype = ? AND v1 = ?"
        );
        assert_eq!(delete.binds, vec!["p", "data1"]);
    }
}
