//! SQL-backed Casbin policy adapter.
//!
//! [`SqlAdapter`] stores policy rules in a single table reached through
//! an `sqlx` `Any` pool and implements [`casbin::Adapter`] on top of it.

use std::time::Duration;

use async_trait::async_trait;
use casbin::{Adapter, Filter, Model, Result as CasbinResult};
use sqlx::any::{AnyArguments, AnyPoolOptions};
use sqlx::query::Query;
use sqlx::{Any, AnyPool};

use super::models::CasbinRuleRow;
use super::sql::{DeleteStatement, Statements};
use crate::config::AdapterConfig;
use crate::domain::{CasbinRule, Driver, TableName, load_policy_line};
use crate::error::{AdapterError, AdapterResult};

/// Sections written by a full save, in insertion order.
const SAVED_SECTIONS: [&str; 2] = ["p", "g"];

/// Casbin adapter persisting policy rules in a relational table.
///
/// Holds a pooled connection and the table name; no other state survives
/// between calls apart from whether the last load was filtered. The pool
/// is released when the adapter is dropped, or explicitly via
/// [`SqlAdapter::close`].
///
/// # Concurrency
///
/// The adapter takes no locks. Concurrent calls run concurrently against
/// the database and get whatever isolation the database provides.
#[derive(Debug)]
pub struct SqlAdapter {
    pool: AnyPool,
    statements: Statements,
    is_filtered: bool,
}

impl SqlAdapter {
    /// Opens a pool for the driver identifier and connection string and
    /// makes sure the default policy table exists.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::UnsupportedDriver`] for an unknown driver,
    /// [`AdapterError::Config`] if the driver disagrees with the URL, and
    /// [`AdapterError::Database`] if connecting or creating the table fails.
    pub async fn new(driver: &str, database_url: &str) -> AdapterResult<Self> {
        let mut config = AdapterConfig::new(database_url);
        config.driver = Some(driver.parse()?);
        Self::connect(&config).await
    }

    /// Opens a pool as described by `config` and makes sure the configured
    /// table exists.
    ///
    /// A private in-memory SQLite database is bound to a single
    /// long-lived connection, so its pool is pinned to exactly one.
    ///
    /// # Errors
    ///
    /// Returns an [`AdapterError`] if the driver cannot be resolved, the
    /// connection fails, or the table cannot be created.
    pub async fn connect(config: &AdapterConfig) -> AdapterResult<Self> {
        let driver = config.resolve_driver()?;
        sqlx::any::install_default_drivers();

        let mut options = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout());
        if driver.is_in_memory(&config.database_url) {
            options = options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>);
        }
        let pool = options.connect(&config.database_url).await?;
        tracing::info!(%driver, table = %config.table_name, "connected to policy store");

        Self::from_pool_with_table(pool, driver, config.table_name.clone()).await
    }

    /// Wraps an already-open pool, using the default table name.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Database`] if the table cannot be created.
    pub async fn from_pool(pool: AnyPool, driver: Driver) -> AdapterResult<Self> {
        Self::from_pool_with_table(pool, driver, TableName::default()).await
    }

    /// Wraps an already-open pool, storing rules in `table`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Database`] if the table cannot be created.
    pub async fn from_pool_with_table(
        pool: AnyPool,
        driver: Driver,
        table: TableName,
    ) -> AdapterResult<Self> {
        let adapter = Self {
            pool,
            statements: Statements::new(driver, table),
            is_filtered: false,
        };
        adapter.ensure_table().await?;
        Ok(adapter)
    }

    /// Returns the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Returns the policy table name.
    #[must_use]
    pub const fn table_name(&self) -> &TableName {
        self.statements.table()
    }

    /// Returns the database driver.
    #[must_use]
    pub const fn driver(&self) -> Driver {
        self.statements.driver()
    }

    /// Closes the pool and waits for its connections to shut down.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!(table = %self.table_name(), "policy store closed");
    }

    /// Returns `true` if the policy table is among the existing tables.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Database`] if the tables cannot be listed.
    pub async fn table_exists(&self) -> AdapterResult<bool> {
        let tables: Vec<String> =
            sqlx::query_scalar::<_, String>(self.driver().list_tables_sql())
                .fetch_all(&self.pool)
                .await?;
        Ok(tables.iter().any(|t| t == self.table_name().as_str()))
    }

    /// Creates the policy table unless it already exists.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Database`] if listing tables or the
    /// `CREATE TABLE` fails.
    pub async fn ensure_table(&self) -> AdapterResult<()> {
        if self.table_exists().await? {
            return Ok(());
        }
        sqlx::query(&self.statements.create_table())
            .execute(&self.pool)
            .await?;
        tracing::info!(table = %self.table_name(), "created policy table");
        Ok(())
    }

    /// Drops the policy table unconditionally.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Database`] if the `DROP TABLE` fails,
    /// including when the table does not exist.
    pub async fn drop_table(&self) -> AdapterResult<()> {
        sqlx::query(&self.statements.drop_table())
            .execute(&self.pool)
            .await?;
        tracing::info!(table = %self.table_name(), "dropped policy table");
        Ok(())
    }

    /// Reads every stored rule. Row order is whatever the database returns.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Database`] on query or decode failure.
    pub async fn load_rules(&self) -> AdapterResult<Vec<CasbinRule>> {
        let rows = sqlx::query_as::<_, CasbinRuleRow>(&self.statements.select_all())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(CasbinRule::from).collect())
    }

    async fn insert_rule(&self, rule: &CasbinRule) -> AdapterResult<()> {
        let sql = self.statements.insert();
        insert_query(&sql, rule).execute(&self.pool).await?;
        Ok(())
    }

    async fn delete_matching(&self, rule: &CasbinRule) -> AdapterResult<u64> {
        let delete = self.statements.delete_matching(rule);
        let result = delete_query(&delete).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn insert_all(&self, rules: &[CasbinRule]) -> AdapterResult<()> {
        let sql = self.statements.insert();
        let mut tx = self.pool.begin().await?;
        for rule in rules {
            insert_query(&sql, rule).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Deletes each rule's matches in one transaction. Rolls back and
    /// returns `false` if any rule matched nothing.
    async fn delete_all_matching(&self, rules: &[CasbinRule]) -> AdapterResult<bool> {
        let mut tx = self.pool.begin().await?;
        for rule in rules {
            let delete = self.statements.delete_matching(rule);
            let result = delete_query(&delete).execute(&mut *tx).await?;
            if result.rows_affected() == 0 {
                tx.rollback().await?;
                return Ok(false);
            }
        }
        tx.commit().await?;
        Ok(true)
    }

    fn replay(
        &self,
        rules: &[CasbinRule],
        m: &mut dyn Model,
        filter: Option<&Filter<'_>>,
    ) -> usize {
        let mut loaded = 0;
        for rule in rules {
            if rule.ptype.is_empty() {
                continue;
            }
            let accepted = match (filter, rule.section()) {
                (Some(f), Some("p")) => rule.matches_filter(f.p.as_slice()),
                (Some(f), Some("g")) => rule.matches_filter(f.g.as_slice()),
                _ => true,
            };
            if accepted && load_policy_line(&rule.to_policy_line(), m) {
                loaded += 1;
            }
        }
        tracing::debug!(
            table = %self.table_name(),
            rows = rules.len(),
            loaded,
            filtered = filter.is_some(),
            "loaded policy"
        );
        loaded
    }
}

fn insert_query<'q>(sql: &'q str, rule: &'q CasbinRule) -> Query<'q, Any, AnyArguments<'q>> {
    rule.values
        .iter()
        .fold(sqlx::query(sql).bind(rule.ptype.as_str()), |query, value| {
            query.bind(value.as_str())
        })
}

fn delete_query<'q>(delete: &'q DeleteStatement<'_>) -> Query<'q, Any, AnyArguments<'q>> {
    delete
        .binds
        .iter()
        .fold(sqlx::query(&delete.sql), |query, value| query.bind(*value))
}

/// Collects the rules of the saved sections, validating each one.
fn collect_rules(m: &dyn Model) -> AdapterResult<Vec<CasbinRule>> {
    let mut rules = Vec::new();
    for section in SAVED_SECTIONS {
        let Some(assertions) = m.get_model().get(section) else {
            continue;
        };
        for (ptype, assertion) in assertions {
            for policy in assertion.get_policy() {
                rules.push(CasbinRule::new(ptype, policy.as_slice())?);
            }
        }
    }
    Ok(rules)
}

fn build_rules(ptype: &str, rules: &[Vec<String>]) -> AdapterResult<Vec<CasbinRule>> {
    rules
        .iter()
        .map(|rule| CasbinRule::new(ptype, rule.as_slice()))
        .collect()
}

#[async_trait]
impl Adapter for SqlAdapter {
    async fn load_policy(&mut self, m: &mut dyn Model) -> CasbinResult<()> {
        let rules = self.load_rules().await?;
        self.replay(&rules, m, None);
        self.is_filtered = false;
        Ok(())
    }

    async fn load_filtered_policy<'a>(
        &mut self,
        m: &mut dyn Model,
        f: Filter<'a>,
    ) -> CasbinResult<()> {
        let rules = self.load_rules().await?;
        self.replay(&rules, m, Some(&f));
        self.is_filtered = true;
        Ok(())
    }

    async fn save_policy(&mut self, m: &mut dyn Model) -> CasbinResult<()> {
        let rules = collect_rules(m)?;
        self.drop_table().await?;
        self.ensure_table().await?;
        for rule in &rules {
            self.insert_rule(rule).await?;
        }
        tracing::info!(table = %self.table_name(), rows = rules.len(), "saved policy");
        Ok(())
    }

    async fn clear_policy(&mut self) -> CasbinResult<()> {
        sqlx::query(&self.statements.delete_all())
            .execute(&self.pool)
            .await
            .map_err(AdapterError::from)?;
        tracing::info!(table = %self.table_name(), "cleared policy");
        Ok(())
    }

    fn is_filtered(&self) -> bool {
        self.is_filtered
    }

    async fn add_policy(
        &mut self,
        _sec: &str,
        ptype: &str,
        rule: Vec<String>,
    ) -> CasbinResult<bool> {
        let rule = CasbinRule::new(ptype, rule.as_slice())?;
        self.insert_rule(&rule).await?;
        tracing::debug!(ptype, "added policy rule");
        Ok(true)
    }

    async fn add_policies(
        &mut self,
        _sec: &str,
        ptype: &str,
        rules: Vec<Vec<String>>,
    ) -> CasbinResult<bool> {
        let rules = build_rules(ptype, &rules)?;
        self.insert_all(&rules).await?;
        tracing::debug!(ptype, rows = rules.len(), "added policy rules");
        Ok(true)
    }

    async fn remove_policy(
        &mut self,
        _sec: &str,
        ptype: &str,
        rule: Vec<String>,
    ) -> CasbinResult<bool> {
        let rule = CasbinRule::new(ptype, rule.as_slice())?;
        let removed = self.delete_matching(&rule).await?;
        tracing::debug!(ptype, removed, "removed policy rule");
        Ok(removed > 0)
    }

    async fn remove_policies(
        &mut self,
        _sec: &str,
        ptype: &str,
        rules: Vec<Vec<String>>,
    ) -> CasbinResult<bool> {
        let rules = build_rules(ptype, &rules)?;
        let removed = self.delete_all_matching(&rules).await?;
        tracing::debug!(ptype, rows = rules.len(), removed, "removed policy rules");
        Ok(removed)
    }

    async fn remove_filtered_policy(
        &mut self,
        _sec: &str,
        ptype: &str,
        field_index: usize,
        field_values: Vec<String>,
    ) -> CasbinResult<bool> {
        let filter = CasbinRule::filter(ptype, field_index, field_values.as_slice())?;
        let removed = self.delete_matching(&filter).await?;
        tracing::debug!(ptype, field_index, removed, "removed filtered policy rules");
        Ok(removed > 0)
    }
}
