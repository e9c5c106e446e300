//! Persistence layer: the policy table and the Casbin adapter over it.
//!
//! [`SqlAdapter`] implements [`casbin::Adapter`] using an `sqlx::AnyPool`,
//! so PostgreSQL, MySQL and SQLite share one code path. Dialect specifics
//! are confined to [`sql::Statements`] and [`crate::domain::Driver`].

pub mod adapter;
pub mod models;
pub mod sql;

pub use adapter::SqlAdapter;
