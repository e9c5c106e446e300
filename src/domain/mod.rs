//! Domain layer: policy rules, driver dialects and table naming.
//!
//! Everything here is independent of a live database connection.

pub mod driver;
pub mod rule;
pub mod table_name;

pub use driver::Driver;
pub use rule::{CasbinRule, MAX_VALUES, load_policy_line, parse_policy_line};
pub use table_name::{DEFAULT_TABLE_NAME, TableName};
