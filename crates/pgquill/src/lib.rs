//! # pgquill
//!
//! A chainable PostgreSQL statement builder with a heuristic safety scanner
//! between your code and the database.
//!
//! ## Features
//!
//! - **Chainable queries**: `where_` / `and` / `or` plus comparison operators, values always bound
//! - **Upserts**: `set` updates the row matched by the unique columns, or inserts
//! - **Lazy tables**: `Db::table` issues `CREATE TABLE IF NOT EXISTS` once per process
//! - **Safety scanning**: every statement is vetted before it is sent (see [`pgquill_check`])
//! - **Safe defaults**: `delete` without WHERE and `drop_table` require `force`
//!
//! ## Example
//!
//! ```ignore
//! use pgquill::{Column, Db, Values};
//!
//! let db = Db::new(client);
//! let users = db
//!     .table("users", &[Column::text("username").unique(), Column::text("password")])
//!     .await;
//!
//! users
//!     .set(&db, &Values::new().with("username", "admin").with("password", "x"), &["username"])
//!     .await?;
//!
//! let rows: Vec<(String,)> = users
//!     .where_("username")
//!     .equal("admin")
//!     .get_as(&db, &["password"])
//!     .await?;
//! ```

pub mod client;
pub mod column;
pub mod datasource;
pub mod db;
pub mod error;
pub mod fragment;
mod ops;
pub mod param;
pub mod query;
pub mod registry;
pub mod row;
pub mod statement;
pub mod values;

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(test)]
mod test_support;

pub use client::{GenericClient, RowStream, StreamingClient};
pub use column::{Column, ValueKind};
pub use datasource::{DataSource, MEMORY_DSN, PoolLimits, Server};
pub use db::{Db, DbConfig, ScanMode, UNCHECKED_CONFIRMATION};
pub use error::{DbError, DbResult};
pub use fragment::Fragment;
pub use param::{Param, ParamList};
pub use query::{OrderTerm, Query, SortOrder, WhereQuery};
pub use registry::SchemaRegistry;
pub use row::{FromRow, RowExt};
pub use statement::{Statement, StatementKind};
pub use values::Values;

#[cfg(feature = "pool")]
pub use pool::DbPool;

pub use pgquill_check::{
    SafetyScanner, ScanIssue, ScanRule, ScannerConfig, add_check, add_pattern, add_where_pattern,
    to_alphanumeric,
};
