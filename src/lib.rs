//! pgfluent - A fluent, parameterized PostgreSQL query and schema layer
//!
//! # Example
//! ```ignore
//! use pgfluent::{fields, Column, ColumnExpr, DatabaseConfig, DatabaseInterface};
//!
//! // Connect, creating the bootstrap tables if needed
//! let dbi = DatabaseInterface::connect(DatabaseConfig::from_env()?).await?;
//!
//! // Declare and create a table
//! let mut trainers = dbi.table("trainers").with_columns([
//!     Column::id("trainer_id").primary_key().build()?,
//!     Column::small_integer("team").build()?,
//! ]);
//! trainers.create_if_missing().await?;
//!
//! // Count messages per channel for one author
//! let author_id = Column::new("author_id");
//! let counts = dbi
//!     .query()
//!     .select([author_id.count()])
//!     .table(["messages"])
//!     .where_(fields![author_id = 42_i64])
//!     .group_by(["channel_id"])
//!     .get()
//!     .await?;
//!
//! // Write through a table narrowed to one row
//! let trainer = trainers.where_(fields![trainer_id = 1_i64]);
//! trainer.column("team").set(2_i16).await?;
//! ```

#[macro_use]
mod macros;

pub mod builders;
pub mod clauses;
pub mod config;
pub mod drivers;
pub mod error;
pub mod guild;
pub mod interface;
pub mod schema;
pub mod traits;
pub mod types;

// Re-export main types for convenient access
pub use builders::{Query, SortDirection};
pub use clauses::{Aggregate, Condition, SqlOperator, WhereClause};
pub use config::DatabaseConfig;
pub use error::{PgFluentError, Result};
pub use guild::GuildData;
pub use interface::DatabaseInterface;
pub use schema::{AggregateColumn, Column, ColumnBuilder, ColumnType, Table};
pub use traits::{ColumnExpr, ColumnRef, DatabaseDriver, PreparedStatement, TableDefinition};
pub use types::{Fields, Interval, QueryResult, RawQueryResult, Row, SqlValue};
