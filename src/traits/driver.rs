use async_trait::async_trait;

use crate::error::Result;
use crate::types::{RawQueryResult, SqlValue};

/// Lookups hot enough to keep prepared on a dedicated connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreparedStatement {
    /// `$1` guild id
    GuildPrefix,
    /// `$1` guild id, `$2` setting name
    GuildSetting,
}

impl PreparedStatement {
    pub const ALL: [PreparedStatement; 2] =
        [PreparedStatement::GuildPrefix, PreparedStatement::GuildSetting];

    pub fn sql(&self) -> &'static str {
        match self {
            PreparedStatement::GuildPrefix => "SELECT prefix FROM prefix WHERE guild_id=$1;",
            PreparedStatement::GuildSetting => {
                "SELECT config_value FROM guild_config WHERE guild_id=$1 AND config_name=$2;"
            }
        }
    }
}

/// Trait for database driver implementations.
/// Drivers are responsible for:
/// - Managing connections to the database
/// - Converting SqlValue parameters to native types
/// - Executing statements and converting results to RawQueryResult
///
/// Parameters use PostgreSQL-style placeholders ($1, $2, etc.)
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Opens the driver's connections. Called once before any statement runs.
    async fn start(&self) -> Result<()> {
        Ok(())
    }

    /// Prepares every [`PreparedStatement`]. Runs after the tables they read exist.
    async fn prepare_statements(&self) -> Result<()> {
        Ok(())
    }

    /// Releases all connections. Must be safe to call more than once, and after a failed start.
    async fn stop(&self) -> Result<()> {
        Ok(())
    }

    /// Execute a read statement with the given parameters.
    async fn execute_query(&self, sql: &str, params: &[SqlValue]) -> Result<RawQueryResult>;

    /// Execute a statement inside a transaction.
    async fn execute_transaction(&self, sql: &str, params: &[SqlValue]) -> Result<RawQueryResult>;

    /// Execute one statement once per parameter set, all inside a single transaction.
    async fn execute_many(&self, sql: &str, param_sets: &[Vec<SqlValue>])
        -> Result<RawQueryResult>;

    /// Execute one of the hot lookups.
    async fn execute_prepared(
        &self,
        statement: PreparedStatement,
        params: &[SqlValue],
    ) -> Result<RawQueryResult> {
        self.execute_query(statement.sql(), params).await
    }
}
