use std::fmt;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::builders::create::create_table_sql;
use crate::builders::delete::delete_sql;
use crate::builders::insert::{insert_sql, upsert_sql};
use crate::builders::Query;
use crate::clauses::SqlParams;
use crate::config::DatabaseConfig;
use crate::drivers::TokioPostgresDriver;
use crate::error::{PgFluentError, Result};
use crate::guild::GuildData;
use crate::schema::core_tables::{GuildConfigTable, PrefixTable};
use crate::schema::{validate_identifier, Column, Table};
use crate::traits::{DatabaseDriver, PreparedStatement, TableDefinition};
use crate::types::{Fields, QueryResult, Row, SqlValue};

const PRIMARY_KEYS_SQL: &str = "SELECT a.attname FROM pg_index i \
     JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = ANY(i.indkey) \
     WHERE i.indrelid = to_regclass($1)::oid AND i.indisprimary;";

/// Handle to the database that every [`Table`], [`Column`] and [`Query`] goes through.
///
/// Cloning is cheap; clones share the driver and its pool.
#[derive(Clone)]
pub struct DatabaseInterface {
    driver: Arc<dyn DatabaseDriver>,
}

impl fmt::Debug for DatabaseInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseInterface").finish_non_exhaustive()
    }
}

impl DatabaseInterface {
    /// Creates an interface over a pooled PostgreSQL driver. Nothing connects
    /// until [`start`](Self::start).
    pub fn new(config: DatabaseConfig) -> Self {
        Self::with_driver(Arc::new(TokioPostgresDriver::new(config)))
    }

    /// Creates an interface and starts it.
    pub async fn connect(config: DatabaseConfig) -> Result<Self> {
        let dbi = Self::new(config);
        dbi.start().await?;
        Ok(dbi)
    }

    /// Create a new interface with a custom driver.
    /// Useful for testing or using alternative database drivers.
    pub fn with_driver(driver: Arc<dyn DatabaseDriver>) -> Self {
        Self { driver }
    }

    /// Connects, creates the `prefix` and `guild_config` tables when missing,
    /// then prepares the guild lookups that read them.
    #[instrument(name = "DatabaseInterface::start", skip_all)]
    pub async fn start(&self) -> Result<()> {
        self.driver.start().await?;
        if self.define::<PrefixTable>()?.create_if_missing().await? {
            info!(table = PrefixTable::table_name(), "created table");
        }
        if self.define::<GuildConfigTable>()?.create_if_missing().await? {
            info!(table = GuildConfigTable::table_name(), "created table");
        }
        self.driver.prepare_statements().await?;
        info!("database interface started");
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        self.driver.stop().await?;
        info!("database interface stopped");
        Ok(())
    }

    pub async fn execute_query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        Ok(self.fetch(sql, params).await?.rows())
    }

    /// Runs a statement inside its own transaction.
    pub async fn execute_transaction(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        let raw = self.driver.execute_transaction(sql, params).await?;
        Ok(QueryResult::from_raw(raw).rows())
    }

    /// Runs `sql` once per parameter set, all in one transaction.
    pub async fn execute_many(&self, sql: &str, param_sets: &[Vec<SqlValue>]) -> Result<Vec<Row>> {
        let raw = self.driver.execute_many(sql, param_sets).await?;
        Ok(QueryResult::from_raw(raw).rows())
    }

    async fn fetch(&self, sql: &str, params: &[SqlValue]) -> Result<QueryResult> {
        let raw = self.driver.execute_query(sql, params).await?;
        Ok(QueryResult::from_raw(raw))
    }

    pub fn query(&self) -> Query {
        Query::new(Arc::clone(&self.driver))
    }

    pub fn table(&self, name: impl Into<String>) -> Table {
        Table::new(name, self.clone())
    }

    /// A table with the columns, primary key and seed rows of `T` queued for creation.
    pub fn define<T: TableDefinition>(&self) -> Result<Table> {
        let name = T::qualified_name();
        validate_identifier("table", &name)?;
        Ok(Table::new(name, self.clone())
            .with_columns(T::columns()?)
            .with_primaries(T::primaries())
            .with_initial_data(T::initial_data()))
    }

    fn select(&self, table: &str, columns: &[&str], filters: Fields) -> Query {
        self.query()
            .table([table])
            .select(columns.iter().copied())
            .where_(filters)
    }

    pub async fn get(&self, table: &str, columns: &[&str], filters: Fields) -> Result<Vec<Row>> {
        self.select(table, columns, filters).get().await
    }

    pub async fn get_first(
        &self,
        table: &str,
        columns: &[&str],
        filters: Fields,
    ) -> Result<Option<Row>> {
        self.select(table, columns, filters).get_first().await
    }

    pub async fn get_value(
        &self,
        table: &str,
        column: &str,
        filters: Fields,
    ) -> Result<Option<SqlValue>> {
        self.select(table, &[column], filters).get_value().await
    }

    pub async fn get_values(
        &self,
        table: &str,
        column: &str,
        filters: Fields,
    ) -> Result<Vec<SqlValue>> {
        self.select(table, &[column], filters).get_values().await
    }

    pub async fn insert(&self, table: &str, data: Fields) -> Result<()> {
        let (sql, params) = insert_sql(table, &data)?;
        self.driver.execute_transaction(&sql, &params).await?;
        Ok(())
    }

    /// Inserts every row in one transaction. All rows must set the same columns
    /// in the same order.
    pub async fn insert_many(&self, table: &str, rows: &[Fields]) -> Result<()> {
        let Some(first) = rows.first() else {
            return Ok(());
        };
        let (sql, _) = insert_sql(table, first)?;
        let columns: Vec<&str> = first.columns().collect();

        let mut param_sets = Vec::with_capacity(rows.len());
        for row in rows {
            if !row.columns().eq(columns.iter().copied()) {
                return Err(PgFluentError::Schema(format!(
                    "insert_many into `{table}` needs the same columns in every row, \
                     expected ({})",
                    columns.join(", ")
                )));
            }
            param_sets.push(row.values().cloned().collect());
        }

        self.driver.execute_many(&sql, &param_sets).await?;
        Ok(())
    }

    /// Inserts `data` or, on a primary key conflict, updates the other columns.
    pub async fn upsert<P: AsRef<str>>(
        &self,
        table: &str,
        primaries: &[P],
        data: Fields,
    ) -> Result<()> {
        let (sql, params) = upsert_sql(table, primaries, &data)?;
        self.driver.execute_transaction(&sql, &params).await?;
        Ok(())
    }

    pub async fn delete(&self, table: &str, filters: Fields) -> Result<()> {
        let mut params = SqlParams::new();
        let sql = delete_sql(table, &[filters.into()], &mut params)?;
        self.driver
            .execute_transaction(&sql, &params.into_values())
            .await?;
        Ok(())
    }

    /// Issues `CREATE TABLE`. An empty `primaries` uses the columns flagged as primary keys.
    pub async fn create_table<P: AsRef<str>>(
        &self,
        table: &str,
        columns: &[Column],
        primaries: &[P],
    ) -> Result<()> {
        let sql = create_table_sql(table, columns, primaries)?;
        self.driver.execute_transaction(&sql, &[]).await?;
        Ok(())
    }

    pub async fn drop_table(&self, table: &str) -> Result<()> {
        validate_identifier("table", table)?;
        self.driver
            .execute_transaction(&format!("DROP TABLE {table}"), &[])
            .await?;
        Ok(())
    }

    /// Whether the catalog resolves `table` to a relation.
    pub async fn table_exists(&self, table: &str) -> Result<bool> {
        let result = self
            .fetch("SELECT to_regclass($1)::text;", &[SqlValue::from(table)])
            .await?;
        Ok(result.first_value().is_some())
    }

    /// Primary key columns of `table` according to the catalog.
    pub async fn primary_keys(&self, table: &str) -> Result<Vec<String>> {
        let result = self
            .fetch(PRIMARY_KEYS_SQL, &[SqlValue::from(table)])
            .await?;
        Ok(result
            .rows()
            .into_iter()
            .filter_map(Row::into_first)
            .filter_map(|value| match value {
                SqlValue::Text(name) => Some(name),
                _ => None,
            })
            .collect())
    }

    pub fn guild(&self, guild_id: i64) -> GuildData {
        GuildData::new(self.clone(), guild_id)
    }

    /// The guild's command prefix, read through its prepared statement.
    pub async fn guild_prefix(&self, guild_id: i64) -> Result<Option<String>> {
        self.prepared_text(PreparedStatement::GuildPrefix, &[SqlValue::Int64(guild_id)])
            .await
    }

    /// One guild setting, read through its prepared statement.
    pub async fn guild_setting(&self, guild_id: i64, name: &str) -> Result<Option<String>> {
        self.prepared_text(
            PreparedStatement::GuildSetting,
            &[SqlValue::Int64(guild_id), SqlValue::from(name)],
        )
        .await
    }

    async fn prepared_text(
        &self,
        statement: PreparedStatement,
        params: &[SqlValue],
    ) -> Result<Option<String>> {
        let raw = self.driver.execute_prepared(statement, params).await?;
        match QueryResult::from_raw(raw).first_value() {
            None => Ok(None),
            Some(SqlValue::Text(value)) => Ok(Some(value)),
            Some(other) => Err(PgFluentError::QueryFailed(format!(
                "{statement:?} returned {} instead of text",
                other.kind()
            ))),
        }
    }
}
