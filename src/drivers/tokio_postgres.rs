use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use chrono::{DateTime, NaiveDateTime, Utc};
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, PoolError, RecyclingMethod};
use futures::TryStreamExt;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::{to_sql_checked, FromSql, IsNull, ToSql, Type};
use tokio_postgres::{Column, NoTls, Statement};
use tracing::{debug, info, instrument};

use crate::config::DatabaseConfig;
use crate::drivers::retry::retry_on_disconnect;
use crate::error::{PgFluentError, Result};
use crate::traits::{DatabaseDriver, PreparedStatement};
use crate::types::{Interval, RawQueryResult, SqlValue};

/// A pooled connection kept aside with one statement prepared on it.
struct PreparedConnection {
    client: Object,
    statement: Statement,
}

/// PostgreSQL driver backed by a `deadpool-postgres` pool of `tokio-postgres` clients.
///
/// Construction does not connect; [`start`](DatabaseDriver::start) builds the
/// pool and checks that a connection can be made. Each
/// [`PreparedStatement`] gets its own connection, taken out of the pool by
/// [`prepare_statements`](DatabaseDriver::prepare_statements), on top of the
/// configured pool size.
///
/// A statement that fails because the connection broke is retried once on a
/// freshly built pool.
pub struct TokioPostgresDriver {
    config: DatabaseConfig,
    pool: RwLock<Option<Pool>>,
    prepared: RwLock<HashMap<PreparedStatement, Arc<PreparedConnection>>>,
}

impl TokioPostgresDriver {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            pool: RwLock::new(None),
            prepared: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    fn build_pool(&self) -> Result<Pool> {
        self.config.validate()?;
        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let manager = Manager::from_config(self.config.pg_config()?, NoTls, manager_config);

        Pool::builder(manager)
            .max_size(self.config.pool_size + PreparedStatement::ALL.len())
            .build()
            .map_err(|e| PgFluentError::Config(format!("Failed to create DB pool: {e}")))
    }

    async fn pool(&self) -> Result<Pool> {
        self.pool.read().await.clone().ok_or(PgFluentError::NotStarted)
    }

    async fn client(&self) -> Result<Object> {
        self.pool().await?.get().await.map_err(map_pool_error)
    }

    /// Replaces the pool and, if statements were prepared, prepares them again.
    async fn reconnect(&self) -> Result<()> {
        let had_prepared = {
            let mut prepared = self.prepared.write().await;
            let had_prepared = !prepared.is_empty();
            prepared.clear();
            had_prepared
        };
        let pool = self.build_pool()?;
        if let Some(old) = self.pool.write().await.replace(pool) {
            old.close();
        }
        if had_prepared {
            self.prepare_statements().await?;
        }
        info!("database pool rebuilt");
        Ok(())
    }

    async fn run_query(&self, sql: &str, params: &[SqlValue]) -> Result<RawQueryResult> {
        let client = self.client().await?;
        let statement = client.prepare_cached(sql).await.map_err(map_db_error)?;
        let rows = client
            .query(&statement, &as_params(params))
            .await
            .map_err(map_db_error)?;
        rows_to_raw(statement.columns(), &rows)
    }

    /// Runs `sql` once per parameter set inside one transaction.
    async fn run_batch(&self, sql: &str, param_sets: &[&[SqlValue]]) -> Result<RawQueryResult> {
        let mut client = self.client().await?;
        let transaction = client.transaction().await.map_err(map_db_error)?;
        let statement = transaction
            .prepare_cached(sql)
            .await
            .map_err(map_db_error)?;

        let mut result = RawQueryResult::new(column_names(statement.columns()), Vec::new());
        for params in param_sets {
            let rows: Vec<tokio_postgres::Row> = transaction
                .query_raw(&statement, params.iter())
                .await
                .map_err(map_db_error)?
                .try_collect()
                .await
                .map_err(map_db_error)?;
            result.extend(rows_to_raw(statement.columns(), &rows)?);
        }

        transaction.commit().await.map_err(map_db_error)?;
        Ok(result)
    }

    async fn run_prepared(
        &self,
        statement: PreparedStatement,
        params: &[SqlValue],
    ) -> Result<RawQueryResult> {
        let connection = self.prepared.read().await.get(&statement).cloned();
        match connection {
            Some(connection) => {
                let rows = connection
                    .client
                    .query(&connection.statement, &as_params(params))
                    .await
                    .map_err(map_db_error)?;
                rows_to_raw(connection.statement.columns(), &rows)
            }
            None => self.run_query(statement.sql(), params).await,
        }
    }
}

#[async_trait]
impl DatabaseDriver for TokioPostgresDriver {
    #[instrument(name = "TokioPostgresDriver::start", skip_all)]
    async fn start(&self) -> Result<()> {
        let pool = self.build_pool()?;
        // Fail on an unreachable server now rather than on the first query.
        drop(pool.get().await.map_err(map_pool_error)?);
        if let Some(old) = self.pool.write().await.replace(pool) {
            old.close();
        }
        info!(pool_size = self.config.pool_size, "database pool started");
        Ok(())
    }

    #[instrument(name = "TokioPostgresDriver::prepare_statements", skip_all)]
    async fn prepare_statements(&self) -> Result<()> {
        let pool = self.pool().await?;
        let mut prepared = HashMap::new();
        for statement in PreparedStatement::ALL {
            let client = pool.get().await.map_err(map_pool_error)?;
            let prepared_statement = client
                .prepare(statement.sql())
                .await
                .map_err(map_db_error)?;
            prepared.insert(
                statement,
                Arc::new(PreparedConnection {
                    client,
                    statement: prepared_statement,
                }),
            );
        }
        debug!(count = prepared.len(), "prepared statements ready");
        *self.prepared.write().await = prepared;
        Ok(())
    }

    #[instrument(name = "TokioPostgresDriver::stop", skip_all)]
    async fn stop(&self) -> Result<()> {
        self.prepared.write().await.clear();
        if let Some(pool) = self.pool.write().await.take() {
            pool.close();
            info!("database pool closed");
        }
        Ok(())
    }

    #[instrument(name = "TokioPostgresDriver::execute_query", skip_all)]
    async fn execute_query(&self, sql: &str, params: &[SqlValue]) -> Result<RawQueryResult> {
        debug!(sql, "executing query");
        retry_on_disconnect(|| self.run_query(sql, params), || self.reconnect()).await
    }

    #[instrument(name = "TokioPostgresDriver::execute_transaction", skip_all)]
    async fn execute_transaction(&self, sql: &str, params: &[SqlValue]) -> Result<RawQueryResult> {
        debug!(sql, "executing transaction");
        let param_sets = [params];
        retry_on_disconnect(|| self.run_batch(sql, &param_sets), || self.reconnect()).await
    }

    #[instrument(name = "TokioPostgresDriver::execute_many", skip_all)]
    async fn execute_many(
        &self,
        sql: &str,
        param_sets: &[Vec<SqlValue>],
    ) -> Result<RawQueryResult> {
        debug!(sql, count = param_sets.len(), "executing batch");
        let param_sets: Vec<&[SqlValue]> = param_sets.iter().map(Vec::as_slice).collect();
        retry_on_disconnect(|| self.run_batch(sql, &param_sets), || self.reconnect()).await
    }

    #[instrument(name = "TokioPostgresDriver::execute_prepared", skip_all)]
    async fn execute_prepared(
        &self,
        statement: PreparedStatement,
        params: &[SqlValue],
    ) -> Result<RawQueryResult> {
        debug!(?statement, "executing prepared statement");
        retry_on_disconnect(|| self.run_prepared(statement, params), || self.reconnect()).await
    }
}

fn as_params(params: &[SqlValue]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

fn column_names(columns: &[Column]) -> Vec<String> {
    columns.iter().map(|c| c.name().to_string()).collect()
}

fn rows_to_raw(columns: &[Column], rows: &[tokio_postgres::Row]) -> Result<RawQueryResult> {
    let rows = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .enumerate()
                .map(|(index, column)| decode_value(row, index, column))
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(RawQueryResult::new(column_names(columns), rows))
}

fn decode<'a, T: FromSql<'a>>(
    row: &'a tokio_postgres::Row,
    index: usize,
    wrap: impl FnOnce(T) -> SqlValue,
) -> Result<SqlValue> {
    row.try_get::<_, Option<T>>(index)
        .map(|value| value.map_or(SqlValue::Null, wrap))
        .map_err(map_db_error)
}

fn decode_array<'a, T: FromSql<'a>>(
    row: &'a tokio_postgres::Row,
    index: usize,
    wrap: impl Fn(T) -> SqlValue,
) -> Result<SqlValue> {
    decode(row, index, |values: Vec<Option<T>>| {
        SqlValue::Array(
            values
                .into_iter()
                .map(|value| value.map_or(SqlValue::Null, &wrap))
                .collect(),
        )
    })
}

fn decode_value(row: &tokio_postgres::Row, index: usize, column: &Column) -> Result<SqlValue> {
    match *column.type_() {
        Type::BOOL => decode(row, index, SqlValue::Bool),
        Type::INT2 => decode(row, index, SqlValue::Int16),
        Type::INT4 => decode(row, index, SqlValue::Int32),
        Type::INT8 => decode(row, index, SqlValue::Int64),
        Type::FLOAT4 => decode(row, index, |v: f32| SqlValue::Float64(f64::from(v))),
        Type::FLOAT8 => decode(row, index, SqlValue::Float64),
        Type::NUMERIC => decode(row, index, SqlValue::Decimal),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            decode(row, index, SqlValue::Text)
        }
        Type::TIMESTAMP => decode::<NaiveDateTime>(row, index, SqlValue::Timestamp),
        Type::TIMESTAMPTZ => decode::<DateTime<Utc>>(row, index, SqlValue::TimestampTz),
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY => decode(row, index, SqlValue::TextArray),
        Type::INT8_ARRAY => decode(row, index, SqlValue::Int64Array),
        Type::INTERVAL => decode(row, index, SqlValue::Interval),
        Type::BOOL_ARRAY => decode_array(row, index, SqlValue::Bool),
        Type::INT2_ARRAY => decode_array(row, index, SqlValue::Int16),
        Type::INT4_ARRAY => decode_array(row, index, SqlValue::Int32),
        Type::FLOAT4_ARRAY => {
            decode_array(row, index, |v: f32| SqlValue::Float64(f64::from(v)))
        }
        Type::FLOAT8_ARRAY => decode_array(row, index, SqlValue::Float64),
        Type::NUMERIC_ARRAY => decode_array(row, index, SqlValue::Decimal),
        Type::TIMESTAMP_ARRAY => decode_array::<NaiveDateTime>(row, index, SqlValue::Timestamp),
        Type::TIMESTAMPTZ_ARRAY => {
            decode_array::<DateTime<Utc>>(row, index, SqlValue::TimestampTz)
        }
        Type::INTERVAL_ARRAY => decode_array(row, index, SqlValue::Interval),
        ref other => Err(PgFluentError::UnsupportedType(format!(
            "{} (column `{}`)",
            other,
            column.name()
        ))),
    }
}

impl ToSql for SqlValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Bool(v) => v.to_sql_checked(ty, out),
            SqlValue::Int16(v) => int_to_sql(i64::from(*v), ty, out),
            SqlValue::Int32(v) => int_to_sql(i64::from(*v), ty, out),
            SqlValue::Int64(v) => int_to_sql(*v, ty, out),
            SqlValue::Float64(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql_checked(ty, out),
                Type::NUMERIC => Decimal::try_from(*v)?.to_sql_checked(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            SqlValue::Decimal(v) => v.to_sql_checked(ty, out),
            SqlValue::Text(v) => v.to_sql_checked(ty, out),
            SqlValue::Timestamp(v) => v.to_sql_checked(ty, out),
            SqlValue::TimestampTz(v) => v.to_sql_checked(ty, out),
            SqlValue::TextArray(v) => v.to_sql_checked(ty, out),
            SqlValue::Interval(v) => v.to_sql_checked(ty, out),
            SqlValue::Int64Array(v) => v.to_sql_checked(ty, out),
            SqlValue::Array(v) => v.to_sql_checked(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

// Binary wire form: microseconds (i64), days (i32), months (i32), all big-endian.
impl<'a> FromSql<'a> for Interval {
    fn from_sql(
        _ty: &Type,
        raw: &'a [u8],
    ) -> std::result::Result<Self, Box<dyn Error + Sync + Send>> {
        if raw.len() != 16 {
            return Err(format!("invalid interval length {}", raw.len()).into());
        }
        Ok(Interval {
            microseconds: i64::from_be_bytes(raw[0..8].try_into()?),
            days: i32::from_be_bytes(raw[8..12].try_into()?),
            months: i32::from_be_bytes(raw[12..16].try_into()?),
        })
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::INTERVAL
    }
}

impl ToSql for Interval {
    fn to_sql(
        &self,
        _ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn Error + Sync + Send>> {
        out.put_i64(self.microseconds);
        out.put_i32(self.days);
        out.put_i32(self.months);
        Ok(IsNull::No)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::INTERVAL
    }

    to_sql_checked!();
}

/// Integers bind to whichever numeric type the server inferred for the placeholder.
fn int_to_sql(
    value: i64,
    ty: &Type,
    out: &mut BytesMut,
) -> std::result::Result<IsNull, Box<dyn Error + Sync + Send>> {
    match *ty {
        Type::INT2 => i16::try_from(value)?.to_sql_checked(ty, out),
        Type::INT4 => i32::try_from(value)?.to_sql_checked(ty, out),
        Type::NUMERIC => Decimal::from(value).to_sql_checked(ty, out),
        Type::FLOAT4 => (value as f32).to_sql_checked(ty, out),
        Type::FLOAT8 => (value as f64).to_sql_checked(ty, out),
        _ => value.to_sql_checked(ty, out),
    }
}

fn is_connection_state(code: &SqlState) -> bool {
    let code = code.code();
    code.starts_with("08") || code.starts_with("28") || code.starts_with("57P")
}

fn map_db_error(e: tokio_postgres::Error) -> PgFluentError {
    if e.is_closed() {
        return PgFluentError::ConnectionFailed(e.to_string());
    }
    if let Some(db_error) = e.as_db_error() {
        let constraint = db_error.constraint().unwrap_or_default().to_string();
        let message = db_error.message().to_string();
        return if *db_error.code() == SqlState::UNIQUE_VIOLATION {
            PgFluentError::UniqueViolation {
                constraint,
                message,
            }
        } else if db_error.code().code().starts_with("23") {
            PgFluentError::ConstraintViolation {
                constraint,
                message,
            }
        } else if is_connection_state(db_error.code()) {
            PgFluentError::ConnectionFailed(db_error.to_string())
        } else {
            PgFluentError::QueryFailed(db_error.to_string())
        };
    }
    if e.source().is_some_and(|s| s.is::<std::io::Error>()) {
        return PgFluentError::ConnectionFailed(e.to_string());
    }
    PgFluentError::QueryFailed(e.to_string())
}

fn map_pool_error(e: PoolError) -> PgFluentError {
    match e {
        PoolError::Backend(e) => map_db_error(e),
        other => PgFluentError::ConnectionFailed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: &SqlValue, ty: &Type) -> std::result::Result<(IsNull, BytesMut), String> {
        let mut out = BytesMut::new();
        value
            .to_sql_checked(ty, &mut out)
            .map(|is_null| (is_null, out))
            .map_err(|e| e.to_string())
    }

    #[test]
    fn test_integers_follow_parameter_type() {
        let (_, bytes) = encode(&SqlValue::Int64(42), &Type::INT4).unwrap();
        assert_eq!(bytes.len(), 4);

        let (_, bytes) = encode(&SqlValue::Int64(42), &Type::INT2).unwrap();
        assert_eq!(bytes.len(), 2);

        let (_, bytes) = encode(&SqlValue::Int16(42), &Type::INT8).unwrap();
        assert_eq!(bytes.len(), 8);

        assert!(encode(&SqlValue::Int64(70_000), &Type::INT2).is_err());
    }

    #[test]
    fn test_null_binds_as_null() {
        let (is_null, bytes) = encode(&SqlValue::Null, &Type::TEXT).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_mismatched_type_is_rejected() {
        assert!(encode(&SqlValue::from("abc"), &Type::INT8).is_err());
        assert!(encode(&SqlValue::Bool(true), &Type::TEXT).is_err());
    }

    #[test]
    fn test_float_narrows_for_real_columns() {
        let (_, bytes) = encode(&SqlValue::Float64(1.5), &Type::FLOAT4).unwrap();
        assert_eq!(bytes.len(), 4);
    }

    #[test]
    fn test_interval_wire_format() {
        let interval = Interval::new(14, 3, 4_500_000);
        let (_, bytes) = encode(&SqlValue::Interval(interval), &Type::INTERVAL).unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[..8], &4_500_000_i64.to_be_bytes());
        assert_eq!(&bytes[12..], &14_i32.to_be_bytes());

        assert_eq!(Interval::from_sql(&Type::INTERVAL, &bytes).unwrap(), interval);
        assert!(Interval::from_sql(&Type::INTERVAL, &bytes[..12]).is_err());
        assert!(encode(&SqlValue::Interval(interval), &Type::TEXT).is_err());
    }

    #[test]
    fn test_arrays_bind_element_wise() {
        let ints = SqlValue::Array(vec![SqlValue::Int32(1), SqlValue::Null, SqlValue::Int64(3)]);
        let (is_null, bytes) = encode(&ints, &Type::INT4_ARRAY).unwrap();
        assert!(matches!(is_null, IsNull::No));
        assert!(!bytes.is_empty());

        // A scalar parameter never accepts an array
        assert!(encode(&ints, &Type::INT4).is_err());
        assert!(encode(&SqlValue::Array(vec![SqlValue::from("a")]), &Type::INT4_ARRAY).is_err());
    }

    #[tokio::test]
    async fn test_queries_before_start_fail() {
        let driver = TokioPostgresDriver::new(DatabaseConfig::default());
        let err = driver.execute_query("SELECT 1;", &[]).await.unwrap_err();
        assert!(matches!(err, PgFluentError::NotStarted));
        assert!(driver.prepare_statements().await.is_err());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let driver = TokioPostgresDriver::new(DatabaseConfig::default());
        driver.stop().await.unwrap();
        driver.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_pool_size_fails_start() {
        let config = DatabaseConfig {
            pool_size: 0,
            ..DatabaseConfig::default()
        };
        let err = TokioPostgresDriver::new(config).start().await.unwrap_err();
        assert!(matches!(err, PgFluentError::Config(_)));
    }
}
