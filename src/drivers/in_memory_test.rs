use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::{PgFluentError, Result};
use crate::traits::{DatabaseDriver, PreparedStatement};
use crate::types::{RawQueryResult, SqlValue};

/// Which driver entry point ran a recorded statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Query,
    Transaction,
    /// One entry per parameter set of an `execute_many` call.
    Batch,
    Prepared(PreparedStatement),
}

/// A recorded query execution for verification.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub kind: QueryKind,
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// An in-memory database driver for testing.
///
/// Allows configuring expected responses and verifying executed queries.
/// Every call consumes one queued response; an `execute_many` call consumes
/// one response for the whole batch.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use pgfluent::drivers::{InMemoryTestDriver, InMemoryTestResponseBuilder};
/// use pgfluent::{DatabaseInterface, SqlValue};
///
/// let driver = Arc::new(
///     InMemoryTestDriver::new().with_response(
///         InMemoryTestResponseBuilder::new()
///             .columns(&["guild_id", "prefix"])
///             .row([SqlValue::Int64(1), SqlValue::from("!")])
///             .build(),
///     ),
/// );
/// let dbi = DatabaseInterface::with_driver(driver);
/// ```
pub struct InMemoryTestDriver {
    responses: Mutex<VecDeque<Result<RawQueryResult>>>,
    recorded_queries: Mutex<Vec<RecordedQuery>>,
    default_response: RawQueryResult,
    started: AtomicBool,
    statements_prepared: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryTestDriver {
    /// Create a new in-memory test driver with no pre-configured responses.
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            recorded_queries: Mutex::new(Vec::new()),
            default_response: RawQueryResult::empty(),
            started: AtomicBool::new(false),
            statements_prepared: AtomicBool::new(false),
        }
    }

    /// Add a response to be returned by the next query.
    /// Responses are returned in FIFO order.
    pub fn with_response(self, response: RawQueryResult) -> Self {
        self.push_response(response);
        self
    }

    /// Add multiple responses to be returned by subsequent queries.
    pub fn with_responses(self, responses: impl IntoIterator<Item = RawQueryResult>) -> Self {
        lock(&self.responses).extend(responses.into_iter().map(Ok));
        self
    }

    /// Make the next query fail with `error`.
    pub fn with_error(self, error: PgFluentError) -> Self {
        lock(&self.responses).push_back(Err(error));
        self
    }

    /// Set a default response to use when no queued responses remain.
    pub fn with_default_response(mut self, response: RawQueryResult) -> Self {
        self.default_response = response;
        self
    }

    /// Queue a response on a driver that is already shared.
    pub fn push_response(&self, response: RawQueryResult) {
        lock(&self.responses).push_back(Ok(response));
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn statements_prepared(&self) -> bool {
        self.statements_prepared.load(Ordering::SeqCst)
    }

    /// Get all recorded queries that have been executed.
    pub fn recorded_queries(&self) -> Vec<RecordedQuery> {
        lock(&self.recorded_queries).clone()
    }

    /// Get the last recorded query, if any.
    pub fn last_query(&self) -> Option<RecordedQuery> {
        lock(&self.recorded_queries).last().cloned()
    }

    /// Clear all recorded queries.
    pub fn clear_recorded_queries(&self) {
        lock(&self.recorded_queries).clear();
    }

    /// Assert that the last query matches the expected SQL and parameters.
    pub fn assert_last_query(&self, expected_sql: &str, expected_params: &[SqlValue]) {
        let last = self.last_query().expect("No queries were recorded");
        assert_eq!(
            last.sql, expected_sql,
            "SQL mismatch.\nExpected: {}\nActual: {}",
            expected_sql, last.sql
        );
        assert_eq!(
            last.params, expected_params,
            "Parameters mismatch.\nExpected: {:?}\nActual: {:?}",
            expected_params, last.params
        );
    }

    /// Assert that exactly n queries were executed.
    pub fn assert_query_count(&self, expected: usize) {
        let actual = lock(&self.recorded_queries).len();
        assert_eq!(
            actual, expected,
            "Query count mismatch. Expected: {}, Actual: {}",
            expected, actual
        );
    }

    fn record(&self, kind: QueryKind, sql: &str, params: &[SqlValue]) {
        lock(&self.recorded_queries).push(RecordedQuery {
            kind,
            sql: sql.to_string(),
            params: params.to_vec(),
        });
    }

    /// Return next queued response or default
    fn next_response(&self) -> Result<RawQueryResult> {
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| Ok(self.default_response.clone()))
    }
}

impl Default for InMemoryTestDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for InMemoryTestDriver {
    async fn start(&self) -> Result<()> {
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn prepare_statements(&self) -> Result<()> {
        self.statements_prepared.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.started.store(false, Ordering::SeqCst);
        self.statements_prepared.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn execute_query(&self, sql: &str, params: &[SqlValue]) -> Result<RawQueryResult> {
        self.record(QueryKind::Query, sql, params);
        self.next_response()
    }

    async fn execute_transaction(&self, sql: &str, params: &[SqlValue]) -> Result<RawQueryResult> {
        self.record(QueryKind::Transaction, sql, params);
        self.next_response()
    }

    async fn execute_many(
        &self,
        sql: &str,
        param_sets: &[Vec<SqlValue>],
    ) -> Result<RawQueryResult> {
        for params in param_sets {
            self.record(QueryKind::Batch, sql, params);
        }
        self.next_response()
    }

    async fn execute_prepared(
        &self,
        statement: PreparedStatement,
        params: &[SqlValue],
    ) -> Result<RawQueryResult> {
        self.record(QueryKind::Prepared(statement), statement.sql(), params);
        self.next_response()
    }
}

/// Builder for creating test responses easily.
pub struct InMemoryTestResponseBuilder {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
}

impl InMemoryTestResponseBuilder {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Set the column names for the response.
    pub fn columns(mut self, cols: &[&str]) -> Self {
        self.columns = cols.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Add a row of values.
    pub fn row(mut self, values: impl IntoIterator<Item = SqlValue>) -> Self {
        self.rows.push(values.into_iter().collect());
        self
    }

    /// Build the RawQueryResult.
    pub fn build(self) -> RawQueryResult {
        RawQueryResult::new(self.columns, self.rows)
    }
}

impl Default for InMemoryTestResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_responses_are_fifo_then_default() {
        let driver = InMemoryTestDriver::new()
            .with_response(
                InMemoryTestResponseBuilder::new()
                    .columns(&["n"])
                    .row([SqlValue::Int64(1)])
                    .build(),
            )
            .with_error(PgFluentError::ConnectionFailed("closed".to_string()));

        let first = driver.execute_query("SELECT 1;", &[]).await.unwrap();
        assert_eq!(first.rows, vec![vec![SqlValue::Int64(1)]]);
        assert!(driver.execute_query("SELECT 2;", &[]).await.is_err());
        assert!(driver.execute_query("SELECT 3;", &[]).await.unwrap().rows.is_empty());
        driver.assert_query_count(3);
    }

    #[tokio::test]
    async fn test_batches_record_each_parameter_set() {
        let driver = InMemoryTestDriver::new();
        driver
            .execute_many(
                "INSERT INTO t (a) VALUES ($1)",
                &[vec![SqlValue::Int64(1)], vec![SqlValue::Int64(2)]],
            )
            .await
            .unwrap();

        let recorded = driver.recorded_queries();
        assert_eq!(recorded.len(), 2);
        assert!(recorded.iter().all(|q| q.kind == QueryKind::Batch));
        driver.assert_last_query("INSERT INTO t (a) VALUES ($1)", &[SqlValue::Int64(2)]);
    }

    #[tokio::test]
    async fn test_lifecycle_flags() {
        let driver = InMemoryTestDriver::new();
        driver.start().await.unwrap();
        driver.prepare_statements().await.unwrap();
        assert!(driver.is_started());
        assert!(driver.statements_prepared());

        driver.stop().await.unwrap();
        assert!(!driver.is_started());
        assert!(!driver.statements_prepared());
    }
}
