use std::fmt;
use std::sync::Arc;

use crate::builders::delete::delete_sql;
use crate::clauses::{SqlParams, WhereClause};
use crate::error::{PgFluentError, Result};
use crate::traits::{ColumnRef, DatabaseDriver};
use crate::types::{QueryResult, Row, SqlValue};

/// Direction appended after the ORDER BY list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Fluent SELECT builder.
///
/// Every builder method takes and returns the query, so calls chain. Builder
/// state is purely additive: rendering with [`sql`](Self::sql) never changes
/// it, and execution happens only in the terminal `get*` methods.
///
/// A builder call that misuses the schema (for example an OR group mixing
/// aggregate and plain conditions) records an error instead of panicking; the
/// error is returned by `sql` and every terminal method, before any SQL is sent.
#[derive(Clone)]
pub struct Query {
    driver: Arc<dyn DatabaseDriver>,
    columns: Vec<ColumnRef>,
    distinct: bool,
    tables: Vec<String>,
    where_clauses: Vec<WhereClause>,
    having_clauses: Vec<WhereClause>,
    group_by: Vec<ColumnRef>,
    order_by: Vec<ColumnRef>,
    direction: Option<SortDirection>,
    limit: Option<u64>,
    offset: Option<u64>,
    error: Option<PgFluentError>,
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("columns", &self.columns)
            .field("distinct", &self.distinct)
            .field("tables", &self.tables)
            .field("where_clauses", &self.where_clauses)
            .field("having_clauses", &self.having_clauses)
            .field("group_by", &self.group_by)
            .field("order_by", &self.order_by)
            .field("direction", &self.direction)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl Query {
    pub(crate) fn new(driver: Arc<dyn DatabaseDriver>) -> Self {
        Self {
            driver,
            columns: Vec::new(),
            distinct: false,
            tables: Vec::new(),
            where_clauses: Vec::new(),
            having_clauses: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            direction: None,
            limit: None,
            offset: None,
            error: None,
        }
    }

    fn fail(&mut self, error: PgFluentError) {
        self.error.get_or_insert(error);
    }

    /// Replaces the select list. An empty list selects `*`.
    /// Strings pass through verbatim, so expressions such as
    /// `"rank() over (order by count(message_id) desc) as rank"` are allowed.
    pub fn select<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnRef>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self.distinct = false;
        self
    }

    /// Like [`select`](Self::select), with `SELECT DISTINCT`.
    pub fn select_distinct<I, C>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnRef>,
    {
        let mut query = self.select(columns);
        query.distinct = true;
        query
    }

    /// Replaces the FROM list. Without it, FROM is taken from the tables the
    /// selected columns are bound to.
    pub fn table<I, T>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tables.clear();
        for table in tables {
            let table = table.into();
            if !self.tables.contains(&table) {
                self.tables.push(table);
            }
        }
        self
    }

    /// ANDs a condition, a condition tree or [`Fields`](crate::Fields) onto the
    /// query. Aggregate conditions are routed to HAVING.
    pub fn where_(mut self, clause: impl Into<WhereClause>) -> Self {
        if let Err(e) = clause
            .into()
            .classify(&mut self.where_clauses, &mut self.having_clauses)
        {
            self.fail(e);
        }
        self
    }

    /// ANDs one OR group of `clauses` onto the query.
    pub fn or_<I, C>(self, clauses: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<WhereClause>,
    {
        self.where_(WhereClause::any(clauses))
    }

    /// ANDs a clause onto HAVING, whether or not it uses aggregates.
    pub fn having(mut self, clause: impl Into<WhereClause>) -> Self {
        let clause = clause.into();
        if !clause.is_empty() {
            self.having_clauses.push(clause);
        }
        self
    }

    /// Appends to the GROUP BY list.
    pub fn group_by<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnRef>,
    {
        self.group_by.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Replaces the ORDER BY list. Direction stays unset until
    /// [`asc`](Self::asc) or [`desc`](Self::desc).
    pub fn order_by<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnRef>,
    {
        self.order_by = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn asc(mut self) -> Self {
        self.direction = Some(SortDirection::Asc);
        self
    }

    pub fn desc(mut self) -> Self {
        self.direction = Some(SortDirection::Desc);
        self
    }

    /// Sets or, with `None`, clears the LIMIT. `Some(0)` is a real limit.
    pub fn limit(mut self, limit: impl Into<Option<u64>>) -> Self {
        self.limit = limit.into();
        self
    }

    /// Sets or, with `None`, clears the OFFSET.
    pub fn offset(mut self, offset: impl Into<Option<u64>>) -> Self {
        self.offset = offset.into();
        self
    }

    pub fn current_limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn current_offset(&self) -> Option<u64> {
        self.offset
    }

    /// Renders the statement and its bound values, in placeholder order.
    pub fn sql(&self) -> Result<(String, Vec<SqlValue>)> {
        self.build_sql(self.limit)
    }

    fn from_tables(&self) -> Result<Vec<String>> {
        if !self.tables.is_empty() {
            return Ok(self.tables.clone());
        }
        let mut tables: Vec<String> = Vec::new();
        for table in self.columns.iter().filter_map(|c| c.table.as_ref()) {
            if !tables.contains(table) {
                tables.push(table.clone());
            }
        }
        if tables.is_empty() {
            return Err(PgFluentError::QueryShape(
                "query has no table to select from".to_string(),
            ));
        }
        Ok(tables)
    }

    fn build_sql(&self, limit: Option<u64>) -> Result<(String, Vec<SqlValue>)> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        let mut sql = String::with_capacity(256);
        let mut params = SqlParams::new();

        // SELECT clause
        sql.push_str("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        if self.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&join_refs(&self.columns));
        }

        // FROM clause
        sql.push_str(" FROM ");
        sql.push_str(&self.from_tables()?.join(", "));

        // WHERE clause
        if !self.where_clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&build_conditions(&self.where_clauses, &mut params));
        }

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&join_refs(&self.group_by));
        }

        if !self.having_clauses.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&build_conditions(&self.having_clauses, &mut params));
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&join_refs(&self.order_by));
            match self.direction {
                Some(SortDirection::Asc) => sql.push_str(" ASC"),
                Some(SortDirection::Desc) => sql.push_str(" DESC"),
                None => {}
            }
        }

        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        sql.push(';');
        Ok((sql, params.into_values()))
    }

    async fn fetch(&self, limit: Option<u64>) -> Result<QueryResult> {
        let (sql, params) = self.build_sql(limit)?;
        let raw = self.driver.execute_query(&sql, &params).await?;
        Ok(QueryResult::from_raw(raw))
    }

    /// Executes the query and returns every row.
    pub async fn get(&self) -> Result<Vec<Row>> {
        Ok(self.fetch(self.limit).await?.rows())
    }

    /// Returns the only matching row, `None` when nothing matches, and a
    /// query shape error when more than one row does.
    pub async fn get_one(&self) -> Result<Option<Row>> {
        let mut rows = self.fetch(Some(2)).await?.rows();
        if rows.len() > 1 {
            return Err(PgFluentError::QueryShape(
                "query returned more than one result".to_string(),
            ));
        }
        Ok(rows.pop())
    }

    /// Returns the first row, if any.
    pub async fn get_first(&self) -> Result<Option<Row>> {
        Ok(self.fetch(Some(1)).await?.first_row())
    }

    /// Returns the single selected column of the first row. NULL reads as `None`.
    pub async fn get_value(&self) -> Result<Option<SqlValue>> {
        self.require_single_column("get_value")?;
        Ok(self.fetch(Some(1)).await?.first_value())
    }

    /// Returns the single selected column of every row.
    pub async fn get_values(&self) -> Result<Vec<SqlValue>> {
        self.require_single_column("get_values")?;
        Ok(self
            .fetch(self.limit)
            .await?
            .rows()
            .into_iter()
            .filter_map(Row::into_first)
            .collect())
    }

    /// Deletes the rows of the query's table matching its WHERE conditions.
    pub async fn delete(&self) -> Result<()> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        let tables = self.from_tables()?;
        let [table] = tables.as_slice() else {
            return Err(PgFluentError::QueryShape(format!(
                "delete needs exactly one table, query has {}",
                tables.len()
            )));
        };
        if !self.having_clauses.is_empty() {
            return Err(PgFluentError::QueryShape(
                "delete can't filter on aggregates".to_string(),
            ));
        }
        let mut params = SqlParams::new();
        let sql = delete_sql(table, &self.where_clauses, &mut params)?;
        self.driver
            .execute_transaction(&sql, &params.into_values())
            .await?;
        Ok(())
    }

    fn require_single_column(&self, method: &str) -> Result<()> {
        match self.columns.as_slice() {
            [column] if !column.is_wildcard() => Ok(()),
            columns => Err(PgFluentError::QueryShape(format!(
                "{method} needs exactly one selected column, query selects {}",
                if columns.is_empty() {
                    "*".to_string()
                } else {
                    join_refs(columns)
                }
            ))),
        }
    }
}

fn join_refs(columns: &[ColumnRef]) -> String {
    columns
        .iter()
        .map(ColumnRef::sql)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Top-level entries are ANDed.
pub(crate) fn build_conditions(clauses: &[WhereClause], params: &mut SqlParams) -> String {
    WhereClause::And(clauses.to_vec()).build_sql(params)
}
