use std::fmt;

use crate::builders::Query;
use crate::error::{PgFluentError, Result};
use crate::interface::DatabaseInterface;
use crate::schema::Column;
use crate::traits::ColumnRef;
use crate::types::{Fields, Row, SqlValue};

/// A named relation bound to a [`DatabaseInterface`].
///
/// Besides the name, a table carries:
/// - columns queued for a `CREATE TABLE` that has not been issued yet,
/// - optional explicit primary key columns,
/// - rows to seed right after creation,
/// - an active filter that every read, write and delete is narrowed by.
#[derive(Clone)]
pub struct Table {
    name: String,
    dbi: DatabaseInterface,
    pending_columns: Vec<Column>,
    primaries: Vec<String>,
    initial_data: Vec<Fields>,
    filters: Fields,
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("pending_columns", &self.pending_columns.len())
            .field("primaries", &self.primaries)
            .field("filters", &self.filters)
            .finish_non_exhaustive()
    }
}

impl Table {
    pub(crate) fn new(name: impl Into<String>, dbi: DatabaseInterface) -> Self {
        Self {
            name: name.into(),
            dbi,
            pending_columns: Vec::new(),
            primaries: Vec::new(),
            initial_data: Vec::new(),
            filters: Fields::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pending_columns(&self) -> &[Column] {
        &self.pending_columns
    }

    /// The active filter.
    pub fn filters(&self) -> &Fields {
        &self.filters
    }

    /// Queues column definitions for [`create`](Self::create).
    pub fn with_columns(mut self, columns: impl IntoIterator<Item = Column>) -> Self {
        self.pending_columns.extend(columns);
        self
    }

    /// Sets the primary key explicitly, overriding column flags and introspection.
    pub fn with_primaries<I, S>(mut self, primaries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primaries = primaries.into_iter().map(Into::into).collect();
        self
    }

    /// Rows inserted, in one transaction, right after [`create`](Self::create).
    pub fn with_initial_data(mut self, rows: impl IntoIterator<Item = Fields>) -> Self {
        self.initial_data.extend(rows);
        self
    }

    /// Narrows the active filter. Later calls AND with earlier ones.
    pub fn where_(mut self, filters: Fields) -> Self {
        self.filters = self.filters.merged(&filters);
        self
    }

    /// A column of this table. Carries the queued definition when one exists.
    pub fn column(&self, name: &str) -> Column {
        let column = self
            .pending_columns
            .iter()
            .find(|c| c.name() == name)
            .cloned()
            .unwrap_or_else(|| Column::new(name));
        column.bind(self.clone())
    }

    /// Starts a query against this table, narrowed by the active filter.
    pub fn query<I, C>(&self, columns: I) -> Query
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnRef>,
    {
        self.dbi
            .query()
            .table([self.name.as_str()])
            .select(columns)
            .where_(self.filters.clone())
    }

    pub async fn get(&self, columns: &[&str], filters: Fields) -> Result<Vec<Row>> {
        self.dbi
            .get(&self.name, columns, self.filters.merged(&filters))
            .await
    }

    pub async fn get_first(&self, columns: &[&str], filters: Fields) -> Result<Option<Row>> {
        self.dbi
            .get_first(&self.name, columns, self.filters.merged(&filters))
            .await
    }

    pub async fn get_value(&self, column: &str, filters: Fields) -> Result<Option<SqlValue>> {
        self.dbi
            .get_value(&self.name, column, self.filters.merged(&filters))
            .await
    }

    pub async fn get_values(&self, column: &str, filters: Fields) -> Result<Vec<SqlValue>> {
        self.dbi
            .get_values(&self.name, column, self.filters.merged(&filters))
            .await
    }

    pub async fn insert(&self, data: Fields) -> Result<()> {
        self.dbi
            .insert(&self.name, self.filters.merged(&data))
            .await
    }

    pub async fn insert_many(&self, rows: impl IntoIterator<Item = Fields>) -> Result<()> {
        let rows: Vec<Fields> = rows
            .into_iter()
            .map(|row| self.filters.merged(&row))
            .collect();
        self.dbi.insert_many(&self.name, &rows).await
    }

    /// Inserts `data`, or updates every non-key column of the row it conflicts with.
    pub async fn upsert(&self, data: Fields) -> Result<()> {
        let primaries = self.resolve_primaries().await?;
        self.dbi
            .upsert(&self.name, &primaries, self.filters.merged(&data))
            .await
    }

    pub async fn delete(&self, filters: Fields) -> Result<()> {
        self.dbi
            .delete(&self.name, self.filters.merged(&filters))
            .await
    }

    /// Issues `CREATE TABLE` for the queued columns, seeds the initial data
    /// and clears the queue.
    pub async fn create(&mut self) -> Result<()> {
        if self.pending_columns.is_empty() {
            return Err(PgFluentError::Schema(format!(
                "table `{}` has no columns to create",
                self.name
            )));
        }
        self.dbi
            .create_table(&self.name, &self.pending_columns, &self.primaries)
            .await?;
        if !self.initial_data.is_empty() {
            self.dbi.insert_many(&self.name, &self.initial_data).await?;
        }
        if self.primaries.is_empty() {
            self.primaries = primary_columns(&self.pending_columns);
        }
        self.pending_columns.clear();
        self.initial_data.clear();
        Ok(())
    }

    /// Creates the table unless the catalog already has it. Returns whether it was created.
    pub async fn create_if_missing(&mut self) -> Result<bool> {
        if self.exists().await? {
            self.pending_columns.clear();
            self.initial_data.clear();
            return Ok(false);
        }
        self.create().await?;
        Ok(true)
    }

    pub async fn exists(&self) -> Result<bool> {
        self.dbi.table_exists(&self.name).await
    }

    pub async fn drop_table(&self) -> Result<()> {
        self.dbi.drop_table(&self.name).await
    }

    async fn resolve_primaries(&self) -> Result<Vec<String>> {
        if !self.primaries.is_empty() {
            return Ok(self.primaries.clone());
        }
        let flagged = primary_columns(&self.pending_columns);
        if !flagged.is_empty() {
            return Ok(flagged);
        }
        let introspected = self.dbi.primary_keys(&self.name).await?;
        if introspected.is_empty() {
            return Err(PgFluentError::Schema(format!(
                "upsert on `{}` requires a primary key",
                self.name
            )));
        }
        Ok(introspected)
    }
}

fn primary_columns(columns: &[Column]) -> Vec<String> {
    columns
        .iter()
        .filter(|c| c.is_primary_key())
        .map(|c| c.name().to_string())
        .collect()
}
