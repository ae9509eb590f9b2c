use crate::clauses::{Aggregate, Condition, SqlOperator};
use crate::types::SqlValue;

/// A reference to a column, used internally by query builders.
/// This allows storing column information without requiring the original Column type.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    /// Table the column was bound to, used to infer FROM.
    pub table: Option<String>,
    pub column: String,
    pub aggregate: Option<Aggregate>,
}

impl ColumnRef {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            table: None,
            column: column.into(),
            aggregate: None,
        }
    }

    pub fn with_table(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: column.into(),
            aggregate: None,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        self.aggregate.is_some()
    }

    /// True for a bare `*`.
    pub fn is_wildcard(&self) -> bool {
        self.aggregate.is_none() && self.column == "*"
    }

    /// Renders the reference as it appears in a select list or condition.
    pub fn sql(&self) -> String {
        match self.aggregate {
            Some(aggregate) => format!("{}({})", aggregate.function(), self.column),
            None => self.column.clone(),
        }
    }
}

impl From<&str> for ColumnRef {
    fn from(column: &str) -> Self {
        ColumnRef::new(column)
    }
}

impl From<String> for ColumnRef {
    fn from(column: String) -> Self {
        ColumnRef::new(column)
    }
}

impl From<&ColumnRef> for ColumnRef {
    fn from(column: &ColumnRef) -> Self {
        column.clone()
    }
}

/// Builds conditions against a column.
///
/// Rust comparison operators must return `bool`, so each SQL operator is an
/// explicit method instead. Implementors must not also implement `PartialEq`
/// or `PartialOrd`, whose `eq`/`lt`/... would shadow these.
pub trait ColumnExpr {
    /// Returns the reference conditions are built against.
    fn column_ref(&self) -> ColumnRef;

    fn eq(&self, value: impl Into<SqlValue>) -> Condition {
        Condition::compare(self.column_ref(), SqlOperator::Eq, value.into())
    }

    fn ne(&self, value: impl Into<SqlValue>) -> Condition {
        Condition::compare(self.column_ref(), SqlOperator::Ne, value.into())
    }

    fn lt(&self, value: impl Into<SqlValue>) -> Condition {
        Condition::compare(self.column_ref(), SqlOperator::Lt, value.into())
    }

    fn le(&self, value: impl Into<SqlValue>) -> Condition {
        Condition::compare(self.column_ref(), SqlOperator::Le, value.into())
    }

    fn gt(&self, value: impl Into<SqlValue>) -> Condition {
        Condition::compare(self.column_ref(), SqlOperator::Gt, value.into())
    }

    fn ge(&self, value: impl Into<SqlValue>) -> Condition {
        Condition::compare(self.column_ref(), SqlOperator::Ge, value.into())
    }

    /// Case-sensitive pattern match.
    fn like(&self, pattern: impl Into<SqlValue>) -> Condition {
        Condition::compare(self.column_ref(), SqlOperator::Like, pattern.into())
    }

    fn not_like(&self, pattern: impl Into<SqlValue>) -> Condition {
        Condition::compare(self.column_ref(), SqlOperator::NotLike, pattern.into())
    }

    /// Case-insensitive pattern match.
    fn ilike(&self, pattern: impl Into<SqlValue>) -> Condition {
        Condition::compare(self.column_ref(), SqlOperator::ILike, pattern.into())
    }

    fn not_ilike(&self, pattern: impl Into<SqlValue>) -> Condition {
        Condition::compare(self.column_ref(), SqlOperator::NotILike, pattern.into())
    }

    fn between(&self, min: impl Into<SqlValue>, max: impl Into<SqlValue>) -> Condition {
        Condition::between(self.column_ref(), min.into(), max.into())
    }

    fn is_in<I, V>(&self, values: I) -> Condition
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        Condition::is_in(self.column_ref(), values.into_iter().map(Into::into).collect())
    }
}
