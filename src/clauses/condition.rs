use crate::clauses::SqlParams;
use crate::traits::ColumnRef;
use crate::types::SqlValue;

/// SQL aggregate functions a column reference can be wrapped in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aggregate {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl Aggregate {
    pub fn function(&self) -> &'static str {
        match self {
            Aggregate::Count => "COUNT",
            Aggregate::Sum => "SUM",
            Aggregate::Avg => "AVG",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
        }
    }
}

/// The operators a [`Condition`] may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlOperator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    NotLike,
    ILike,
    NotILike,
    Between,
    In,
}

impl SqlOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SqlOperator::Eq => "=",
            SqlOperator::Ne => "!=",
            SqlOperator::Lt => "<",
            SqlOperator::Le => "<=",
            SqlOperator::Gt => ">",
            SqlOperator::Ge => ">=",
            SqlOperator::Like => "LIKE",
            SqlOperator::NotLike => "NOT LIKE",
            SqlOperator::ILike => "ILIKE",
            SqlOperator::NotILike => "NOT ILIKE",
            SqlOperator::Between => "BETWEEN",
            SqlOperator::In => "IN",
        }
    }
}

/// The right-hand side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Compared or pattern-matched against a single value.
    Value(SqlOperator, SqlValue),
    /// `BETWEEN min AND max`
    Range(SqlValue, SqlValue),
    /// `IN (...)`
    Set(Vec<SqlValue>),
}

/// A single predicate on a column. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    column: ColumnRef,
    operand: Operand,
}

impl Condition {
    pub(crate) fn compare(column: ColumnRef, operator: SqlOperator, value: SqlValue) -> Self {
        Self {
            column,
            operand: Operand::Value(operator, value),
        }
    }

    pub(crate) fn between(column: ColumnRef, min: SqlValue, max: SqlValue) -> Self {
        Self {
            column,
            operand: Operand::Range(min, max),
        }
    }

    pub(crate) fn is_in(column: ColumnRef, values: Vec<SqlValue>) -> Self {
        Self {
            column,
            operand: Operand::Set(values),
        }
    }

    pub fn column(&self) -> &ColumnRef {
        &self.column
    }

    pub fn operator(&self) -> SqlOperator {
        match &self.operand {
            Operand::Value(op, _) => *op,
            Operand::Range(..) => SqlOperator::Between,
            Operand::Set(_) => SqlOperator::In,
        }
    }

    pub fn operand(&self) -> &Operand {
        &self.operand
    }

    /// Aggregate conditions can only be evaluated in a HAVING clause.
    pub fn is_aggregate(&self) -> bool {
        self.column.is_aggregate()
    }

    /// Renders the predicate, binding every value through `params`.
    pub fn build_sql(&self, params: &mut SqlParams) -> String {
        let column = self.column.sql();
        match &self.operand {
            Operand::Value(SqlOperator::Eq, SqlValue::Null) => format!("{column} IS NULL"),
            Operand::Value(SqlOperator::Ne, SqlValue::Null) => format!("{column} IS NOT NULL"),
            Operand::Value(op, value) => {
                let placeholder = params.push(value.clone());
                match op {
                    SqlOperator::Like
                    | SqlOperator::NotLike
                    | SqlOperator::ILike
                    | SqlOperator::NotILike => {
                        format!("{column} {} {placeholder}", op.as_sql())
                    }
                    _ => format!("{column}{}{placeholder}", op.as_sql()),
                }
            }
            Operand::Range(min, max) => {
                let min = params.push(min.clone());
                let max = params.push(max.clone());
                format!("{column} BETWEEN {min} AND {max}")
            }
            Operand::Set(values) if values.is_empty() => "FALSE".to_string(),
            Operand::Set(values) => {
                let placeholders: Vec<String> =
                    values.iter().map(|v| params.push(v.clone())).collect();
                format!("{column} IN ({})", placeholders.join(", "))
            }
        }
    }
}
