use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;

use super::Interval;

/// Represents a SQL parameter or result value in a driver-agnostic way.
/// Drivers are responsible for converting these to and from their native types.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Decimal(Decimal),
    Text(String),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Interval(Interval),
    TextArray(Vec<String>),
    Int64Array(Vec<i64>),
    /// Any other one-dimensional array. Elements may be `Null`.
    Array(Vec<SqlValue>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Integer value widened to `i64`, if this is any integer variant.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int16(v) => Some(i64::from(*v)),
            SqlValue::Int32(v) => Some(i64::from(*v)),
            SqlValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Float64(v) => Some(*v),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Bool(_) => "bool",
            SqlValue::Int16(_) => "int16",
            SqlValue::Int32(_) => "int32",
            SqlValue::Int64(_) => "int64",
            SqlValue::Float64(_) => "float64",
            SqlValue::Decimal(_) => "decimal",
            SqlValue::Text(_) => "text",
            SqlValue::Timestamp(_) => "timestamp",
            SqlValue::TimestampTz(_) => "timestamptz",
            SqlValue::Interval(_) => "interval",
            SqlValue::TextArray(_) => "text[]",
            SqlValue::Int64Array(_) => "int64[]",
            SqlValue::Array(_) => "array",
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<&String> for SqlValue {
    fn from(value: &String) -> Self {
        SqlValue::Text(value.clone())
    }
}

impl From<i16> for SqlValue {
    fn from(value: i16) -> Self {
        SqlValue::Int16(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int32(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int64(value)
    }
}

// Discord snowflakes arrive as u64 but always fit in a signed bigint.
impl From<u64> for SqlValue {
    fn from(value: u64) -> Self {
        SqlValue::Int64(value as i64)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float64(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<Decimal> for SqlValue {
    fn from(value: Decimal) -> Self {
        SqlValue::Decimal(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        SqlValue::Timestamp(value)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        SqlValue::TimestampTz(value)
    }
}

impl From<Interval> for SqlValue {
    fn from(value: Interval) -> Self {
        SqlValue::Interval(value)
    }
}

impl From<Vec<String>> for SqlValue {
    fn from(value: Vec<String>) -> Self {
        SqlValue::TextArray(value)
    }
}

impl From<Vec<&str>> for SqlValue {
    fn from(value: Vec<&str>) -> Self {
        SqlValue::TextArray(value.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<i64>> for SqlValue {
    fn from(value: Vec<i64>) -> Self {
        SqlValue::Int64Array(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => SqlValue::Null,
        }
    }
}
