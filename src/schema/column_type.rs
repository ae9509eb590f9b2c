use std::fmt;

use crate::error::{PgFluentError, Result};

/// Number of bits in an integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntBits {
    _16,
    _32,
    _64,
}

/// Field restriction for an `interval` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntervalField {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    YearToMonth,
    DayToHour,
    DayToMinute,
    DayToSecond,
    HourToMinute,
    HourToSecond,
    MinuteToSecond,
}

impl IntervalField {
    pub fn as_sql(&self) -> &'static str {
        match self {
            IntervalField::Year => "year",
            IntervalField::Month => "month",
            IntervalField::Day => "day",
            IntervalField::Hour => "hour",
            IntervalField::Minute => "minute",
            IntervalField::Second => "second",
            IntervalField::YearToMonth => "year to month",
            IntervalField::DayToHour => "day to hour",
            IntervalField::DayToMinute => "day to minute",
            IntervalField::DayToSecond => "day to second",
            IntervalField::HourToMinute => "hour to minute",
            IntervalField::HourToSecond => "hour to second",
            IntervalField::MinuteToSecond => "minute to second",
        }
    }
}

/// SQL storage kind of a column. Write-once configuration; values are never
/// checked against it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Integer(IntBits),
    Double,
    Text,
    Boolean,
    Timestamp { with_time_zone: bool },
    /// `numeric`, optionally constrained. A scale needs a precision.
    Decimal {
        precision: Option<u32>,
        scale: Option<u32>,
    },
    Interval(Option<IntervalField>),
    Array(Box<ColumnType>),
}

impl ColumnType {
    pub const SMALLINT: ColumnType = ColumnType::Integer(IntBits::_16);
    pub const INTEGER: ColumnType = ColumnType::Integer(IntBits::_32);
    pub const BIGINT: ColumnType = ColumnType::Integer(IntBits::_64);

    pub fn array_of(element: ColumnType) -> Self {
        ColumnType::Array(Box::new(element))
    }

    /// Checks parameters the database would otherwise reject at CREATE time.
    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            ColumnType::Decimal {
                precision: None,
                scale: Some(_),
            } => Err(PgFluentError::Schema(
                "numeric scale requires a precision".to_string(),
            )),
            ColumnType::Decimal {
                precision: Some(p), ..
            } if *p == 0 || *p > 1000 => Err(PgFluentError::Schema(format!(
                "numeric precision must be between 1 and 1000, got {p}"
            ))),
            ColumnType::Decimal {
                precision: Some(p),
                scale: Some(s),
            } if s > p => Err(PgFluentError::Schema(format!(
                "numeric scale {s} exceeds precision {p}"
            ))),
            ColumnType::Array(element) if matches!(**element, ColumnType::Array(_)) => Err(
                PgFluentError::Schema("nested arrays are not supported".to_string()),
            ),
            ColumnType::Array(element) => element.validate(),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer(IntBits::_16) => f.write_str("smallint"),
            ColumnType::Integer(IntBits::_32) => f.write_str("integer"),
            ColumnType::Integer(IntBits::_64) => f.write_str("bigint"),
            ColumnType::Double => f.write_str("double precision"),
            ColumnType::Text => f.write_str("text"),
            ColumnType::Boolean => f.write_str("boolean"),
            ColumnType::Timestamp {
                with_time_zone: false,
            } => f.write_str("timestamp"),
            ColumnType::Timestamp {
                with_time_zone: true,
            } => f.write_str("timestamp with time zone"),
            ColumnType::Decimal {
                precision: Some(p),
                scale: Some(s),
            } => write!(f, "numeric({p},{s})"),
            ColumnType::Decimal {
                precision: Some(p),
                scale: None,
            } => write!(f, "numeric({p})"),
            ColumnType::Decimal { .. } => f.write_str("numeric"),
            ColumnType::Interval(None) => f.write_str("interval"),
            ColumnType::Interval(Some(field)) => write!(f, "interval {}", field.as_sql()),
            ColumnType::Array(element) => write!(f, "{element}[]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_rendering() {
        assert_eq!(ColumnType::BIGINT.to_string(), "bigint");
        assert_eq!(ColumnType::SMALLINT.to_string(), "smallint");
        assert_eq!(ColumnType::Text.to_string(), "text");
        assert_eq!(ColumnType::Boolean.to_string(), "boolean");
        assert_eq!(
            ColumnType::Timestamp {
                with_time_zone: true
            }
            .to_string(),
            "timestamp with time zone"
        );
        assert_eq!(
            ColumnType::array_of(ColumnType::Text).to_string(),
            "text[]"
        );
    }

    #[test]
    fn test_decimal_rendering() {
        let constrained = ColumnType::Decimal {
            precision: Some(10),
            scale: Some(2),
        };
        assert_eq!(constrained.to_string(), "numeric(10,2)");

        let unconstrained = ColumnType::Decimal {
            precision: None,
            scale: None,
        };
        assert_eq!(unconstrained.to_string(), "numeric");
    }

    #[test]
    fn test_interval_rendering() {
        assert_eq!(ColumnType::Interval(None).to_string(), "interval");
        assert_eq!(
            ColumnType::Interval(Some(IntervalField::DayToSecond)).to_string(),
            "interval day to second"
        );
    }

    #[test]
    fn test_decimal_validation() {
        assert!(ColumnType::Decimal {
            precision: None,
            scale: Some(2)
        }
        .validate()
        .is_err());
        assert!(ColumnType::Decimal {
            precision: Some(2),
            scale: Some(4)
        }
        .validate()
        .is_err());
        assert!(ColumnType::Decimal {
            precision: Some(12),
            scale: Some(4)
        }
        .validate()
        .is_ok());
    }

    #[test]
    fn test_nested_arrays_are_rejected() {
        let nested = ColumnType::array_of(ColumnType::array_of(ColumnType::INTEGER));
        assert!(matches!(nested.validate(), Err(PgFluentError::Schema(_))));
        assert!(ColumnType::array_of(ColumnType::Interval(None))
            .validate()
            .is_ok());
    }
}
