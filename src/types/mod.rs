mod fields;
mod interval;
mod row;
mod sql_value;

pub use fields::Fields;
pub use interval::Interval;
pub use row::{QueryResult, RawQueryResult, Row};
pub use sql_value::SqlValue;
