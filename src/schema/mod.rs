mod column;
mod column_type;
pub mod core_tables;
mod table;

pub use column::{AggregateColumn, Column, ColumnBuilder};
pub use column_type::{ColumnType, IntBits, IntervalField};
pub use table::Table;

use crate::error::{PgFluentError, Result};

/// Identifiers are interpolated into SQL text, so schema definitions only
/// accept plain names. A table name may carry one `schema.` prefix.
pub(crate) fn validate_identifier(kind: &str, name: &str) -> Result<()> {
    let parts: Vec<&str> = name.split('.').collect();
    let valid = parts.len() <= 2
        && parts.iter().all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if valid && (kind == "table" || parts.len() == 1) {
        Ok(())
    } else {
        Err(PgFluentError::Schema(format!("invalid {kind} name `{name}`")))
    }
}

/// The relation name without any schema prefix, used to name constraints.
pub(crate) fn unqualified(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}
