use crate::error::Result;
use crate::schema::Column;
use crate::types::Fields;

/// A table declared in code.
/// `DatabaseInterface::define` turns an implementation into a [`Table`](crate::Table)
/// with its columns queued for creation.
pub trait TableDefinition {
    /// Returns the table name as it appears in the database.
    fn table_name() -> &'static str;

    /// Returns the schema name, if any.
    fn schema() -> Option<&'static str> {
        None
    }

    /// Returns the fully qualified table name (schema.table or just table).
    fn qualified_name() -> String {
        match Self::schema() {
            Some(schema) => format!("{}.{}", schema, Self::table_name()),
            None => Self::table_name().to_string(),
        }
    }

    /// Column definitions, in creation order.
    fn columns() -> Result<Vec<Column>>;

    /// Primary key columns. Empty means "whichever columns are flagged primary".
    fn primaries() -> Vec<&'static str> {
        Vec::new()
    }

    /// Rows inserted right after the table is created.
    fn initial_data() -> Vec<Fields> {
        Vec::new()
    }
}
