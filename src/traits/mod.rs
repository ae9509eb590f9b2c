mod column;
mod driver;
mod table;

pub use column::{ColumnExpr, ColumnRef};
pub use driver::{DatabaseDriver, PreparedStatement};
pub use table::TableDefinition;
