mod condition;
mod params;
mod where_clause;

pub use condition::{Aggregate, Condition, Operand, SqlOperator};
pub use params::SqlParams;
pub use where_clause::WhereClause;
