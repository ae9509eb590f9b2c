use crate::builders::query::build_conditions;
use crate::clauses::{SqlParams, WhereClause};
use crate::error::{PgFluentError, Result};

/// Renders `DELETE FROM <table> WHERE ...`.
///
/// A delete with no conditions would empty the table, so it is refused.
pub(crate) fn delete_sql(
    table: &str,
    clauses: &[WhereClause],
    params: &mut SqlParams,
) -> Result<String> {
    if clauses.iter().all(WhereClause::is_empty) {
        return Err(PgFluentError::QueryShape(format!(
            "refusing to delete from `{table}` without filters"
        )));
    }
    Ok(format!(
        "DELETE FROM {table} WHERE {}",
        build_conditions(clauses, params)
    ))
}
