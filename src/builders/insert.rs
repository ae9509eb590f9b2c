use crate::clauses::SqlParams;
use crate::error::{PgFluentError, Result};
use crate::types::{Fields, SqlValue};

/// Renders `INSERT INTO <table> (<cols>) VALUES ($1, ...)` for one row.
pub(crate) fn insert_sql(table: &str, data: &Fields) -> Result<(String, Vec<SqlValue>)> {
    if data.is_empty() {
        return Err(PgFluentError::Schema(format!(
            "insert into `{table}` needs at least one column"
        )));
    }
    let mut params = SqlParams::new();
    let placeholders: Vec<String> = data.values().map(|v| params.push(v.clone())).collect();
    let sql = format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        data.columns().collect::<Vec<_>>().join(", "),
        placeholders.join(", ")
    );
    Ok((sql, params.into_values()))
}

/// Renders the insert with an `ON CONFLICT (<primaries>)` clause that updates
/// every non-key column from `excluded`. When every column is a key there is
/// nothing to update and the conflict is ignored.
pub(crate) fn upsert_sql<P: AsRef<str>>(
    table: &str,
    primaries: &[P],
    data: &Fields,
) -> Result<(String, Vec<SqlValue>)> {
    if primaries.is_empty() {
        return Err(PgFluentError::Schema(format!(
            "upsert on `{table}` requires a primary key"
        )));
    }
    let primaries: Vec<&str> = primaries.iter().map(AsRef::as_ref).collect();
    if let Some(missing) = primaries.iter().find(|p| data.get(p).is_none()) {
        return Err(PgFluentError::Schema(format!(
            "upsert on `{table}` is missing primary key column `{missing}`"
        )));
    }

    let (mut sql, params) = insert_sql(table, data)?;
    let updates: Vec<String> = data
        .columns()
        .filter(|c| !primaries.contains(c))
        .map(|c| format!("{c}=excluded.{c}"))
        .collect();

    sql.push_str(&format!(" ON CONFLICT ({})", primaries.join(", ")));
    if updates.is_empty() {
        sql.push_str(" DO NOTHING");
    } else {
        sql.push_str(" DO UPDATE SET ");
        sql.push_str(&updates.join(", "));
    }
    Ok((sql, params))
}
