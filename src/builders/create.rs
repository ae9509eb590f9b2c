use crate::error::{PgFluentError, Result};
use crate::schema::{unqualified, validate_identifier, Column};

/// Renders `CREATE TABLE` for `columns`.
///
/// The primary key is `primaries` when given, otherwise every column flagged
/// as a primary key. It is emitted as a named table constraint rather than
/// inline, and each of its columns is `NOT NULL`.
pub(crate) fn create_table_sql<P: AsRef<str>>(
    table: &str,
    columns: &[Column],
    primaries: &[P],
) -> Result<String> {
    validate_identifier("table", table)?;
    if columns.is_empty() {
        return Err(PgFluentError::Schema(format!(
            "table `{table}` has no columns to create"
        )));
    }

    let primaries: Vec<&str> = if primaries.is_empty() {
        columns
            .iter()
            .filter(|c| c.is_primary_key())
            .map(Column::name)
            .collect()
    } else {
        primaries.iter().map(AsRef::as_ref).collect()
    };
    if let Some(missing) = primaries
        .iter()
        .find(|p| !columns.iter().any(|c| c.name() == **p))
    {
        return Err(PgFluentError::Schema(format!(
            "primary key column `{missing}` is not defined on `{table}`"
        )));
    }

    let mut definitions = columns
        .iter()
        .map(|c| {
            let not_null = c.is_required() || primaries.contains(&c.name());
            c.definition_sql(false, not_null)
        })
        .collect::<Result<Vec<_>>>()?;
    if !primaries.is_empty() {
        definitions.push(format!(
            "CONSTRAINT {}_pkey PRIMARY KEY ({})",
            unqualified(table),
            primaries.join(", ")
        ));
    }

    Ok(format!("CREATE TABLE {table} ({})", definitions.join(", ")))
}
