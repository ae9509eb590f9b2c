use crate::clauses::Aggregate;
use crate::error::{PgFluentError, Result};
use crate::schema::{validate_identifier, ColumnType, IntervalField, Table};
use crate::traits::{ColumnExpr, ColumnRef};
use crate::types::{Fields, SqlValue};

/// Names a table attribute, and optionally describes it for `CREATE TABLE`.
///
/// A column obtained from [`Table::column`] is bound to that table and can
/// read or write through it. Columns built with [`Column::builder`] (or one of
/// the typed shorthands) carry a type and constraints.
///
/// `Column` deliberately has no `PartialEq`: the [`ColumnExpr`] methods
/// (`eq`, `lt`, ...) build conditions. Use [`Column::equals`] to compare two
/// column definitions.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    column_type: Option<ColumnType>,
    primary_key: bool,
    required: bool,
    default: Option<String>,
    unique: bool,
    references: Option<ColumnRef>,
    table: Option<Table>,
}

impl Column {
    /// An untyped reference to a column, for queries.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: None,
            primary_key: false,
            required: false,
            default: None,
            unique: false,
            references: None,
            table: None,
        }
    }

    pub fn builder(name: impl Into<String>) -> ColumnBuilder {
        ColumnBuilder::new(name)
    }

    pub fn typed(name: impl Into<String>, column_type: ColumnType) -> ColumnBuilder {
        ColumnBuilder::new(name).column_type(column_type)
    }

    /// A `bigint` column, the type used for Discord ids.
    pub fn id(name: impl Into<String>) -> ColumnBuilder {
        Self::typed(name, ColumnType::BIGINT)
    }

    pub fn string(name: impl Into<String>) -> ColumnBuilder {
        Self::typed(name, ColumnType::Text)
    }

    pub fn integer(name: impl Into<String>) -> ColumnBuilder {
        Self::typed(name, ColumnType::INTEGER)
    }

    pub fn small_integer(name: impl Into<String>) -> ColumnBuilder {
        Self::typed(name, ColumnType::SMALLINT)
    }

    pub fn boolean(name: impl Into<String>) -> ColumnBuilder {
        Self::typed(name, ColumnType::Boolean)
    }

    pub fn timestamp(name: impl Into<String>, with_time_zone: bool) -> ColumnBuilder {
        Self::typed(name, ColumnType::Timestamp { with_time_zone })
    }

    pub fn decimal(
        name: impl Into<String>,
        precision: Option<u32>,
        scale: Option<u32>,
    ) -> ColumnBuilder {
        Self::typed(name, ColumnType::Decimal { precision, scale })
    }

    pub fn interval(name: impl Into<String>, field: Option<IntervalField>) -> ColumnBuilder {
        Self::typed(name, ColumnType::Interval(field))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> Option<&ColumnType> {
        self.column_type.as_ref()
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn default_expr(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    pub(crate) fn bind(mut self, table: Table) -> Self {
        self.table = Some(table);
        self
    }

    /// Structural equality: same name, type, constraints and owning table name.
    pub fn equals(&self, other: &Column) -> bool {
        self.name == other.name
            && self.column_type == other.column_type
            && self.primary_key == other.primary_key
            && self.required == other.required
            && self.default == other.default
            && self.unique == other.unique
            && self.references == other.references
            && self.table.as_ref().map(Table::name) == other.table.as_ref().map(Table::name)
    }

    /// Renders the column definition used by `CREATE TABLE`:
    /// `<name> <type> [DEFAULT <expr>|UNIQUE|PRIMARY KEY] [REFERENCES ...] [NOT NULL]`.
    pub fn to_sql(&self) -> Result<String> {
        self.definition_sql(self.primary_key, self.required || self.primary_key)
    }

    pub(crate) fn definition_sql(&self, inline_primary: bool, not_null: bool) -> Result<String> {
        let column_type = self.column_type.as_ref().ok_or_else(|| {
            PgFluentError::Schema(format!("column `{}` has no type", self.name))
        })?;
        let mut sql = format!("{} {}", self.name, column_type);
        if let Some(default) = &self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        } else if self.unique {
            sql.push_str(" UNIQUE");
        } else if self.primary_key && inline_primary {
            sql.push_str(" PRIMARY KEY");
        }
        if let Some(target) = &self.references {
            if let Some(table) = &target.table {
                sql.push_str(&format!(" REFERENCES {} ({})", table, target.column));
            }
        }
        if not_null {
            sql.push_str(" NOT NULL");
        }
        Ok(sql)
    }

    fn aggregate(&self, aggregate: Aggregate) -> AggregateColumn {
        AggregateColumn {
            aggregate,
            column: self.column_ref(),
        }
    }

    pub fn count(&self) -> AggregateColumn {
        self.aggregate(Aggregate::Count)
    }

    pub fn sum(&self) -> AggregateColumn {
        self.aggregate(Aggregate::Sum)
    }

    pub fn avg(&self) -> AggregateColumn {
        self.aggregate(Aggregate::Avg)
    }

    pub fn min(&self) -> AggregateColumn {
        self.aggregate(Aggregate::Min)
    }

    pub fn max(&self) -> AggregateColumn {
        self.aggregate(Aggregate::Max)
    }

    fn owning_table(&self) -> Result<&Table> {
        self.table.as_ref().ok_or_else(|| {
            PgFluentError::Schema(format!("column `{}` is not bound to a table", self.name))
        })
    }

    /// Every value of this column in rows matching `filters` and the table's active filter.
    pub async fn get(&self, filters: Fields) -> Result<Vec<SqlValue>> {
        self.owning_table()?.get_values(&self.name, filters).await
    }

    /// The value of this column in the first matching row.
    pub async fn get_first(&self, filters: Fields) -> Result<Option<SqlValue>> {
        self.owning_table()?.get_value(&self.name, filters).await
    }

    /// Upserts `value` into this column of the row selected by the table's active filter.
    pub async fn set(&self, value: impl Into<SqlValue>) -> Result<()> {
        self.owning_table()?
            .upsert(Fields::new().with(self.name.as_str(), value))
            .await
    }
}

impl ColumnExpr for Column {
    fn column_ref(&self) -> ColumnRef {
        ColumnRef {
            table: self.table.as_ref().map(|t| t.name().to_string()),
            column: self.name.clone(),
            aggregate: None,
        }
    }
}

impl From<&Column> for ColumnRef {
    fn from(column: &Column) -> Self {
        column.column_ref()
    }
}

impl From<Column> for ColumnRef {
    fn from(column: Column) -> Self {
        column.column_ref()
    }
}

/// A column wrapped in an aggregate function, e.g. `COUNT(message_id)`.
/// Conditions built from it belong in HAVING.
#[derive(Debug, Clone)]
pub struct AggregateColumn {
    aggregate: Aggregate,
    column: ColumnRef,
}

impl AggregateColumn {
    pub fn aggregate(&self) -> Aggregate {
        self.aggregate
    }

    /// Replaces the aggregate function; aggregates never nest.
    pub fn with_aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregate = aggregate;
        self
    }
}

impl ColumnExpr for AggregateColumn {
    fn column_ref(&self) -> ColumnRef {
        ColumnRef {
            aggregate: Some(self.aggregate),
            ..self.column.clone()
        }
    }
}

impl From<&AggregateColumn> for ColumnRef {
    fn from(column: &AggregateColumn) -> Self {
        column.column_ref()
    }
}

impl From<AggregateColumn> for ColumnRef {
    fn from(column: AggregateColumn) -> Self {
        column.column_ref()
    }
}

/// Builds a typed [`Column`] definition. `build` enforces that at most one of
/// primary key, unique and default is set.
#[derive(Debug, Clone)]
pub struct ColumnBuilder {
    name: String,
    column_type: Option<ColumnType>,
    primary_key: bool,
    required: bool,
    default: Option<String>,
    unique: bool,
    references: Option<ColumnRef>,
}

impl ColumnBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: None,
            primary_key: false,
            required: false,
            default: None,
            unique: false,
            references: None,
        }
    }

    pub fn column_type(mut self, column_type: ColumnType) -> Self {
        self.column_type = Some(column_type);
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Adds `NOT NULL`.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// A SQL expression (`now()`, `0`, `'en'`) written verbatim into the DDL.
    /// Never pass user input here.
    pub fn default_expr(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    /// Adds a foreign key to `target`, which must be bound to a table.
    pub fn references(mut self, target: &Column) -> Self {
        self.references = Some(target.column_ref());
        self
    }

    pub fn build(self) -> Result<Column> {
        validate_identifier("column", &self.name)?;
        let constraints = [self.primary_key, self.default.is_some(), self.unique]
            .into_iter()
            .filter(|set| *set)
            .count();
        if constraints > 1 {
            return Err(PgFluentError::Schema(format!(
                "column `{}` can set only one of primary key, default or unique",
                self.name
            )));
        }
        if let Some(column_type) = &self.column_type {
            column_type.validate()?;
        }
        if let Some(target) = &self.references {
            if target.table.is_none() {
                return Err(PgFluentError::Schema(format!(
                    "column `{}` references `{}`, which is not bound to a table",
                    self.name, target.column
                )));
            }
        }
        Ok(Column {
            name: self.name,
            column_type: self.column_type,
            primary_key: self.primary_key,
            required: self.required,
            default: self.default,
            unique: self.unique,
            references: self.references,
            table: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clauses::SqlParams;

    #[test]
    fn test_primary_key_and_unique_is_rejected() {
        let err = Column::id("team_id").primary_key().unique().build().unwrap_err();
        assert!(matches!(err, PgFluentError::Schema(msg) if msg.contains("team_id")));
    }

    #[test]
    fn test_default_and_primary_key_is_rejected() {
        assert!(Column::integer("n")
            .primary_key()
            .default_expr("0")
            .build()
            .is_err());
    }

    #[test]
    fn test_invalid_identifier_is_rejected() {
        assert!(Column::string("name; DROP TABLE users").build().is_err());
        assert!(Column::string("1st").build().is_err());
    }

    #[test]
    fn test_to_sql() {
        let id = Column::id("language_id").primary_key().build().unwrap();
        assert_eq!(id.to_sql().unwrap(), "language_id bigint PRIMARY KEY NOT NULL");

        let identifier = Column::string("identifier").required().unique().build().unwrap();
        assert_eq!(identifier.to_sql().unwrap(), "identifier text UNIQUE NOT NULL");

        let official = Column::boolean("official")
            .default_expr("false")
            .build()
            .unwrap();
        assert_eq!(official.to_sql().unwrap(), "official boolean DEFAULT false");

        let team = Column::small_integer("team").build().unwrap();
        assert_eq!(team.to_sql().unwrap(), "team smallint");
    }

    #[test]
    fn test_untyped_column_has_no_definition() {
        assert!(matches!(
            Column::new("sent").to_sql(),
            Err(PgFluentError::Schema(_))
        ));
    }

    #[test]
    fn test_references_requires_bound_target() {
        let unbound = Column::new("language_id");
        assert!(Column::id("language_id").references(&unbound).build().is_err());
    }

    #[test]
    fn test_aggregates_do_not_mutate_column() {
        let column = Column::new("message_id");
        let count = column.count();
        let sum = count.clone().with_aggregate(Aggregate::Sum);

        assert_eq!(count.column_ref().sql(), "COUNT(message_id)");
        assert_eq!(sum.column_ref().sql(), "SUM(message_id)");
        assert_eq!(column.column_ref().sql(), "message_id");
        assert!(!column.eq(1).is_aggregate());
        assert!(count.gt(1).is_aggregate());
    }

    #[test]
    fn test_condition_methods() {
        let sent = Column::new("sent");
        let mut params = SqlParams::new();
        assert_eq!(sent.lt(5_i64).build_sql(&mut params), "sent<$1");
        assert_eq!(sent.le(5_i64).build_sql(&mut params), "sent<=$2");
        assert_eq!(sent.ne(5_i64).build_sql(&mut params), "sent!=$3");
        assert_eq!(sent.like("a%").build_sql(&mut params), "sent LIKE $4");
        assert_eq!(sent.not_ilike("a%").build_sql(&mut params), "sent NOT ILIKE $5");
        assert_eq!(params.len(), 5);
    }

    #[test]
    fn test_structural_equality() {
        let a = Column::id("guild_id").required().build().unwrap();
        let b = Column::id("guild_id").required().build().unwrap();
        let c = Column::string("guild_id").build().unwrap();
        assert!(a.equals(&b));
        assert!(!a.equals(&c));
    }
}
