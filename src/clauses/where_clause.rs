use crate::clauses::{Condition, SqlParams};
use crate::error::{PgFluentError, Result};
use crate::traits::ColumnRef;
use crate::types::Fields;

/// A tree of conditions.
/// Leaves are single conditions; inner nodes combine children with AND or OR.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereClause {
    Condition(Condition),
    And(Vec<WhereClause>),
    Or(Vec<WhereClause>),
}

/// How the conditions inside a clause use aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AggregateUse {
    None,
    All,
    Mixed,
}

impl WhereClause {
    /// Combines every clause with AND.
    pub fn all<I, C>(clauses: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<WhereClause>,
    {
        WhereClause::And(clauses.into_iter().map(Into::into).collect())
    }

    /// Combines every clause with OR.
    pub fn any<I, C>(clauses: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<WhereClause>,
    {
        WhereClause::Or(clauses.into_iter().map(Into::into).collect())
    }

    /// Combines this clause with another using AND
    pub fn and(self, other: impl Into<WhereClause>) -> Self {
        match (self, other.into()) {
            (WhereClause::And(mut left), WhereClause::And(right)) => {
                left.extend(right);
                WhereClause::And(left)
            }
            (WhereClause::And(mut left), right) => {
                left.push(right);
                WhereClause::And(left)
            }
            (left, right) => WhereClause::And(vec![left, right]),
        }
    }

    /// Combines this clause with another using OR
    pub fn or(self, other: impl Into<WhereClause>) -> Self {
        match (self, other.into()) {
            (WhereClause::Or(mut left), WhereClause::Or(right)) => {
                left.extend(right);
                WhereClause::Or(left)
            }
            (WhereClause::Or(mut left), right) => {
                left.push(right);
                WhereClause::Or(left)
            }
            (left, right) => WhereClause::Or(vec![left, right]),
        }
    }

    /// True for a group with no conditions in it; such groups render nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            WhereClause::Condition(_) => false,
            WhereClause::And(children) | WhereClause::Or(children) => {
                children.iter().all(WhereClause::is_empty)
            }
        }
    }

    pub(crate) fn aggregate_use(&self) -> AggregateUse {
        match self {
            WhereClause::Condition(c) if c.is_aggregate() => AggregateUse::All,
            WhereClause::Condition(_) => AggregateUse::None,
            WhereClause::And(children) | WhereClause::Or(children) => {
                let mut uses = children
                    .iter()
                    .filter(|c| !c.is_empty())
                    .map(WhereClause::aggregate_use);
                let Some(first) = uses.next() else {
                    return AggregateUse::None;
                };
                uses.fold(first, |acc, u| if acc == u { acc } else { AggregateUse::Mixed })
            }
        }
    }

    /// Splits this clause into the parts a WHERE clause can evaluate and the
    /// parts that need HAVING. AND groups are split member by member; an OR
    /// group must sit entirely on one side.
    pub(crate) fn classify(
        self,
        where_clauses: &mut Vec<WhereClause>,
        having_clauses: &mut Vec<WhereClause>,
    ) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        match self {
            WhereClause::And(children) => {
                for child in children {
                    child.classify(where_clauses, having_clauses)?;
                }
                Ok(())
            }
            clause => match clause.aggregate_use() {
                AggregateUse::None => {
                    where_clauses.push(clause);
                    Ok(())
                }
                AggregateUse::All => {
                    having_clauses.push(clause);
                    Ok(())
                }
                AggregateUse::Mixed => Err(PgFluentError::Schema(
                    "HAVING can't be an OR condition: aggregate and plain conditions \
                     are mixed in one OR group"
                        .to_string(),
                )),
            },
        }
    }

    /// Builds the SQL string and collects parameters.
    /// Placeholders continue from however many values `params` already holds.
    pub fn build_sql(&self, params: &mut SqlParams) -> String {
        match self {
            WhereClause::Condition(condition) => condition.build_sql(params),
            WhereClause::And(children) => {
                let parts = Self::build_children(children, params);
                match parts.len() {
                    0 => "TRUE".to_string(),
                    _ => parts.join(" AND "),
                }
            }
            WhereClause::Or(children) => {
                let parts = Self::build_children(children, params);
                match parts.len() {
                    0 => "FALSE".to_string(),
                    1 => parts.into_iter().collect(),
                    _ => format!("({})", parts.join(" OR ")),
                }
            }
        }
    }

    fn build_children(children: &[WhereClause], params: &mut SqlParams) -> Vec<String> {
        children
            .iter()
            .filter(|c| !c.is_empty())
            .map(|child| match child {
                WhereClause::And(grand) if grand.iter().filter(|c| !c.is_empty()).count() > 1 => {
                    format!("({})", child.build_sql(params))
                }
                _ => child.build_sql(params),
            })
            .collect()
    }
}

impl From<Condition> for WhereClause {
    fn from(condition: Condition) -> Self {
        WhereClause::Condition(condition)
    }
}

/// Each field becomes an equality condition; all of them are ANDed.
impl From<Fields> for WhereClause {
    fn from(fields: Fields) -> Self {
        let mut conditions: Vec<WhereClause> = fields
            .into_iter()
            .map(|(column, value)| {
                WhereClause::Condition(Condition::compare(
                    ColumnRef::new(column),
                    crate::clauses::SqlOperator::Eq,
                    value,
                ))
            })
            .collect();
        match conditions.len() {
            1 => conditions.remove(0),
            _ => WhereClause::And(conditions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clauses::{Aggregate, SqlOperator};
    use crate::types::SqlValue;

    fn eq(column: &str, value: impl Into<SqlValue>) -> Condition {
        Condition::compare(ColumnRef::new(column), SqlOperator::Eq, value.into())
    }

    fn count_gt(column: &str, value: i64) -> Condition {
        let mut column = ColumnRef::new(column);
        column.aggregate = Some(Aggregate::Count);
        Condition::compare(column, SqlOperator::Gt, value.into())
    }

    fn render(clause: &WhereClause) -> (String, Vec<SqlValue>) {
        let mut params = SqlParams::new();
        let sql = clause.build_sql(&mut params);
        (sql, params.into_values())
    }

    #[test]
    fn test_eq_clause() {
        let clause = WhereClause::from(eq("name", "John"));
        let (sql, params) = render(&clause);

        assert_eq!(sql, "name=$1");
        assert_eq!(params, vec![SqlValue::Text("John".to_string())]);
    }

    #[test]
    fn test_and_clause() {
        let clause = WhereClause::from(eq("name", "John")).and(eq("age", 30));
        let (sql, params) = render(&clause);

        assert_eq!(sql, "name=$1 AND age=$2");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_or_inside_and_is_parenthesized() {
        let clause = WhereClause::from(eq("guild_id", 1_i64))
            .and(WhereClause::from(eq("team", "valor")).or(eq("team", "mystic")));
        assert_eq!(
            render(&clause).0,
            "guild_id=$1 AND (team=$2 OR team=$3)"
        );
    }

    #[test]
    fn test_and_inside_or_is_parenthesized() {
        let clause = WhereClause::any([
            WhereClause::from(eq("a", 1)),
            WhereClause::all([eq("b", 2), eq("c", 3)]),
        ]);
        assert_eq!(render(&clause).0, "(a=$1 OR (b=$2 AND c=$3))");
    }

    #[test]
    fn test_fields_expand_to_equalities() {
        let fields = Fields::new().with("guild_id", 7_i64).with("is_edit", false);
        let (sql, params) = render(&WhereClause::from(fields));
        assert_eq!(sql, "guild_id=$1 AND is_edit=$2");
        assert_eq!(params, vec![SqlValue::Int64(7), SqlValue::Bool(false)]);

        assert!(WhereClause::from(Fields::new()).is_empty());
    }

    #[test]
    fn test_classify_splits_and_groups() {
        let mut wheres = Vec::new();
        let mut havings = Vec::new();
        WhereClause::all([eq("guild_id", 1_i64), count_gt("message_id", 10)])
            .classify(&mut wheres, &mut havings)
            .unwrap();

        assert_eq!(wheres, vec![WhereClause::from(eq("guild_id", 1_i64))]);
        assert_eq!(havings, vec![WhereClause::from(count_gt("message_id", 10))]);
    }

    #[test]
    fn test_classify_rejects_mixed_or_group() {
        let mut wheres = Vec::new();
        let mut havings = Vec::new();
        let err = WhereClause::any([eq("guild_id", 1_i64), count_gt("message_id", 10)])
            .classify(&mut wheres, &mut havings)
            .unwrap_err();

        assert!(matches!(err, PgFluentError::Schema(msg) if msg.contains("HAVING can't be an OR")));
        assert!(wheres.is_empty());
        assert!(havings.is_empty());
    }

    #[test]
    fn test_classify_sends_aggregate_or_group_to_having() {
        let mut wheres = Vec::new();
        let mut havings = Vec::new();
        WhereClause::any([count_gt("message_id", 10), count_gt("author_id", 3)])
            .classify(&mut wheres, &mut havings)
            .unwrap();
        assert!(wheres.is_empty());
        assert_eq!(havings.len(), 1);
    }
}
