/// Builds [`Fields`](crate::Fields) from keyword-style pairs.
///
/// ```
/// use pgfluent::{fields, SqlValue};
///
/// let filters = fields![guild_id = 42_i64, is_edit = false];
/// assert_eq!(filters.get("is_edit"), Some(&SqlValue::Bool(false)));
///
/// let data = fields!["type" => "fire"];
/// assert_eq!(data.len(), 1);
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        $crate::Fields::new()
    };
    ($($column:ident = $value:expr),+ $(,)?) => {
        $crate::Fields::new()$(.with(stringify!($column), $value))+
    };
    ($($column:literal => $value:expr),+ $(,)?) => {
        $crate::Fields::new()$(.with($column, $value))+
    };
}
