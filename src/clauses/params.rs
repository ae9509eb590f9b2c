use crate::types::SqlValue;

/// Collects bound values while SQL text is rendered and hands out the
/// matching `$n` placeholders. Numbering starts at 1 and only ever grows, so
/// one instance must span every clause of a statement.
#[derive(Debug, Default)]
pub struct SqlParams {
    values: Vec<SqlValue>,
}

impl SqlParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `value` and returns its placeholder.
    pub fn push(&mut self, value: SqlValue) -> String {
        self.values.push(value);
        format!("${}", self.values.len())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }
}
