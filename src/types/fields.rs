use crate::types::SqlValue;

/// An ordered set of `column = value` pairs.
///
/// Used both as equality filters (`WHERE a=$1 AND b=$2`) and as row data for
/// inserts and upserts. Setting a column twice keeps its first position and
/// replaces the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    entries: Vec<(String, SqlValue)>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces `column`, returning the updated set.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.set(column, value);
        self
    }

    /// Adds or replaces `column` in place.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
    }

    /// Returns a new set holding `self` overlaid with `other`; `other` wins on conflicts.
    pub fn merged(&self, other: &Fields) -> Fields {
        let mut merged = self.clone();
        for (column, value) in other.iter() {
            merged.set(column.as_str(), value.clone());
        }
        merged
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.entries
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &SqlValue> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, SqlValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Fields
where
    K: Into<String>,
    V: Into<SqlValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (column, value) in iter {
            fields.set(column, value);
        }
        fields
    }
}

impl IntoIterator for Fields {
    type Item = (String, SqlValue);
    type IntoIter = std::vec::IntoIter<(String, SqlValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_in_place() {
        let fields = Fields::new()
            .with("guild_id", 1_i64)
            .with("prefix", "!")
            .with("guild_id", 2_i64);

        assert_eq!(fields.columns().collect::<Vec<_>>(), vec!["guild_id", "prefix"]);
        assert_eq!(fields.get("guild_id"), Some(&SqlValue::Int64(2)));
    }

    #[test]
    fn test_merged_prefers_other() {
        let active = Fields::new().with("trainer_id", 5_i64).with("team", 1_i32);
        let data = Fields::new().with("team", 2_i32).with("silph_id", "abc");
        let merged = active.merged(&data);

        assert_eq!(
            merged.columns().collect::<Vec<_>>(),
            vec!["trainer_id", "team", "silph_id"]
        );
        assert_eq!(merged.get("team"), Some(&SqlValue::Int32(2)));
        assert_eq!(active.len(), 2);
    }
}
