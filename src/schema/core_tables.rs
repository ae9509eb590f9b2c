//! Tables the interface itself depends on. Both back a [`PreparedStatement`](crate::PreparedStatement).

use crate::error::Result;
use crate::schema::Column;
use crate::traits::TableDefinition;

/// Per-guild command prefix.
pub struct PrefixTable;

impl TableDefinition for PrefixTable {
    fn table_name() -> &'static str {
        "prefix"
    }

    fn columns() -> Result<Vec<Column>> {
        Ok(vec![
            Column::id("guild_id").primary_key().build()?,
            Column::string("prefix").required().build()?,
        ])
    }
}

/// Per-guild key/value settings.
pub struct GuildConfigTable;

impl TableDefinition for GuildConfigTable {
    fn table_name() -> &'static str {
        "guild_config"
    }

    fn columns() -> Result<Vec<Column>> {
        Ok(vec![
            Column::id("guild_id").required().build()?,
            Column::string("config_name").required().build()?,
            Column::string("config_value").required().build()?,
        ])
    }

    fn primaries() -> Vec<&'static str> {
        vec!["guild_id", "config_name"]
    }
}
