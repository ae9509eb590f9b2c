use crate::error::Result;
use crate::interface::DatabaseInterface;
use crate::schema::core_tables::{GuildConfigTable, PrefixTable};
use crate::traits::TableDefinition;
use crate::types::Fields;

/// Prefix and settings of one guild.
#[derive(Debug, Clone)]
pub struct GuildData {
    dbi: DatabaseInterface,
    guild_id: i64,
}

impl GuildData {
    pub(crate) fn new(dbi: DatabaseInterface, guild_id: i64) -> Self {
        Self { dbi, guild_id }
    }

    pub fn guild_id(&self) -> i64 {
        self.guild_id
    }

    fn guild_filter(&self) -> Fields {
        Fields::new().with("guild_id", self.guild_id)
    }

    /// The custom prefix, or `None` when the guild uses the default.
    pub async fn prefix(&self) -> Result<Option<String>> {
        self.dbi.guild_prefix(self.guild_id).await
    }

    pub async fn set_prefix(&self, prefix: &str) -> Result<()> {
        self.dbi
            .upsert(
                PrefixTable::table_name(),
                &["guild_id"],
                self.guild_filter().with("prefix", prefix),
            )
            .await
    }

    /// Drops the custom prefix so the default applies again.
    pub async fn reset_prefix(&self) -> Result<()> {
        self.dbi
            .delete(PrefixTable::table_name(), self.guild_filter())
            .await
    }

    pub async fn setting(&self, name: &str) -> Result<Option<String>> {
        self.dbi.guild_setting(self.guild_id, name).await
    }

    pub async fn set_setting(&self, name: &str, value: &str) -> Result<()> {
        self.dbi
            .upsert(
                GuildConfigTable::table_name(),
                &GuildConfigTable::primaries(),
                self.guild_filter()
                    .with("config_name", name)
                    .with("config_value", value),
            )
            .await
    }

    pub async fn remove_setting(&self, name: &str) -> Result<()> {
        self.dbi
            .delete(
                GuildConfigTable::table_name(),
                self.guild_filter().with("config_name", name),
            )
            .await
    }
}
