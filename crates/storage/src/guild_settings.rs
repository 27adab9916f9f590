use {async_trait::async_trait, sqlx::SqlitePool};

use crate::Result;

/// Bot settings for one guild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuildSettings {
    pub guild_id: String,
    /// Channel where the bot answers every message.
    pub dedicated_channel_id: Option<String>,
    /// Roles allowed to talk to the bot, ordered by id.
    pub allowed_roles: Vec<String>,
    pub updated_at: Option<i64>,
}

#[async_trait]
pub trait GuildSettingsStore: Send + Sync {
    /// Settings for `guild_id`; an unknown guild yields empty settings.
    async fn get(&self, guild_id: &str) -> Result<GuildSettings>;

    /// Set or clear (`None`) the dedicated channel.
    async fn set_dedicated_channel(&self, guild_id: &str, channel_id: Option<&str>)
    -> Result<()>;

    /// Add (`allowed = true`) or remove a role from the allowlist.
    async fn set_role_allowed(&self, guild_id: &str, role_id: &str, allowed: bool) -> Result<()>;
}

#[derive(sqlx::FromRow)]
struct SettingsRow {
    dedicated_channel_id: Option<String>,
    updated_at: i64,
}

/// SQLite-backed guild settings.
pub struct SqliteGuildSettingsStore {
    pool: SqlitePool,
}

impl SqliteGuildSettingsStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[async_trait]
impl GuildSettingsStore for SqliteGuildSettingsStore {
    async fn get(&self, guild_id: &str) -> Result<GuildSettings> {
        let row = sqlx::query_as::<_, SettingsRow>(
            "SELECT dedicated_channel_id, updated_at FROM guild_settings WHERE guild_id = ?",
        )
        .bind(guild_id)
        .fetch_optional(&self.pool)
        .await?;

        let allowed_roles: Vec<String> = sqlx::query_scalar(
            "SELECT role_id FROM guild_allowed_roles WHERE guild_id = ? ORDER BY role_id",
        )
        .bind(guild_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(GuildSettings {
            guild_id: guild_id.to_string(),
            dedicated_channel_id: row.as_ref().and_then(|r| r.dedicated_channel_id.clone()),
            allowed_roles,
            updated_at: row.map(|r| r.updated_at),
        })
    }

    async fn set_dedicated_channel(
        &self,
        guild_id: &str,
        channel_id: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO guild_settings (guild_id, dedicated_channel_id, updated_at)
             VALUES (?, ?, ?)
             ON CONFLICT(guild_id) DO UPDATE SET
                dedicated_channel_id = excluded.dedicated_channel_id,
                updated_at = excluded.updated_at",
        )
        .bind(guild_id)
        .bind(channel_id)
        .bind(now_secs())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_role_allowed(&self, guild_id: &str, role_id: &str, allowed: bool) -> Result<()> {
        let now = now_secs();
        if allowed {
            sqlx::query(
                "INSERT INTO guild_allowed_roles (guild_id, role_id, created_at)
                 VALUES (?, ?, ?)
                 ON CONFLICT(guild_id, role_id) DO NOTHING",
            )
            .bind(guild_id)
            .bind(role_id)
            .bind(now)
            .execute(&self.pool)
            .await?;
        } else {
            sqlx::query("DELETE FROM guild_allowed_roles WHERE guild_id = ? AND role_id = ?")
                .bind(guild_id)
                .bind(role_id)
                .execute(&self.pool)
                .await?;
        }

        // Touch the settings row so `updated_at` reflects role changes too.
        sqlx::query(
            "INSERT INTO guild_settings (guild_id, dedicated_channel_id, updated_at)
             VALUES (?, NULL, ?)
             ON CONFLICT(guild_id) DO UPDATE SET updated_at = excluded.updated_at",
        )
        .bind(guild_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
