//! Per-guild settings persisted in SQLite.
//!
//! Every write is an upsert or an idempotent delete, so replaying a command
//! after a broker redelivery leaves the same state behind.

pub mod error;
pub mod guild_settings;

use {
    sqlx::{SqlitePool, sqlite::SqlitePoolOptions},
    tracing::info,
};

pub use {
    error::{Error, Result},
    guild_settings::{GuildSettings, GuildSettingsStore, SqliteGuildSettingsStore},
};

/// Open a connection pool and run migrations.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect(database_url)
        .await?;
    run_migrations(&pool).await?;
    info!("storage ready");
    Ok(pool)
}

/// Run database migrations for the storage crate.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
