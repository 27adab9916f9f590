//! Configuration loading, env substitution, env overrides, and validation.
//!
//! Config files: `courier.toml`, `courier.yaml`, or `courier.json`,
//! searched in `./` then `~/.config/courier/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values; well-known
//! variables (`DISCORD_APP_TOKEN`, `OPENAI_API_KEY`, `NATS_URL`,
//! `DATABASE_URL`, ...) override file values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, discover_and_load, load_config},
    schema::{
        AiConfig, BrokerConfig, CommandsConfig, CourierConfig, DiscordConfig, DmPolicy,
        HandlerSet, LocalesConfig, StorageConfig,
    },
    validate::{Diagnostic, Role, Severity, ValidationResult, validate},
};
