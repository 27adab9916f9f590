/// Config schema types (discord, broker, storage, ai, commands, locales).
use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
};

/// Token value shipped in the sample `.env`; treated as unset.
pub const PLACEHOLDER_TOKEN: &str = "your_discord_bot_token_here";

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CourierConfig {
    pub discord: DiscordConfig,
    pub broker: BrokerConfig,
    pub storage: StorageConfig,
    pub ai: AiConfig,
    pub commands: CommandsConfig,
    pub locales: LocalesConfig,
}

/// Direct-message access policy for chat messages.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DmPolicy {
    /// Every DM to the bot is forwarded, mentioned or not.
    Open,
    /// DMs are never forwarded.
    #[default]
    Disabled,
}

/// Discord gateway settings (bridge only).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token. Overridden by `DISCORD_APP_TOKEN`.
    pub token: Secret<String>,
    pub dm_policy: DmPolicy,
    /// How many recent messages accompany a forwarded chat message.
    pub history_limit: u8,
    /// Register every command descriptor as a global slash command on ready.
    pub register_commands: bool,
    /// Presence text shown under the bot's name.
    pub activity: Option<String>,
    /// Deferred interactions older than this are answered with a timeout.
    pub pending_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            dm_policy: DmPolicy::default(),
            history_limit: 100,
            register_commands: true,
            activity: Some("AI Language Model".into()),
            // Discord interaction tokens expire after 15 minutes.
            pending_ttl_secs: 840,
            sweep_interval_secs: 30,
        }
    }
}

impl DiscordConfig {
    /// The token, unless it is empty or still the sample placeholder.
    pub fn usable_token(&self) -> Option<&str> {
        let token = self.token.expose_secret().trim();
        (!is_unset(token) && token != PLACEHOLDER_TOKEN).then_some(token)
    }
}

/// Empty, or an `${ENV_VAR}` placeholder whose variable was not set.
pub(crate) fn is_unset(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || (value.starts_with("${") && value.ends_with('}'))
}

/// Message broker connection and queue names.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// NATS server URL. Overridden by `NATS_URL`.
    pub url: String,
    /// Queue the workers consume.
    pub inbox_queue: String,
    /// Queue the bridge consumes (worker replies).
    pub reply_queue: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: "nats://127.0.0.1:4222".into(),
            inbox_queue: "inbox".into(),
            reply_queue: "discord".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// sqlx connection string. Overridden by `DATABASE_URL`.
    pub database_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://courier.db?mode=rwc".into(),
        }
    }
}

/// AI completion backend (worker only).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// When false the worker runs without a completion backend and the
    /// API key is not required.
    pub enabled: bool,
    /// Overridden by `OPENAI_API_KEY`.
    pub api_key: Secret<String>,
    pub model: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: Secret::new(String::new()),
            model: "gpt-4o-mini".into(),
        }
    }
}

/// Which command handlers a worker registers.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HandlerSet {
    /// `help` only.
    Minimal,
    /// Every built-in command.
    #[default]
    Full,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    /// Directory of command descriptor JSON files.
    pub dir: PathBuf,
    pub handler_set: HandlerSet,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("commands"),
            handler_set: HandlerSet::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalesConfig {
    /// Directory of `<locale>.json` files.
    pub dir: PathBuf,
    /// Locale used when the requested one lacks a key.
    pub default_locale: String,
}

impl Default for LocalesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("locales"),
            default_locale: "en-US".into(),
        }
    }
}
