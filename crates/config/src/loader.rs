use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, info},
};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::CourierConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "courier.toml",
    "courier.yaml",
    "courier.yml",
    "courier.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<CourierConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations, then apply env
/// overrides.
///
/// Search order:
/// 1. `./courier.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/courier/courier.{toml,yaml,yml,json}` (user-global)
///
/// No config file at all yields the defaults; a file that exists but does
/// not parse is an error.
pub fn discover_and_load() -> Result<CourierConfig> {
    let mut config = match find_config_file() {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            load_config(&path)?
        },
        None => {
            debug!("no config file found, using defaults");
            CourierConfig::default()
        },
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Overlay well-known environment variables onto `config`.
pub fn apply_env_overrides(config: &mut CourierConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

fn apply_env_overrides_with(config: &mut CourierConfig, lookup: impl Fn(&str) -> Option<String>) {
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(token) = var("DISCORD_APP_TOKEN") {
        config.discord.token = Secret::new(token);
    }
    if let Some(key) = var("OPENAI_API_KEY") {
        config.ai.api_key = Secret::new(key);
    }
    if let Some(url) = var("NATS_URL") {
        config.broker.url = url;
    }
    if let Some(url) = var("DATABASE_URL") {
        config.storage.database_url = url;
    }
    if let Some(dir) = var("COURIER_COMMANDS_DIR") {
        config.commands.dir = PathBuf::from(dir);
    }
    if let Some(dir) = var("COURIER_LOCALES_DIR") {
        config.locales.dir = PathBuf::from(dir);
    }
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dirs = directories::ProjectDirs::from("", "", "courier")?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dirs.config_dir().join(name))
        .find(|p| p.exists())
}

fn parse_config(raw: &str, path: &Path) -> Result<CourierConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse(path, e)),
        _ => Err(Error::UnsupportedFormat(ext.to_string())),
    }
}
