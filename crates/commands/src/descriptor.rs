//! Slash command descriptors, one JSON file per command.

use std::path::{Path, PathBuf};

use {
    serde::{Deserialize, Deserializer, de},
    serde_json::{Map, Value},
    tracing::{debug, info},
};

use crate::error::{Error, Result};

/// A slash command as declared in `commands/<name>.json`.
///
/// Fields other than the ones below are Discord command fields passed through
/// verbatim at registration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommandDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub options: Vec<Value>,
    /// Permission bitmask required to see the command.
    #[serde(default, deserialize_with = "deserialize_perms")]
    pub perms: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn deserialize_perms<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid permission bitmask {n}"))),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid permission bitmask '{s}'"))),
        Some(other) => Err(de::Error::custom(format!(
            "permission bitmask must be a number or string, got {other}"
        ))),
    }
}

impl CommandDescriptor {
    /// Registration payload: the descriptor without `perms`, which becomes
    /// `default_member_permissions` (a decimal string, as Discord expects).
    pub fn manifest(&self) -> Value {
        let mut map = self.extra.clone();
        map.insert("name".into(), Value::String(self.name.clone()));
        map.insert(
            "description".into(),
            Value::String(self.description.clone()),
        );
        if !self.options.is_empty() {
            map.insert("options".into(), Value::Array(self.options.clone()));
        }
        if let Some(perms) = self.perms {
            map.insert(
                "default_member_permissions".into(),
                Value::String(perms.to_string()),
            );
        }
        Value::Object(map)
    }
}

/// Load every `*.json` descriptor in `dir`, ordered by file name.
///
/// Any problem is fatal: a missing directory, no descriptor files, or a file
/// that cannot be read or parsed.
pub fn load_commands(dir: &Path) -> Result<Vec<CommandDescriptor>> {
    if !dir.is_dir() {
        return Err(Error::MissingDir {
            path: dir.to_path_buf(),
        });
    }

    let files = json_files(dir)?;
    if files.is_empty() {
        return Err(Error::NoCommands {
            path: dir.to_path_buf(),
        });
    }

    let mut commands = Vec::with_capacity(files.len());
    for path in files {
        let raw = std::fs::read(&path).map_err(|source| Error::Read {
            path: path.clone(),
            source,
        })?;
        let command: CommandDescriptor = serde_json::from_slice(&raw)
            .map_err(|source| Error::InvalidJson {
                path: path.clone(),
                source,
            })?;
        debug!(name = %command.name, path = %path.display(), "loaded command");
        commands.push(command);
    }

    info!(count = commands.len(), dir = %dir.display(), "commands loaded");
    Ok(commands)
}

/// `*.json` files directly under `dir`, sorted by name.
pub(crate) fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|source| Error::Read {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}
