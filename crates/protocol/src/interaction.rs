use {serde::Deserialize, serde_json::Value};

use crate::snowflake;

/// Typed view over the raw interaction JSON carried by `interaction_handle`.
///
/// Only the fields the workers read are modelled; everything else in the
/// payload is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InteractionRecord {
    #[serde(deserialize_with = "snowflake::deserialize_opt")]
    pub id: Option<String>,
    #[serde(deserialize_with = "snowflake::deserialize_opt")]
    pub guild_id: Option<String>,
    #[serde(deserialize_with = "snowflake::deserialize_opt")]
    pub channel_id: Option<String>,
    /// Invoking user's client locale, e.g. `en-US`.
    pub locale: Option<String>,
    pub data: InteractionData,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InteractionData {
    pub name: Option<String>,
    pub options: Vec<InteractionOption>,
}

/// One slash command option as Discord sends it: `{name, type, value}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InteractionOption {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<u8>,
    pub value: Option<Value>,
}

impl InteractionRecord {
    pub fn from_value(value: &Value) -> serde_json::Result<Self> {
        Self::deserialize(value)
    }

    pub fn command_name(&self) -> Option<&str> {
        self.data.name.as_deref().filter(|name| !name.is_empty())
    }

    /// Interactions without a guild come from direct messages.
    pub fn is_dm(&self) -> bool {
        self.guild_id.as_deref().is_none_or(str::is_empty)
    }

    fn option(&self, name: &str) -> Option<&Value> {
        self.data
            .options
            .iter()
            .find(|opt| opt.name == name)
            .and_then(|opt| opt.value.as_ref())
    }

    /// String or snowflake option value.
    pub fn option_str(&self, name: &str) -> Option<String> {
        match self.option(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn option_bool(&self, name: &str) -> Option<bool> {
        self.option(name)?.as_bool()
    }
}
