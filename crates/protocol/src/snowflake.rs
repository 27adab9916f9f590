use serde::{Deserialize, Deserializer, de::Error as _};
use serde_json::Value;

/// Accept a Discord snowflake sent either as a JSON string or a JSON number.
pub(crate) fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected snowflake string or number, got {other}"
        ))),
    }
}

/// A JSON list where `null` means empty.
pub(crate) fn deserialize_list<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}
