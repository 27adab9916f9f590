use {
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

use crate::snowflake;

/// Envelope types understood by [`decode`].
const KNOWN_TYPES: &[&str] = &[
    "message_create",
    "interaction_handle",
    "send_message",
    "start_typing",
    "interaction_reply",
];

/// A broker message.
///
/// Serialized flat as `{"type": ..., ...fields}`. Per-type fields are
/// optional here; the consumer of each type decides which of them it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// A triggering chat message plus recent channel history.
    MessageCreate {
        #[serde(
            default,
            deserialize_with = "snowflake::deserialize_opt",
            skip_serializing_if = "Option::is_none"
        )]
        channel_id: Option<String>,
        #[serde(default, deserialize_with = "snowflake::deserialize_list")]
        messages: Vec<Value>,
    },
    /// A slash command invocation, forwarded verbatim.
    InteractionHandle {
        #[serde(default)]
        interaction: Value,
    },
    /// Post text to a channel.
    SendMessage {
        #[serde(
            default,
            deserialize_with = "snowflake::deserialize_opt",
            skip_serializing_if = "Option::is_none"
        )]
        channel_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
    /// Show the typing indicator in a channel.
    StartTyping {
        #[serde(
            default,
            deserialize_with = "snowflake::deserialize_opt",
            skip_serializing_if = "Option::is_none"
        )]
        channel_id: Option<String>,
    },
    /// Finish a deferred interaction.
    InteractionReply {
        #[serde(
            default,
            deserialize_with = "snowflake::deserialize_opt",
            skip_serializing_if = "Option::is_none"
        )]
        interaction_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(
            default,
            deserialize_with = "snowflake::deserialize_list",
            skip_serializing_if = "Vec::is_empty"
        )]
        embeds: Vec<Value>,
    },
}

impl Envelope {
    pub fn send_message(channel_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::SendMessage {
            channel_id: Some(channel_id.into()),
            content: Some(content.into()),
        }
    }

    pub fn start_typing(channel_id: impl Into<String>) -> Self {
        Self::StartTyping {
            channel_id: Some(channel_id.into()),
        }
    }

    pub fn interaction_reply(interaction_id: Option<String>, content: impl Into<String>) -> Self {
        Self::InteractionReply {
            interaction_id,
            content: Some(content.into()),
            embeds: Vec::new(),
        }
    }

    /// Wire name of this envelope's `type`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MessageCreate { .. } => "message_create",
            Self::InteractionHandle { .. } => "interaction_handle",
            Self::SendMessage { .. } => "send_message",
            Self::StartTyping { .. } => "start_typing",
            Self::InteractionReply { .. } => "interaction_reply",
        }
    }
}

/// Why a broker payload could not be turned into an [`Envelope`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Not JSON, or a known type whose fields have the wrong shape.
    #[error("malformed envelope payload: {0}")]
    MalformedPayload(#[source] serde_json::Error),

    /// No non-empty string `type` field.
    #[error("envelope has no type")]
    MissingType,

    /// A `type` this protocol does not define.
    #[error("unknown envelope type: {0}")]
    UnknownType(String),
}

/// Serialize an envelope to UTF-8 JSON bytes.
pub fn encode(envelope: &Envelope) -> Vec<u8> {
    // Strings and JSON values only, so serialization cannot fail.
    serde_json::to_vec(envelope).unwrap_or_default()
}

/// Parse broker bytes into an envelope.
pub fn decode(bytes: &[u8]) -> Result<Envelope, DecodeError> {
    let value: Value = serde_json::from_slice(bytes).map_err(DecodeError::MalformedPayload)?;
    let kind = match value.get("type") {
        Some(Value::String(kind)) if !kind.is_empty() => kind.as_str(),
        _ => return Err(DecodeError::MissingType),
    };
    if !KNOWN_TYPES.contains(&kind) {
        return Err(DecodeError::UnknownType(kind.to_string()));
    }
    serde_json::from_value(value).map_err(DecodeError::MalformedPayload)
}
