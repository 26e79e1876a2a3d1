//! WebSocket envelope DTOs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Envelope `type` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    ConnectionStatus,
    ClientJoined,
    ClientLeft,
    DirectMessage,
    Broadcast,
    AdminMessage,
    /// Plain-text frame relayed verbatim.
    Message,
    Ping,
    Pong,
    Error,
}

/// Sent to a client right after its connection is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStatusMessage {
    pub r#type: MessageType,
    pub status: String,
    pub client_key: Option<String>,
    pub client_name: String,
}

impl ConnectionStatusMessage {
    pub fn connected(client_key: Option<String>, client_name: String) -> Self {
        Self {
            r#type: MessageType::ConnectionStatus,
            status: "connected".to_string(),
            client_key,
            client_name,
        }
    }
}

/// `client_joined` / `client_left` notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceMessage {
    pub r#type: MessageType,
    pub client_key: String,
    pub client_name: String,
    pub timestamp: String,
}

/// Chat envelope delivered to recipients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEnvelope {
    pub r#type: MessageType,
    pub content: String,
    pub sender_key: Option<String>,
    pub sender_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<u64>,
    pub timestamp: String,
}

/// Liveness probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingMessage {
    pub r#type: MessageType,
}

impl PingMessage {
    pub fn new() -> Self {
        Self {
            r#type: MessageType::Ping,
        }
    }
}

impl Default for PingMessage {
    fn default() -> Self {
        Self::new()
    }
}

/// In-band error reported to the sender; the connection stays open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub r#type: MessageType,
    pub detail: String,
}

impl ErrorMessage {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            r#type: MessageType::Error,
            detail: detail.into(),
        }
    }
}

/// Recipient field of an inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundRecipient {
    Key(String),
    /// Present but not a string, e.g. `"recipient_key": 1`.
    Invalid(Value),
}

/// Frame received from a client.
///
/// Fields are read leniently from any JSON object: a wrongly typed `type` or
/// `content` is tolerated, a wrongly typed recipient is kept as
/// [`InboundRecipient::Invalid`] so it can be rejected. `recipient_key` wins
/// over its older alias `recipient_id`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InboundFrame {
    pub kind: Option<String>,
    pub content: Option<String>,
    pub recipient: Option<InboundRecipient>,
}

impl InboundFrame {
    /// `None` when `text` is not a JSON object; such frames are relayed as plain text.
    pub fn parse(text: &str) -> Option<Self> {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(fields)) => Some(Self::from_fields(&fields)),
            _ => None,
        }
    }

    fn from_fields(fields: &Map<String, Value>) -> Self {
        let kind = fields
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string);
        let content = match fields.get("content") {
            None | Some(Value::Null) => None,
            Some(Value::String(content)) => Some(content.clone()),
            Some(other) => Some(other.to_string()),
        };
        let recipient = ["recipient_key", "recipient_id"]
            .iter()
            .filter_map(|name| fields.get(*name))
            .find(|value| !value.is_null())
            .map(|value| match value {
                Value::String(key) => InboundRecipient::Key(key.clone()),
                other => InboundRecipient::Invalid(other.clone()),
            });

        Self {
            kind,
            content,
            recipient,
        }
    }

    /// `pong` replies to our pings (and client-initiated `ping`s) only refresh liveness.
    pub fn is_liveness_ack(&self) -> bool {
        matches!(self.kind.as_deref(), Some("pong") | Some("ping"))
    }

    /// Non-empty content, if any.
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref().filter(|content| !content.is_empty())
    }

    /// Recipient, if any; an empty string counts as none.
    pub fn recipient(&self) -> Option<&InboundRecipient> {
        self.recipient
            .as_ref()
            .filter(|recipient| !matches!(recipient, InboundRecipient::Key(key) if key.is_empty()))
    }
}
