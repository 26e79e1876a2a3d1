//! Shared helpers for building and persisting chat envelopes.

use ordertalk_shared::time::timestamp_to_rfc3339;

use crate::{
    domain::{MessageStore, NewMessage, StoredMessage, Timestamp},
    infrastructure::dto::websocket::{ChatEnvelope, MessageType},
};

/// Persist without letting a store failure stop delivery.
pub(super) async fn persist_best_effort(
    store: &dyn MessageStore,
    message: NewMessage,
) -> Option<StoredMessage> {
    match store.persist_message(message).await {
        Ok(stored) => Some(stored),
        Err(e) => {
            tracing::warn!("Failed to persist message, delivering anyway: {}", e);
            None
        }
    }
}

pub(super) fn chat_envelope(
    kind: MessageType,
    message: &NewMessage,
    stored: Option<StoredMessage>,
    now: Timestamp,
) -> ChatEnvelope {
    let timestamp = stored.map(|s| s.timestamp).unwrap_or(now);
    ChatEnvelope {
        r#type: kind,
        content: message.content.clone(),
        sender_key: message.sender_key.clone(),
        sender_name: message.sender_name.clone(),
        recipient_key: message.recipient_key.as_ref().map(|key| key.to_string()),
        message_id: stored.map(|s| s.message_id),
        timestamp: timestamp_to_rfc3339(timestamp.value()),
    }
}
