//! UseCase: HTTP からのメッセージ送信
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - client_id 指定時は宛先のみ、未指定時は全員への配送
//!
//! ### どのような状況を想定しているか
//! - 正常系：宛先指定（接続中 / 未接続）
//! - 正常系：ブロードキャスト
//! - 異常系：空の content、不正な client_id

use std::sync::Arc;

use ordertalk_shared::time::Clock;

use crate::{
    domain::{ClientKey, ConnectionRegistry, MessageStore, NewMessage, Timestamp},
    infrastructure::dto::websocket::MessageType,
};

use super::{
    SendMessageError,
    envelope::{chat_envelope, persist_best_effort},
};

/// Sender key recorded when the HTTP caller gives no name.
const ANONYMOUS_SENDER: &str = "anonymous";
const DEFAULT_SENDER_NAME: &str = "Anonymous";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendMessageCommand {
    pub content: String,
    pub sender_name: Option<String>,
    /// Target client key; `None` broadcasts.
    pub recipient: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendMessageReport {
    Direct {
        delivered: bool,
        message_id: Option<u64>,
    },
    Broadcast {
        recipients: usize,
        message_id: Option<u64>,
    },
}

/// HTTP 経由のメッセージ送信のユースケース
pub struct SendMessageUseCase {
    registry: Arc<dyn ConnectionRegistry>,
    store: Arc<dyn MessageStore>,
    clock: Arc<dyn Clock>,
}

impl SendMessageUseCase {
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        store: Arc<dyn MessageStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            store,
            clock,
        }
    }

    pub async fn execute(
        &self,
        command: SendMessageCommand,
    ) -> Result<SendMessageReport, SendMessageError> {
        if command.content.trim().is_empty() {
            return Err(SendMessageError::EmptyContent);
        }
        let recipient = command
            .recipient
            .filter(|recipient| !recipient.trim().is_empty())
            .map(ClientKey::new)
            .transpose()?;
        let sender_name = command
            .sender_name
            .filter(|name| !name.trim().is_empty());

        let message = NewMessage {
            content: command.content,
            sender_key: Some(
                sender_name
                    .clone()
                    .unwrap_or_else(|| ANONYMOUS_SENDER.to_string()),
            ),
            sender_name: sender_name.unwrap_or_else(|| DEFAULT_SENDER_NAME.to_string()),
            broadcast: recipient.is_none(),
            recipient_key: recipient.clone(),
        };
        let stored = persist_best_effort(self.store.as_ref(), message.clone()).await;
        let message_id = stored.map(|s| s.message_id);
        let now = Timestamp::new(self.clock.now_millis());

        match recipient {
            Some(recipient) => {
                let envelope = chat_envelope(MessageType::DirectMessage, &message, stored, now);
                let delivered = self
                    .registry
                    .send_to(&recipient, &serde_json::to_string(&envelope)?)
                    .await;
                tracing::info!(
                    "HTTP message to '{}' (delivered: {})",
                    recipient,
                    delivered
                );
                Ok(SendMessageReport::Direct {
                    delivered,
                    message_id,
                })
            }
            None => {
                let envelope = chat_envelope(MessageType::Broadcast, &message, stored, now);
                let recipients = self
                    .registry
                    .broadcast(&serde_json::to_string(&envelope)?, None)
                    .await;
                tracing::info!("HTTP broadcast to {} live connections", recipients);
                Ok(SendMessageReport::Broadcast {
                    recipients,
                    message_id,
                })
            }
        }
    }
}
