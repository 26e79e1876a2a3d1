//! MessageStore trait 定義
//!
//! チャット履歴の永続化インターフェース。リレーは結果を待たずに配送を続けるため、
//! 永続化の失敗は配送を妨げません。

use async_trait::async_trait;

use super::{ClientKey, MessageStoreError, Timestamp};

/// A chat message to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub content: String,
    pub sender_key: Option<String>,
    pub sender_name: String,
    pub recipient_key: Option<ClientKey>,
    pub broadcast: bool,
}

/// What the store assigned to a persisted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredMessage {
    pub message_id: u64,
    pub timestamp: Timestamp,
}

/// A persisted chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub id: u64,
    pub content: String,
    pub sender_key: Option<String>,
    pub sender_name: String,
    pub recipient_key: Option<ClientKey>,
    pub is_broadcast: bool,
    pub timestamp: Timestamp,
}

/// History query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    /// Messages sent by this key plus every broadcast.
    pub client_key: Option<String>,
    /// Only broadcasts; takes precedence over `client_key`.
    pub broadcast_only: bool,
}

impl HistoryFilter {
    pub fn matches(&self, record: &MessageRecord) -> bool {
        if self.broadcast_only {
            return record.is_broadcast;
        }
        match &self.client_key {
            Some(key) => record.is_broadcast || record.sender_key.as_deref() == Some(key),
            None => true,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn persist_message(&self, message: NewMessage) -> Result<StoredMessage, MessageStoreError>;

    /// Matching records, newest first.
    async fn history(&self, filter: HistoryFilter) -> Vec<MessageRecord>;
}
