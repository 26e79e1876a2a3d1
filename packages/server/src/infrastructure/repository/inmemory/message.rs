//! インメモリの MessageStore 実装
//!
//! チャット履歴を容量付きのリングバッファに保持します。容量に達すると
//! 最も古いメッセージから捨てられます。ID は破棄とは無関係に単調増加します。

use std::{collections::VecDeque, sync::Arc};

use async_trait::async_trait;
use ordertalk_shared::time::Clock;
use tokio::sync::Mutex;

use crate::domain::{
    HistoryFilter, MessageRecord, MessageStore, MessageStoreError, NewMessage, StoredMessage,
    Timestamp,
};

#[derive(Default)]
struct StoreState {
    records: VecDeque<MessageRecord>,
    next_id: u64,
}

pub struct InMemoryMessageStore {
    state: Mutex<StoreState>,
    capacity: usize,
    clock: Arc<dyn Clock>,
}

impl InMemoryMessageStore {
    pub const DEFAULT_CAPACITY: usize = 1000;

    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY, clock)
    }

    pub fn with_capacity(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            capacity: capacity.max(1),
            clock,
        }
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn persist_message(&self, message: NewMessage) -> Result<StoredMessage, MessageStoreError> {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let stored = StoredMessage {
            message_id: state.next_id,
            timestamp: Timestamp::new(self.clock.now_millis()),
        };

        if state.records.len() >= self.capacity {
            if let Some(evicted) = state.records.pop_front() {
                tracing::trace!("History full, evicted message {}", evicted.id);
            }
        }
        state.records.push_back(MessageRecord {
            id: stored.message_id,
            content: message.content,
            sender_key: message.sender_key,
            sender_name: message.sender_name,
            recipient_key: message.recipient_key,
            is_broadcast: message.broadcast,
            timestamp: stored.timestamp,
        });

        Ok(stored)
    }

    async fn history(&self, filter: HistoryFilter) -> Vec<MessageRecord> {
        let state = self.state.lock().await;
        state
            .records
            .iter()
            .rev()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect()
    }
}
