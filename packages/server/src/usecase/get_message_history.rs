//! UseCase: チャット履歴の取得

use std::sync::Arc;

use crate::domain::{HistoryFilter, MessageRecord, MessageStore};

pub struct GetMessageHistoryUseCase {
    store: Arc<dyn MessageStore>,
}

impl GetMessageHistoryUseCase {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    /// 新しい順に返す
    pub async fn execute(&self, filter: HistoryFilter) -> Vec<MessageRecord> {
        self.store.history(filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MockMessageStore, Timestamp};
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_passes_filter_to_store() {
        // テスト項目: フィルタがそのままストアに渡され、結果が返される
        // given (前提条件):
        let filter = HistoryFilter {
            client_key: Some("user_1".to_string()),
            broadcast_only: false,
        };
        let record = MessageRecord {
            id: 3,
            content: "hi".to_string(),
            sender_key: Some("user_1".to_string()),
            sender_name: "alice".to_string(),
            recipient_key: None,
            is_broadcast: true,
            timestamp: Timestamp::new(1_000),
        };
        let mut store = MockMessageStore::new();
        let returned = vec![record.clone()];
        store
            .expect_history()
            .with(eq(filter.clone()))
            .times(1)
            .returning(move |_| returned.clone());
        let usecase = GetMessageHistoryUseCase::new(Arc::new(store));

        // when (操作):
        let history = usecase.execute(filter).await;

        // then (期待する結果):
        assert_eq!(history, vec![record]);
    }
}
