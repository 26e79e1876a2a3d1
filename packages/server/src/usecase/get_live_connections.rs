//! UseCase: 接続中クライアントの一覧取得

use std::sync::Arc;

use crate::domain::{ConnectionRegistry, LiveConnections};

pub struct GetLiveConnectionsUseCase {
    registry: Arc<dyn ConnectionRegistry>,
}

impl GetLiveConnectionsUseCase {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub async fn execute(&self) -> LiveConnections {
        self.registry.list_live().await
    }
}
