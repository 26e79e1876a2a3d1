//! UseCase: クライアント切断処理
//!
//! 切断はベストエフォート: 通知の失敗は記録するだけで、登録解除は必ず行う。

use std::sync::Arc;

use ordertalk_shared::time::{Clock, timestamp_to_rfc3339};

use crate::{
    domain::ConnectionRegistry,
    infrastructure::dto::websocket::{MessageType, PresenceMessage},
};

use super::SessionPeer;

/// クライアント切断のユースケース
pub struct DisconnectClientUseCase {
    registry: Arc<dyn ConnectionRegistry>,
    clock: Arc<dyn Clock>,
}

impl DisconnectClientUseCase {
    pub fn new(registry: Arc<dyn ConnectionRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self { registry, clock }
    }

    /// 切断を実行
    ///
    /// # Returns
    ///
    /// レジストリから実際に削除した場合 `true`。既に追い出されていた場合
    /// （同じキーで再接続された等）は `false` で、client_left は送られない。
    pub async fn execute(&self, peer: &SessionPeer) -> bool {
        let removed = self
            .registry
            .unregister(peer.connection_id(), peer.key())
            .await;
        if !removed {
            tracing::debug!("{} was no longer registered", peer);
            return false;
        }
        tracing::info!("{} disconnected and removed from registry", peer);

        let Some(key) = peer.key() else {
            return true;
        };
        let left = PresenceMessage {
            r#type: MessageType::ClientLeft,
            client_key: key.to_string(),
            client_name: peer.name().to_string(),
            timestamp: timestamp_to_rfc3339(self.clock.now_millis()),
        };
        match serde_json::to_string(&left) {
            Ok(payload) => {
                let recipients = self.registry.broadcast(&payload, None).await;
                tracing::info!("Broadcasted client_left for {} ({} live)", peer, recipients);
            }
            Err(e) => tracing::warn!("Failed to encode client_left for {}: {}", peer, e),
        }

        true
    }
}
