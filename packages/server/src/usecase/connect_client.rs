//! UseCase: クライアント接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectClientUseCase::execute() メソッド
//! - connection_status の返信、レジストリへの登録、client_joined の通知
//!
//! ### どのような状況を想定しているか
//! - 正常系：キー付き接続（他の参加者に通知される）
//! - 正常系：匿名接続（通知なし）
//! - エッジケース：同じキーでの再接続（古い接続は追い出される）

use std::sync::Arc;

use ordertalk_shared::time::{Clock, timestamp_to_rfc3339};

use crate::{
    domain::ConnectionRegistry,
    infrastructure::dto::websocket::{ConnectionStatusMessage, MessageType, PresenceMessage},
};

use super::{SessionError, SessionPeer};

/// クライアント接続のユースケース
pub struct ConnectClientUseCase {
    registry: Arc<dyn ConnectionRegistry>,
    clock: Arc<dyn Clock>,
}

impl ConnectClientUseCase {
    pub fn new(registry: Arc<dyn ConnectionRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self { registry, clock }
    }

    /// 接続を実行
    ///
    /// connection_status はレジストリ登録より前に積まれるため、
    /// 他の参加者からのメッセージより先にクライアントへ届く。
    pub async fn execute(&self, peer: &SessionPeer) -> Result<(), SessionError> {
        // 1. connection_status を本人に返信
        let status = ConnectionStatusMessage::connected(
            peer.key().map(|key| key.to_string()),
            peer.name().to_string(),
        );
        if !peer.reply(serde_json::to_string(&status)?) {
            tracing::debug!("{} went away before connection_status was queued", peer);
        }

        // 2. レジストリに登録（同じキーの古い接続は追い出される）
        if let Some(evicted) = self.registry.register(peer.to_connection()).await {
            tracing::info!("{} replaced connection {}", peer, evicted);
        }

        // 3. キー付きなら他の参加者に client_joined を通知
        if let Some(key) = peer.key() {
            let joined = PresenceMessage {
                r#type: MessageType::ClientJoined,
                client_key: key.to_string(),
                client_name: peer.name().to_string(),
                timestamp: timestamp_to_rfc3339(self.clock.now_millis()),
            };
            let recipients = self
                .registry
                .broadcast(&serde_json::to_string(&joined)?, Some(key))
                .await;
            tracing::info!("Broadcasted client_joined for {} ({} live)", peer, recipients);
        }

        Ok(())
    }
}
