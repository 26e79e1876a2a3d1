//! Shared application state.

use std::sync::Arc;

use ordertalk_shared::time::Clock;

use crate::{
    domain::{ConnectionRegistry, MessageStore},
    usecase::{
        AuthenticateClientUseCase, ConnectClientUseCase, DisconnectClientUseCase,
        GetLiveConnectionsUseCase, GetMessageHistoryUseCase, RelayMessageUseCase,
        SendMessageUseCase,
    },
};

/// Shared application state
pub struct AppState {
    /// AuthenticateClientUseCase（ロール別チャンネルの認証）。未設定なら /ws/user, /ws/admin は拒否
    pub authenticate_client_usecase: Option<Arc<AuthenticateClientUseCase>>,
    /// ConnectClientUseCase（クライアント接続のユースケース）
    pub connect_client_usecase: Arc<ConnectClientUseCase>,
    /// DisconnectClientUseCase（クライアント切断のユースケース）
    pub disconnect_client_usecase: Arc<DisconnectClientUseCase>,
    /// RelayMessageUseCase（受信フレーム配送のユースケース）
    pub relay_message_usecase: Arc<RelayMessageUseCase>,
    /// SendMessageUseCase（HTTP 経由の送信のユースケース）
    pub send_message_usecase: Arc<SendMessageUseCase>,
    /// GetLiveConnectionsUseCase（接続一覧取得のユースケース）
    pub get_live_connections_usecase: Arc<GetLiveConnectionsUseCase>,
    /// GetMessageHistoryUseCase（履歴取得のユースケース）
    pub get_message_history_usecase: Arc<GetMessageHistoryUseCase>,
}

impl AppState {
    /// Wire every usecase over one registry and one message store.
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        store: Arc<dyn MessageStore>,
        clock: Arc<dyn Clock>,
        authenticate_client_usecase: Option<Arc<AuthenticateClientUseCase>>,
    ) -> Self {
        Self {
            authenticate_client_usecase,
            connect_client_usecase: Arc::new(ConnectClientUseCase::new(
                registry.clone(),
                clock.clone(),
            )),
            disconnect_client_usecase: Arc::new(DisconnectClientUseCase::new(
                registry.clone(),
                clock.clone(),
            )),
            relay_message_usecase: Arc::new(RelayMessageUseCase::new(
                registry.clone(),
                store.clone(),
                clock.clone(),
            )),
            send_message_usecase: Arc::new(SendMessageUseCase::new(
                registry.clone(),
                store.clone(),
                clock,
            )),
            get_live_connections_usecase: Arc::new(GetLiveConnectionsUseCase::new(registry)),
            get_message_history_usecase: Arc::new(GetMessageHistoryUseCase::new(store)),
        }
    }
}
