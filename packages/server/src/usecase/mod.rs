//! UseCase 層: チャットセッションプロトコルの各ステップ
//!
//! - 認証（ロール別チャンネルのみ）
//! - 接続（connection_status の送信、登録、client_joined の通知）
//! - 受信フレームの分類と配送
//! - 切断（登録解除、client_left の通知）
//! - HTTP からの送信と参照

mod authenticate_client;
mod connect_client;
mod disconnect_client;
mod envelope;
mod error;
mod get_live_connections;
mod get_message_history;
mod peer;
mod relay_message;
mod send_message;

pub use authenticate_client::AuthenticateClientUseCase;
pub use connect_client::ConnectClientUseCase;
pub use disconnect_client::DisconnectClientUseCase;
pub use error::{SendMessageError, SessionError};
pub use get_live_connections::GetLiveConnectionsUseCase;
pub use get_message_history::GetMessageHistoryUseCase;
pub use peer::{ChannelScope, SessionPeer};
pub use relay_message::{RelayMessageUseCase, RelayOutcome};
pub use send_message::{SendMessageCommand, SendMessageReport, SendMessageUseCase};
