//! WebSocket connection handlers.
//!
//! One task per connection: the session future reads frames, and a spawned
//! pusher task owns the socket sink and drains the connection's channel.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use serde::Deserialize;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    domain::{AuthError, ClientKey, OutboundFrame, Role, close_code},
    ui::state::AppState,
    usecase::SessionPeer,
};

/// How long a finished session waits for its writer to flush a final close.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Query parameters for `/ws`
#[derive(Debug, Default, Deserialize)]
pub struct OpenChannelQuery {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Query parameters for `/ws/user` and `/ws/admin`
#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// `GET /ws`: unauthenticated, optionally keyed.
pub async fn open_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<OpenChannelQuery>,
) -> Result<Response, StatusCode> {
    let key = match query.client_id.filter(|id| !id.trim().is_empty()) {
        Some(raw) => match ClientKey::new(raw) {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::warn!("Rejected client_id: {}", e);
                return Err(StatusCode::BAD_REQUEST);
            }
        },
        None => None,
    };
    let name = query.name;

    Ok(ws.on_upgrade(move |socket| async move {
        let (tx, rx) = mpsc::unbounded_channel();
        let peer = SessionPeer::open(key, name, tx);
        run_session(socket, state, peer, rx).await;
    }))
}

/// `GET /ws/user`
pub async fn user_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<TokenQuery>,
) -> Response {
    let token = bearer_token(&headers).or(query.token);
    ws.on_upgrade(move |socket| authenticated_session(socket, state, Role::User, token))
        .into_response()
}

/// `GET /ws/admin`
pub async fn admin_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<TokenQuery>,
) -> Response {
    let token = bearer_token(&headers).or(query.token);
    ws.on_upgrade(move |socket| authenticated_session(socket, state, Role::Admin, token))
        .into_response()
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Authenticate, then run the session. A failed credential closes the socket
/// with 1008 before anything is registered.
async fn authenticated_session(
    mut socket: WebSocket,
    state: Arc<AppState>,
    role: Role,
    token: Option<String>,
) {
    let Some(authenticate) = state.authenticate_client_usecase.clone() else {
        tracing::warn!("Rejected {} connection: {}", role, AuthError::Disabled);
        reject(&mut socket, "authentication is not configured").await;
        return;
    };

    match authenticate.execute(token.as_deref(), role).await {
        Ok(identity) => {
            let (tx, rx) = mpsc::unbounded_channel();
            let peer = SessionPeer::authenticated(&identity, tx);
            tracing::info!("Authenticated {} as {}", role, peer);
            run_session(socket, state, peer, rx).await;
        }
        Err(e) => {
            tracing::warn!("Rejected {} connection: {}", role, e);
            reject(&mut socket, "authentication failed").await;
        }
    }
}

async fn reject(socket: &mut WebSocket, reason: &'static str) {
    let frame = CloseFrame {
        code: close_code::POLICY_VIOLATION,
        reason: reason.into(),
    };
    if let Err(e) = socket.send(Message::Close(Some(frame))).await {
        tracing::debug!("Failed to send close frame: {}", e);
    }
}

/// Drains the connection's channel into the socket.
///
/// Stops after a close frame or a failed write; dropping `rx` makes every
/// later push to this connection fail, which is how the registry sees a
/// dead peer.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<OutboundFrame>,
    mut sender: SplitSink<WebSocket, Message>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match frame {
                OutboundFrame::Text(text) => {
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                OutboundFrame::Close { code, reason } => {
                    let frame = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    let _ = sender.send(Message::Close(Some(frame))).await;
                    break;
                }
            }
        }
    })
}

async fn run_session(
    socket: WebSocket,
    state: Arc<AppState>,
    peer: SessionPeer,
    rx: mpsc::UnboundedReceiver<OutboundFrame>,
) {
    let (sender, mut receiver) = socket.split();
    let mut send_task = pusher_loop(rx, sender);
    let mut writer_done = false;

    match state.connect_client_usecase.execute(&peer).await {
        Ok(()) => {
            tracing::info!("{} connected", peer);
            loop {
                tokio::select! {
                    frame = receiver.next() => {
                        let message = match frame {
                            Some(Ok(message)) => message,
                            Some(Err(e)) => {
                                tracing::debug!("WebSocket error from {}: {}", peer, e);
                                break;
                            }
                            None => break,
                        };
                        if !handle_message(&state, &peer, message).await {
                            break;
                        }
                    }
                    _ = &mut send_task => {
                        tracing::debug!("Writer for {} stopped", peer);
                        writer_done = true;
                        break;
                    }
                }
            }
        }
        Err(e) => {
            tracing::error!("Failed to connect {}: {}", peer, e);
            peer.close(close_code::INTERNAL_ERROR, "internal error");
        }
    }

    state.disconnect_client_usecase.execute(&peer).await;
    // last sender for this connection, so the writer drains and exits
    drop(peer);

    if !writer_done && tokio::time::timeout(FLUSH_TIMEOUT, &mut send_task).await.is_err() {
        send_task.abort();
    }
}

/// Returns `false` when the session should end.
async fn handle_message(state: &AppState, peer: &SessionPeer, message: Message) -> bool {
    match message {
        Message::Text(text) => {
            match state
                .relay_message_usecase
                .execute(peer, text.as_str())
                .await
            {
                Ok(outcome) => {
                    tracing::debug!("Frame from {}: {:?}", peer, outcome);
                    true
                }
                Err(e) => {
                    tracing::error!("Unexpected error in session {}: {}", peer, e);
                    peer.close(close_code::INTERNAL_ERROR, "internal error");
                    false
                }
            }
        }
        Message::Pong(_) => {
            state.relay_message_usecase.acknowledge_liveness(peer).await;
            true
        }
        Message::Ping(_) => {
            // axum answers pings itself
            tracing::debug!("Received ping from {}", peer);
            true
        }
        Message::Binary(_) => {
            tracing::debug!("Ignoring binary frame from {}", peer);
            true
        }
        Message::Close(_) => {
            tracing::info!("{} requested close", peer);
            false
        }
    }
}
