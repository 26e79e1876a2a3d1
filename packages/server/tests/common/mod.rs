//! Shared helpers for the server integration tests.
//!
//! Each test starts its own server on `127.0.0.1:0` with an in-memory
//! registry, message store and identity directory.

#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use ordertalk_server::{
    infrastructure::{
        auth::{
            DirectoryEntry, InMemoryIdentityDirectory, JwtCredentialVerifier, TokenClaims,
            encode_token,
        },
        dto::http::LiveConnectionsDto,
        liveness::LivenessConfig,
        registry::{InMemoryConnectionRegistry, RegistryConfig},
        repository::InMemoryMessageStore,
    },
    ui::{AppState, Server},
    usecase::AuthenticateClientUseCase,
};
use ordertalk_shared::time::SystemClock;
use serde_json::Value;
use tokio::{net::TcpStream, sync::oneshot, task::JoinHandle};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{
        client::IntoClientRequest,
        http::{HeaderValue, header::AUTHORIZATION},
        protocol::Message,
    },
};

pub const SECRET: &str = "integration-test-secret";
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A running server; shut down when dropped.
pub struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(LivenessConfig::default()).await
    }

    pub async fn start_with(liveness: LivenessConfig) -> Self {
        let clock = Arc::new(SystemClock);
        let registry = Arc::new(InMemoryConnectionRegistry::new(
            RegistryConfig::default(),
            clock.clone(),
        ));
        let store = Arc::new(InMemoryMessageStore::new(clock.clone()));
        let directory = InMemoryIdentityDirectory::new(
            vec![
                entry(1, "alice", "alice@example.com"),
                entry(2, "carol", "carol@example.com"),
            ],
            vec![entry(1, "root", "root@example.com")],
        );
        let authenticate = Arc::new(AuthenticateClientUseCase::new(
            Arc::new(JwtCredentialVerifier::new(SECRET)),
            Arc::new(directory),
        ));

        let state = AppState::new(registry.clone(), store, clock.clone(), Some(authenticate));
        let server = Server::new(state, registry, clock, liveness);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve(listener, async move {
            let _ = shutdown_rx.await;
        }));

        Self {
            addr,
            shutdown: Some(shutdown),
            handle,
        }
    }

    pub fn ws_url(&self, path_and_query: &str) -> String {
        format!("ws://{}{}", self.addr, path_and_query)
    }

    pub fn http_url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }

    /// Poll `/api/clients` until `predicate` holds.
    pub async fn wait_for_clients(
        &self,
        predicate: impl Fn(&LiveConnectionsDto) -> bool,
    ) -> LiveConnectionsDto {
        let client = reqwest::Client::new();
        let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
        loop {
            let live: LiveConnectionsDto = client
                .get(self.http_url("/api/clients"))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            if predicate(&live) {
                return live;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "clients never matched, last seen: {:?}",
                live
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.handle.abort();
    }
}

fn entry(id: u64, username: &str, email: &str) -> DirectoryEntry {
    DirectoryEntry {
        id,
        username: username.to_string(),
        email: email.to_string(),
    }
}

pub fn token(subject: &str, role: Option<&str>) -> String {
    let claims = TokenClaims {
        sub: subject.to_string(),
        token_type: role.map(str::to_string),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    encode_token(&claims, SECRET).unwrap()
}

pub async fn connect(url: &str) -> WsStream {
    let (ws, _) = connect_async(url).await.expect("failed to connect");
    ws
}

pub async fn connect_with_bearer(url: &str, token: &str) -> WsStream {
    let mut request = url.into_client_request().unwrap();
    request.headers_mut().insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    let (ws, _) = connect_async(request).await.expect("failed to connect");
    ws
}

/// Next frame that is not a transport ping/pong.
pub async fn recv_frame(ws: &mut WsStream) -> Message {
    loop {
        let frame = tokio::time::timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("websocket error");
        match frame {
            Message::Ping(_) | Message::Pong(_) => continue,
            other => return other,
        }
    }
}

pub async fn recv_json(ws: &mut WsStream) -> Value {
    match recv_frame(ws).await {
        Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("expected a text frame, got {:?}", other),
    }
}

/// Skip envelopes until one of type `kind` arrives.
pub async fn recv_type(ws: &mut WsStream, kind: &str) -> Value {
    loop {
        let value = recv_json(ws).await;
        if value["type"] == kind {
            return value;
        }
    }
}

pub async fn send_text(ws: &mut WsStream, text: &str) {
    ws.send(Message::Text(text.to_string().into())).await.unwrap();
}

pub async fn send_json(ws: &mut WsStream, value: Value) {
    send_text(ws, &value.to_string()).await;
}

/// Close code of the next close frame.
pub async fn recv_close_code(ws: &mut WsStream) -> Option<u16> {
    match recv_frame(ws).await {
        Message::Close(frame) => frame.map(|frame| u16::from(frame.code)),
        other => panic!("expected a close frame, got {:?}", other),
    }
}
