//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{
    Router,
    routing::{get, post},
};
use ordertalk_shared::time::Clock;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{
    domain::ConnectionRegistry,
    infrastructure::liveness::{LivenessConfig, LivenessSweep},
};

use super::{
    handler::{
        admin_websocket_handler, get_clients, get_message_history, health_check,
        open_websocket_handler, send_message, user_websocket_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

/// Where to listen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Chat relay server
///
/// HTTP と WebSocket のルーターに加え、生存確認スイープのライフサイクルを管理する。
///
/// # Example
///
/// ```ignore
/// let state = AppState::new(registry.clone(), store, clock.clone(), Some(auth));
/// let server = Server::new(state, registry, clock, LivenessConfig::default());
/// server.run(&ServerConfig::default()).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
    /// スイープ対象のレジストリ（AppState 内のユースケースと同一インスタンス）
    registry: Arc<dyn ConnectionRegistry>,
    clock: Arc<dyn Clock>,
    liveness: LivenessConfig,
}

impl Server {
    pub fn new(
        state: AppState,
        registry: Arc<dyn ConnectionRegistry>,
        clock: Arc<dyn Clock>,
        liveness: LivenessConfig,
    ) -> Self {
        Self {
            state: Arc::new(state),
            registry,
            clock,
            liveness,
        }
    }

    /// Build the router without binding anything.
    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(open_websocket_handler))
            .route("/ws/user", get(user_websocket_handler))
            .route("/ws/admin", get(admin_websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/clients", get(get_clients))
            .route("/api/messages/send", post(send_message))
            .route("/api/messages/history", get(get_message_history))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    ///
    /// The liveness sweep runs for exactly as long as the HTTP server does.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let sweep = LivenessSweep::start(self.registry.clone(), self.clock.clone(), self.liveness);

        tracing::info!("Chat relay listening on {}", listener.local_addr()?);
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;

        sweep.stop().await;
        tracing::info!("Server shutdown complete");
        result
    }

    /// Bind to `config` and serve until Ctrl+C / SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&bind_addr).await?;
        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await?;
        Ok(())
    }
}
