//! In-memory ConnectionRegistry 実装
//!
//! ## 責務
//!
//! - キー付き接続（`user_<id>` など）と匿名接続の管理
//! - 単一宛先送信（send_to）と全体送信（broadcast）
//! - 生存確認（sweep_stale）による古い接続の検出と削除
//!
//! ## 設計ノート
//!
//! 状態は 1 つの `Mutex` で保護され、登録・削除・送信・スイープは全て直列化されます。
//! 送信はチャンネルへの enqueue のみで await しないため、ロック保持中に
//! ソケット I/O を待つことはありません。

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use ordertalk_shared::time::Clock;
use tokio::sync::Mutex;

use crate::domain::{
    ClientKey, Connection, ConnectionId, ConnectionRegistry, LiveConnections, SweepReport,
    Timestamp, close_code,
};

/// Registry behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Evict a keyed connection when a direct send to it fails.
    ///
    /// Off by default: a failed `send_to` only reports `false`, and the
    /// connection is left for the next broadcast or sweep to clean up.
    pub evict_on_direct_failure: bool,
}

#[derive(Debug, Default)]
struct RegistryState {
    keyed: HashMap<ClientKey, Connection>,
    anonymous: Vec<Connection>,
}

impl RegistryState {
    fn find_mut(&mut self, connection_id: ConnectionId) -> Option<&mut Connection> {
        if let Some(connection) = self.keyed.values_mut().find(|c| c.id() == connection_id) {
            return Some(connection);
        }
        self.anonymous.iter_mut().find(|c| c.id() == connection_id)
    }

    fn total(&self) -> usize {
        self.keyed.len() + self.anonymous.len()
    }
}

/// Process-wide registry of live WebSocket connections.
///
/// ## 使用例
///
/// ```ignore
/// let registry = InMemoryConnectionRegistry::new(RegistryConfig::default(), Arc::new(SystemClock));
/// registry.register(Connection::new(ConnectionId::new(), Some(key), tx)).await;
/// let delivered = registry.send_to(&key, r#"{"type":"direct_message"}"#).await;
/// ```
pub struct InMemoryConnectionRegistry {
    state: Mutex<RegistryState>,
    config: RegistryConfig,
    clock: Arc<dyn Clock>,
}

impl InMemoryConnectionRegistry {
    pub fn new(config: RegistryConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            config,
            clock,
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }
}

#[async_trait]
impl ConnectionRegistry for InMemoryConnectionRegistry {
    async fn register(&self, mut connection: Connection) -> Option<ConnectionId> {
        connection.mark_alive(self.now());
        let mut state = self.state.lock().await;

        let Some(key) = connection.key().cloned() else {
            tracing::debug!("Anonymous connection {} registered", connection.id());
            state.anonymous.push(connection);
            return None;
        };

        let evicted = state.keyed.remove(&key).map(|previous| {
            tracing::info!(
                "Client '{}' reconnected, closing previous connection {}",
                key,
                previous.id()
            );
            previous.close_quietly(close_code::NORMAL, "replaced by a newer connection");
            previous.id()
        });

        tracing::debug!("Client '{}' registered as {}", key, connection.id());
        state.keyed.insert(key, connection);
        evicted
    }

    async fn unregister(&self, connection_id: ConnectionId, key: Option<&ClientKey>) -> bool {
        let mut state = self.state.lock().await;

        if let Some(key) = key {
            let owned = state
                .keyed
                .get(key)
                .is_some_and(|connection| connection.id() == connection_id);
            if owned {
                state.keyed.remove(key);
                tracing::debug!("Client '{}' unregistered", key);
            }
            return owned;
        }

        let before = state.anonymous.len();
        state.anonymous.retain(|c| c.id() != connection_id);
        let removed = state.anonymous.len() != before;
        if removed {
            tracing::debug!("Anonymous connection {} unregistered", connection_id);
        }
        removed
    }

    async fn send_to(&self, key: &ClientKey, payload: &str) -> bool {
        let mut state = self.state.lock().await;

        let Some(connection) = state.keyed.get(key) else {
            tracing::debug!("Client '{}' is not connected", key);
            return false;
        };

        match connection.push(payload) {
            Ok(()) => {
                tracing::debug!("Pushed message to client '{}'", key);
                true
            }
            Err(e) => {
                tracing::warn!("Failed to push message to client '{}': {}", key, e);
                if self.config.evict_on_direct_failure {
                    state.keyed.remove(key);
                    tracing::info!("Evicted client '{}' after failed direct send", key);
                }
                false
            }
        }
    }

    async fn broadcast(&self, payload: &str, exclude: Option<&ClientKey>) -> usize {
        let mut state = self.state.lock().await;

        let dead: Vec<ClientKey> = state
            .keyed
            .iter()
            .filter(|(key, _)| Some(*key) != exclude)
            .filter_map(|(key, connection)| match connection.push(payload) {
                Ok(()) => None,
                Err(e) => {
                    tracing::warn!("Failed to broadcast to client '{}': {}", key, e);
                    Some(key.clone())
                }
            })
            .collect();
        for key in dead {
            state.keyed.remove(&key);
            tracing::info!("Evicted client '{}' after failed broadcast", key);
        }

        state.anonymous.retain(|connection| match connection.push(payload) {
            Ok(()) => true,
            Err(e) => {
                tracing::info!("Dropping anonymous connection {}: {}", connection.id(), e);
                false
            }
        });

        state.total()
    }

    async fn list_live(&self) -> LiveConnections {
        let state = self.state.lock().await;
        LiveConnections {
            keys: state.keyed.keys().cloned().collect(),
            anonymous_count: state.anonymous.len(),
        }
    }

    async fn touch(&self, connection_id: ConnectionId) {
        let now = self.now();
        let mut state = self.state.lock().await;
        if let Some(connection) = state.find_mut(connection_id) {
            connection.mark_alive(now);
        }
    }

    async fn sweep_stale(&self, now: Timestamp, stale_after: Duration, probe: &str) -> SweepReport {
        let threshold = i64::try_from(stale_after.as_millis()).unwrap_or(i64::MAX);
        let is_stale = |connection: &Connection| now.millis_since(connection.last_liveness()) > threshold;
        let mut report = SweepReport::default();
        let mut state = self.state.lock().await;

        let mut dead = Vec::new();
        for (key, connection) in state.keyed.iter_mut() {
            if !is_stale(connection) {
                continue;
            }
            match connection.push(probe) {
                Ok(()) => {
                    connection.mark_alive(now);
                    report.probed += 1;
                }
                Err(e) => {
                    tracing::warn!("Liveness probe to client '{}' failed: {}", key, e);
                    dead.push(key.clone());
                }
            }
        }
        for key in dead {
            state.keyed.remove(&key);
            report.evicted += 1;
        }

        state.anonymous.retain_mut(|connection| {
            if !is_stale(connection) {
                return true;
            }
            match connection.push(probe) {
                Ok(()) => {
                    connection.mark_alive(now);
                    report.probed += 1;
                    true
                }
                Err(e) => {
                    tracing::warn!(
                        "Liveness probe to anonymous connection {} failed: {}",
                        connection.id(),
                        e
                    );
                    report.evicted += 1;
                    false
                }
            }
        });

        report
    }
}
