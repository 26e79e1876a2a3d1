//! ConnectionRegistry trait 定義
//!
//! セッションプロトコルと生存確認タスクが共有する接続レジストリのインターフェース。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use std::{collections::BTreeSet, time::Duration};

use async_trait::async_trait;

use super::{ClientKey, Connection, ConnectionId, Timestamp};

/// Snapshot returned by [`ConnectionRegistry::list_live`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveConnections {
    pub keys: BTreeSet<ClientKey>,
    pub anonymous_count: usize,
}

impl LiveConnections {
    pub fn total(&self) -> usize {
        self.keys.len() + self.anonymous_count
    }
}

/// Outcome of one liveness sweep cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub probed: usize,
    pub evicted: usize,
}

/// Registry of live connections.
///
/// Payloads are opaque serialized envelopes; the registry never looks inside them.
/// All mutation is serialized by the implementation so the one-connection-per-key
/// invariant holds across concurrent session tasks and the sweep task.
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// Track a connection. A previous connection under the same key is closed
    /// and evicted first; its id is returned.
    async fn register(&self, connection: Connection) -> Option<ConnectionId>;

    /// Stop tracking a connection. Returns `false` if it was not tracked
    /// (already removed, or its key now belongs to a newer connection).
    async fn unregister(&self, connection_id: ConnectionId, key: Option<&ClientKey>) -> bool;

    /// Deliver to one keyed connection. `false` if the key is unknown or the write failed.
    async fn send_to(&self, key: &ClientKey, payload: &str) -> bool;

    /// Deliver to every connection except `exclude`. Dead connections found on the
    /// way are evicted. Returns the number of connections tracked afterwards.
    async fn broadcast(&self, payload: &str, exclude: Option<&ClientKey>) -> usize;

    async fn list_live(&self) -> LiveConnections;

    /// Record a liveness acknowledgement from the connection.
    async fn touch(&self, connection_id: ConnectionId);

    /// Probe every connection silent for longer than `stale_after` with `probe`,
    /// refreshing its liveness on success and evicting it on failure.
    async fn sweep_stale(&self, now: Timestamp, stale_after: Duration, probe: &str) -> SweepReport;
}
