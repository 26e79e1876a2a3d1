//! Live duplex connection as seen by the registry.

use tokio::sync::mpsc;

use super::{ClientKey, ConnectionId, MessagePushError, Timestamp};

/// WebSocket close codes used by the relay.
pub mod close_code {
    pub const NORMAL: u16 = 1000;
    pub const POLICY_VIOLATION: u16 = 1008;
    pub const INTERNAL_ERROR: u16 = 1011;
}

/// Frame queued for the socket writer of one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    Close { code: u16, reason: String },
}

/// Channel feeding a connection's socket writer.
///
/// A send fails once the writer has stopped, which is how a dead peer shows up.
pub type PusherChannel = mpsc::UnboundedSender<OutboundFrame>;

/// A live connection, owned by the registry while it is tracked.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    key: Option<ClientKey>,
    channel: PusherChannel,
    last_liveness: Timestamp,
}

impl Connection {
    pub fn new(id: ConnectionId, key: Option<ClientKey>, channel: PusherChannel) -> Self {
        Self {
            id,
            key,
            channel,
            last_liveness: Timestamp::new(0),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn key(&self) -> Option<&ClientKey> {
        self.key.as_ref()
    }

    pub fn last_liveness(&self) -> Timestamp {
        self.last_liveness
    }

    pub fn mark_alive(&mut self, at: Timestamp) {
        self.last_liveness = at;
    }

    /// Queue a text frame for this connection.
    pub fn push(&self, payload: &str) -> Result<(), MessagePushError> {
        self.channel
            .send(OutboundFrame::Text(payload.to_string()))
            .map_err(|_| MessagePushError::ConnectionClosed(self.id.to_string()))
    }

    /// Ask the writer to close the socket.
    pub fn close(&self, code: u16, reason: &str) -> Result<(), MessagePushError> {
        self.channel
            .send(OutboundFrame::Close {
                code,
                reason: reason.to_string(),
            })
            .map_err(|_| MessagePushError::ConnectionClosed(self.id.to_string()))
    }

    /// Close without reporting failure; a peer that is already gone is only logged.
    pub fn close_quietly(&self, code: u16, reason: &str) {
        if let Err(e) = self.close(code, reason) {
            tracing::debug!("Ignoring close failure: {}", e);
        }
    }
}
