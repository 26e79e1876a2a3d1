//! The per-connection view used by the session protocol.

use std::fmt;

use crate::domain::{
    ClientKey, Connection, ConnectionId, Identity, OutboundFrame, PusherChannel, Role,
};

/// Which endpoint a session came in through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelScope {
    /// `/ws`: unauthenticated, any key or none.
    Open,
    /// `/ws/user` or `/ws/admin`: authenticated, keys namespaced by role.
    Role(Role),
}

/// One connected participant, as seen by its own session task.
#[derive(Debug, Clone)]
pub struct SessionPeer {
    connection_id: ConnectionId,
    key: Option<ClientKey>,
    name: String,
    scope: ChannelScope,
    channel: PusherChannel,
}

impl SessionPeer {
    pub const DEFAULT_NAME: &'static str = "Anonymous";

    /// Peer on the open channel; missing or blank names become `"Anonymous"`.
    pub fn open(key: Option<ClientKey>, name: Option<String>, channel: PusherChannel) -> Self {
        let name = name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_NAME.to_string());
        Self {
            connection_id: ConnectionId::new(),
            key,
            name,
            scope: ChannelScope::Open,
            channel,
        }
    }

    /// Peer on a role-scoped channel, keyed by `<role>_<id>`.
    pub fn authenticated(identity: &Identity, channel: PusherChannel) -> Self {
        Self {
            connection_id: ConnectionId::new(),
            key: Some(identity.client_key()),
            name: identity.display_name.clone(),
            scope: ChannelScope::Role(identity.role),
            channel,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn key(&self) -> Option<&ClientKey> {
        self.key.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> ChannelScope {
        self.scope
    }

    /// The registry-owned side of this peer.
    pub fn to_connection(&self) -> Connection {
        Connection::new(self.connection_id, self.key.clone(), self.channel.clone())
    }

    /// Queue a frame back to this peer only. `false` if its writer is gone.
    pub fn reply(&self, payload: String) -> bool {
        self.channel.send(OutboundFrame::Text(payload)).is_ok()
    }

    /// Ask this peer's writer to close the socket.
    pub fn close(&self, code: u16, reason: &str) {
        let frame = OutboundFrame::Close {
            code,
            reason: reason.to_string(),
        };
        if self.channel.send(frame).is_err() {
            tracing::debug!("Close for {} ignored, writer already stopped", self);
        }
    }
}

impl fmt::Display for SessionPeer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "'{}'", key),
            None => write!(f, "anonymous {}", self.connection_id),
        }
    }
}
