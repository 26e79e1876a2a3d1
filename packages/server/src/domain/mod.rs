//! Domain layer: value objects, connection model and the interfaces the
//! session protocol depends on.

mod auth;
mod connection;
mod error;
mod identity;
mod message_store;
mod registry;
mod value_object;

#[cfg(test)]
pub use auth::{MockCredentialVerifier, MockIdentityResolver};
pub use auth::{CredentialVerifier, IdentityResolver};
pub use connection::{Connection, OutboundFrame, PusherChannel, close_code};
pub use error::{AuthError, ClientKeyError, MessagePushError, MessageStoreError, RecipientKeyError};
pub use identity::{Claims, Identity};
#[cfg(test)]
pub use message_store::MockMessageStore;
pub use message_store::{HistoryFilter, MessageRecord, MessageStore, NewMessage, StoredMessage};
pub use registry::{ConnectionRegistry, LiveConnections, SweepReport};
pub use value_object::{ClientKey, ConnectionId, RecipientKey, Role, Timestamp};
