//! Value objects used across the relay.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{ClientKeyError, RecipientKeyError};

/// Role of an authenticated chat participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// The namespace a participant of this role may address directly.
    ///
    /// Users talk to admins and admins talk to users.
    pub fn counterpart(&self) -> Role {
        match self {
            Role::User => Role::Admin,
            Role::Admin => Role::User,
        }
    }

    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable address of a keyed connection.
///
/// Opaque to the registry. Role-scoped channels build it as `<role>_<id>`,
/// the open channel takes whatever the client supplies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientKey(String);

impl ClientKey {
    pub const MAX_LEN: usize = 128;

    pub fn new(value: String) -> Result<Self, ClientKeyError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ClientKeyError::Empty);
        }
        let len = trimmed.chars().count();
        if len > Self::MAX_LEN {
            return Err(ClientKeyError::TooLong(len));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Canonical key of an authenticated identity: `"<role>_<id>"`.
    pub fn for_role(role: Role, id: u64) -> Self {
        Self(format!("{}_{}", role.as_str(), id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ClientKey {
    type Error = ClientKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ClientKey> for String {
    fn from(key: ClientKey) -> Self {
        key.0
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Recipient address on a role-scoped channel: `user_<id>` or `admin_<id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipientKey {
    pub role: Role,
    pub id: u64,
}

impl RecipientKey {
    pub fn parse(value: &str) -> Result<Self, RecipientKeyError> {
        let malformed = || RecipientKeyError::Malformed(value.to_string());

        let (prefix, id) = value.split_once('_').ok_or_else(malformed)?;
        let role = Role::parse(prefix).ok_or_else(malformed)?;
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let id = id.parse::<u64>().map_err(|_| malformed())?;

        Ok(Self { role, id })
    }

    /// Parse and require the key to live in the `expected` namespace.
    pub fn parse_in(value: &str, expected: Role) -> Result<Self, RecipientKeyError> {
        let key = Self::parse(value)?;
        if key.role != expected {
            return Err(RecipientKeyError::WrongNamespace {
                key: value.to_string(),
                expected,
            });
        }
        Ok(key)
    }

    pub fn to_client_key(self) -> ClientKey {
        ClientKey::for_role(self.role, self.id)
    }
}

/// Identity of one physical connection, independent of its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unix timestamp in milliseconds (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Milliseconds elapsed from `earlier` to `self`, zero if `earlier` is later.
    pub fn millis_since(&self, earlier: Timestamp) -> i64 {
        (self.0 - earlier.0).max(0)
    }
}
