//! Authenticated identities.

use super::{ClientKey, Role};

/// Result of verifying a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub subject: String,
    /// `None` for tokens issued without a role claim; those are accepted
    /// on either role-scoped channel.
    pub role: Option<Role>,
}

/// A resolved participant. Immutable for the life of the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: u64,
    pub display_name: String,
    pub role: Role,
}

impl Identity {
    pub fn client_key(&self) -> ClientKey {
        ClientKey::for_role(self.role, self.id)
    }
}
