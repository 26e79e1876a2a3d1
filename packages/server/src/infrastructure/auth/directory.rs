//! In-memory directory of known users and admins.
//!
//! Loaded from a JSON file:
//!
//! ```json
//! {
//!   "users":  [{"id": 1, "username": "alice", "email": "alice@example.com"}],
//!   "admins": [{"id": 1, "username": "root",  "email": "root@example.com"}]
//! }
//! ```

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::{AuthError, Identity, IdentityResolver, Role};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("failed to read directory file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse directory file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirectoryEntry {
    pub id: u64,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InMemoryIdentityDirectory {
    #[serde(default)]
    users: Vec<DirectoryEntry>,
    #[serde(default)]
    admins: Vec<DirectoryEntry>,
}

impl InMemoryIdentityDirectory {
    pub fn new(users: Vec<DirectoryEntry>, admins: Vec<DirectoryEntry>) -> Self {
        Self { users, admins }
    }

    pub fn from_json(json: &str) -> Result<Self, DirectoryError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.users.len() + self.admins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self, role: Role) -> &[DirectoryEntry] {
        match role {
            Role::User => &self.users,
            Role::Admin => &self.admins,
        }
    }

    /// Email match wins over username match.
    fn lookup(&self, role: Role, subject: &str) -> Option<&DirectoryEntry> {
        let entries = self.entries(role);
        entries
            .iter()
            .find(|entry| entry.email == subject)
            .or_else(|| entries.iter().find(|entry| entry.username == subject))
    }
}

#[async_trait]
impl IdentityResolver for InMemoryIdentityDirectory {
    async fn resolve_identity(&self, role: Role, subject: &str) -> Result<Identity, AuthError> {
        self.lookup(role, subject)
            .map(|entry| Identity {
                id: entry.id,
                display_name: entry.username.clone(),
                role,
            })
            .ok_or_else(|| AuthError::NotFound {
                role,
                subject: subject.to_string(),
            })
    }
}
