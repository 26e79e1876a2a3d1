//! Credential collaborators consumed by the role-scoped channels.

use async_trait::async_trait;

use super::{AuthError, Claims, Identity, Role};

/// Verifies a bearer token.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify_credential(&self, token: &str) -> Result<Claims, AuthError>;
}

/// Looks up the participant behind a verified subject.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve_identity(&self, role: Role, subject: &str) -> Result<Identity, AuthError>;
}
