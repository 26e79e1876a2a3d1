//! Credential verification and identity lookup.
//!
//! - `jwt`: HS256 bearer token verification
//! - `directory`: in-memory user/admin directory loaded from JSON

pub mod directory;
pub mod jwt;

pub use directory::{DirectoryEntry, DirectoryError, InMemoryIdentityDirectory};
pub use jwt::{JwtCredentialVerifier, TokenClaims, encode_token};
