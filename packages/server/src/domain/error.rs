//! Domain errors.

use thiserror::Error;

use super::Role;

/// クライアントキーの検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientKeyError {
    #[error("client key must not be empty")]
    Empty,
    #[error("client key is too long ({0} characters)")]
    TooLong(usize),
}

/// Role-scoped recipient key could not be accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecipientKeyError {
    #[error("malformed recipient key '{0}', expected 'user_<id>' or 'admin_<id>'")]
    Malformed(String),
    #[error("recipient '{key}' is outside the {expected} namespace")]
    WrongNamespace { key: String, expected: Role },
}

/// Credential verification / identity resolution failures.
///
/// Surfaced by closing the connection before it is ever registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing credential")]
    MissingCredential,
    #[error("invalid credential: {0}")]
    InvalidCredential(String),
    #[error("credential expired")]
    Expired,
    #[error("credential is not valid for the {expected} channel")]
    RoleMismatch { expected: Role },
    #[error("{role} '{subject}' not found")]
    NotFound { role: Role, subject: String },
    #[error("role-scoped channels are disabled")]
    Disabled,
}

/// Failure writing to a single connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("connection {0} is closed")]
    ConnectionClosed(String),
}

/// メッセージストアのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageStoreError {
    #[error("message store unavailable: {0}")]
    Unavailable(String),
}
