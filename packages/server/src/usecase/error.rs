//! UseCase errors.

use thiserror::Error;

use crate::domain::ClientKeyError;

/// Unexpected failure inside a session; the connection is force-closed.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SendMessageError {
    #[error("no content provided")]
    EmptyContent,
    #[error("invalid recipient: {0}")]
    InvalidRecipient(#[from] ClientKeyError),
    #[error("failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),
}
