//! HTTP API DTOs.

use serde::{Deserialize, Serialize};

/// `GET /api/clients`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveConnectionsDto {
    pub connected_clients: Vec<String>,
    pub anonymous_clients_count: usize,
    pub total_clients: usize,
}

/// `POST /api/messages/send`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub sender_name: Option<String>,
    /// Recipient key; absent means broadcast.
    #[serde(default)]
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub message: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<u64>,
}

/// `GET /api/messages/history` query.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub broadcast_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecordDto {
    pub id: u64,
    pub content: String,
    pub sender_id: Option<String>,
    pub sender_name: String,
    pub recipient_id: Option<String>,
    pub is_broadcast: bool,
    pub timestamp: String,
}
