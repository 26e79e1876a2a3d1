//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

use crate::{
    domain::HistoryFilter,
    infrastructure::dto::http::{
        HistoryQuery, LiveConnectionsDto, MessageRecordDto, SendMessageRequest,
        SendMessageResponse,
    },
    ui::state::AppState,
    usecase::{SendMessageCommand, SendMessageError, SendMessageReport},
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Currently connected clients
pub async fn get_clients(State(state): State<Arc<AppState>>) -> Json<LiveConnectionsDto> {
    let live = state.get_live_connections_usecase.execute().await;
    // Domain Model から DTO への変換
    Json(LiveConnectionsDto::from(live))
}

/// Send a message to one client (`client_id`) or to everyone
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SendMessageRequest>,
) -> (StatusCode, Json<SendMessageResponse>) {
    let command = SendMessageCommand {
        content: request.content.unwrap_or_default(),
        sender_name: request.sender_name,
        recipient: request.client_id,
    };

    match state.send_message_usecase.execute(command).await {
        Ok(SendMessageReport::Direct {
            delivered,
            message_id,
        }) => {
            let message = if delivered {
                "Message delivered".to_string()
            } else {
                "Recipient is not connected".to_string()
            };
            (
                StatusCode::OK,
                Json(SendMessageResponse {
                    message,
                    success: delivered,
                    message_id,
                }),
            )
        }
        Ok(SendMessageReport::Broadcast {
            recipients,
            message_id,
        }) => (
            StatusCode::OK,
            Json(SendMessageResponse {
                message: format!("Message broadcast to {} clients", recipients),
                success: true,
                message_id,
            }),
        ),
        Err(SendMessageError::EmptyContent) => (
            StatusCode::OK,
            Json(SendMessageResponse {
                message: "No content provided".to_string(),
                success: false,
                message_id: None,
            }),
        ),
        Err(SendMessageError::InvalidRecipient(e)) => {
            tracing::warn!("Rejected HTTP message: {}", e);
            (
                StatusCode::BAD_REQUEST,
                Json(SendMessageResponse {
                    message: e.to_string(),
                    success: false,
                    message_id: None,
                }),
            )
        }
        Err(e) => {
            tracing::error!("Failed to send HTTP message: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SendMessageResponse {
                    message: "Internal error".to_string(),
                    success: false,
                    message_id: None,
                }),
            )
        }
    }
}

/// Chat history, newest first
pub async fn get_message_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<MessageRecordDto>> {
    let filter = HistoryFilter {
        client_key: query.client_id.filter(|id| !id.is_empty()),
        broadcast_only: query.broadcast_only,
    };
    let records = state.get_message_history_usecase.execute(filter).await;

    Json(records.into_iter().map(MessageRecordDto::from).collect())
}
