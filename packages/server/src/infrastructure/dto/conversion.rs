//! DTO と Domain Model の相互変換

use ordertalk_shared::time::timestamp_to_rfc3339;

use crate::domain::{LiveConnections, MessageRecord};

use super::http::{LiveConnectionsDto, MessageRecordDto};

impl From<LiveConnections> for LiveConnectionsDto {
    fn from(live: LiveConnections) -> Self {
        let total_clients = live.total();
        Self {
            connected_clients: live.keys.into_iter().map(String::from).collect(),
            anonymous_clients_count: live.anonymous_count,
            total_clients,
        }
    }
}

impl From<MessageRecord> for MessageRecordDto {
    fn from(record: MessageRecord) -> Self {
        Self {
            id: record.id,
            content: record.content,
            sender_id: record.sender_key,
            sender_name: record.sender_name,
            recipient_id: record.recipient_key.map(String::from),
            is_broadcast: record.is_broadcast,
            timestamp: timestamp_to_rfc3339(record.timestamp.value()),
        }
    }
}
