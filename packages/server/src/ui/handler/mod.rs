//! Request handlers.

mod http;
mod websocket;

pub use http::{get_clients, get_message_history, health_check, send_message};
pub use websocket::{admin_websocket_handler, open_websocket_handler, user_websocket_handler};
