//! Data Transfer Objects for the WebSocket and HTTP surfaces.

pub mod conversion;
pub mod http;
pub mod websocket;
