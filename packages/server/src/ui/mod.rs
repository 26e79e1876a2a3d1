//! UI 層: axum ルーター、WebSocket / HTTP ハンドラー

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::{Server, ServerConfig};
pub use signal::shutdown_signal;
pub use state::AppState;
