//! 接続レジストリの実装
//!
//! - `inmemory`: プロセス内メモリで接続を管理する実装（単一プロセス前提）

pub mod inmemory;

pub use inmemory::{InMemoryConnectionRegistry, RegistryConfig};
